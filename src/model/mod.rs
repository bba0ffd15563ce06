mod business_logic;
mod test_script;

pub use business_logic::{
    BusinessLogic, BusinessRule, IntegrationPoint, ProgramType, SpecialCase, Validation,
};
pub use test_script::{TestCase, TestScript, NONE_PLACEHOLDER};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Format problems in a hand-edited record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("program name must not be empty")]
    EmptyProgramName,

    #[error("{kind} #{position} has an empty identifier")]
    EmptyId { kind: &'static str, position: usize },

    #[error("{kind} identifier '{id}' is used more than once")]
    DuplicateId { kind: &'static str, id: String },
}

/// Identifiers must be non-empty and unique (case-insensitive)
pub(crate) fn check_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), EditError> {
    let mut seen = std::collections::HashSet::new();
    for (i, id) in ids.enumerate() {
        let id = id.trim();
        if id.is_empty() {
            return Err(EditError::EmptyId {
                kind,
                position: i + 1,
            });
        }
        if !seen.insert(id.to_lowercase()) {
            return Err(EditError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Deserialize a String, accepting the booleans, numbers and nulls LLMs emit in its place
pub(crate) fn deserialize_flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct FlexibleStringVisitor;

    impl<'de> Visitor<'de> for FlexibleStringVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("string, boolean, number or null")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(FlexibleStringVisitor)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }
    }

    deserializer.deserialize_any(FlexibleStringVisitor)
}

/// Optional string where an empty value means absent
pub(crate) fn deserialize_optional_string<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_flexible_string(deserializer)?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("false") {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

/// List of strings where the LLM may send a single string or null
pub(crate) fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<serde_json::Value>),
        One(serde_json::Value),
    }

    let items = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(values)) => values,
        Some(OneOrMany::One(value)) => vec![value],
    };

    Ok(items
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .filter(|s| !s.trim().is_empty())
        .collect())
}

/// Key/value test data where values may arrive as numbers or booleans
pub(crate) fn deserialize_test_data<'de, D>(
    deserializer: D,
) -> Result<indexmap::IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<indexmap::IndexMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
