use super::{
    check_ids, deserialize_flexible_string, deserialize_string_list, deserialize_test_data,
    EditError,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder rendered for empty list fields
pub const NONE_PLACEHOLDER: &str = "None";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, alias = "id", deserialize_with = "deserialize_flexible_string")]
    pub test_id: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub description: String,
    #[serde(default, alias = "preconditions", deserialize_with = "deserialize_string_list")]
    pub prerequisites: Vec<String>,
    /// Display order follows insertion order
    #[serde(default, deserialize_with = "deserialize_test_data")]
    pub test_data: IndexMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub expected_results: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub related_rules: Vec<String>,
}

impl TestCase {
    pub fn new(test_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn prerequisites_display(&self) -> String {
        join_or_none(&self.prerequisites, "; ")
    }

    pub fn related_rules_display(&self) -> String {
        join_or_none(&self.related_rules, ", ")
    }
}

fn join_or_none(items: &[String], separator: &str) -> String {
    if items.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        items.join(separator)
    }
}

/// Collection of test cases derived from a business logic record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScript {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub program_name: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TestScript {
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            test_cases: Vec::new(),
        }
    }

    pub fn test_case(&self, test_id: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|t| t.test_id == test_id)
    }

    /// Format checks applied before hand edits are accepted
    pub fn check(&self) -> Result<(), EditError> {
        if self.program_name.trim().is_empty() {
            return Err(EditError::EmptyProgramName);
        }
        check_ids("Test case", self.test_cases.iter().map(|t| t.test_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prerequisites_render_as_none() {
        let case = TestCase::new("TC-001", "Happy path");
        assert_eq!(case.prerequisites_display(), "None");
        assert_eq!(case.related_rules_display(), "None");
    }

    #[test]
    fn test_check_rejects_duplicate_test_ids() {
        let mut script = TestScript::new("X800DN");
        script.test_cases.push(TestCase::new("TC-001", "a"));
        script.test_cases.push(TestCase::new("TC-002", "b"));
        assert_eq!(script.check(), Ok(()));

        script.test_cases[1].test_id = "TC-001".to_string();
        assert_eq!(
            script.check(),
            Err(EditError::DuplicateId {
                kind: "Test case",
                id: "TC-001".to_string()
            })
        );
    }

    #[test]
    fn test_test_data_keeps_insertion_order() {
        let case: TestCase = serde_json::from_str(
            r#"{"test_id": "TC-1", "test_data": {"zeta": "1", "alpha": 2, "mid": true}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = case.test_data.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(case.test_data["alpha"], "2");
        assert_eq!(case.test_data["mid"], "true");
    }

    #[test]
    fn test_single_string_list_fields() {
        let case: TestCase = serde_json::from_str(
            r#"{"id": "TC-2", "preconditions": "Region is up", "steps": null, "related_rules": ["R1", 2]}"#,
        )
        .unwrap();
        assert_eq!(case.test_id, "TC-2");
        assert_eq!(case.prerequisites, vec!["Region is up"]);
        assert!(case.steps.is_empty());
        assert_eq!(case.related_rules, vec!["R1", "2"]);
    }
}
