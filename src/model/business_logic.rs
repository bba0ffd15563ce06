use super::{check_ids, deserialize_flexible_string, deserialize_optional_string, EditError};
use serde::{Deserialize, Serialize};

/// Category of a legacy program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramType {
    /// Online / transactional (IDMS-DC, CICS)
    Online,
    /// Batch / database (IDMS-DB)
    Batch,
}

impl ProgramType {
    /// Lenient parse of the labels models and users write for program types
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label
            .trim()
            .trim_matches(|c: char| c == '*' || c == '`' || c == '.')
            .to_lowercase();
        let first = normalized
            .split(|c: char| c.is_whitespace() || c == '(' || c == '/' || c == ',')
            .find(|w| !w.is_empty())
            .unwrap_or("");

        match first {
            "dc" | "online" | "idms-dc" | "cics" | "interactive" | "transactional" => {
                Some(ProgramType::Online)
            }
            "db" | "batch" | "idms-db" | "database" => Some(ProgramType::Batch),
            _ => None,
        }
    }

    pub fn all() -> [ProgramType; 2] {
        [ProgramType::Online, ProgramType::Batch]
    }
}

impl Default for ProgramType {
    fn default() -> Self {
        ProgramType::Batch
    }
}

impl std::fmt::Display for ProgramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramType::Online => write!(f, "Online"),
            ProgramType::Batch => write!(f, "Batch"),
        }
    }
}

// Custom deserializer to handle LLM variations like "IDMS-DC" -> Online
impl<'de> Deserialize<'de> for ProgramType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = deserialize_flexible_string(deserializer)?;
        Ok(ProgramType::from_label(&s).unwrap_or_default())
    }
}

impl Serialize for ProgramType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRule {
    #[serde(default, alias = "rule_id", deserialize_with = "deserialize_flexible_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub implementation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub field: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub rule: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub error_handling: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCase {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub condition: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub handling: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationPoint {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub name: String,
    /// Database, File, API, Program, ...
    #[serde(default, rename = "type", deserialize_with = "deserialize_flexible_string")]
    pub kind: String,
    /// Input, Output or Both
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub direction: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub description: String,
}

/// Structured extraction of a legacy program's business logic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessLogic {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub program_name: String,
    #[serde(default)]
    pub program_type: ProgramType,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub program_purpose: String,
    #[serde(default)]
    pub core_rules: Vec<BusinessRule>,
    #[serde(default)]
    pub validations: Vec<Validation>,
    #[serde(default)]
    pub special_cases: Vec<SpecialCase>,
    #[serde(default)]
    pub integration_points: Vec<IntegrationPoint>,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub additional_notes: String,
}

impl BusinessLogic {
    pub fn new(program_name: impl Into<String>, program_type: ProgramType) -> Self {
        Self {
            program_name: program_name.into(),
            program_type,
            ..Self::default()
        }
    }

    pub fn rule(&self, id: &str) -> Option<&BusinessRule> {
        self.core_rules.iter().find(|r| r.id == id)
    }

    /// True when no list section carries any item
    pub fn has_no_findings(&self) -> bool {
        self.core_rules.is_empty()
            && self.validations.is_empty()
            && self.special_cases.is_empty()
            && self.integration_points.is_empty()
    }

    /// Format checks applied before hand edits are accepted
    pub fn check(&self) -> Result<(), EditError> {
        if self.program_name.trim().is_empty() {
            return Err(EditError::EmptyProgramName);
        }
        check_ids("Rule", self.core_rules.iter().map(|r| r.id.as_str()))
    }

    /// Short per-section count, used for status lines and logs
    pub fn summary(&self) -> String {
        format!(
            "{} rules, {} validations, {} special cases, {} integration points",
            self.core_rules.len(),
            self.validations.len(),
            self.special_cases.len(),
            self.integration_points.len()
        )
    }
}
