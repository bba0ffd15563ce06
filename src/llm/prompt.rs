use crate::intake::ProgramInfo;
use crate::model::{BusinessLogic, ProgramType};

/// What a prompt asks the model to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ExtractBusinessLogic,
    GenerateTests,
    ReviewLogic,
}

impl OperationKind {
    pub fn default_temperature(&self) -> f32 {
        match self {
            OperationKind::ExtractBusinessLogic => 0.1,
            OperationKind::GenerateTests => 0.3,
            OperationKind::ReviewLogic => 0.2,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::ExtractBusinessLogic => write!(f, "extract-business-logic"),
            OperationKind::GenerateTests => write!(f, "generate-tests"),
            OperationKind::ReviewLogic => write!(f, "review-logic"),
        }
    }
}

/// Exact text sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: OperationKind,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl Prompt {
    pub fn new(kind: OperationKind, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
            user: user.into(),
            temperature: kind.default_temperature(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        if let Some(t) = temperature {
            self.temperature = t.clamp(0.0, 1.0);
        }
        self
    }
}

/// Response layout the business logic parser reads
pub const BUSINESS_LOGIC_FORMAT: &str = r#"## Program Name
<program id>

## Program Type
Online or Batch

## Program Purpose
<what the program does for the business, one or more paragraphs>

## Core Business Rules
- RULE-001: <what the rule enforces>
  Implementation: <how the program implements it>

## Data Validation Rules
- <FIELD-NAME>: <validation rule>
  Error Handling: <what happens when the check fails>

## Special Processing Rules
- <condition>: <how it is handled>
  Notes: <optional remarks>

## Integration Points
- <name>: <description>
  Type: <Database | File | Program | API | Screen>
  Direction: <Input | Output | Both>

## Additional Notes
<anything else worth recording, such as screen flow or error handling>"#;

/// Response layout the test script parser reads
pub const TEST_SCRIPT_FORMAT: &str = r#"### Test Case: <PROGRAM>-TC-001
Title: <short title>
Description: <what the test verifies>
Related Rules: <RULE-001, RULE-002 or None>
Prerequisites:
- <condition that must hold before running>
Test Data:
- <FIELD>: <value>
Steps:
1. <step>
2. <step>
Expected Results:
- <observable outcome>"#;

fn program_type_guidance(program_type: ProgramType) -> &'static str {
    match program_type {
        ProgramType::Online => {
            r#"This is an online (IDMS-DC / transactional) program. Pay special attention to:
- Screen mapping and user interactions
- PF key functions and screen flow
- Validation of user input and the error messages shown
- Session state kept between transactions
Describe the screen flow under Additional Notes."#
        }
        ProgramType::Batch => {
            r#"This is a batch (IDMS-DB) program. Focus on:
- Database access patterns and record relationships
- Business transformations and calculations
- Processing order and logic branches
- Batch control, restart and error logging rules"#
        }
    }
}

/// Build the prompt that extracts business logic from one chunk of source
pub fn extraction_prompt(
    source_chunk: &str,
    info: &ProgramInfo,
    chunk_index: usize,
    chunk_count: usize,
) -> Prompt {
    let system = format!(
        r#"You are an expert in IDMS and COBOL who extracts business logic from legacy programs.
Describe business meaning, not code structure: the rules the program enforces, the data it validates, the exceptional cases it handles and the systems it talks to.

{guidance}

Respond in markdown using exactly these section headings, in this order, with one bullet per item:

{format}

Use "- None" under a heading when a section has no items. Do not add other top-level headings."#,
        guidance = program_type_guidance(info.program_type),
        format = BUSINESS_LOGIC_FORMAT,
    );

    let program_line = match &info.program_id {
        Some(id) => format!("Program: {} ({})", id, info.program_type),
        None => format!("Program type: {}", info.program_type),
    };

    let part_note = if chunk_count > 1 {
        format!(
            "\nThis is part {} of {} of the program. Extract only what this part shows; rule identifiers must stay stable across parts (use the paragraph name when there is one).\n",
            chunk_index + 1,
            chunk_count
        )
    } else {
        String::new()
    };

    let remarks = if info.remarks.is_empty() {
        String::new()
    } else {
        format!("\nProgram remarks:\n{}\n", info.remarks.join("\n"))
    };

    let user = format!(
        r#"Extract the business logic from this program.

{program_line}
{part_note}{remarks}
Program source:
```
{source_chunk}
```"#
    );

    Prompt::new(OperationKind::ExtractBusinessLogic, system, user)
}

/// Build the prompt that generates test cases from a business logic record.
///
/// Rules past `char_budget` are summarized as a count so the prompt stays bounded.
pub fn test_generation_prompt(logic: &BusinessLogic, char_budget: usize) -> Prompt {
    let system = format!(
        r#"You are a test engineer writing test scripts for an IDMS/COBOL program.
Write at least five test cases covering basic functionality, data validation, error handling, integration points and special processing conditions. Include positive and negative tests.
{focus}

Format EVERY test case exactly like this:

{format}

Test IDs must be unique. Reference rule identifiers from the business logic under Related Rules."#,
        focus = match logic.program_type {
            ProgramType::Online => "Include screen navigation and PF key tests.",
            ProgramType::Batch => "Include database access pattern and batch control tests.",
        },
        format = TEST_SCRIPT_FORMAT,
    );

    let mut user = format!(
        "Create a test script for this program.\n\nProgram Name: {}\nProgram Type: {}\nPurpose: {}\n\nCore business rules:\n",
        logic.program_name, logic.program_type, logic.program_purpose
    );

    if logic.core_rules.is_empty() {
        user.push_str("- No specific core rules identified\n");
    } else {
        let mut included = 0;
        for rule in &logic.core_rules {
            let line = format!("- {}: {}\n", rule.id, rule.description);
            if user.len() + line.len() > char_budget && included > 0 {
                break;
            }
            user.push_str(&line);
            included += 1;
        }
        let omitted = logic.core_rules.len() - included;
        if omitted > 0 {
            user.push_str(&format!("- Plus {} more rules\n", omitted));
        }
    }

    let sections: [(&str, Vec<String>); 3] = [
        (
            "Validations",
            logic
                .validations
                .iter()
                .map(|v| format!("- {}: {}", v.field, v.rule))
                .collect(),
        ),
        (
            "Special cases",
            logic
                .special_cases
                .iter()
                .map(|c| format!("- {}: {}", c.condition, c.handling))
                .collect(),
        ),
        (
            "Integration points",
            logic
                .integration_points
                .iter()
                .map(|p| format!("- {} ({}, {})", p.name, p.kind, p.direction))
                .collect(),
        ),
    ];

    for (title, lines) in sections {
        if lines.is_empty() {
            continue;
        }
        let block = format!("\n{}:\n{}\n", title, lines.join("\n"));
        if user.len() + block.len() <= char_budget {
            user.push_str(&block);
        }
    }

    Prompt::new(OperationKind::GenerateTests, system, user)
}

/// Build the prompt asking the model to review an edited record for gaps
pub fn review_prompt(logic: &BusinessLogic) -> Prompt {
    let system = r#"You are an IDMS/COBOL business logic reviewer.
Review an extracted business logic summary for internal consistency, missing validations, unhandled special cases and vague integration descriptions.
Answer with a short bulleted list of findings and suggested improvements. Do not restate the input."#;

    let mut user = format!(
        "Program Name: {}\nProgram Type: {}\nProgram Purpose: {}\n\nCore Business Rules:\n",
        logic.program_name, logic.program_type, logic.program_purpose
    );
    for rule in &logic.core_rules {
        user.push_str(&format!("- {}: {}\n", rule.id, rule.description));
    }
    user.push_str("\nData Validation Rules:\n");
    for v in &logic.validations {
        user.push_str(&format!("- {}: {}\n", v.field, v.rule));
    }
    user.push_str("\nSpecial Processing Rules:\n");
    for c in &logic.special_cases {
        user.push_str(&format!("- {}: {}\n", c.condition, c.handling));
    }
    user.push_str("\nIntegration Points:\n");
    for p in &logic.integration_points {
        user.push_str(&format!("- {} ({}, {}): {}\n", p.name, p.kind, p.direction, p.description));
    }

    Prompt::new(OperationKind::ReviewLogic, system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BusinessRule;

    fn info(program_type: ProgramType) -> ProgramInfo {
        ProgramInfo {
            program_id: Some("X800DN".to_string()),
            program_type,
            ..ProgramInfo::default()
        }
    }

    #[test]
    fn test_extraction_prompt_is_deterministic() {
        let a = extraction_prompt("MOVE A TO B.", &info(ProgramType::Batch), 0, 1);
        let b = extraction_prompt("MOVE A TO B.", &info(ProgramType::Batch), 0, 1);
        assert_eq!(a, b);
        assert_eq!(a.kind, OperationKind::ExtractBusinessLogic);
        assert_eq!(a.temperature, 0.1);
    }

    #[test]
    fn test_extraction_prompt_contents() {
        let prompt = extraction_prompt("MAP IN USING X800MAP.", &info(ProgramType::Online), 1, 3);
        assert!(prompt.system.contains("## Core Business Rules"));
        assert!(prompt.system.contains("PF key"));
        assert!(prompt.user.contains("Program: X800DN (Online)"));
        assert!(prompt.user.contains("part 2 of 3"));
        assert!(prompt.user.contains("MAP IN USING X800MAP."));
    }

    #[test]
    fn test_single_chunk_has_no_part_note() {
        let prompt = extraction_prompt("MOVE A TO B.", &info(ProgramType::Batch), 0, 1);
        assert!(!prompt.user.contains("part 1 of 1"));
        assert!(prompt.system.contains("batch"));
    }

    #[test]
    fn test_generation_prompt_summarizes_rules_past_budget() {
        let mut logic = BusinessLogic::new("X800DN", ProgramType::Batch);
        for i in 0..50 {
            logic.core_rules.push(BusinessRule {
                id: format!("RULE-{:03}", i),
                description: "Customer balance must never go negative after posting".to_string(),
                implementation: String::new(),
            });
        }

        let prompt = test_generation_prompt(&logic, 600);
        assert!(prompt.user.contains("RULE-000"));
        assert!(!prompt.user.contains("RULE-049"));
        assert!(prompt.user.contains("more rules"));
        assert_eq!(prompt.kind, OperationKind::GenerateTests);
    }

    #[test]
    fn test_generation_prompt_without_rules() {
        let logic = BusinessLogic::new("EMPTY", ProgramType::Online);
        let prompt = test_generation_prompt(&logic, 10_000);
        assert!(prompt.user.contains("No specific core rules identified"));
        assert!(prompt.system.contains("### Test Case:"));
        assert!(prompt.system.contains("screen navigation"));
    }

    #[test]
    fn test_temperature_override() {
        let prompt = review_prompt(&BusinessLogic::default()).with_temperature(Some(1.7));
        assert_eq!(prompt.temperature, 1.0);
        assert_eq!(prompt.kind, OperationKind::ReviewLogic);
    }
}
