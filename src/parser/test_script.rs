//! Test script response parsing.

use super::text::{
    heading_text, is_none_marker, normalize_key, split_label, strip_code_fences, strip_emphasis,
    strip_list_marker, unique_id,
};
use super::ParseError;
use crate::model::{TestCase, TestScript};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Prerequisites,
    TestData,
    Steps,
    ExpectedResults,
    RelatedRules,
}

fn field_for(label: &str) -> Option<Field> {
    let field = match normalize_key(label).as_str() {
        "title" | "test title" | "test case title" | "name" | "objective" | "test objective" => {
            Field::Title
        }
        "description" | "test description" | "purpose" => Field::Description,
        "prerequisites" | "prerequisite" | "preconditions" | "pre-conditions" | "setup" => {
            Field::Prerequisites
        }
        "test data" | "data" | "input data" | "inputs" => Field::TestData,
        "steps" | "test steps" | "procedure" | "steps to execute" => Field::Steps,
        "expected results" | "expected result" | "expected outcome" | "expected outcomes"
        | "pass/fail criteria" => Field::ExpectedResults,
        "related rules" | "related business rules" | "rules covered" | "business rules" => {
            Field::RelatedRules
        }
        _ => return None,
    };
    Some(field)
}

impl Field {
    fn is_list(self) -> bool {
        matches!(
            self,
            Field::Prerequisites | Field::TestData | Field::Steps | Field::ExpectedResults
        )
    }
}

const HEADER_PREFIXES: [&str; 3] = ["test case id", "test case", "test id"];

/// `(id, inline title)` when the line opens a new test case
fn test_case_header(line: &str) -> Option<(String, String)> {
    let text = heading_text(line)?;
    let lower = text.to_lowercase();

    let prefix = HEADER_PREFIXES.iter().find(|p| lower.starts_with(*p))?;
    let rest = &text[prefix.len()..];
    // "Test Cases" is a heading, not a test case
    if rest.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false) {
        return None;
    }

    let rest =
        rest.trim_start_matches(|c: char| c == ':' || c == '#' || c == '-' || c.is_whitespace());
    let id_end = rest
        .find(|c: char| c.is_whitespace() || c == ':' || c == '(')
        .unwrap_or(rest.len());
    let id = rest[..id_end].trim_end_matches(['.', ',']);
    if id.is_empty() || !id.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let title = rest[id_end..]
        .trim_start_matches(|c: char| c == ':' || c == '-' || c == '–' || c.is_whitespace())
        .trim();

    let id = if id.chars().all(|c| c.is_ascii_digit()) {
        format!("TC-{}", id)
    } else {
        id.to_string()
    };
    Some((id, title.to_string()))
}

struct CaseBuilder {
    case: TestCase,
    field: Option<Field>,
    /// Any line seen after the header
    has_body: bool,
}

impl CaseBuilder {
    fn new(id: String, title: String) -> Self {
        Self {
            case: TestCase::new(id, title),
            field: None,
            has_body: false,
        }
    }

    fn line(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }

        self.has_body = true;

        let item = strip_list_marker(trimmed);
        let body = item.unwrap_or(trimmed);
        let text = strip_emphasis(body);

        if let Some((label, value)) = split_label(&text) {
            // "- Name: John Smith" under Test Data is a row, not a new field
            let is_row = item.is_some()
                && self.field.map(Field::is_list).unwrap_or(false)
                && !value.is_empty()
                && !body.starts_with("**");
            if let Some(field) = field_for(label).filter(|_| !is_row) {
                self.field = Some(field);
                if !value.is_empty() {
                    self.value(field, value);
                }
                return;
            }
        }

        // A bare heading such as "**Steps**"
        if let Some(field) = field_for(&text) {
            self.field = Some(field);
            return;
        }

        if text.is_empty() {
            return;
        }
        let field = self.field.unwrap_or(Field::Description);
        self.value(field, &text);
    }

    fn value(&mut self, field: Field, text: &str) {
        let text = text.trim();
        if is_none_marker(text) {
            return;
        }
        let case = &mut self.case;
        match field {
            Field::Title => super::text::append_text(&mut case.title, text),
            Field::Description => super::text::append_text(&mut case.description, text),
            Field::Prerequisites => case.prerequisites.push(text.to_string()),
            Field::Steps => case.steps.push(text.to_string()),
            Field::ExpectedResults => case.expected_results.push(text.to_string()),
            Field::TestData => {
                let (key, value) = split_label(text)
                    .or_else(|| text.split_once('=').map(|(k, v)| (k.trim(), v.trim())))
                    .unwrap_or((text, ""));
                case.test_data.insert(key.to_string(), value.to_string());
            }
            Field::RelatedRules => {
                for rule in text.split([',', ';']) {
                    let rule = rule.trim();
                    if !rule.is_empty() && !is_none_marker(rule) {
                        case.related_rules.push(rule.to_string());
                    }
                }
            }
        }
    }

    fn finish(self) -> TestCase {
        let mut case = self.case;
        if case.title.is_empty() {
            case.title = match case.description.split('.').next() {
                Some(first) if !first.trim().is_empty() => first.trim().to_string(),
                _ => "Untitled Test Case".to_string(),
            };
        }
        if case.description.is_empty() {
            case.description = case.title.clone();
        }
        case
    }
}

/// Parse a model response into a test script for `program_name`
pub fn parse_test_script(raw: &str, program_name: &str) -> Result<TestScript, ParseError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    if text.starts_with('{') || text.starts_with('[') {
        match parse_json(text, program_name) {
            Ok(script) if !script.test_cases.is_empty() => return Ok(finalize(script)),
            Ok(_) => return Err(ParseError::NoTestCases),
            Err(e) => {
                tracing::debug!(error = %e, "Response is not valid JSON, reading as markdown")
            }
        }
    }

    let mut cases = Vec::new();
    let mut current: Option<CaseBuilder> = None;

    for line in text.lines() {
        if let Some((id, title)) = test_case_header(line) {
            match current.as_mut() {
                // "Test Case 1: Title" directly followed by "Test ID: X-TC-001"
                Some(builder) if !builder.has_body => {
                    builder.case.test_id = id;
                    if builder.case.title.is_empty() {
                        builder.case.title = title;
                    }
                    continue;
                }
                _ => {}
            }
            if let Some(done) = current.take() {
                cases.push(done.finish());
            }
            current = Some(CaseBuilder::new(id, title));
            continue;
        }

        if let Some(builder) = current.as_mut() {
            builder.line(line);
        }
    }
    if let Some(done) = current {
        cases.push(done.finish());
    }

    if cases.is_empty() {
        tracing::warn!(response_len = raw.len(), "No test cases recognized in response");
        return Err(ParseError::NoTestCases);
    }

    Ok(finalize(TestScript {
        program_name: program_name.to_string(),
        test_cases: cases,
    }))
}

fn parse_json(text: &str, program_name: &str) -> Result<TestScript, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let test_cases = if value.is_array() {
        serde_json::from_value::<Vec<TestCase>>(value)?
    } else {
        match value.get("test_cases") {
            Some(cases) => serde_json::from_value::<Vec<TestCase>>(cases.clone())?,
            None => Vec::new(),
        }
    };
    Ok(TestScript {
        program_name: program_name.to_string(),
        test_cases,
    })
}

fn finalize(mut script: TestScript) -> TestScript {
    let mut taken = HashSet::new();
    for (i, case) in script.test_cases.iter_mut().enumerate() {
        if case.test_id.trim().is_empty() {
            case.test_id = format!("TC-{:03}", i + 1);
        }
        case.test_id = unique_id(&taken, case.test_id.trim());
        taken.insert(case.test_id.to_lowercase());
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"Here are the test cases.

### Test Case: X800DN-TC-001
Title: Valid payment is posted
Description: A payment for an open invoice is applied.
Related Rules: RULE-001, RULE-002
Prerequisites:
- Invoice 1001 is open
- Region is up
Test Data:
- INVOICE-NO: 1001
- PAYMENT-AMOUNT: 250.00
Steps:
1. Submit the payment
2. Run the posting job
Expected Results:
- Invoice 1001 is closed

### Test Case: X800DN-TC-002
**Title:** Zero amount is rejected
**Related Rules:** None
**Test Data:**
- PAYMENT-AMOUNT = 0
**Steps:**
1. Submit the payment
**Expected Results:**
- Payment is written to the reject file
"#;

    #[test]
    fn test_parse_test_cases() {
        let script = parse_test_script(RESPONSE, "X800DN").unwrap();
        assert_eq!(script.program_name, "X800DN");
        assert_eq!(script.test_cases.len(), 2);

        let first = &script.test_cases[0];
        assert_eq!(first.test_id, "X800DN-TC-001");
        assert_eq!(first.title, "Valid payment is posted");
        assert_eq!(first.description, "A payment for an open invoice is applied.");
        assert_eq!(first.related_rules, vec!["RULE-001", "RULE-002"]);
        assert_eq!(first.prerequisites, vec!["Invoice 1001 is open", "Region is up"]);
        let keys: Vec<&str> = first.test_data.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["INVOICE-NO", "PAYMENT-AMOUNT"]);
        assert_eq!(first.test_data["PAYMENT-AMOUNT"], "250.00");
        assert_eq!(first.steps, vec!["Submit the payment", "Run the posting job"]);
        assert_eq!(first.expected_results, vec!["Invoice 1001 is closed"]);

        let second = &script.test_cases[1];
        assert_eq!(second.title, "Zero amount is rejected");
        assert_eq!(second.description, "Zero amount is rejected");
        assert!(second.related_rules.is_empty());
        assert!(second.prerequisites.is_empty());
        assert_eq!(second.test_data["PAYMENT-AMOUNT"], "0");
    }

    #[test]
    fn test_data_rows_named_like_fields() {
        let response = "### Test Case: CL-TC-001\nTitle: Customer lookup\nTest Data:\n- CUSTOMER-ID: C1\n- Name: John Smith\nSteps:\n1. Enter C1\n";
        let case = &parse_test_script(response, "CL").unwrap().test_cases[0];
        assert_eq!(case.title, "Customer lookup");
        assert_eq!(case.test_data["CUSTOMER-ID"], "C1");
        assert_eq!(case.test_data["Name"], "John Smith");
        assert_eq!(case.steps, vec!["Enter C1"]);
    }

    #[test]
    fn test_steps_that_start_with_a_field_name() {
        let response = "### Test Case: GL400-TC-001\nTitle: Invalid account\nSteps:\n1. Data: enter account 0\n2. Press ENTER\n- **Expected Results:** Error message is shown\n";
        let case = &parse_test_script(response, "GL400").unwrap().test_cases[0];
        assert_eq!(case.steps, vec!["Data: enter account 0", "Press ENTER"]);
        assert!(case.test_data.is_empty());
        assert_eq!(case.expected_results, vec!["Error message is shown"]);
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(
            parse_test_script(RESPONSE, "X800DN"),
            parse_test_script(RESPONSE, "X800DN")
        );
    }

    #[test]
    fn test_numbered_headers_and_separate_test_id() {
        let response = "Test Case 1: Basic functionality\nTest ID: GL400-TC-007\nSteps:\n- Open the map\n\nTest Case 2 - Invalid account\nSteps:\n- Enter account 0\n";
        let script = parse_test_script(response, "GL400").unwrap();
        assert_eq!(script.test_cases.len(), 2);
        assert_eq!(script.test_cases[0].test_id, "GL400-TC-007");
        assert_eq!(script.test_cases[0].title, "Basic functionality");
        assert_eq!(script.test_cases[0].steps, vec!["Open the map"]);
        assert_eq!(script.test_cases[1].test_id, "TC-2");
        assert_eq!(script.test_cases[1].title, "Invalid account");
    }

    #[test]
    fn test_test_cases_heading_is_not_a_case() {
        assert!(test_case_header("## Test Cases").is_none());
        assert_eq!(
            test_case_header("### Test Case: A-TC-1"),
            Some(("A-TC-1".to_string(), String::new()))
        );
    }

    #[test]
    fn test_duplicate_ids_get_suffix() {
        let response = "Test Case: TC-1\nTitle: a\nTest Case: TC-1\nTitle: b\n";
        let script = parse_test_script(response, "P").unwrap();
        let ids: Vec<&str> = script.test_cases.iter().map(|c| c.test_id.as_str()).collect();
        assert_eq!(ids, vec!["TC-1", "TC-1-2"]);
    }

    #[test]
    fn test_no_test_cases() {
        assert_eq!(parse_test_script("", "P"), Err(ParseError::EmptyResponse));
        assert_eq!(
            parse_test_script("I cannot generate tests for this program.", "P"),
            Err(ParseError::NoTestCases)
        );
    }

    #[test]
    fn test_json_test_cases() {
        let response = r#"{"test_cases": [{"id": "TC-9", "title": "Json case", "steps": "Run it"}]}"#;
        let script = parse_test_script(response, "P").unwrap();
        assert_eq!(script.test_cases[0].test_id, "TC-9");
        assert_eq!(script.test_cases[0].steps, vec!["Run it"]);
    }
}
