use crate::model::ProgramType;
use once_cell::sync::Lazy;
use regex::Regex;

static PROGRAM_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:\d{6})?\s*PROGRAM-ID\.\s*'?([A-Z0-9][A-Z0-9_-]*)").unwrap()
});

/// Source markers that only appear in online (DC) programs
const ONLINE_INDICATORS: &[&str] = &[
    "MODE IS IDMS-DC",
    "MAP SECTION",
    "MAP OUT",
    "MAP IN",
    "MODIFY MAP",
    "DC RETURN",
    "TRANSFER CONTROL",
    "DC-AID-CONDITION-NAMES",
    "EXEC CICS",
];

/// Basic facts read directly from the source before any LLM call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInfo {
    pub program_id: Option<String>,
    pub program_type: ProgramType,
    pub remarks: Vec<String>,
    pub history: Vec<String>,
    pub line_count: usize,
}

pub fn detect_program_type(content: &str) -> ProgramType {
    let upper = content.to_uppercase();
    // Collapse runs of whitespace so "MODE  IS   IDMS-DC" still matches
    let normalized = upper.split_whitespace().collect::<Vec<_>>().join(" ");

    if ONLINE_INDICATORS.iter().any(|i| normalized.contains(i)) {
        ProgramType::Online
    } else {
        ProgramType::Batch
    }
}

pub fn extract_program_info(content: &str) -> ProgramInfo {
    let program_id = PROGRAM_ID
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_uppercase());

    ProgramInfo {
        program_id,
        program_type: detect_program_type(content),
        remarks: comment_block(content, "*REMARKS.", Some("*HISTORY:")),
        history: comment_block(content, "*HISTORY:", None),
        line_count: content.lines().count(),
    }
}

/// Collect `*`-comment lines following `start` until a non-comment line or `stop`
fn comment_block(content: &str, start: &str, stop: Option<&str>) -> Vec<String> {
    let mut items = Vec::new();
    let mut inside = false;

    for line in content.lines() {
        let line = strip_sequence_area(line).trim();

        if !inside {
            if line.to_uppercase().contains(start) {
                inside = true;
            }
            continue;
        }

        if !line.starts_with('*') {
            break;
        }
        if stop.is_some_and(|s| line.to_uppercase().contains(s)) {
            break;
        }

        let text = line.trim_start_matches('*').trim();
        if !text.is_empty() && !text.starts_with("--") {
            items.push(text.to_string());
        }
    }

    items
}

/// Drop the fixed-format sequence number area (columns 1-6) when present
fn strip_sequence_area(line: &str) -> &str {
    let bytes = line.as_bytes();
    if bytes.len() > 6 && bytes[..6].iter().all(|b| b.is_ascii_digit()) {
        &line[6..]
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONLINE_SOURCE: &str = r#"       IDENTIFICATION DIVISION.
       PROGRAM-ID. X800DN.
      *REMARKS.
      *    MAINTAINS CUSTOMER ADDRESSES.
      *    ----------------------------
      *    CALLED FROM MENU X800.
      *HISTORY:
      *    2001-03-01 INITIAL VERSION.
       ENVIRONMENT DIVISION.
       IDMS-CONTROL SECTION.
       PROTOCOL.  MODE IS IDMS-DC.
       PROCEDURE DIVISION.
           MAP IN USING X800MAP.
"#;

    #[test]
    fn test_detects_online_program() {
        assert_eq!(detect_program_type(ONLINE_SOURCE), ProgramType::Online);
    }

    #[test]
    fn test_defaults_to_batch() {
        let source = "       PROCEDURE DIVISION.\n           OBTAIN CALC CUSTOMER.\n";
        assert_eq!(detect_program_type(source), ProgramType::Batch);
    }

    #[test]
    fn test_extracts_program_info() {
        let info = extract_program_info(ONLINE_SOURCE);
        assert_eq!(info.program_id.as_deref(), Some("X800DN"));
        assert_eq!(info.program_type, ProgramType::Online);
        assert_eq!(
            info.remarks,
            vec!["MAINTAINS CUSTOMER ADDRESSES.", "CALLED FROM MENU X800."]
        );
        assert_eq!(info.history, vec!["2001-03-01 INITIAL VERSION."]);
        assert_eq!(info.line_count, 13);
    }

    #[test]
    fn test_program_id_with_sequence_numbers() {
        let source = "000100 IDENTIFICATION DIVISION.\n000200 PROGRAM-ID. BATCH01.\n";
        let info = extract_program_info(source);
        assert_eq!(info.program_id.as_deref(), Some("BATCH01"));
    }

    #[test]
    fn test_missing_program_id() {
        let info = extract_program_info("MOVE A TO B.\n");
        assert_eq!(info.program_id, None);
        assert!(info.remarks.is_empty());
    }
}
