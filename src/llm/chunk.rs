//! Splitting long source text into prompt-sized chunks.
//!
//! Cuts prefer the start of a COBOL division, section or paragraph header,
//! then a line break, and only split mid-line when a single line exceeds the
//! budget. Concatenating the chunks always reproduces the input.

use once_cell::sync::Lazy;
use regex::Regex;

static UNIT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9][A-Z0-9-]*(\s+(SECTION|DIVISION))?(\s+USING\s+[^.]*)?\s*\.\s*$")
        .unwrap()
});

/// Area A ends at column 11; paragraph names start at most this far in
const AREA_A_MAX_INDENT: usize = 10;

/// Rough token estimate used for budgeting prompts
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> usize {
    text.chars().count() / chars_per_token.max(1)
}

/// Split `text` into chunks of at most `max_bytes` bytes
pub fn chunk_source(text: &str, max_bytes: usize) -> Vec<String> {
    let max_bytes = max_bytes.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_bytes {
        let cut = best_cut(rest, max_bytes);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head.to_string());
        rest = tail;
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }

    tracing::debug!(chunks = chunks.len(), bytes = text.len(), "Chunked source text");
    chunks
}

fn best_cut(text: &str, max_bytes: usize) -> usize {
    let window_end = floor_char_boundary(text, max_bytes);
    let window = &text[..window_end];
    let min_cut = window_end / 4;

    // Last logical-unit header starting inside the window
    let mut unit_cut = None;
    let mut line_start = 0;
    for line in window.split_inclusive('\n') {
        if line_start > min_cut && is_unit_header(line) {
            unit_cut = Some(line_start);
        }
        line_start += line.len();
    }
    if let Some(cut) = unit_cut {
        return cut;
    }

    if let Some(newline) = window.rfind('\n') {
        if newline + 1 > min_cut {
            return newline + 1;
        }
    }

    if window_end > 0 {
        window_end
    } else {
        // A single character wider than the budget
        text.chars().next().map(|c| c.len_utf8()).unwrap_or(text.len())
    }
}

fn is_unit_header(line: &str) -> bool {
    let line = line.trim_end_matches(['\n', '\r']);
    let line = match line.as_bytes() {
        b if b.len() > 6 && b[..6].iter().all(|c| c.is_ascii_digit()) => &line[6..],
        _ => line,
    };
    let indent = line.len() - line.trim_start().len();
    indent <= AREA_A_MAX_INDENT && UNIT_HEADER.is_match(line.trim())
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(paragraphs: usize) -> String {
        let mut source = String::from(
            "       IDENTIFICATION DIVISION.\n       PROGRAM-ID. BIGPROG.\n       PROCEDURE DIVISION.\n",
        );
        for i in 0..paragraphs {
            source.push_str(&format!("       {:04}-PARA.\n", i));
            for _ in 0..5 {
                source.push_str("           MOVE WS-AMOUNT TO OUT-AMOUNT.\n");
            }
            source.push_str("           EXIT.\n");
        }
        source
    }

    #[test]
    fn test_small_text_is_one_chunk() {
        let chunks = chunk_source("MOVE A TO B.\n", 1000);
        assert_eq!(chunks, vec!["MOVE A TO B.\n".to_string()]);
    }

    #[test]
    fn test_empty_text_is_one_empty_chunk() {
        assert_eq!(chunk_source("", 10), vec![String::new()]);
    }

    #[test]
    fn test_chunks_reassemble_and_respect_budget() {
        let source = program(40);
        let chunks = chunk_source(&source, 1000);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 1000));
        assert_eq!(chunks.concat(), source);
    }

    #[test]
    fn test_cuts_at_paragraph_headers() {
        let source = program(40);
        let chunks = chunk_source(&source, 1000);
        for chunk in &chunks[1..] {
            let first_line = chunk.lines().next().unwrap();
            assert!(first_line.trim().ends_with("-PARA."), "chunk starts with {first_line:?}");
        }
    }

    #[test]
    fn test_exit_statements_are_not_units() {
        assert!(!is_unit_header("           EXIT.\n"));
        assert!(is_unit_header("       0100-MAIN-PARA.\n"));
        assert!(is_unit_header("000300 PROCEDURE DIVISION USING LINKAGE-REC.\n"));
        assert!(is_unit_header("       2000-VALIDATE SECTION.\n"));
    }

    #[test]
    fn test_long_single_line_is_split_on_char_boundary() {
        let source = "é".repeat(100);
        let chunks = chunk_source(&source, 15);
        assert!(chunks.iter().all(|c| c.len() <= 15));
        assert_eq!(chunks.concat(), source);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("abcdefgh", 4), 2);
        assert_eq!(estimate_tokens("abc", 0), 3);
    }
}
