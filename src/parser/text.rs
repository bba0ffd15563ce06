//! Line helpers shared by the response parsers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+|[a-zA-Z])[.)]\s+").unwrap());

/// Strip a surrounding ``` fence from an LLM response
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();

    if text.starts_with("```") {
        // Skip the opening fence line (``` or ```json)
        let start = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
        let end = text[start..]
            .rfind("```")
            .map(|i| start + i)
            .unwrap_or(text.len());
        return text[start..end].trim();
    }

    text
}

/// Remove markdown emphasis and inline code markers
pub(crate) fn strip_emphasis(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .trim()
        .to_string()
}

/// If the line is a list item, return the text after its marker
pub(crate) fn strip_list_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();

    for marker in ["- ", "+ ", "• ", "* "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    if trimmed == "-" || trimmed == "•" {
        return Some("");
    }

    NUMBERING.find(trimmed).map(|m| trimmed[m.end()..].trim())
}

/// Text of a line that may be a heading: markers, emphasis and numbering removed.
///
/// Returns `None` for bullet items, which are never headings.
pub(crate) fn heading_text(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let is_bullet = ["- ", "+ ", "• ", "* "].iter().any(|m| trimmed.starts_with(m));
    if is_bullet {
        return None;
    }

    let without_hashes = trimmed.trim_start_matches('#').trim();
    let cleaned = strip_emphasis(without_hashes);
    let cleaned = match NUMBERING.find(&cleaned) {
        Some(m) => cleaned[m.end()..].trim().to_string(),
        None => cleaned,
    };

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Split `Label: value` at the first colon; the label must be short and non-empty
pub(crate) fn split_label(text: &str) -> Option<(&str, &str)> {
    let (label, value) = text.split_once(':')?;
    let label = label.trim();
    if label.is_empty() || label.chars().count() > 80 {
        return None;
    }
    Some((label, value.trim()))
}

/// Lowercase, collapse whitespace, drop parentheticals and trailing punctuation
pub(crate) fn normalize_key(text: &str) -> String {
    let text = match text.find('(') {
        Some(i) => &text[..i],
        None => text,
    };
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_end_matches([':', '.', '-'])
        .trim()
        .to_string()
}

/// Placeholder items a model writes for an empty section
pub(crate) fn is_none_marker(text: &str) -> bool {
    matches!(
        normalize_key(text).as_str(),
        "none" | "n/a" | "na" | "none identified" | "not applicable" | "none found" | "-"
    )
}

/// Return `id`, or `id-2`, `id-3`, ... whichever is not yet in `taken`
pub(crate) fn unique_id(taken: &HashSet<String>, id: &str) -> String {
    if !taken.contains(&id.to_lowercase()) {
        return id.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", id, n))
        .find(|candidate| !taken.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| id.to_string())
}

/// Looks like an identifier (RULE-001, R1, 2000-VALIDATE) rather than prose
pub(crate) fn looks_like_identifier(text: &str) -> bool {
    !text.is_empty()
        && text.len() <= 40
        && !text.contains(char::is_whitespace)
        && text.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && text.chars().any(|c| c.is_ascii_digit() || c == '-' || c == '_')
}

/// Append `more` to `target` separated by a space
pub(crate) fn append_text(target: &mut String, more: &str) {
    let more = more.trim();
    if more.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(more);
}

/// Accumulates prose lines: lines join with spaces, blank lines start a new paragraph
#[derive(Default)]
pub(crate) struct Paragraphs {
    done: Vec<String>,
    current: String,
}

impl Paragraphs {
    pub(crate) fn push_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            self.break_paragraph();
        } else {
            append_text(&mut self.current, line);
        }
    }

    pub(crate) fn break_paragraph(&mut self) {
        if !self.current.is_empty() {
            self.done.push(std::mem::take(&mut self.current));
        }
    }

    pub(crate) fn finish(mut self) -> String {
        self.break_paragraph();
        self.done.join("\n\n")
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.done.is_empty() && self.current.is_empty()
    }
}
