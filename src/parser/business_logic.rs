//! Business logic response parsing.
//!
//! JSON objects are accepted as-is. Everything else goes through a lenient
//! line-based reader that tolerates the heading styles, bullet markers and
//! emphasis models actually produce.

use super::text::{
    heading_text, is_none_marker, looks_like_identifier, normalize_key, split_label,
    strip_code_fences, strip_emphasis, strip_list_marker, unique_id, Paragraphs,
};
use super::ParseError;
use crate::model::{
    BusinessLogic, BusinessRule, IntegrationPoint, ProgramType, SpecialCase, Validation,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Name,
    Type,
    Purpose,
    Rules,
    Validations,
    SpecialCases,
    Integrations,
    Notes,
}

const SECTION_ALIASES: &[(&str, Section)] = &[
    ("program name", Section::Name),
    ("program id", Section::Name),
    ("program-id", Section::Name),
    ("program type", Section::Type),
    ("type of program", Section::Type),
    ("program purpose", Section::Purpose),
    ("purpose", Section::Purpose),
    ("purpose statement", Section::Purpose),
    ("program overview", Section::Purpose),
    ("overview", Section::Purpose),
    ("core business rules", Section::Rules),
    ("business rules", Section::Rules),
    ("core rules", Section::Rules),
    ("data validation rules", Section::Validations),
    ("validation rules", Section::Validations),
    ("data validations", Section::Validations),
    ("input validation rules", Section::Validations),
    ("validations", Section::Validations),
    ("special processing rules", Section::SpecialCases),
    ("special processing", Section::SpecialCases),
    ("special cases", Section::SpecialCases),
    ("special case handling", Section::SpecialCases),
    ("exception handling", Section::SpecialCases),
    ("integration points", Section::Integrations),
    ("integrations", Section::Integrations),
    ("external interfaces", Section::Integrations),
    ("interfaces", Section::Integrations),
    ("additional notes", Section::Notes),
    ("notes", Section::Notes),
    ("screen flow logic", Section::Notes),
    ("screen flow", Section::Notes),
    ("error handling", Section::Notes),
    ("error handling logic", Section::Notes),
    ("conclusion", Section::Notes),
];

const EXPECTED_HEADINGS: &str =
    "'Program Purpose', 'Core Business Rules', 'Data Validation Rules', 'Integration Points'";

static API_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(api|apis|service|services|web ?service|http|rest)\b").unwrap()
});
static FILE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(file|files|dataset|datasets)\b").unwrap());
static INPUT_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(input|inputs|read|reads|reading|retrieves?|obtains?)\b").unwrap()
});
static OUTPUT_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(output|outputs|write|writes|writing|written|updates?|stores?|inserts?)\b",
    )
    .unwrap()
});

struct SectionHeader {
    section: Section,
    title: String,
    inline: String,
}

fn match_section(line: &str) -> Option<SectionHeader> {
    let text = heading_text(line)?;
    let (title, inline) = match text.split_once(':') {
        Some((title, inline)) => (title.trim(), inline.trim()),
        None => (text.as_str(), ""),
    };
    let key = normalize_key(title);
    let section = SECTION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, section)| *section)?;

    let title = title.split('(').next().unwrap_or(title).trim();

    Some(SectionHeader {
        section,
        title: title.to_string(),
        inline: strip_emphasis(inline),
    })
}

/// Item under construction in one of the list sections
enum Item {
    Rule(BusinessRule),
    Validation(Validation),
    Special(SpecialCase),
    Integration(IntegrationPoint),
}

impl Item {
    fn empty(section: Section) -> Option<Self> {
        match section {
            Section::Rules => Some(Item::Rule(BusinessRule::default())),
            Section::Validations => Some(Item::Validation(Validation::default())),
            Section::SpecialCases => Some(Item::Special(SpecialCase::default())),
            Section::Integrations => Some(Item::Integration(IntegrationPoint::default())),
            _ => None,
        }
    }

    fn start(section: Section, text: &str) -> Option<Self> {
        // "- Condition: ..." opens an item by naming one of its fields
        if let (Some(mut item), Some((label, value))) = (Item::empty(section), split_label(text)) {
            if let Some(field) = item.field_for(label) {
                item.append(field, value);
                return Some(item);
            }
        }

        let labelled = split_label(text).or_else(|| split_dashed(text));
        let item = match section {
            Section::Rules => {
                let rule = match labelled {
                    Some((label, rest)) if looks_like_identifier(label) => BusinessRule {
                        id: label.to_string(),
                        description: rest.to_string(),
                        implementation: String::new(),
                    },
                    _ => BusinessRule {
                        description: text.to_string(),
                        ..BusinessRule::default()
                    },
                };
                Item::Rule(rule)
            }
            Section::Validations => {
                let validation = match labelled {
                    Some((field, rule)) => Validation {
                        field: field.to_string(),
                        rule: rule.to_string(),
                        error_handling: None,
                    },
                    None => Validation {
                        rule: text.to_string(),
                        ..Validation::default()
                    },
                };
                Item::Validation(validation)
            }
            Section::SpecialCases => {
                let case = match labelled {
                    Some((condition, handling)) => SpecialCase {
                        condition: condition.to_string(),
                        handling: handling.to_string(),
                        notes: None,
                    },
                    None => SpecialCase {
                        condition: text.to_string(),
                        ..SpecialCase::default()
                    },
                };
                Item::Special(case)
            }
            Section::Integrations => {
                let point = match labelled {
                    Some((name, description)) => IntegrationPoint {
                        name: name.to_string(),
                        description: description.to_string(),
                        ..IntegrationPoint::default()
                    },
                    None => IntegrationPoint {
                        name: text.to_string(),
                        ..IntegrationPoint::default()
                    },
                };
                Item::Integration(point)
            }
            _ => return None,
        };
        Some(item)
    }

    /// Canonical field a sub-field label names for this kind of item
    fn field_for(&self, label: &str) -> Option<&'static str> {
        let key = normalize_key(label);
        let key = key.as_str();
        match self {
            Item::Rule(_) => match key {
                "implementation" | "implemented in" | "implemented by" | "location" | "paragraph" => {
                    Some("implementation")
                }
                "description" | "rule" | "business rule" => Some("description"),
                "id" | "rule id" => Some("id"),
                _ => None,
            },
            Item::Validation(_) => match key {
                "rule" | "validation" | "validation rule" | "check" | "constraint" => Some("rule"),
                "error handling" | "error" | "on error" | "error message" | "if invalid" => {
                    Some("error_handling")
                }
                "field" | "field name" => Some("field"),
                _ => None,
            },
            Item::Special(_) => match key {
                "condition" | "when" | "trigger" => Some("condition"),
                "handling" | "action" | "processing" => Some("handling"),
                "notes" | "note" | "remarks" => Some("notes"),
                _ => None,
            },
            Item::Integration(_) => match key {
                "type" | "kind" | "integration type" => Some("type"),
                "direction" | "data direction" => Some("direction"),
                "description" | "purpose" | "usage" => Some("description"),
                "name" => Some("name"),
                _ => None,
            },
        }
    }

    fn main_field(&self) -> &'static str {
        match self {
            Item::Rule(_) => "description",
            Item::Validation(_) => "rule",
            Item::Special(_) => "handling",
            Item::Integration(_) => "description",
        }
    }

    fn append(&mut self, field: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match (self, field) {
            (Item::Rule(r), "id") => r.id = text.to_string(),
            (Item::Rule(r), "implementation") => append_field(&mut r.implementation, text),
            (Item::Rule(r), _) => append_field(&mut r.description, text),
            (Item::Validation(v), "field") => append_field(&mut v.field, text),
            (Item::Validation(v), "error_handling") => append_optional(&mut v.error_handling, text),
            (Item::Validation(v), _) => append_field(&mut v.rule, text),
            (Item::Special(c), "condition") => append_field(&mut c.condition, text),
            (Item::Special(c), "notes") => append_optional(&mut c.notes, text),
            (Item::Special(c), _) => append_field(&mut c.handling, text),
            (Item::Integration(p), "name") => append_field(&mut p.name, text),
            (Item::Integration(p), "type") => append_field(&mut p.kind, text),
            (Item::Integration(p), "direction") => append_field(&mut p.direction, text),
            (Item::Integration(p), _) => append_field(&mut p.description, text),
        }
    }

    /// Whether `field` already holds text
    fn has(&self, field: &str) -> bool {
        let value = match (self, field) {
            (Item::Rule(r), "id") => r.id.as_str(),
            (Item::Rule(r), "implementation") => &r.implementation,
            (Item::Rule(r), _) => &r.description,
            (Item::Validation(v), "field") => &v.field,
            (Item::Validation(v), "error_handling") => v.error_handling.as_deref().unwrap_or(""),
            (Item::Validation(v), _) => &v.rule,
            (Item::Special(c), "condition") => &c.condition,
            (Item::Special(c), "notes") => c.notes.as_deref().unwrap_or(""),
            (Item::Special(c), _) => &c.handling,
            (Item::Integration(p), "name") => &p.name,
            (Item::Integration(p), "type") => &p.kind,
            (Item::Integration(p), "direction") => &p.direction,
            (Item::Integration(p), _) => &p.description,
        };
        !value.is_empty()
    }

    fn push_into(self, record: &mut BusinessLogic) {
        match self {
            Item::Rule(r) => record.core_rules.push(r),
            Item::Validation(v) => record.validations.push(v),
            Item::Special(c) => record.special_cases.push(c),
            Item::Integration(p) => record.integration_points.push(p),
        }
    }
}

fn append_field(target: &mut String, text: &str) {
    super::text::append_text(target, text);
}

fn append_optional(target: &mut Option<String>, text: &str) {
    if is_none_marker(text) {
        return;
    }
    append_field(target.get_or_insert_with(String::new), text);
}

/// `RULE-001 - text` style labels
fn split_dashed(text: &str) -> Option<(&str, &str)> {
    let (label, rest) = text.split_once(" - ").or_else(|| text.split_once(" – "))?;
    let label = label.trim();
    looks_like_identifier(label).then_some((label, rest.trim()))
}

fn program_type_in(text: &str) -> Option<ProgramType> {
    if let Some(found) = ProgramType::from_label(text) {
        return Some(found);
    }
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| matches!(*w, "online" | "idms-dc" | "dc" | "cics")) {
        Some(ProgramType::Online)
    } else if words.iter().any(|w| matches!(*w, "batch" | "idms-db" | "db")) {
        Some(ProgramType::Batch)
    } else {
        None
    }
}

/// Accumulates state while walking the response line by line
struct Reader {
    record: BusinessLogic,
    section: Option<Section>,
    recognized: bool,
    current: Option<Item>,
    last_field: Option<&'static str>,
    name: Option<String>,
    program_type: Option<ProgramType>,
    purpose: Paragraphs,
    note_blocks: Vec<String>,
    note: Option<(String, Vec<String>)>,
}

impl Reader {
    fn new() -> Self {
        Self {
            record: BusinessLogic::default(),
            section: None,
            recognized: false,
            current: None,
            last_field: None,
            name: None,
            program_type: None,
            purpose: Paragraphs::default(),
            note_blocks: Vec::new(),
            note: None,
        }
    }

    fn finish_item(&mut self) {
        if let Some(item) = self.current.take() {
            item.push_into(&mut self.record);
        }
        self.last_field = None;
    }

    fn finish_note(&mut self) {
        if let Some((title, lines)) = self.note.take() {
            if lines.is_empty() {
                return;
            }
            let body = lines.join("\n");
            let block = if normalize_key(&title).contains("notes") {
                body
            } else {
                format!("{}:\n{}", title.trim(), body)
            };
            self.note_blocks.push(block);
        }
    }

    fn enter(&mut self, header: SectionHeader) {
        self.finish_item();
        self.finish_note();
        self.recognized = true;
        self.section = Some(header.section);

        if header.section == Section::Notes {
            self.note = Some((header.title, Vec::new()));
        }
        if !header.inline.is_empty() {
            self.scalar_or_item(&header.inline);
        }
    }

    fn leave(&mut self) {
        self.finish_item();
        self.finish_note();
        self.section = None;
    }

    fn line(&mut self, raw: &str) {
        let trimmed = raw.trim();

        if trimmed.starts_with('#') {
            match match_section(trimmed) {
                Some(header) => self.enter(header),
                None => self.leave(),
            }
            return;
        }

        if self.try_sub_field(raw) {
            return;
        }

        if let Some(header) = match_section(trimmed) {
            self.enter(header);
            return;
        }

        let Some(section) = self.section else {
            return;
        };

        match section {
            Section::Name | Section::Type | Section::Purpose | Section::Notes => {
                self.scalar_or_item(trimmed)
            }
            _ => self.list_line(raw),
        }
    }

    /// `Label: value` attached to the item being built
    fn try_sub_field(&mut self, raw: &str) -> bool {
        let Some(item) = self.current.as_mut() else {
            return false;
        };
        let trimmed = raw.trim();
        let bullet = strip_list_marker(trimmed);
        let text = strip_emphasis(bullet.unwrap_or(trimmed));
        let Some((label, value)) = split_label(&text) else {
            return false;
        };
        let Some(field) = item.field_for(label) else {
            return false;
        };
        // An unindented bullet repeating a filled field opens the next item
        let indented = raw.len() - raw.trim_start().len() >= 2;
        if bullet.is_some() && !indented && item.has(field) {
            return false;
        }
        if !is_none_marker(value) {
            item.append(field, value);
        }
        self.last_field = Some(field);
        true
    }

    fn list_line(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }

        // Bold-only lines group items; they are not items themselves
        if trimmed.starts_with("**") && trimmed.trim_end_matches(':').ends_with("**") {
            let cleaned = strip_emphasis(trimmed);
            let has_value = split_label(&cleaned).map(|(_, v)| !v.is_empty()).unwrap_or(false);
            if !has_value {
                self.finish_item();
                return;
            }
        }

        let bullet = strip_list_marker(raw);
        let indented = raw.len() - raw.trim_start().len() >= 2;
        let text = strip_emphasis(bullet.unwrap_or(trimmed));
        if text.is_empty() || is_none_marker(&text) {
            return;
        }

        let continues = self.current.is_some() && (bullet.is_none() || indented);
        if continues {
            if let Some(item) = self.current.as_mut() {
                let field = self.last_field.unwrap_or_else(|| item.main_field());
                item.append(field, &text);
            }
            return;
        }

        self.finish_item();
        if let Some(section) = self.section {
            self.current = Item::start(section, &text);
        }
    }

    fn scalar_or_item(&mut self, text: &str) {
        let Some(section) = self.section else {
            return;
        };
        let cleaned = strip_emphasis(strip_list_marker(text).unwrap_or(text.trim()));

        match section {
            Section::Name => {
                if self.name.is_none() && !cleaned.is_empty() && !is_none_marker(&cleaned) {
                    let name = cleaned.trim_end_matches('.').trim().to_string();
                    self.name = Some(name);
                }
            }
            Section::Type => {
                if self.program_type.is_none() {
                    self.program_type = program_type_in(&cleaned);
                }
            }
            Section::Purpose => {
                if !is_none_marker(&cleaned) || cleaned.is_empty() {
                    self.purpose.push_line(&cleaned);
                }
            }
            Section::Notes => {
                if cleaned.is_empty() || is_none_marker(&cleaned) {
                    return;
                }
                let line = match strip_list_marker(text) {
                    Some(_) => format!("- {}", cleaned),
                    None => cleaned,
                };
                if let Some((_, lines)) = self.note.as_mut() {
                    lines.push(line);
                }
            }
            _ => {
                if !cleaned.is_empty() && !is_none_marker(&cleaned) {
                    self.finish_item();
                    self.current = Item::start(section, &cleaned);
                }
            }
        }
    }

    fn finish(mut self) -> (BusinessLogic, ParsedIdentity) {
        self.finish_item();
        self.finish_note();

        let mut record = self.record;
        if !self.purpose.is_empty() {
            record.program_purpose = self.purpose.finish();
        }
        record.additional_notes = self.note_blocks.join("\n\n");

        let identity = ParsedIdentity {
            name: self.name,
            program_type: self.program_type,
            recognized: self.recognized,
        };
        (record, identity)
    }
}

struct ParsedIdentity {
    name: Option<String>,
    program_type: Option<ProgramType>,
    recognized: bool,
}

/// Parse a model response into a business logic record.
///
/// `defaults` supplies the program name and type when the response omits them.
pub fn parse_business_logic(
    raw: &str,
    defaults: &BusinessLogic,
) -> Result<BusinessLogic, ParseError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    if text.starts_with('{') {
        match parse_json(text) {
            Ok((record, identity)) => return Ok(finalize(record, identity, defaults)),
            Err(e) => {
                tracing::debug!(error = %e, "Response is not valid JSON, reading as markdown")
            }
        }
    }

    let mut reader = Reader::new();
    for line in text.lines() {
        reader.line(line);
    }
    let (record, identity) = reader.finish();

    if !identity.recognized {
        tracing::warn!(
            response_len = raw.len(),
            "No business logic sections recognized in response"
        );
        return Err(ParseError::NoRecognizedSections {
            expected: EXPECTED_HEADINGS.to_string(),
        });
    }

    Ok(finalize(record, identity, defaults))
}

fn parse_json(text: &str) -> Result<(BusinessLogic, ParsedIdentity), serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let has_type = value
        .get("program_type")
        .map(|v| !v.is_null())
        .unwrap_or(false);
    let record: BusinessLogic = serde_json::from_value(value)?;

    let identity = ParsedIdentity {
        name: Some(record.program_name.clone()).filter(|n| !n.trim().is_empty()),
        program_type: has_type.then_some(record.program_type),
        recognized: true,
    };
    Ok((record, identity))
}

fn finalize(
    mut record: BusinessLogic,
    identity: ParsedIdentity,
    defaults: &BusinessLogic,
) -> BusinessLogic {
    record.program_name = identity
        .name
        .unwrap_or_else(|| defaults.program_name.clone());
    record.program_type = identity.program_type.unwrap_or(defaults.program_type);

    let mut taken = HashSet::new();
    for (i, rule) in record.core_rules.iter_mut().enumerate() {
        if rule.id.trim().is_empty() {
            rule.id = format!("RULE_{}", i + 1);
        }
        rule.id = unique_id(&taken, rule.id.trim());
        taken.insert(rule.id.to_lowercase());
    }

    for validation in &mut record.validations {
        if validation.field.trim().is_empty() {
            validation.field = "Unspecified Field".to_string();
        }
    }

    for point in &mut record.integration_points {
        let context = format!("{} {}", point.name, point.description);
        if point.kind.trim().is_empty() {
            point.kind = infer_integration_type(&context).to_string();
        }
        if point.direction.trim().is_empty() {
            point.direction = infer_direction(&context).to_string();
        }
    }

    record
}

fn infer_integration_type(text: &str) -> &'static str {
    if API_WORDS.is_match(text) {
        "API"
    } else if FILE_WORDS.is_match(text) {
        "File"
    } else {
        "Database"
    }
}

fn infer_direction(text: &str) -> &'static str {
    match (INPUT_WORDS.is_match(text), OUTPUT_WORDS.is_match(text)) {
        (true, false) => "Input",
        (false, true) => "Output",
        _ => "Both",
    }
}
