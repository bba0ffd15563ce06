//! Format-independent layout of the exported documents.

use crate::model::{BusinessLogic, TestCase, TestScript};

pub const NO_PURPOSE: &str = "No program purpose identified.";
pub const NO_RULES: &str = "No core business rules identified.";
pub const NO_VALIDATIONS: &str = "No validation rules identified.";
pub const NO_SPECIAL_CASES: &str = "No special cases identified.";
pub const NO_INTEGRATIONS: &str = "No integration points identified.";
pub const NO_NOTES: &str = "No additional notes.";
pub const NO_TEST_CASES: &str = "No test cases generated.";
pub const NONE: &str = crate::model::NONE_PLACEHOLDER;
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Subtitle(String),
    Heading { level: u8, text: String },
    Paragraph(String),
    /// Bold label followed by its value on one line
    Field { label: String, value: String },
    Bullet(String),
    Numbered { number: usize, text: String },
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentModel {
    pub blocks: Vec<Block>,
}

impl DocumentModel {
    fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    fn heading(&mut self, level: u8, text: impl Into<String>) -> &mut Self {
        self.push(Block::Heading {
            level,
            text: text.into(),
        })
    }

    fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Paragraph(text.into()))
    }

    fn field(&mut self, label: &str, value: impl Into<String>) -> &mut Self {
        self.push(Block::Field {
            label: label.to_string(),
            value: value.into(),
        })
    }

    fn table(&mut self, header: &[&str], rows: Vec<Vec<String>>) -> &mut Self {
        self.push(Block::Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        })
    }

    /// All text in reading order, one block per line
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Title(text)
                | Block::Subtitle(text)
                | Block::Heading { text, .. }
                | Block::Paragraph(text)
                | Block::Bullet(text) => out.push_str(text),
                Block::Field { label, value } => {
                    out.push_str(label);
                    out.push_str(": ");
                    out.push_str(value);
                }
                Block::Numbered { number, text } => out.push_str(&format!("{}. {}", number, text)),
                Block::Table { header, rows } => {
                    out.push_str(&header.join(" | "));
                    for row in rows {
                        out.push('\n');
                        out.push_str(&row.join(" | "));
                    }
                }
                Block::PageBreak => continue,
            }
            out.push('\n');
        }
        out
    }
}

fn or_placeholder(text: &str, placeholder: &str) -> String {
    if text.trim().is_empty() {
        placeholder.to_string()
    } else {
        text.to_string()
    }
}

/// Lay out a business logic record; the record itself is never modified
pub fn business_logic_document(logic: &BusinessLogic) -> DocumentModel {
    let mut doc = DocumentModel::default();
    let name = or_placeholder(&logic.program_name, "Unnamed Program");

    doc.push(Block::Title(format!("{} Business Logic", name)))
        .push(Block::Subtitle(format!("Program Type: {}", logic.program_type)));

    doc.heading(1, "Program Information").table(
        &["Property", "Value"],
        vec![
            vec!["Program Name".to_string(), name.clone()],
            vec!["Program Type".to_string(), logic.program_type.to_string()],
        ],
    );

    doc.heading(1, "Program Purpose")
        .paragraph(or_placeholder(&logic.program_purpose, NO_PURPOSE));

    doc.heading(1, "Core Business Rules");
    if logic.core_rules.is_empty() {
        doc.paragraph(NO_RULES);
    }
    for rule in &logic.core_rules {
        doc.heading(2, or_placeholder(&rule.id, NOT_AVAILABLE))
            .paragraph(or_placeholder(&rule.description, NOT_AVAILABLE));
        if !rule.implementation.trim().is_empty() {
            doc.field("Implementation", rule.implementation.clone());
        }
    }

    doc.heading(1, "Data Validation Rules");
    if logic.validations.is_empty() {
        doc.paragraph(NO_VALIDATIONS);
    } else {
        let rows = logic
            .validations
            .iter()
            .map(|v| {
                vec![
                    or_placeholder(&v.field, NOT_AVAILABLE),
                    or_placeholder(&v.rule, NOT_AVAILABLE),
                    or_placeholder(v.error_handling.as_deref().unwrap_or(""), NOT_AVAILABLE),
                ]
            })
            .collect();
        doc.table(&["Field", "Validation Rule", "Error Handling"], rows);
    }

    doc.heading(1, "Special Processing Rules");
    if logic.special_cases.is_empty() {
        doc.paragraph(NO_SPECIAL_CASES);
    }
    for case in &logic.special_cases {
        doc.heading(2, or_placeholder(&case.condition, NOT_AVAILABLE))
            .field("Handling", or_placeholder(&case.handling, NOT_AVAILABLE));
        if let Some(notes) = &case.notes {
            doc.field("Notes", notes.clone());
        }
    }

    doc.heading(1, "Integration Points");
    if logic.integration_points.is_empty() {
        doc.paragraph(NO_INTEGRATIONS);
    } else {
        let rows = logic
            .integration_points
            .iter()
            .map(|p| {
                vec![
                    or_placeholder(&p.name, NOT_AVAILABLE),
                    or_placeholder(&p.kind, NOT_AVAILABLE),
                    or_placeholder(&p.direction, NOT_AVAILABLE),
                    or_placeholder(&p.description, NOT_AVAILABLE),
                ]
            })
            .collect();
        doc.table(&["Name", "Type", "Direction", "Description"], rows);
    }

    doc.heading(1, "Additional Notes")
        .paragraph(or_placeholder(&logic.additional_notes, NO_NOTES));

    doc
}

/// Lay out a test script; one page per test case
pub fn test_script_document(script: &TestScript) -> DocumentModel {
    let mut doc = DocumentModel::default();
    let name = or_placeholder(&script.program_name, "Unnamed Program");

    doc.push(Block::Title(format!("Test Script for {}", name)));
    doc.heading(1, "Test Script Overview")
        .field("Program Name", name)
        .field("Total Test Cases", script.test_cases.len().to_string());

    if script.test_cases.is_empty() {
        doc.paragraph(NO_TEST_CASES);
    }

    for case in &script.test_cases {
        doc.push(Block::PageBreak);
        test_case_blocks(&mut doc, case);
    }

    doc
}

fn test_case_blocks(doc: &mut DocumentModel, case: &TestCase) {
    doc.heading(1, format!("Test Case: {}", or_placeholder(&case.test_id, NOT_AVAILABLE)))
        .field("Title", or_placeholder(&case.title, NOT_AVAILABLE))
        .field("Description", or_placeholder(&case.description, NOT_AVAILABLE));

    doc.heading(2, "Prerequisites");
    if case.prerequisites.is_empty() {
        doc.paragraph(NONE);
    }
    for item in &case.prerequisites {
        doc.push(Block::Bullet(item.clone()));
    }

    doc.heading(2, "Test Data");
    if case.test_data.is_empty() {
        doc.paragraph(NONE);
    } else {
        let rows = case
            .test_data
            .iter()
            .map(|(key, value)| vec![key.clone(), or_placeholder(value, NOT_AVAILABLE)])
            .collect();
        doc.table(&["Field", "Value"], rows);
    }

    doc.heading(2, "Steps");
    if case.steps.is_empty() {
        doc.paragraph(NONE);
    }
    for (i, step) in case.steps.iter().enumerate() {
        doc.push(Block::Numbered {
            number: i + 1,
            text: step.clone(),
        });
    }

    doc.heading(2, "Expected Results");
    if case.expected_results.is_empty() {
        doc.paragraph(NONE);
    }
    for result in &case.expected_results {
        doc.push(Block::Bullet(result.clone()));
    }

    doc.heading(2, "Related Business Rules")
        .paragraph(case.related_rules_display());
}
