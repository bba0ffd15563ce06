use super::document::{Block, DocumentModel};

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

fn table_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |\n", cells.join(" | "))
}

/// Render a document model as markdown
pub fn render_markdown(document: &DocumentModel) -> String {
    let mut out = String::new();
    let mut in_list = false;

    for block in &document.blocks {
        let is_list = matches!(block, Block::Bullet(_) | Block::Numbered { .. });
        if in_list && !is_list {
            out.push('\n');
        }
        in_list = is_list;

        match block {
            Block::Title(text) => out.push_str(&format!("# {}\n\n", text)),
            Block::Subtitle(text) => out.push_str(&format!("_{}_\n\n", text)),
            Block::Heading { level, text } => {
                let hashes = "#".repeat(usize::from(*level).clamp(1, 5) + 1);
                out.push_str(&format!("{} {}\n\n", hashes, text));
            }
            Block::Paragraph(text) => out.push_str(&format!("{}\n\n", text)),
            Block::Field { label, value } => out.push_str(&format!("**{}:** {}\n\n", label, value)),
            Block::Bullet(text) => out.push_str(&format!("- {}\n", text)),
            Block::Numbered { number, text } => out.push_str(&format!("{}. {}\n", number, text)),
            Block::Table { header, rows } => {
                out.push_str(&table_row(header));
                out.push_str(&format!("|{}\n", "---|".repeat(header.len())));
                for row in rows {
                    out.push_str(&table_row(row));
                }
                out.push('\n');
            }
            Block::PageBreak => out.push_str("---\n\n"),
        }
    }

    if in_list {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::document::{business_logic_document, test_script_document};
    use crate::model::{BusinessLogic, ProgramType, TestCase, TestScript, Validation};

    #[test]
    fn test_business_logic_markdown() {
        let mut logic = BusinessLogic::new("X800DN", ProgramType::Batch);
        logic.validations.push(Validation {
            field: "CODE".to_string(),
            rule: "A|B".to_string(),
            error_handling: Some("reject".to_string()),
        });

        let md = render_markdown(&business_logic_document(&logic));
        assert!(md.starts_with("# X800DN Business Logic\n"));
        assert!(md.contains("## Core Business Rules\n\nNo core business rules identified."));
        assert!(md.contains("| Field | Validation Rule | Error Handling |\n|---|---|---|\n"));
        assert!(md.contains("| CODE | A\\|B | reject |"));
    }

    #[test]
    fn test_lists_end_with_blank_line() {
        let mut script = TestScript::new("P");
        let mut case = TestCase::new("TC-1", "t");
        case.steps = vec!["one".to_string(), "two".to_string()];
        script.test_cases.push(case);

        let md = render_markdown(&test_script_document(&script));
        assert!(md.contains("1. one\n2. two\n\n### Expected Results"));
    }
}
