use super::document::{Block, DocumentModel};
use super::ExportError;
use docx_rs::{
    AlignmentType, BreakType, Docx, Paragraph, Run, Style, StyleType, Table, TableCell, TableRow,
};
use std::io::Cursor;

const HEADING_COLOR: &str = "1F3864";

fn styles() -> Vec<Style> {
    vec![
        Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(48)
            .bold()
            .color(HEADING_COLOR),
        Style::new("Subtitle", StyleType::Paragraph)
            .name("Subtitle")
            .size(28)
            .italic(),
        Style::new("Heading1", StyleType::Paragraph)
            .name("Heading 1")
            .size(32)
            .bold()
            .color(HEADING_COLOR),
        Style::new("Heading2", StyleType::Paragraph)
            .name("Heading 2")
            .size(26)
            .bold()
            .color(HEADING_COLOR),
        Style::new("Heading3", StyleType::Paragraph)
            .name("Heading 3")
            .size(24)
            .bold(),
    ]
}

/// Run carrying `text`, with embedded newlines turned into line breaks
fn text_run(text: &str) -> Run {
    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    run
}

fn cell(text: &str, bold: bool) -> TableCell {
    let run = if bold { text_run(text).bold() } else { text_run(text) };
    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
}

fn table(header: &[String], rows: &[Vec<String>]) -> Table {
    let mut table_rows = Vec::with_capacity(rows.len() + 1);
    table_rows.push(TableRow::new(header.iter().map(|h| cell(h, true)).collect()));
    for row in rows {
        table_rows.push(TableRow::new(row.iter().map(|c| cell(c, false)).collect()));
    }
    Table::new(table_rows)
}

/// Render a document model into .docx bytes
pub fn render_docx(document: &DocumentModel) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new();
    for style in styles() {
        docx = docx.add_style(style);
    }

    for block in &document.blocks {
        docx = match block {
            Block::Title(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(text_run(text))
                    .style("Title")
                    .align(AlignmentType::Center),
            ),
            Block::Subtitle(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(text_run(text))
                    .style("Subtitle")
                    .align(AlignmentType::Center),
            ),
            Block::Heading { level, text } => {
                let style = format!("Heading{}", (*level).clamp(1, 3));
                docx.add_paragraph(Paragraph::new().add_run(text_run(text)).style(&style))
            }
            Block::Paragraph(text) => docx.add_paragraph(Paragraph::new().add_run(text_run(text))),
            Block::Field { label, value } => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(format!("{}: ", label)).bold())
                    .add_run(text_run(value)),
            ),
            Block::Bullet(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("• "))
                    .add_run(text_run(text)),
            ),
            Block::Numbered { number, text } => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(format!("{}. ", number)))
                    .add_run(text_run(text)),
            ),
            Block::Table { header, rows } => docx.add_table(table(header, rows)),
            Block::PageBreak => {
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)))
            }
        };
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| ExportError::Docx(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::document::business_logic_document;
    use crate::model::{BusinessLogic, BusinessRule, ProgramType};

    /// Document contents read back from the rendered bytes
    fn read_back(bytes: &[u8]) -> String {
        docx_rs::read_docx(bytes).unwrap().json()
    }

    #[test]
    fn test_renders_zip_container() {
        let doc = business_logic_document(&BusinessLogic::new("X800DN", ProgramType::Batch));
        let bytes = render_docx(&doc).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_special_characters_do_not_break_rendering() {
        let mut logic = BusinessLogic::new("A&B <X>", ProgramType::Online);
        logic.additional_notes = "line one\nline \"two\" & <three>".to_string();
        let bytes = render_docx(&business_logic_document(&logic)).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let text = read_back(&bytes);
        assert!(text.contains("A&B <X> Business Logic"));
        assert!(text.contains("<three>"));
    }

    #[test]
    fn test_cover_and_rule_text_survive_rendering() {
        let mut logic = BusinessLogic::new("X800DN", ProgramType::Batch);
        logic.core_rules.push(BusinessRule {
            id: "RULE_1".to_string(),
            description: "Reject when A < B & C > D".to_string(),
            implementation: "2000-PROCESS".to_string(),
        });

        let text = read_back(&render_docx(&business_logic_document(&logic)).unwrap());
        assert!(text.contains("X800DN Business Logic"));
        assert!(text.contains("Program Type: Batch"));
        assert!(text.contains("RULE_1"));
        assert!(text.contains("Reject when A < B & C > D"));
        assert!(text.contains("2000-PROCESS"));
    }
}
