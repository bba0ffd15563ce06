use super::analyzer::Analyzer;
use crate::config::{Config, ExportConfig, ExportFormat, IntakeConfig};
use crate::export::{
    export_business_logic, export_test_script, write_to_dir, ArtifactKind, ExportedDocument,
};
use crate::intake::{accept_upload, upload_from_path, SourceCache, SourceFile};
use crate::model::{BusinessLogic, TestScript};
use crate::{Result, ScribeError};
use std::path::{Path, PathBuf};

const INSIGHTS_HEADER: &str = "Validation Insights:";

/// Workflow steps, in the order the user moves through them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Upload,
    Extract,
    Validate,
    GenerateTests,
    Export,
}

impl Step {
    pub fn all() -> [Step; 5] {
        [
            Step::Upload,
            Step::Extract,
            Step::Validate,
            Step::GenerateTests,
            Step::Export,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::Upload => "Upload",
            Step::Extract => "Extract",
            Step::Validate => "Validate",
            Step::GenerateTests => "Generate Tests",
            Step::Export => "Export",
        }
    }
}

/// Everything held for one user session. Nothing outlives it.
pub struct Session {
    analyzer: Analyzer,
    intake: IntakeConfig,
    export: ExportConfig,
    source: Option<SourceFile>,
    business_logic: Option<BusinessLogic>,
    test_script: Option<TestScript>,
    last_raw_response: Option<String>,
}

impl Session {
    pub fn new(analyzer: Analyzer, config: &Config) -> Self {
        Self {
            analyzer,
            intake: config.intake.clone(),
            export: config.export.clone(),
            source: None,
            business_logic: None,
            test_script: None,
            last_raw_response: None,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }

    pub fn business_logic(&self) -> Option<&BusinessLogic> {
        self.business_logic.as_ref()
    }

    pub fn test_script(&self) -> Option<&TestScript> {
        self.test_script.as_ref()
    }

    pub fn last_raw_response(&self) -> Option<&str> {
        self.last_raw_response.as_deref()
    }

    pub fn export_formats(&self) -> &[ExportFormat] {
        &self.export.formats
    }

    pub fn output_dir(&self) -> &Path {
        &self.export.output_dir
    }

    /// Whether the prerequisites for `step` are met
    pub fn can_enter(&self, step: Step) -> bool {
        match step {
            Step::Upload => true,
            Step::Extract => self.source.is_some(),
            Step::Validate | Step::GenerateTests | Step::Export => self.business_logic.is_some(),
        }
    }

    /// Furthest step the session is ready for
    pub fn current_step(&self) -> Step {
        if self.source.is_none() {
            Step::Upload
        } else if self.business_logic.is_none() {
            Step::Extract
        } else if self.test_script.is_none() {
            Step::Validate
        } else {
            Step::Export
        }
    }

    fn require(&self, step: Step) -> Result<()> {
        if self.can_enter(step) {
            return Ok(());
        }
        let missing = match step {
            Step::Extract => "Upload a source file first",
            _ => "Extract the business logic first",
        };
        Err(ScribeError::Workflow(format!("{} ({} step)", missing, step.title())))
    }

    fn accept(&mut self, source: SourceFile) -> &SourceFile {
        match SourceCache::new(&self.intake.cache_dir)
            .and_then(|cache| cache.clear_older_than(self.intake.cache_retention_days))
        {
            Ok(removed) if removed > 0 => tracing::info!(removed, "Cleared stale cached uploads"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to clear upload cache"),
        }

        self.business_logic = None;
        self.test_script = None;
        self.last_raw_response = None;
        self.source.insert(source)
    }

    /// Accept uploaded bytes. A new upload discards everything derived from the previous one.
    pub fn upload(&mut self, filename: &str, bytes: &[u8]) -> Result<&SourceFile> {
        let source = accept_upload(filename, bytes, &self.intake)?;
        Ok(self.accept(source))
    }

    pub fn upload_path(&mut self, path: &str) -> Result<&SourceFile> {
        let source = upload_from_path(path, &self.intake)?;
        Ok(self.accept(source))
    }

    /// Extract business logic from the uploaded source. On failure the
    /// previous record, if any, is kept as it was.
    pub async fn extract(&mut self) -> Result<&BusinessLogic> {
        self.require(Step::Extract)?;
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| ScribeError::Workflow("No source file uploaded".to_string()))?;

        let extraction = self.analyzer.extract(source).await?;

        self.last_raw_response = Some(extraction.raw_responses.join("\n\n"));
        self.test_script = None;
        let logic = self.business_logic.insert(extraction.record);
        Ok(&*logic)
    }

    /// Replace the business logic record with a hand-edited version
    pub fn apply_business_logic_edits(&mut self, edited: BusinessLogic) -> Result<()> {
        self.require(Step::Validate)?;
        edited.check()?;
        tracing::info!(
            program = %edited.program_name,
            summary = %edited.summary(),
            "Applied business logic edits"
        );
        self.business_logic = Some(edited);
        Ok(())
    }

    /// Ask the model to review the current record and append its findings to the notes
    pub async fn review(&mut self) -> Result<String> {
        self.require(Step::Validate)?;
        let logic = self
            .business_logic
            .as_ref()
            .ok_or_else(|| ScribeError::Workflow("No business logic to review".to_string()))?;

        let findings = self.analyzer.review(logic).await?;

        if let Some(logic) = self.business_logic.as_mut() {
            // Replace insights from an earlier review
            if let Some(start) = logic.additional_notes.find(INSIGHTS_HEADER) {
                logic.additional_notes.truncate(start);
            }
            let notes = logic.additional_notes.trim_end().to_string();
            logic.additional_notes = if notes.is_empty() {
                format!("{}\n{}", INSIGHTS_HEADER, findings)
            } else {
                format!("{}\n\n{}\n{}", notes, INSIGHTS_HEADER, findings)
            };
        }
        self.last_raw_response = Some(findings.clone());
        Ok(findings)
    }

    pub async fn generate_tests(&mut self) -> Result<&TestScript> {
        self.require(Step::GenerateTests)?;
        let logic = self
            .business_logic
            .as_ref()
            .ok_or_else(|| {
                ScribeError::Workflow("No business logic to generate tests from".to_string())
            })?;

        let generated = self.analyzer.generate_tests(logic).await?;

        self.last_raw_response = Some(generated.raw_response);
        let script = self.test_script.insert(generated.script);
        Ok(&*script)
    }

    pub fn apply_test_script_edits(&mut self, edited: TestScript) -> Result<()> {
        if self.test_script.is_none() {
            return Err(ScribeError::Workflow(
                "Generate a test script first (Generate Tests step)".to_string(),
            ));
        }
        edited.check()?;
        tracing::info!(
            program = %edited.program_name,
            test_cases = edited.test_cases.len(),
            "Applied test script edits"
        );
        self.test_script = Some(edited);
        Ok(())
    }

    /// Render one artifact in one format without touching the disk
    pub fn render(&self, kind: ArtifactKind, format: ExportFormat) -> Result<ExportedDocument> {
        self.require(Step::Export)?;
        let document = match kind {
            ArtifactKind::BusinessLogic => {
                let logic = self
                    .business_logic
                    .as_ref()
                    .ok_or_else(|| {
                        ScribeError::Workflow("No business logic to export".to_string())
                    })?;
                export_business_logic(logic, format)?
            }
            ArtifactKind::TestScript => {
                let script = self.test_script.as_ref().ok_or_else(|| {
                    ScribeError::Workflow("Generate a test script before exporting it".to_string())
                })?;
                export_test_script(script, format)?
            }
        };
        Ok(document)
    }

    /// Write `kind` in every configured format to the output directory
    pub fn export(&self, kind: ArtifactKind) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for format in &self.export.formats {
            let document = self.render(kind, *format)?;
            written.push(write_to_dir(&self.export.output_dir, &document)?);
        }
        Ok(written)
    }

    /// Abandon the session's state
    pub fn reset(&mut self) {
        self.source = None;
        self.business_logic = None;
        self.test_script = None;
        self.last_raw_response = None;
        tracing::info!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::llm::client::MockLlmClient;
    use crate::llm::{OperationKind, RequestError, RetryPolicy};
    use crate::model::{BusinessRule, EditError};
    use crate::parser::ParseError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const SOURCE: &[u8] = b"       IDENTIFICATION DIVISION.\n       PROGRAM-ID. PAYPOST.\n       PROCEDURE DIVISION.\n           STOP RUN.\n";

    const EXTRACTION: &str = "## Program Purpose\nPosts payments\n\n## Core Business Rules\n- R1: No zero amounts\n";

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.intake.cache_dir = dir.path().join("cache");
        config.export.output_dir = dir.path().join("out");
        config.export.formats = vec![ExportFormat::Docx, ExportFormat::Markdown];
        config
    }

    fn session(client: MockLlmClient, config: &Config) -> Session {
        let analyzer = Analyzer::new(
            Box::new(client),
            RetryPolicy::none(),
            ChunkingConfig::default(),
            None,
        );
        Session::new(analyzer, config)
    }

    fn scripted_client() -> MockLlmClient {
        let mut client = MockLlmClient::new();
        client.expect_complete().returning(|prompt| match prompt.kind {
            OperationKind::ExtractBusinessLogic => Ok(EXTRACTION.to_string()),
            OperationKind::GenerateTests => {
                Ok("### Test Case: PAYPOST-TC-001\nTitle: Happy path\nRelated Rules: R1\n".to_string())
            }
            OperationKind::ReviewLogic => Ok("- Consider validating the posting date".to_string()),
        });
        client
    }

    #[tokio::test]
    async fn test_steps_are_gated() {
        let dir = TempDir::new().unwrap();
        let mut session = session(MockLlmClient::new(), &config(&dir));

        assert_eq!(session.current_step(), Step::Upload);
        assert!(matches!(session.extract().await, Err(ScribeError::Workflow(_))));
        assert!(matches!(session.generate_tests().await, Err(ScribeError::Workflow(_))));
        assert!(matches!(
            session.render(ArtifactKind::BusinessLogic, ExportFormat::Docx),
            Err(ScribeError::Workflow(_))
        ));
    }

    #[tokio::test]
    async fn test_full_workflow() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut session = session(scripted_client(), &config);

        session.upload("paypost.cbl", SOURCE).unwrap();
        assert_eq!(session.current_step(), Step::Extract);

        let logic = session.extract().await.unwrap();
        assert_eq!(logic.program_name, "PAYPOST");
        assert_eq!(session.current_step(), Step::Validate);
        assert_eq!(session.last_raw_response(), Some(EXTRACTION));

        let insights = session.review().await.unwrap();
        assert!(insights.contains("posting date"));
        let notes = &session.business_logic().unwrap().additional_notes;
        assert!(notes.starts_with("Validation Insights:\n- Consider"));

        // A second review replaces the first
        session.review().await.unwrap();
        let notes = &session.business_logic().unwrap().additional_notes;
        assert_eq!(notes.matches("Validation Insights:").count(), 1);

        let script = session.generate_tests().await.unwrap();
        assert_eq!(script.test_cases[0].related_rules, vec!["R1"]);
        assert_eq!(session.current_step(), Step::Export);

        let written = session.export(ArtifactKind::BusinessLogic).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("PAYPOST_Business_Logic.docx"));
        assert!(written[1].ends_with("PAYPOST_Business_Logic.md"));
        assert!(written.iter().all(|p| p.exists()));

        let written = session.export(ArtifactKind::TestScript).unwrap();
        assert!(written[0].ends_with("PAYPOST_Test_Script.docx"));
    }

    #[tokio::test]
    async fn test_failed_extraction_keeps_previous_record() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_mock = calls.clone();
        let mut client = MockLlmClient::new();
        client.expect_complete().returning(move |_| {
            match calls_in_mock.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(EXTRACTION.to_string()),
                1 => Err(RequestError::Authentication {
                    status: 401,
                    message: "bad key".to_string(),
                }),
                _ => Ok("no sections here".to_string()),
            }
        });
        let mut session = session(client, &config(&dir));
        session.upload("paypost.cbl", SOURCE).unwrap();

        let before = session.extract().await.unwrap().clone();

        let err = session.extract().await.unwrap_err();
        assert!(matches!(err, ScribeError::Request(RequestError::Authentication { .. })));
        assert_eq!(session.business_logic(), Some(&before));

        let err = session.extract().await.unwrap_err();
        assert!(matches!(err, ScribeError::Parse(ParseError::NoRecognizedSections { .. })));
        assert_eq!(session.business_logic(), Some(&before));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_new_upload_clears_downstream_records() {
        let dir = TempDir::new().unwrap();
        let mut session = session(scripted_client(), &config(&dir));
        session.upload("paypost.cbl", SOURCE).unwrap();
        session.extract().await.unwrap();
        session.generate_tests().await.unwrap();

        session.upload("other.cob", b"       PROGRAM-ID. OTHER.\n").unwrap();
        assert!(session.business_logic().is_none());
        assert!(session.test_script().is_none());
        assert_eq!(session.current_step(), Step::Extract);
    }

    #[tokio::test]
    async fn test_rejected_edits_leave_record_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut session = session(scripted_client(), &config(&dir));
        session.upload("paypost.cbl", SOURCE).unwrap();
        let before = session.extract().await.unwrap().clone();

        let mut edited = before.clone();
        edited.core_rules.push(BusinessRule {
            id: "r1".to_string(),
            description: "duplicate".to_string(),
            implementation: String::new(),
        });
        let err = session.apply_business_logic_edits(edited).unwrap_err();
        assert!(matches!(err, ScribeError::Edit(EditError::DuplicateId { .. })));
        assert_eq!(session.business_logic(), Some(&before));

        let mut edited = before.clone();
        edited.program_purpose = "Posts and reconciles payments".to_string();
        session.apply_business_logic_edits(edited).unwrap();
        assert_eq!(
            session.business_logic().unwrap().program_purpose,
            "Posts and reconciles payments"
        );
    }

    #[test]
    fn test_rejected_upload() {
        let dir = TempDir::new().unwrap();
        let mut session = session(MockLlmClient::new(), &config(&dir));
        let err = session.upload("notes.pdf", b"%PDF").unwrap_err();
        assert_eq!(err.stage(), "Upload");
        assert!(session.source().is_none());
    }

    #[tokio::test]
    async fn test_reset() {
        let dir = TempDir::new().unwrap();
        let mut session = session(scripted_client(), &config(&dir));
        session.upload("paypost.cbl", SOURCE).unwrap();
        session.extract().await.unwrap();

        session.reset();
        assert_eq!(session.current_step(), Step::Upload);
        assert!(session.business_logic().is_none());
    }
}
