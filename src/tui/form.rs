use crate::config::Config;
use crate::export::ArtifactKind;
use crate::pipeline::{Session, Step};
use crate::tui::theme::Theme;
use crate::tui::widgets::{
    add_item, add_test_case, apply_business_logic_form, apply_test_script_form,
    build_business_logic_form, build_test_script_form, item_count, remove_item,
    remove_test_case, FieldPath, FormState, ListKind,
};
use crate::ScribeError;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

/// Long-running step started from a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Extract,
    Review,
    GenerateTests,
}

impl Pending {
    fn message(&self) -> &'static str {
        match self {
            Pending::Extract => "Working... extracting business logic",
            Pending::Review => "Working... reviewing business logic",
            Pending::GenerateTests => "Working... generating test cases",
        }
    }
}

struct Status {
    message: String,
    is_error: bool,
}

struct App {
    session: Session,
    theme: Theme,
    model: String,
    show_raw_response: bool,
    allowed_extensions: String,
    step: Step,
    path_input: String,
    logic_form: Option<FormState>,
    script_form: Option<FormState>,
    raw_scroll: u16,
    exported: Vec<PathBuf>,
    status: Option<Status>,
    busy: Option<&'static str>,
    quit: bool,
}

impl App {
    fn new(config: &Config, session: Session) -> Self {
        let allowed_extensions = config
            .intake
            .allowed_extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            session,
            theme: Theme::named(&config.ui.theme),
            model: config.llm.model.clone(),
            show_raw_response: config.ui.show_raw_response,
            allowed_extensions,
            step: Step::Upload,
            path_input: String::new(),
            logic_form: None,
            script_form: None,
            raw_scroll: 0,
            exported: Vec::new(),
            status: None,
            busy: None,
            quit: false,
        }
    }

    fn set_info(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            is_error: false,
        });
    }

    fn set_error(&mut self, err: ScribeError) {
        tracing::warn!(stage = err.stage(), error = %err, "Step failed");
        self.status = Some(Status {
            message: err.user_message(),
            is_error: true,
        });
    }

    fn active_form_mut(&mut self) -> Option<&mut FormState> {
        match self.step {
            Step::Validate => self.logic_form.as_mut(),
            Step::GenerateTests => self.script_form.as_mut(),
            _ => None,
        }
    }

    fn is_editing(&self) -> bool {
        match self.step {
            Step::Validate => self.logic_form.as_ref().is_some_and(|f| f.editing),
            Step::GenerateTests => self.script_form.as_ref().is_some_and(|f| f.editing),
            _ => false,
        }
    }

    fn rebuild_logic_form(&mut self) {
        let selected = self.logic_form.as_ref().map(|f| f.selected).unwrap_or(0);
        self.logic_form = self.session.business_logic().map(|logic| {
            let mut form = FormState::new(build_business_logic_form(logic));
            form.selected = selected.min(form.fields.len().saturating_sub(1));
            form
        });
    }

    fn rebuild_script_form(&mut self) {
        let selected = self.script_form.as_ref().map(|f| f.selected).unwrap_or(0);
        self.script_form = self.session.test_script().map(|script| {
            let mut form = FormState::new(build_test_script_form(script));
            form.selected = selected.min(form.fields.len().saturating_sub(1));
            form
        });
    }

    /// Push pending form edits into the session
    fn sync_logic_edits(&mut self) -> crate::Result<()> {
        let Some(form) = self.logic_form.as_ref().filter(|f| f.is_modified()) else {
            return Ok(());
        };
        let mut record = self
            .session
            .business_logic()
            .cloned()
            .ok_or_else(|| ScribeError::Workflow("No business logic to edit".to_string()))?;
        apply_business_logic_form(&mut record, &form.fields)?;
        self.session.apply_business_logic_edits(record)?;
        self.rebuild_logic_form();
        Ok(())
    }

    fn sync_script_edits(&mut self) -> crate::Result<()> {
        let Some(form) = self.script_form.as_ref().filter(|f| f.is_modified()) else {
            return Ok(());
        };
        let mut script = self
            .session
            .test_script()
            .cloned()
            .ok_or_else(|| ScribeError::Workflow("No test script to edit".to_string()))?;
        apply_test_script_form(&mut script, &form.fields)?;
        self.session.apply_test_script_edits(script)?;
        self.rebuild_script_form();
        Ok(())
    }

    fn go_to(&mut self, step: Step) {
        if step == self.step {
            return;
        }
        let synced = match self.step {
            Step::Validate => self.sync_logic_edits(),
            Step::GenerateTests => self.sync_script_edits(),
            _ => Ok(()),
        };
        if let Err(e) = synced {
            return self.set_error(e);
        }
        if !self.session.can_enter(step) {
            let missing = if step == Step::Extract {
                "Upload a source file first"
            } else {
                "Extract the business logic first"
            };
            return self.set_error(ScribeError::Workflow(format!(
                "{} before {}",
                missing,
                step.title()
            )));
        }
        self.step = step;
        self.status = None;
    }

    fn step_offset(&mut self, offset: isize) {
        let steps = Step::all();
        let current = steps.iter().position(|s| *s == self.step).unwrap_or(0);
        let target = current as isize + offset;
        if let Some(step) = usize::try_from(target).ok().and_then(|i| steps.get(i)) {
            self.go_to(*step);
        }
    }

    fn upload(&mut self) {
        let path = self.path_input.trim().to_string();
        if path.is_empty() {
            return self.set_info("Type the path of a source file");
        }
        let result = self.session.upload_path(&path).map(|source| {
            format!(
                "Uploaded {} ({}, {} lines)",
                source.filename, source.info.program_type, source.info.line_count
            )
        });
        match result {
            Ok(message) => {
                self.logic_form = None;
                self.script_form = None;
                self.exported.clear();
                self.raw_scroll = 0;
                self.step = Step::Extract;
                self.set_info(message);
            }
            Err(e) => self.set_error(e),
        }
    }

    fn add_logic_item(&mut self) {
        if let Err(e) = self.sync_logic_edits() {
            return self.set_error(e);
        }
        let kind = self
            .logic_form
            .as_ref()
            .and_then(|f| f.current_field())
            .and_then(|f| f.path.list_item())
            .map(|(kind, _)| kind)
            .unwrap_or(ListKind::Rule);
        let Some(mut record) = self.session.business_logic().cloned() else {
            return;
        };
        add_item(&mut record, kind);
        let index = item_count(&record, kind).saturating_sub(1);

        match self.session.apply_business_logic_edits(record) {
            Ok(()) => {
                self.rebuild_logic_form();
                if let Some(form) = self.logic_form.as_mut() {
                    form.select_where(|path| path.list_item() == Some((kind, index)));
                }
                self.set_info(format!("Added {}", kind.label().to_lowercase()));
            }
            Err(e) => self.set_error(e),
        }
    }

    fn delete_logic_item(&mut self) {
        let target = self
            .logic_form
            .as_ref()
            .and_then(|f| f.current_field())
            .and_then(|f| f.path.list_item());
        let Some((kind, index)) = target else {
            return self
                .set_info("Select a rule, validation, special case or integration to delete");
        };
        if let Err(e) = self.sync_logic_edits() {
            return self.set_error(e);
        }
        let Some(mut record) = self.session.business_logic().cloned() else {
            return;
        };
        remove_item(&mut record, kind, index);

        match self.session.apply_business_logic_edits(record) {
            Ok(()) => {
                self.rebuild_logic_form();
                self.set_info(format!("Deleted {} {}", kind.label().to_lowercase(), index + 1));
            }
            Err(e) => self.set_error(e),
        }
    }

    fn add_script_case(&mut self) {
        if let Err(e) = self.sync_script_edits() {
            return self.set_error(e);
        }
        let Some(mut script) = self.session.test_script().cloned() else {
            return;
        };
        add_test_case(&mut script);
        let index = script.test_cases.len() - 1;

        match self.session.apply_test_script_edits(script) {
            Ok(()) => {
                self.rebuild_script_form();
                if let Some(form) = self.script_form.as_mut() {
                    form.select_where(|path| path.test_case_index() == Some(index));
                }
                self.set_info("Added test case");
            }
            Err(e) => self.set_error(e),
        }
    }

    fn delete_script_case(&mut self) {
        let target = self
            .script_form
            .as_ref()
            .and_then(|f| f.current_field())
            .and_then(|f| f.path.test_case_index());
        let Some(index) = target else {
            return self.set_info("Select a test case to delete");
        };
        if let Err(e) = self.sync_script_edits() {
            return self.set_error(e);
        }
        let Some(mut script) = self.session.test_script().cloned() else {
            return;
        };
        remove_test_case(&mut script, index);

        match self.session.apply_test_script_edits(script) {
            Ok(()) => {
                self.rebuild_script_form();
                self.set_info(format!("Deleted test case {}", index + 1));
            }
            Err(e) => self.set_error(e),
        }
    }

    fn export(&mut self, kinds: &[ArtifactKind]) {
        let mut written = Vec::new();
        for kind in kinds {
            match self.session.export(*kind) {
                Ok(paths) => written.extend(paths),
                Err(e) => return self.set_error(e),
            }
        }
        let message = format!(
            "Exported {} file(s) to {}",
            written.len(),
            self.session.output_dir().display()
        );
        self.exported = written;
        self.set_info(message);
    }

    /// Handle one key press; returns a step to run when the key starts one
    fn handle_key(&mut self, key: KeyEvent) -> Option<Pending> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return None;
        }

        if self.is_editing() {
            if let Some(form) = self.active_form_mut() {
                match key.code {
                    KeyCode::Esc | KeyCode::Enter => form.stop_editing(),
                    KeyCode::Backspace => form.delete_char(),
                    KeyCode::Left => form.move_cursor_left(),
                    KeyCode::Right => form.move_cursor_right(),
                    KeyCode::Char(c) => form.insert_char(c),
                    _ => {}
                }
            }
            return None;
        }

        match key.code {
            KeyCode::Tab => {
                self.step_offset(1);
                return None;
            }
            KeyCode::BackTab => {
                self.step_offset(-1);
                return None;
            }
            _ => {}
        }

        match self.step {
            Step::Upload => {
                match key.code {
                    KeyCode::Esc => self.quit = true,
                    KeyCode::Enter => self.upload(),
                    KeyCode::Backspace => {
                        self.path_input.pop();
                    }
                    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.path_input.push(c)
                    }
                    _ => {}
                }
                None
            }
            Step::Extract => match key.code {
                KeyCode::Enter | KeyCode::Char('x') => Some(Pending::Extract),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.raw_scroll = self.raw_scroll.saturating_sub(1);
                    None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.raw_scroll = self.raw_scroll.saturating_add(1);
                    None
                }
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.quit = true;
                    None
                }
                _ => None,
            },
            Step::Validate => {
                if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    match self.sync_logic_edits() {
                        Ok(()) => self.set_info("Business logic edits applied"),
                        Err(e) => self.set_error(e),
                    }
                    return None;
                }
                match key.code {
                    KeyCode::Char('r') => {
                        if let Err(e) = self.sync_logic_edits() {
                            self.set_error(e);
                            return None;
                        }
                        return Some(Pending::Review);
                    }
                    KeyCode::Char('a') => self.add_logic_item(),
                    KeyCode::Char('d') => self.delete_logic_item(),
                    KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
                    _ => {
                        if let Some(form) = self.logic_form.as_mut() {
                            navigate(form, key.code);
                        }
                    }
                }
                None
            }
            Step::GenerateTests => {
                if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    match self.sync_script_edits() {
                        Ok(()) => self.set_info("Test script edits applied"),
                        Err(e) => self.set_error(e),
                    }
                    return None;
                }
                match key.code {
                    KeyCode::Char('g') => return Some(Pending::GenerateTests),
                    KeyCode::Enter if self.script_form.is_none() => {
                        return Some(Pending::GenerateTests)
                    }
                    KeyCode::Char('a') => self.add_script_case(),
                    KeyCode::Char('d') => self.delete_script_case(),
                    KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
                    _ => {
                        if let Some(form) = self.script_form.as_mut() {
                            navigate(form, key.code);
                        }
                    }
                }
                None
            }
            Step::Export => {
                match key.code {
                    KeyCode::Char('1') => self.export(&[ArtifactKind::BusinessLogic]),
                    KeyCode::Char('2') => self.export(&[ArtifactKind::TestScript]),
                    KeyCode::Char('3') => {
                        self.export(&[ArtifactKind::BusinessLogic, ArtifactKind::TestScript])
                    }
                    KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
                    _ => {}
                }
                None
            }
        }
    }

    async fn run(&mut self, pending: Pending) {
        match pending {
            Pending::Extract => {
                let result = self
                    .session
                    .extract()
                    .await
                    .map(|logic| format!("Extracted {}: {}", logic.program_name, logic.summary()));
                match result {
                    Ok(message) => {
                        self.logic_form = None;
                        self.script_form = None;
                        self.rebuild_logic_form();
                        self.raw_scroll = 0;
                        self.step = Step::Validate;
                        self.set_info(message);
                    }
                    Err(e) => self.set_error(e),
                }
            }
            Pending::Review => match self.session.review().await {
                Ok(_) => {
                    self.rebuild_logic_form();
                    if let Some(form) = self.logic_form.as_mut() {
                        form.select_where(|path| *path == FieldPath::AdditionalNotes);
                    }
                    self.set_info("Review findings added to Additional Notes");
                }
                Err(e) => self.set_error(e),
            },
            Pending::GenerateTests => {
                let result = self
                    .session
                    .generate_tests()
                    .await
                    .map(|script| script.test_cases.len());
                match result {
                    Ok(count) => {
                        self.script_form = None;
                        self.rebuild_script_form();
                        self.set_info(format!("Generated {} test case(s)", count));
                    }
                    Err(e) => self.set_error(e),
                }
            }
        }
    }
}

fn navigate(form: &mut FormState, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => form.move_up(),
        KeyCode::Down | KeyCode::Char('j') => form.move_down(),
        KeyCode::Enter => {
            if form.current_field().is_some_and(|f| f.is_choice()) {
                form.cycle_choice();
            } else {
                form.start_editing();
            }
        }
        _ => {}
    }
}

/// Run the step-based workflow until the user quits
pub async fn run_app(config: &Config, session: Session, preload: Option<String>) -> Result<()> {
    let mut app = App::new(config, session);
    if let Some(path) = preload {
        app.path_input = path;
        app.upload();
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| draw_app(f, app))?;
        if app.quit {
            return Ok(());
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(pending) = app.handle_key(key) {
                // Show the indicator before the request blocks the loop
                app.busy = Some(pending.message());
                terminal.draw(|f| draw_app(f, app))?;
                app.run(pending).await;
                app.busy = None;
            }
        }
    }
}

fn draw_app(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Step body
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    match app.step {
        Step::Upload => draw_upload(f, app, chunks[1]),
        Step::Extract => draw_extract(f, app, chunks[1]),
        Step::Validate => {
            if let Some(form) = app.logic_form.as_mut() {
                draw_form(f, form, "Business Logic", &app.theme, chunks[1]);
            }
        }
        Step::GenerateTests => match app.script_form.as_mut() {
            Some(form) => draw_form(f, form, "Test Script", &app.theme, chunks[1]),
            None => {
                let body = Paragraph::new(vec![
                    Line::from("No test script yet."),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Press Enter to generate test cases from the validated business logic.",
                        app.theme.help,
                    )),
                ])
                .block(Block::default().title("Test Script").borders(Borders::ALL));
                f.render_widget(body, chunks[1]);
            }
        },
        Step::Export => draw_export(f, app, chunks[1]),
    }

    if let Some(status) = &app.status {
        let style = if status.is_error {
            app.theme.error
        } else {
            app.theme.success
        };
        f.render_widget(Paragraph::new(status.message.as_str()).style(style), chunks[2]);
    }

    let help = Paragraph::new(help_text(app)).style(app.theme.help);
    f.render_widget(help, chunks[3]);

    if let Some(message) = app.busy {
        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);
        let popup = Paragraph::new(Line::from(Span::styled(message, app.theme.header)))
            .block(Block::default().title("Please wait").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(popup, area);
    }
}

fn help_text(app: &App) -> &'static str {
    if app.is_editing() {
        return "Esc/Enter: finish editing | ←/→: move cursor | Backspace: delete";
    }
    match app.step {
        Step::Upload => "Type a path | Enter: upload | Tab: next step | Esc: quit",
        Step::Extract => {
            "Enter: extract | ↑/↓: scroll response | Tab/Shift+Tab: steps | q: quit"
        }
        Step::Validate => {
            "↑/↓: navigate | Enter: edit | Ctrl+S: apply | r: review | a/d: add/delete item | Tab: steps | q: quit"
        }
        Step::GenerateTests => {
            "Enter: edit | g: generate | Ctrl+S: apply | a/d: add/delete case | Tab: steps | q: quit"
        }
        Step::Export => "1: business logic | 2: test script | 3: both | Shift+Tab: back | q: quit",
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut title = vec![Span::styled("Legacy Scribe", theme.header)];
    if let Some(logic) = app.session.business_logic() {
        title.push(Span::raw(" - "));
        title.push(Span::raw(logic.program_name.clone()));
    } else if let Some(source) = app.session.source() {
        title.push(Span::raw(" - "));
        title.push(Span::raw(source.filename.clone()));
    }
    title.push(Span::styled(format!("  [{}]", app.model), theme.help));

    let mut steps = Vec::new();
    for (i, step) in Step::all().iter().enumerate() {
        if i > 0 {
            steps.push(Span::styled(" › ", theme.help));
        }
        let style = if *step == app.step {
            theme.selected
        } else if app.session.can_enter(*step) {
            theme.normal
        } else {
            theme.disabled
        };
        steps.push(Span::styled(format!("{}. {}", i + 1, step.title()), style));
    }

    let header = Paragraph::new(vec![Line::from(title), Line::from(steps)])
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn draw_upload(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut lines = vec![
        Line::from("Source file path:"),
        Line::from(Span::styled(format!("> {}_", app.path_input), theme.selected)),
        Line::from(""),
        Line::from(Span::styled(
            format!("Accepted extensions: {}", app.allowed_extensions),
            theme.help,
        )),
    ];
    if let Some(source) = app.session.source() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Current upload: {}", source.filename)));
    }

    let body = Paragraph::new(lines)
        .block(Block::default().title("Upload").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

fn draw_extract(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let raw = app
        .session
        .last_raw_response()
        .filter(|_| app.show_raw_response);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if raw.is_some() {
            [Constraint::Length(8), Constraint::Min(3)]
        } else {
            [Constraint::Min(3), Constraint::Length(0)]
        })
        .split(area);

    let mut lines = Vec::new();
    if let Some(source) = app.session.source() {
        lines.push(Line::from(vec![
            Span::styled("File: ", theme.header),
            Span::raw(source.filename.clone()),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Program: ", theme.header),
            Span::raw(source.program_name()),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Type: ", theme.header),
            Span::raw(source.info.program_type.to_string()),
            Span::raw(format!("  ({} lines)", source.info.line_count)),
        ]));
    }
    match app.session.business_logic() {
        Some(logic) => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Extracted: {}", logic.summary()),
                theme.preview,
            )));
        }
        None => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Press Enter to extract business logic.",
                theme.help,
            )));
        }
    }

    let summary = Paragraph::new(lines)
        .block(Block::default().title("Source").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(summary, chunks[0]);

    if let Some(raw) = raw {
        let preview = Paragraph::new(raw)
            .style(theme.preview)
            .block(Block::default().title("Raw Response").borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .scroll((app.raw_scroll, 0));
        f.render_widget(preview, chunks[1]);
    }
}

fn with_cursor(value: &str, cursor: usize) -> String {
    let mut shown: String = value.chars().take(cursor).collect();
    shown.push('▏');
    shown.extend(value.chars().skip(cursor));
    shown.replace('\n', " ↵ ")
}

fn draw_form(f: &mut Frame, state: &mut FormState, title: &str, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(6)])
        .split(area);

    let height = chunks[0].height.saturating_sub(2) as usize;
    state.scroll_to_selected(height);

    let items: Vec<ListItem> = state
        .fields
        .iter()
        .enumerate()
        .skip(state.scroll)
        .take(height)
        .map(|(i, field)| {
            let is_selected = i == state.selected;
            let style = if is_selected {
                theme.selected
            } else if field.is_modified() {
                theme.modified
            } else if field.required {
                theme.required
            } else if field.starts_group {
                theme.header
            } else {
                theme.normal
            };

            let marker = if field.required { "*" } else { " " };
            let value = if is_selected && state.editing {
                with_cursor(&field.value, state.cursor_pos)
            } else {
                field.display_value()
            };

            ListItem::new(Line::from(Span::styled(
                format!("{} {}: {}", marker, field.label, value),
                style,
            )))
        })
        .collect();

    let modified = if state.is_modified() { " (modified)" } else { "" };
    let list = List::new(items).block(
        Block::default()
            .title(format!("{}{}", title, modified))
            .borders(Borders::ALL),
    );
    f.render_widget(list, chunks[0]);

    // Full value of the selected field
    if let Some(field) = state.current_field() {
        let value = Paragraph::new(field.value.as_str())
            .block(Block::default().title(field.label.as_str()).borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        f.render_widget(value, chunks[1]);
    }
}

fn draw_export(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let ready = |present: bool| {
        if present {
            Span::styled("ready", theme.success)
        } else {
            Span::styled("not generated", theme.disabled)
        }
    };
    let formats = app
        .session
        .export_formats()
        .iter()
        .map(|format| format.extension())
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Business logic: ", theme.header),
            ready(app.session.business_logic().is_some()),
        ]),
        Line::from(vec![
            Span::styled("Test script: ", theme.header),
            ready(app.session.test_script().is_some()),
        ]),
        Line::from(vec![Span::styled("Formats: ", theme.header), Span::raw(formats)]),
        Line::from(vec![
            Span::styled("Output directory: ", theme.header),
            Span::raw(app.session.output_dir().display().to_string()),
        ]),
    ];
    if !app.exported.is_empty() {
        lines.push(Line::from(""));
        for path in &app.exported {
            lines.push(Line::from(Span::styled(
                path.display().to_string(),
                theme.preview,
            )));
        }
    }

    let body = Paragraph::new(lines)
        .block(Block::default().title("Export").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::llm::client::MockLlmClient;
    use crate::llm::{OperationKind, RetryPolicy};
    use crate::pipeline::Analyzer;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    const SOURCE: &str = "       IDENTIFICATION DIVISION.\n       PROGRAM-ID. PAYPOST.\n       PROCEDURE DIVISION.\n           STOP RUN.\n";

    fn app(dir: &TempDir) -> App {
        let mut config = Config::default();
        config.intake.cache_dir = dir.path().join("cache");
        config.export.output_dir = dir.path().join("out");

        let mut client = MockLlmClient::new();
        client.expect_complete().returning(|prompt| match prompt.kind {
            OperationKind::ExtractBusinessLogic => Ok(
                "## Program Purpose\nPosts payments\n\n## Core Business Rules\n- R1: No zero amounts\n"
                    .to_string(),
            ),
            OperationKind::GenerateTests => {
                Ok("### Test Case: PAYPOST-TC-001\nTitle: Happy path\n".to_string())
            }
            OperationKind::ReviewLogic => Ok("- Looks consistent".to_string()),
        });
        let analyzer = Analyzer::new(
            Box::new(client),
            RetryPolicy::none(),
            ChunkingConfig::default(),
            None,
        );
        App::new(&config, Session::new(analyzer, &config))
    }

    fn press(app: &mut App, code: KeyCode) -> Option<Pending> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw_app(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    /// Style of the first cell where `text` is drawn
    fn style_of(app: &mut App, text: &str) -> ratatui::style::Style {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw_app(f, app)).unwrap();
        let cells = terminal.backend().buffer().content();
        let len = text.chars().count();
        let start = (0..cells.len())
            .find(|&i| {
                let shown: String = cells[i..].iter().take(len).map(|c| c.symbol()).collect();
                shown == text
            })
            .unwrap();
        cells[start].style()
    }

    async fn uploaded_and_extracted(dir: &TempDir) -> App {
        let path = dir.path().join("paypost.cbl");
        std::fs::write(&path, SOURCE).unwrap();

        let mut app = app(dir);
        type_text(&mut app, &path.display().to_string());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.step, Step::Extract);

        let pending = press(&mut app, KeyCode::Enter).unwrap();
        assert_eq!(pending, Pending::Extract);
        app.run(pending).await;
        app
    }

    #[test]
    fn test_steps_are_gated() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.step, Step::Upload);
        assert!(app.status.as_ref().is_some_and(|s| s.is_error));
        assert!(screen(&mut app).contains("Upload a source file first"));
    }

    #[tokio::test]
    async fn test_step_bar_marks_unavailable_steps() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        assert_eq!(style_of(&mut app, "1. Upload").fg, app.theme.selected.fg);
        let extract = style_of(&mut app, "2. Extract");
        assert_eq!(extract.fg, app.theme.disabled.fg);
        assert!(extract.add_modifier.contains(ratatui::style::Modifier::DIM));

        let mut app = uploaded_and_extracted(&dir).await;
        assert_eq!(style_of(&mut app, "2. Extract").fg, app.theme.normal.fg);
        assert_eq!(style_of(&mut app, "3. Validate").fg, app.theme.selected.fg);
        assert_eq!(style_of(&mut app, "5. Export").fg, app.theme.normal.fg);
        assert_eq!(style_of(&mut app, "Extracted PAYPOST").fg, app.theme.success.fg);
    }

    #[test]
    fn test_failed_upload_shows_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        type_text(&mut app, "/no/such/file.cbl");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.step, Step::Upload);
        let status = app.status.as_ref().unwrap();
        assert!(status.is_error);
        assert!(status.message.starts_with("Upload failed"));
    }

    #[tokio::test]
    async fn test_extract_opens_validation_form() {
        let dir = TempDir::new().unwrap();
        let mut app = uploaded_and_extracted(&dir).await;

        assert_eq!(app.step, Step::Validate);
        let form = app.logic_form.as_ref().unwrap();
        assert_eq!(form.fields[0].value, "PAYPOST");
        assert!(screen(&mut app).contains("Rule 1 Description: No zero amounts"));
    }

    #[tokio::test]
    async fn test_invalid_edit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut app = uploaded_and_extracted(&dir).await;
        let before = app.session.business_logic().cloned();

        // Clear the program name
        press(&mut app, KeyCode::Enter);
        for _ in 0.."PAYPOST".len() {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Enter);
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));

        assert!(app.status.as_ref().is_some_and(|s| s.is_error));
        assert_eq!(app.session.business_logic().cloned(), before);

        // Leaving the step is refused while the edit is invalid
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.step, Step::Validate);
    }

    #[tokio::test]
    async fn test_edit_review_generate_and_export() {
        let dir = TempDir::new().unwrap();
        let mut app = uploaded_and_extracted(&dir).await;

        // Rename the first rule's description
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, " allowed");
        press(&mut app, KeyCode::Enter);

        let pending = press(&mut app, KeyCode::Char('r')).unwrap();
        app.run(pending).await;
        let logic = app.session.business_logic().unwrap();
        assert_eq!(logic.core_rules[0].description, "No zero amounts allowed");
        assert!(logic.additional_notes.contains("Looks consistent"));

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.step, Step::GenerateTests);
        let pending = press(&mut app, KeyCode::Enter).unwrap();
        app.run(pending).await;
        assert_eq!(app.script_form.as_ref().unwrap().fields[1].value, "PAYPOST-TC-001");

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.session.test_script().unwrap().test_cases.len(), 2);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.step, Step::Export);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.exported.len(), 2);
        assert!(app.exported.iter().all(|p| p.exists()));
        assert!(screen(&mut app).contains("PAYPOST_Test_Script.docx"));
    }

    #[test]
    fn test_busy_indicator_is_drawn() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.busy = Some(Pending::Extract.message());
        assert!(screen(&mut app).contains("Working..."));
    }
}
