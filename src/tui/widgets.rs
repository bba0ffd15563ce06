use crate::model::{
    BusinessLogic, BusinessRule, EditError, IntegrationPoint, ProgramType, SpecialCase, TestCase,
    TestScript, Validation,
};
use indexmap::IndexMap;

/// List sections of a business logic record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Rule,
    Validation,
    SpecialCase,
    Integration,
}

impl ListKind {
    pub fn label(&self) -> &'static str {
        match self {
            ListKind::Rule => "Rule",
            ListKind::Validation => "Validation",
            ListKind::SpecialCase => "Special case",
            ListKind::Integration => "Integration point",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePart {
    Id,
    Description,
    Implementation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPart {
    Field,
    Rule,
    ErrorHandling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCasePart {
    Condition,
    Handling,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationPart {
    Name,
    Kind,
    Direction,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCasePart {
    Id,
    Title,
    Description,
    Prerequisites,
    TestData,
    Steps,
    ExpectedResults,
    RelatedRules,
}

/// Address of one editable value inside a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    ProgramName,
    ProgramType,
    ProgramPurpose,
    AdditionalNotes,
    Rule(usize, RulePart),
    Validation(usize, ValidationPart),
    SpecialCase(usize, SpecialCasePart),
    Integration(usize, IntegrationPart),
    ScriptProgramName,
    TestCase(usize, TestCasePart),
}

impl FieldPath {
    /// List item this field belongs to, if any
    pub fn list_item(&self) -> Option<(ListKind, usize)> {
        match *self {
            FieldPath::Rule(i, _) => Some((ListKind::Rule, i)),
            FieldPath::Validation(i, _) => Some((ListKind::Validation, i)),
            FieldPath::SpecialCase(i, _) => Some((ListKind::SpecialCase, i)),
            FieldPath::Integration(i, _) => Some((ListKind::Integration, i)),
            _ => None,
        }
    }

    pub fn test_case_index(&self) -> Option<usize> {
        match *self {
            FieldPath::TestCase(i, _) => Some(i),
            _ => None,
        }
    }
}

/// Form field representing a single editable value
#[derive(Debug, Clone)]
pub struct FormField {
    pub path: FieldPath,
    pub label: String,
    pub value: String,
    /// Value as first rendered; unchanged fields are not written back
    pub initial: String,
    pub required: bool,
    /// Allowed values; cycled instead of typed
    pub choices: Vec<String>,
    /// First field of a list item
    pub starts_group: bool,
}

impl FormField {
    fn new(path: FieldPath, label: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            path,
            label: label.into(),
            initial: value.clone(),
            value,
            required: false,
            choices: Vec::new(),
            starts_group: false,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn group_start(mut self) -> Self {
        self.starts_group = true;
        self
    }

    pub fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.value != self.initial
    }

    /// Single-line rendering of the value
    pub fn display_value(&self) -> String {
        self.value.replace('\n', " ↵ ")
    }
}

/// Separator for list-valued fields edited as one line
pub const LIST_SEPARATOR: &str = "; ";

pub fn join_list(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

pub fn split_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_test_data(data: &IndexMap<String, String>) -> String {
    data.iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

pub fn split_test_data(text: &str) -> IndexMap<String, String> {
    split_list(text)
        .into_iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (pair, String::new()),
        })
        .collect()
}

/// One field per value of a business logic record, in document order
pub fn build_business_logic_form(logic: &BusinessLogic) -> Vec<FormField> {
    let mut fields = vec![
        FormField::new(FieldPath::ProgramName, "Program Name", logic.program_name.clone())
            .required(),
        FormField {
            choices: ProgramType::all().iter().map(|t| t.to_string()).collect(),
            ..FormField::new(FieldPath::ProgramType, "Program Type", logic.program_type.to_string())
        },
        FormField::new(FieldPath::ProgramPurpose, "Program Purpose", logic.program_purpose.clone()),
    ];

    for (i, rule) in logic.core_rules.iter().enumerate() {
        let n = i + 1;
        let path = |part| FieldPath::Rule(i, part);
        fields.push(
            FormField::new(path(RulePart::Id), format!("Rule {} ID", n), rule.id.clone())
                .required()
                .group_start(),
        );
        fields.push(FormField::new(
            path(RulePart::Description),
            format!("Rule {} Description", n),
            rule.description.clone(),
        ));
        fields.push(FormField::new(
            path(RulePart::Implementation),
            format!("Rule {} Implementation", n),
            rule.implementation.clone(),
        ));
    }

    for (i, validation) in logic.validations.iter().enumerate() {
        let n = i + 1;
        let path = |part| FieldPath::Validation(i, part);
        fields.push(
            FormField::new(
                path(ValidationPart::Field),
                format!("Validation {} Field", n),
                validation.field.clone(),
            )
            .group_start(),
        );
        fields.push(FormField::new(
            path(ValidationPart::Rule),
            format!("Validation {} Rule", n),
            validation.rule.clone(),
        ));
        fields.push(FormField::new(
            path(ValidationPart::ErrorHandling),
            format!("Validation {} Error Handling", n),
            validation.error_handling.clone().unwrap_or_default(),
        ));
    }

    for (i, case) in logic.special_cases.iter().enumerate() {
        let n = i + 1;
        let path = |part| FieldPath::SpecialCase(i, part);
        fields.push(
            FormField::new(
                path(SpecialCasePart::Condition),
                format!("Special Case {} Condition", n),
                case.condition.clone(),
            )
            .group_start(),
        );
        fields.push(FormField::new(
            path(SpecialCasePart::Handling),
            format!("Special Case {} Handling", n),
            case.handling.clone(),
        ));
        fields.push(FormField::new(
            path(SpecialCasePart::Notes),
            format!("Special Case {} Notes", n),
            case.notes.clone().unwrap_or_default(),
        ));
    }

    for (i, point) in logic.integration_points.iter().enumerate() {
        let n = i + 1;
        let path = |part| FieldPath::Integration(i, part);
        fields.push(
            FormField::new(
                path(IntegrationPart::Name),
                format!("Integration {} Name", n),
                point.name.clone(),
            )
            .group_start(),
        );
        fields.push(FormField::new(
            path(IntegrationPart::Kind),
            format!("Integration {} Type", n),
            point.kind.clone(),
        ));
        fields.push(FormField::new(
            path(IntegrationPart::Direction),
            format!("Integration {} Direction", n),
            point.direction.clone(),
        ));
        fields.push(FormField::new(
            path(IntegrationPart::Description),
            format!("Integration {} Description", n),
            point.description.clone(),
        ));
    }

    fields.push(
        FormField::new(
            FieldPath::AdditionalNotes,
            "Additional Notes",
            logic.additional_notes.clone(),
        )
        .group_start(),
    );
    fields
}

fn optional(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Write form edits into `logic`. On a format error the record is left unchanged.
pub fn apply_business_logic_form(
    logic: &mut BusinessLogic,
    fields: &[FormField],
) -> Result<(), EditError> {
    let mut edited = logic.clone();

    for field in fields.iter().filter(|f| f.is_modified()) {
        let value = field.value.clone();
        match field.path {
            FieldPath::ProgramName => edited.program_name = value.trim().to_string(),
            FieldPath::ProgramType => {
                if let Some(program_type) = ProgramType::from_label(&value) {
                    edited.program_type = program_type;
                }
            }
            FieldPath::ProgramPurpose => edited.program_purpose = value,
            FieldPath::AdditionalNotes => edited.additional_notes = value,
            FieldPath::Rule(i, part) => {
                if let Some(rule) = edited.core_rules.get_mut(i) {
                    match part {
                        RulePart::Id => rule.id = value.trim().to_string(),
                        RulePart::Description => rule.description = value,
                        RulePart::Implementation => rule.implementation = value,
                    }
                }
            }
            FieldPath::Validation(i, part) => {
                if let Some(validation) = edited.validations.get_mut(i) {
                    match part {
                        ValidationPart::Field => validation.field = value,
                        ValidationPart::Rule => validation.rule = value,
                        ValidationPart::ErrorHandling => {
                            validation.error_handling = optional(&value)
                        }
                    }
                }
            }
            FieldPath::SpecialCase(i, part) => {
                if let Some(case) = edited.special_cases.get_mut(i) {
                    match part {
                        SpecialCasePart::Condition => case.condition = value,
                        SpecialCasePart::Handling => case.handling = value,
                        SpecialCasePart::Notes => case.notes = optional(&value),
                    }
                }
            }
            FieldPath::Integration(i, part) => {
                if let Some(point) = edited.integration_points.get_mut(i) {
                    match part {
                        IntegrationPart::Name => point.name = value,
                        IntegrationPart::Kind => point.kind = value,
                        IntegrationPart::Direction => point.direction = value,
                        IntegrationPart::Description => point.description = value,
                    }
                }
            }
            FieldPath::ScriptProgramName | FieldPath::TestCase(..) => {}
        }
    }

    edited.check()?;
    *logic = edited;
    Ok(())
}

pub fn build_test_script_form(script: &TestScript) -> Vec<FormField> {
    let mut fields = vec![FormField::new(
        FieldPath::ScriptProgramName,
        "Program Name",
        script.program_name.clone(),
    )
    .required()];

    for (i, case) in script.test_cases.iter().enumerate() {
        let n = i + 1;
        let path = |part| FieldPath::TestCase(i, part);
        fields.push(
            FormField::new(path(TestCasePart::Id), format!("Test {} ID", n), case.test_id.clone())
                .required()
                .group_start(),
        );
        fields.push(FormField::new(
            path(TestCasePart::Title),
            format!("Test {} Title", n),
            case.title.clone(),
        ));
        fields.push(FormField::new(
            path(TestCasePart::Description),
            format!("Test {} Description", n),
            case.description.clone(),
        ));
        fields.push(FormField::new(
            path(TestCasePart::Prerequisites),
            format!("Test {} Prerequisites", n),
            join_list(&case.prerequisites),
        ));
        fields.push(FormField::new(
            path(TestCasePart::TestData),
            format!("Test {} Test Data", n),
            join_test_data(&case.test_data),
        ));
        fields.push(FormField::new(
            path(TestCasePart::Steps),
            format!("Test {} Steps", n),
            join_list(&case.steps),
        ));
        fields.push(FormField::new(
            path(TestCasePart::ExpectedResults),
            format!("Test {} Expected Results", n),
            join_list(&case.expected_results),
        ));
        fields.push(FormField::new(
            path(TestCasePart::RelatedRules),
            format!("Test {} Related Rules", n),
            join_list(&case.related_rules),
        ));
    }

    fields
}

/// Write form edits into `script`. On a format error the script is left unchanged.
pub fn apply_test_script_form(
    script: &mut TestScript,
    fields: &[FormField],
) -> Result<(), EditError> {
    let mut edited = script.clone();

    for field in fields.iter().filter(|f| f.is_modified()) {
        let value = field.value.clone();
        match field.path {
            FieldPath::ScriptProgramName => edited.program_name = value.trim().to_string(),
            FieldPath::TestCase(i, part) => {
                let Some(case) = edited.test_cases.get_mut(i) else {
                    continue;
                };
                match part {
                    TestCasePart::Id => case.test_id = value.trim().to_string(),
                    TestCasePart::Title => case.title = value,
                    TestCasePart::Description => case.description = value,
                    TestCasePart::Prerequisites => case.prerequisites = split_list(&value),
                    TestCasePart::TestData => case.test_data = split_test_data(&value),
                    TestCasePart::Steps => case.steps = split_list(&value),
                    TestCasePart::ExpectedResults => case.expected_results = split_list(&value),
                    TestCasePart::RelatedRules => case.related_rules = split_list(&value),
                }
            }
            _ => {}
        }
    }

    edited.check()?;
    *script = edited;
    Ok(())
}

fn next_free_id(existing: &[&str], make: impl Fn(usize) -> String) -> String {
    (1..)
        .map(&make)
        .find(|id| !existing.iter().any(|e| e.eq_ignore_ascii_case(id)))
        .unwrap_or_else(|| make(existing.len() + 1))
}

/// Append an empty item to a list section
pub fn add_item(logic: &mut BusinessLogic, kind: ListKind) {
    match kind {
        ListKind::Rule => {
            let ids: Vec<&str> = logic.core_rules.iter().map(|r| r.id.as_str()).collect();
            let id = next_free_id(&ids, |n| format!("RULE_{}", n));
            logic.core_rules.push(BusinessRule {
                id,
                ..BusinessRule::default()
            });
        }
        ListKind::Validation => logic.validations.push(Validation::default()),
        ListKind::SpecialCase => logic.special_cases.push(SpecialCase::default()),
        ListKind::Integration => logic.integration_points.push(IntegrationPoint::default()),
    }
}

pub fn item_count(logic: &BusinessLogic, kind: ListKind) -> usize {
    match kind {
        ListKind::Rule => logic.core_rules.len(),
        ListKind::Validation => logic.validations.len(),
        ListKind::SpecialCase => logic.special_cases.len(),
        ListKind::Integration => logic.integration_points.len(),
    }
}

pub fn remove_item(logic: &mut BusinessLogic, kind: ListKind, index: usize) {
    fn remove_at<T>(items: &mut Vec<T>, index: usize) {
        if index < items.len() {
            items.remove(index);
        }
    }
    match kind {
        ListKind::Rule => remove_at(&mut logic.core_rules, index),
        ListKind::Validation => remove_at(&mut logic.validations, index),
        ListKind::SpecialCase => remove_at(&mut logic.special_cases, index),
        ListKind::Integration => remove_at(&mut logic.integration_points, index),
    }
}

pub fn add_test_case(script: &mut TestScript) {
    let ids: Vec<&str> = script.test_cases.iter().map(|c| c.test_id.as_str()).collect();
    let prefix = script.program_name.trim().to_string();
    let id = next_free_id(&ids, |n| {
        if prefix.is_empty() {
            format!("TC-{:03}", n)
        } else {
            format!("{}-TC-{:03}", prefix, n)
        }
    });
    script.test_cases.push(TestCase::new(id, "New test case"));
}

pub fn remove_test_case(script: &mut TestScript, index: usize) {
    if index < script.test_cases.len() {
        script.test_cases.remove(index);
    }
}

/// Form state
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected: usize,
    pub editing: bool,
    /// Cursor position in characters, not bytes
    pub cursor_pos: usize,
    pub scroll: usize,
}

impl FormState {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            selected: 0,
            editing: false,
            cursor_pos: 0,
            scroll: 0,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.fields.iter().any(|f| f.is_modified())
    }

    pub fn current_field(&self) -> Option<&FormField> {
        self.fields.get(self.selected)
    }

    pub fn current_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.selected)
    }

    /// Select the first field whose path satisfies `matches`, if any
    pub fn select_where(&mut self, matches: impl Fn(&FieldPath) -> bool) {
        if let Some(i) = self.fields.iter().position(|f| matches(&f.path)) {
            self.selected = i;
        }
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.fields.len() {
            self.selected += 1;
        }
    }

    /// Keep the selected row inside a window of `height` rows
    pub fn scroll_to_selected(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + height {
            self.scroll = self.selected + 1 - height;
        }
    }

    pub fn start_editing(&mut self) {
        if let Some(len) = self.current_field().map(|f| f.value.chars().count()) {
            self.editing = true;
            self.cursor_pos = len;
        }
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
    }

    fn byte_index(value: &str, char_pos: usize) -> usize {
        value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(value.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let pos = self.cursor_pos;
        if let Some(field) = self.current_field_mut() {
            let at = Self::byte_index(&field.value, pos);
            field.value.insert(at, c);
            self.cursor_pos += 1;
        }
    }

    pub fn delete_char(&mut self) {
        let pos = self.cursor_pos;
        if pos == 0 {
            return;
        }
        if let Some(field) = self.current_field_mut() {
            let at = Self::byte_index(&field.value, pos - 1);
            if at < field.value.len() {
                field.value.remove(at);
                self.cursor_pos -= 1;
            }
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        let len = self.current_field().map(|f| f.value.chars().count()).unwrap_or(0);
        if self.cursor_pos < len {
            self.cursor_pos += 1;
        }
    }

    pub fn cycle_choice(&mut self) {
        if let Some(field) = self.current_field_mut() {
            if field.choices.is_empty() {
                return;
            }
            let next = field
                .choices
                .iter()
                .position(|c| c == &field.value)
                .map(|i| (i + 1) % field.choices.len())
                .unwrap_or(0);
            field.value = field.choices[next].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_logic() -> BusinessLogic {
        let mut logic = BusinessLogic::new("X800DN", ProgramType::Batch);
        logic.program_purpose = "Posts payments.\n\nSecond paragraph.".to_string();
        logic.core_rules.push(BusinessRule {
            id: "R1".to_string(),
            description: "No zero amounts".to_string(),
            implementation: "2000-CHECK".to_string(),
        });
        logic.validations.push(Validation {
            field: "AMOUNT".to_string(),
            rule: "> 0".to_string(),
            error_handling: None,
        });
        logic.special_cases.push(SpecialCase {
            condition: "Disputed".to_string(),
            handling: "Hold".to_string(),
            notes: Some("Daily review".to_string()),
        });
        logic.integration_points.push(IntegrationPoint {
            name: "CUSTOMER".to_string(),
            kind: "Database".to_string(),
            direction: "Input".to_string(),
            description: "master".to_string(),
        });
        logic
    }

    fn sample_script() -> TestScript {
        let mut script = TestScript::new("X800DN");
        let mut case = TestCase::new("X800DN-TC-001", "Happy path");
        case.steps = vec!["Enter A; then B".to_string(), "Run".to_string()];
        case.test_data.insert("AMOUNT".to_string(), "10".to_string());
        case.test_data.insert("DATE".to_string(), "2024-01-01".to_string());
        script.test_cases.push(case);
        script
    }

    fn set(fields: &mut [FormField], path: FieldPath, value: &str) {
        let field = fields.iter_mut().find(|f| f.path == path).unwrap();
        field.value = value.to_string();
    }

    #[test]
    fn test_every_value_has_a_field() {
        let fields = build_business_logic_form(&sample_logic());
        // 3 program fields + 3 + 3 + 3 + 4 item fields + notes
        assert_eq!(fields.len(), 17);
        assert!(fields[0].required);
        assert_eq!(fields[1].choices, vec!["Online", "Batch"]);
    }

    #[test]
    fn test_unedited_form_round_trips() {
        let original = sample_logic();
        let mut logic = original.clone();
        let fields = build_business_logic_form(&logic);
        apply_business_logic_form(&mut logic, &fields).unwrap();
        assert_eq!(logic, original);

        let original = sample_script();
        let mut script = original.clone();
        let fields = build_test_script_form(&script);
        apply_test_script_form(&mut script, &fields).unwrap();
        assert_eq!(script, original);
    }

    #[test]
    fn test_edits_are_written_back() {
        let mut logic = sample_logic();
        let mut fields = build_business_logic_form(&logic);
        set(&mut fields, FieldPath::ProgramType, "Online");
        set(&mut fields, FieldPath::Rule(0, RulePart::Description), "Amounts must be positive");
        set(&mut fields, FieldPath::Validation(0, ValidationPart::ErrorHandling), "Reject");
        set(&mut fields, FieldPath::SpecialCase(0, SpecialCasePart::Notes), "  ");

        apply_business_logic_form(&mut logic, &fields).unwrap();
        assert_eq!(logic.program_type, ProgramType::Online);
        assert_eq!(logic.core_rules[0].description, "Amounts must be positive");
        assert_eq!(logic.validations[0].error_handling.as_deref(), Some("Reject"));
        assert_eq!(logic.special_cases[0].notes, None);
    }

    #[test]
    fn test_rejected_edits_leave_record_unchanged() {
        let original = sample_logic();
        let mut logic = original.clone();
        let mut fields = build_business_logic_form(&logic);
        set(&mut fields, FieldPath::Rule(0, RulePart::Description), "changed");
        set(&mut fields, FieldPath::Rule(0, RulePart::Id), "   ");

        let err = apply_business_logic_form(&mut logic, &fields).unwrap_err();
        assert!(matches!(err, EditError::EmptyId { .. }));
        assert_eq!(logic, original);

        let mut fields = build_business_logic_form(&logic);
        set(&mut fields, FieldPath::ProgramName, "");
        assert_eq!(
            apply_business_logic_form(&mut logic, &fields),
            Err(EditError::EmptyProgramName)
        );
    }

    #[test]
    fn test_test_case_list_fields() {
        let mut script = sample_script();
        let mut fields = build_test_script_form(&script);
        let data = fields
            .iter()
            .find(|f| f.path == FieldPath::TestCase(0, TestCasePart::TestData))
            .unwrap();
        assert_eq!(data.value, "AMOUNT=10; DATE=2024-01-01");

        set(
            &mut fields,
            FieldPath::TestCase(0, TestCasePart::Prerequisites),
            "Region up;  ; Data loaded",
        );
        set(
            &mut fields,
            FieldPath::TestCase(0, TestCasePart::TestData),
            "DATE=2024-02-01; AMOUNT = 5; FLAG",
        );
        apply_test_script_form(&mut script, &fields).unwrap();

        let case = &script.test_cases[0];
        assert_eq!(case.prerequisites, vec!["Region up", "Data loaded"]);
        let keys: Vec<&str> = case.test_data.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["DATE", "AMOUNT", "FLAG"]);
        assert_eq!(case.test_data["AMOUNT"], "5");
        assert_eq!(case.test_data["FLAG"], "");
        // Untouched field keeps its embedded separator
        assert_eq!(case.steps[0], "Enter A; then B");
    }

    #[test]
    fn test_duplicate_test_ids_rejected() {
        let mut script = sample_script();
        add_test_case(&mut script);
        assert_eq!(script.test_cases[1].test_id, "X800DN-TC-002");

        let before = script.clone();
        let mut fields = build_test_script_form(&script);
        set(&mut fields, FieldPath::TestCase(1, TestCasePart::Id), "x800dn-tc-001");
        assert!(matches!(
            apply_test_script_form(&mut script, &fields),
            Err(EditError::DuplicateId { .. })
        ));
        assert_eq!(script, before);
    }

    #[test]
    fn test_add_and_remove_items() {
        let mut logic = sample_logic();
        add_item(&mut logic, ListKind::Rule);
        add_item(&mut logic, ListKind::Validation);
        assert_eq!(logic.core_rules[1].id, "RULE_1");
        assert_eq!(logic.validations.len(), 2);

        remove_item(&mut logic, ListKind::Rule, 0);
        remove_item(&mut logic, ListKind::Integration, 5);
        assert_eq!(logic.core_rules.len(), 1);
        assert_eq!(logic.integration_points.len(), 1);

        let mut script = sample_script();
        remove_test_case(&mut script, 0);
        assert!(script.test_cases.is_empty());
    }

    #[test]
    fn test_editing_is_char_safe() {
        let mut state =
            FormState::new(vec![FormField::new(FieldPath::ProgramName, "Name", "café")]);
        state.start_editing();
        assert_eq!(state.cursor_pos, 4);
        state.delete_char();
        state.insert_char('é');
        state.move_cursor_left();
        state.insert_char('-');
        assert_eq!(state.fields[0].value, "caf-é");
        assert!(state.is_modified());
    }

    #[test]
    fn test_cycle_choice() {
        let mut state = FormState::new(build_business_logic_form(&sample_logic()));
        state.move_down();
        state.cycle_choice();
        assert_eq!(state.fields[1].value, "Online");
        state.cycle_choice();
        assert_eq!(state.fields[1].value, "Batch");
    }

    #[test]
    fn test_scroll_follows_selection() {
        let mut state = FormState::new(build_business_logic_form(&sample_logic()));
        for _ in 0..10 {
            state.move_down();
        }
        state.scroll_to_selected(4);
        assert_eq!(state.scroll, 7);
        state.selected = 2;
        state.scroll_to_selected(4);
        assert_eq!(state.scroll, 2);
    }
}
