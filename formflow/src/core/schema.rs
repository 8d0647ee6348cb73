//! Form schemas: steps, fields and the rules attached to them.
//!
//! A schema is pure data. Single-shot registration forms are one-step
//! schemas; wizards declare several steps. Schemas deserialize from the
//! `[[forms]]` tables of the config file.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::rules::{CheckContext, Rule};
use crate::core::types::SUBMIT_ERROR_KEY;

/// Input normalization applied when a value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Uppercase,
}

impl Transform {
    pub fn apply(self, value: &str) -> String {
        match self {
            Transform::Uppercase => value.to_uppercase(),
        }
    }
}

/// One input of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Blank values fail with "{label} is required" before the rule runs.
    /// When false the rule alone decides, including for blank values.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Falls back to [`Rule::for_field`] when absent.
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            required: true,
            rule: None,
            transform: None,
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn uppercase(mut self) -> Self {
        self.transform = Some(Transform::Uppercase);
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn rule(&self) -> Rule {
        self.rule
            .clone()
            .unwrap_or_else(|| Rule::for_field(&self.name))
    }

    /// Validate a value for this field. `None` means valid.
    pub fn check(&self, value: &str, ctx: &CheckContext<'_>) -> Option<String> {
        if self.required && value.trim().is_empty() {
            return Some(format!("{} is required", self.label()));
        }
        self.rule().check(value, ctx)
    }

    /// Normalize raw input before it is stored.
    pub fn normalize(&self, value: &str) -> String {
        match self.transform {
            Some(transform) => transform.apply(value),
            None => value.to_string(),
        }
    }
}

/// A group of fields validated and advanced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

/// Declaration of a form: ordered steps of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    /// Shown by presentation layers after a successful submission.
    #[serde(default)]
    pub success_message: Option<String>,
    /// Replaces the configured submit-failure message for this form.
    #[serde(default)]
    pub submit_failure_message: Option<String>,
    pub steps: Vec<StepSpec>,
}

impl FormSchema {
    /// One-step schema whose only step shares the form title.
    pub fn single(id: &str, title: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            success_message: None,
            submit_failure_message: None,
            steps: vec![StepSpec {
                title: title.to_string(),
                fields,
            }],
        }
    }

    pub fn with_success_message(mut self, message: &str) -> Self {
        self.success_message = Some(message.to_string());
        self
    }

    pub fn with_submit_failure_message(mut self, message: &str) -> Self {
        self.submit_failure_message = Some(message.to_string());
        self
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step by 1-indexed position.
    pub fn step(&self, step: usize) -> Option<&StepSpec> {
        step.checked_sub(1).and_then(|idx| self.steps.get(idx))
    }

    /// All fields across all steps, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().find(|field| field.name == name)
    }

    /// 1-indexed step that declares `name`.
    pub fn step_of(&self, name: &str) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.fields.iter().any(|field| field.name == name))
            .map(|idx| idx + 1)
    }
}

/// Check structural invariants of one schema:
/// - at least one step, each with at least one field
/// - field names unique within the form
/// - no field shadows the synthetic submit error key
/// - `matches_field` targets exist
pub fn validate_schema(schema: &FormSchema) -> Vec<String> {
    let mut errors = Vec::new();
    let id = schema.id.as_str();

    if id.trim().is_empty() {
        errors.push("form id must not be empty".to_string());
    }
    if schema.steps.is_empty() {
        errors.push(format!("{id}: form must declare at least one step"));
    }

    let mut seen = HashSet::new();
    for (idx, step) in schema.steps.iter().enumerate() {
        if step.fields.is_empty() {
            errors.push(format!("{id}: step {} declares no fields", idx + 1));
        }
        for field in &step.fields {
            if !seen.insert(field.name.as_str()) {
                errors.push(format!("{id}: duplicate field '{}'", field.name));
            }
            if field.name == SUBMIT_ERROR_KEY {
                errors.push(format!("{id}: field name '{SUBMIT_ERROR_KEY}' is reserved"));
            }
        }
    }

    for field in schema.fields() {
        if let Rule::MatchesField { field: target } = field.rule()
            && schema.field(&target).is_none()
        {
            errors.push(format!(
                "{id}: field '{}' must match unknown field '{target}'",
                field.name
            ));
        }
    }

    errors
}

/// Check every schema plus cross-schema invariants (unique form ids).
pub fn validate_schemas(schemas: &[FormSchema]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for schema in schemas {
        if !seen.insert(schema.id.as_str()) {
            errors.push(format!("duplicate form id '{}'", schema.id));
        }
        errors.extend(validate_schema(schema));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CheckContext<'static> {
        CheckContext {
            fields: None,
            current_year: 2026,
        }
    }

    #[test]
    fn required_field_reports_label_before_rule() {
        let field = FieldSpec::new("email", "Email");
        assert_eq!(field.check("", &ctx()), Some("Email is required".to_string()));
        assert_eq!(
            field.check("nope", &ctx()),
            Some("Invalid email format".to_string())
        );
        assert_eq!(field.check("a@b.co", &ctx()), None);
    }

    #[test]
    fn optional_field_defers_to_rule() {
        let field = FieldSpec::new("confirmPassword", "Confirm Password").optional();
        assert_eq!(
            field.check("", &ctx()),
            Some("Please confirm your password".to_string())
        );
    }

    #[test]
    fn uppercase_transform_normalizes_input() {
        let field = FieldSpec::new("moduleCode", "Module Code").uppercase();
        assert_eq!(field.normalize("cs101"), "CS101");
        assert_eq!(FieldSpec::new("name", "Name").normalize("cs"), "cs");
    }

    #[test]
    fn step_lookup_is_one_indexed() {
        let schema = FormSchema {
            id: "wizard".to_string(),
            title: "Wizard".to_string(),
            success_message: None,
            submit_failure_message: None,
            steps: vec![
                StepSpec {
                    title: "One".to_string(),
                    fields: vec![FieldSpec::new("a", "A")],
                },
                StepSpec {
                    title: "Two".to_string(),
                    fields: vec![FieldSpec::new("b", "B")],
                },
            ],
        };
        assert!(schema.step(0).is_none());
        assert_eq!(schema.step(2).map(|s| s.title.as_str()), Some("Two"));
        assert!(schema.step(3).is_none());
        assert_eq!(schema.step_of("b"), Some(2));
        assert_eq!(schema.step_of("zzz"), None);
    }

    #[test]
    fn validate_schema_reports_structural_errors() {
        let schema = FormSchema {
            id: "bad".to_string(),
            title: "Bad".to_string(),
            success_message: None,
            submit_failure_message: None,
            steps: vec![
                StepSpec {
                    title: "One".to_string(),
                    fields: vec![
                        FieldSpec::new("a", "A"),
                        FieldSpec::new("a", "A again"),
                        FieldSpec::new("submit", "Submit"),
                        FieldSpec::new("confirm", "Confirm").with_rule(Rule::MatchesField {
                            field: "missing".to_string(),
                        }),
                    ],
                },
                StepSpec {
                    title: "Empty".to_string(),
                    fields: Vec::new(),
                },
            ],
        };

        let errors = validate_schema(&schema);
        assert!(errors.iter().any(|e| e.contains("duplicate field 'a'")));
        assert!(errors.iter().any(|e| e.contains("'submit' is reserved")));
        assert!(errors.iter().any(|e| e.contains("unknown field 'missing'")));
        assert!(errors.iter().any(|e| e.contains("step 2 declares no fields")));
    }

    #[test]
    fn validate_schemas_rejects_duplicate_ids() {
        let form = FormSchema::single("a", "A", vec![FieldSpec::new("x", "X")]);
        let errors = validate_schemas(&[form.clone(), form]);
        assert_eq!(errors, vec!["duplicate form id 'a'".to_string()]);
    }

    #[test]
    fn schema_deserializes_from_toml() {
        let raw = r#"
id = "event"
title = "Event Registration"

[[steps]]
title = "Details"

[[steps.fields]]
name = "email"
label = "Email"

[[steps.fields]]
name = "code"
rule = { type = "module_code" }
transform = "uppercase"
"#;
        let schema: FormSchema = toml::from_str(raw).expect("parse schema");
        assert_eq!(schema.total_steps(), 1);
        let code = schema.field("code").expect("code field");
        assert_eq!(code.rule(), Rule::ModuleCode);
        assert_eq!(code.transform, Some(Transform::Uppercase));
        assert!(code.required);
        assert_eq!(code.label(), "code");
        assert!(validate_schema(&schema).is_empty());
    }
}
