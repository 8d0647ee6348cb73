//! Step-gated form sessions.
//!
//! A [`FormSession`] owns the values and errors of one form instance. It is
//! mutated only through [`update_field`](FormSession::update_field),
//! [`validate_field`](FormSession::validate_field),
//! [`advance`](FormSession::advance), [`retreat`](FormSession::retreat) and
//! [`submit`](FormSession::submit). Single-shot forms are one-step sessions.
//!
//! Validation failures never surface as `Err`: they land in the error map
//! for the presentation layer to render. `Err` is reserved for misuse such
//! as editing a field the schema does not declare.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::rules::{CheckContext, Rule};
use crate::core::schema::{FieldSpec, FormSchema};
use crate::core::types::{
    Advance, FieldErrors, FieldValues, Phase, SUBMIT_ERROR_KEY, SubmitOutcome, WizardState,
};

/// Message stored under the `submit` key when the recorder fails.
pub const DEFAULT_SUBMIT_FAILURE: &str = "Submission failed. Please try again.";

/// External collaborator that persists a submitted snapshot.
pub trait Recorder {
    fn record(&self, form_id: &str, fields: &FieldValues) -> anyhow::Result<()>;
}

/// Presentation-layer misuse of a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("form '{form}' has no field '{field}'")]
    UnknownField { form: String, field: String },
    #[error("form '{form}' was already submitted")]
    AlreadySubmitted { form: String },
}

/// Serializable snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub form: String,
    pub title: String,
    pub phase: Phase,
    pub current_step: usize,
    pub total_steps: usize,
    pub step_title: String,
    pub fields: FieldValues,
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

/// One live instance of a form schema.
#[derive(Debug, Clone)]
pub struct FormSession {
    schema: Arc<FormSchema>,
    state: WizardState,
    phase: Phase,
    submit_failure_message: String,
}

impl FormSession {
    /// Start on step 1 with every declared field set to the empty string.
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let fields = schema
            .fields()
            .map(|field| (field.name.clone(), String::new()))
            .collect();
        Self {
            schema,
            state: WizardState {
                current_step: 1,
                fields,
                errors: FieldErrors::new(),
            },
            phase: Phase::Editing,
            submit_failure_message: DEFAULT_SUBMIT_FAILURE.to_string(),
        }
    }

    pub fn with_submit_failure_message(mut self, message: impl Into<String>) -> Self {
        self.submit_failure_message = message.into();
        self
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.schema.total_steps()
    }

    pub fn fields(&self) -> &FieldValues {
        &self.state.fields
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.state.errors
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == Phase::Submitted
    }

    pub fn view(&self) -> SessionView {
        let step_title = self
            .schema
            .step(self.state.current_step)
            .map(|step| step.title.clone())
            .unwrap_or_default();
        SessionView {
            form: self.schema.id.clone(),
            title: self.schema.title.clone(),
            phase: self.phase,
            current_step: self.state.current_step,
            total_steps: self.total_steps(),
            step_title,
            fields: self.state.fields.clone(),
            errors: self.state.errors.clone(),
            success_message: self
                .is_submitted()
                .then(|| self.schema.success_message.clone())
                .flatten(),
        }
    }

    /// Store a value and clear that field's error without re-validating.
    ///
    /// Any pending submission failure is cleared as well: the user changed
    /// something and may retry.
    pub fn update_field(&mut self, name: &str, value: &str) -> Result<(), SessionError> {
        self.ensure_editing()?;
        let normalized = self.field_spec(name)?.normalize(value);
        self.state.fields.insert(name.to_string(), normalized);
        self.state.errors.remove(name);
        self.state.errors.remove(SUBMIT_ERROR_KEY);
        Ok(())
    }

    /// Re-validate a single field (blur), storing or clearing its error.
    ///
    /// Filled-in fields that must match `name` (a password confirmation)
    /// are re-checked too, so their error follows the new value.
    pub fn validate_field(&mut self, name: &str) -> Result<Option<String>, SessionError> {
        self.ensure_editing()?;
        let (error, dependents) = {
            let spec = self.field_spec(name)?;
            let ctx = CheckContext::now(Some(&self.state.fields));
            let dependents: Vec<(String, Option<String>)> = self
                .schema
                .fields()
                .filter(|field| {
                    matches!(field.rule(), Rule::MatchesField { field: target } if target == name)
                        && !self.value(&field.name).is_empty()
                })
                .map(|field| {
                    (
                        field.name.clone(),
                        field.check(self.value(&field.name), &ctx),
                    )
                })
                .collect();
            (spec.check(self.value(name), &ctx), dependents)
        };
        self.store_error(name, error.clone());
        for (dependent, dependent_error) in dependents {
            self.store_error(&dependent, dependent_error);
        }
        Ok(error)
    }

    /// Validate exactly the fields declared for `step` (1-indexed).
    ///
    /// Steps outside the schema declare no fields and yield an empty map.
    pub fn validate_step(&self, step: usize) -> FieldErrors {
        match self.schema.step(step) {
            Some(spec) => self.check_fields(spec.fields.iter()),
            None => FieldErrors::new(),
        }
    }

    /// Validate every field of every step.
    pub fn validate_all(&self) -> FieldErrors {
        self.check_fields(self.schema.fields())
    }

    /// Move forward if the current step validates.
    ///
    /// Earlier steps are re-checked too, since their fields can be edited
    /// after leaving them; the session rewinds to the first one that fails.
    pub fn advance(&mut self) -> Advance {
        if self.is_submitted() {
            return Advance::Unchanged;
        }

        let current = self.state.current_step;
        let errors = self.validate_step(current);
        if !errors.is_empty() {
            debug!(form = %self.schema.id, step = current, errors = errors.len(), "advance blocked");
            self.state.errors = errors;
            return Advance::Blocked;
        }

        for earlier in 1..current {
            let errors = self.validate_step(earlier);
            if !errors.is_empty() {
                debug!(form = %self.schema.id, from = current, to = earlier, "advance rewound");
                self.state.current_step = earlier;
                self.state.errors = errors;
                return Advance::Rewound { to: earlier };
            }
        }

        self.state.errors.clear();
        if current >= self.total_steps() {
            return Advance::Unchanged;
        }
        self.state.current_step = current + 1;
        debug!(form = %self.schema.id, step = self.state.current_step, "advanced");
        Advance::Moved {
            to: self.state.current_step,
        }
    }

    /// Step back without validating. Step 1 is the floor.
    pub fn retreat(&mut self) -> usize {
        if !self.is_submitted() && self.state.current_step > 1 {
            self.state.current_step -= 1;
        }
        self.state.current_step
    }

    /// Validate everything and hand the snapshot to `recorder`.
    ///
    /// Only acts on the last step while editing. The recorder is called at
    /// most once per successful submission; its failure is kept under the
    /// `submit` error key and all values are preserved.
    pub fn submit<R: Recorder + ?Sized>(&mut self, recorder: &R) -> SubmitOutcome {
        if self.is_submitted() {
            return SubmitOutcome::AlreadySubmitted;
        }
        if self.state.current_step != self.total_steps() {
            return SubmitOutcome::NotAtFinalStep {
                current_step: self.state.current_step,
            };
        }

        let errors = self.validate_all();
        if !errors.is_empty() {
            debug!(form = %self.schema.id, errors = errors.len(), "submit rejected");
            self.state.errors = errors.clone();
            return SubmitOutcome::Rejected { errors };
        }

        match recorder.record(&self.schema.id, &self.state.fields) {
            Ok(()) => {
                info!(form = %self.schema.id, fields = self.state.fields.len(), "form submitted");
                self.phase = Phase::Submitted;
                self.state.errors.clear();
                SubmitOutcome::Submitted {
                    fields: self.state.fields.clone(),
                }
            }
            Err(err) => {
                warn!(form = %self.schema.id, error = %format!("{err:#}"), "recorder failed");
                let message = self
                    .schema
                    .submit_failure_message
                    .clone()
                    .unwrap_or_else(|| self.submit_failure_message.clone());
                self.state.errors = FieldErrors::from([(
                    SUBMIT_ERROR_KEY.to_string(),
                    message.clone(),
                )]);
                SubmitOutcome::Failed { message }
            }
        }
    }

    /// Fresh session for the same form, ready for the next entry.
    pub fn reset(&self) -> FormSession {
        FormSession::new(Arc::clone(&self.schema))
            .with_submit_failure_message(self.submit_failure_message.clone())
    }

    fn ensure_editing(&self) -> Result<(), SessionError> {
        if self.is_submitted() {
            return Err(SessionError::AlreadySubmitted {
                form: self.schema.id.clone(),
            });
        }
        Ok(())
    }

    fn field_spec(&self, name: &str) -> Result<&FieldSpec, SessionError> {
        self.schema
            .field(name)
            .ok_or_else(|| SessionError::UnknownField {
                form: self.schema.id.clone(),
                field: name.to_string(),
            })
    }

    fn store_error(&mut self, name: &str, error: Option<String>) {
        match error {
            Some(message) => {
                self.state.errors.insert(name.to_string(), message);
            }
            None => {
                self.state.errors.remove(name);
            }
        }
    }

    fn value(&self, name: &str) -> &str {
        self.state
            .fields
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn check_fields<'a>(&self, fields: impl Iterator<Item = &'a FieldSpec>) -> FieldErrors {
        let ctx = CheckContext::now(Some(&self.state.fields));
        fields
            .filter_map(|field| {
                field
                    .check(self.value(&field.name), &ctx)
                    .map(|message| (field.name.clone(), message))
            })
            .collect()
    }
}
