//! Shared deterministic types for form sessions.
//!
//! These types are the contract between the core and presentation layers.
//! They serialize to stable JSON (ordered maps) so views and submissions are
//! reproducible across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current value of every field in a form, keyed by field name.
pub type FieldValues = BTreeMap<String, String>;

/// Validation messages keyed by field name. A missing key means valid.
pub type FieldErrors = BTreeMap<String, String>;

/// Synthetic error key used when the recorder rejects a submission.
pub const SUBMIT_ERROR_KEY: &str = "submit";

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Accepting edits and navigation.
    Editing,
    /// Recorder accepted the snapshot; the session is closed.
    Submitted,
}

/// Step position, values and last validation result of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    /// 1-indexed, bounded by the schema's step count.
    pub current_step: usize,
    pub fields: FieldValues,
    pub errors: FieldErrors,
}

/// Result of a forward navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Advance {
    /// Moved to `to`.
    Moved { to: usize },
    /// Current step has errors; stayed in place.
    Blocked,
    /// An earlier step no longer validates; moved back to it.
    Rewound { to: usize },
    /// Already on the last step (or submitted); nothing changed.
    Unchanged,
}

/// Result of a submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Recorder accepted the snapshot.
    Submitted { fields: FieldValues },
    /// At least one field failed validation.
    Rejected { errors: FieldErrors },
    /// Recorder returned an error; values are kept.
    Failed { message: String },
    /// Not on the last step; nothing happened.
    NotAtFinalStep { current_step: usize },
    /// Session was already submitted; nothing happened.
    AlreadySubmitted,
}
