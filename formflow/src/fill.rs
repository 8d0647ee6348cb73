//! Orchestration for `formflow fill`: drive one session from a set of values.
//!
//! All values are applied up front, then the session is advanced step by
//! step and submitted, exactly as a user clicking "next" until "submit"
//! would.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::core::session::{FormSession, Recorder};
use crate::core::types::{Advance, FieldErrors, FieldValues, SubmitOutcome};
use crate::io::config::load_config;
use crate::io::input::load_values;
use crate::io::recorder::recorder_from_config;

/// Terminal result of filling a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// Recorder accepted the snapshot.
    Submitted {
        fields: FieldValues,
        success_message: Option<String>,
    },
    /// Validation stopped the session on `step`.
    Rejected { step: usize, errors: FieldErrors },
    /// Every field validated but the recorder failed.
    SubmitFailed { message: String },
}

/// Apply `values` to `session`, walk to the last step and submit.
///
/// Unknown field names are an error; validation failures are an outcome.
pub fn fill_session<R: Recorder + ?Sized>(
    session: &mut FormSession,
    values: &FieldValues,
    recorder: &R,
) -> Result<FillOutcome> {
    for (name, value) in values {
        session
            .update_field(name, value)
            .with_context(|| format!("apply input field '{name}'"))?;
    }

    loop {
        let step = session.current_step();
        match session.advance() {
            Advance::Moved { to } => debug!(from = step, to, "step passed"),
            Advance::Unchanged => break,
            Advance::Blocked | Advance::Rewound { .. } => {
                return Ok(FillOutcome::Rejected {
                    step: session.current_step(),
                    errors: session.errors().clone(),
                });
            }
        }
    }

    match session.submit(recorder) {
        SubmitOutcome::Submitted { fields } => Ok(FillOutcome::Submitted {
            fields,
            success_message: session.schema().success_message.clone(),
        }),
        SubmitOutcome::Rejected { errors } => Ok(FillOutcome::Rejected {
            step: session.current_step(),
            errors,
        }),
        SubmitOutcome::Failed { message } => Ok(FillOutcome::SubmitFailed { message }),
        SubmitOutcome::NotAtFinalStep { current_step } => {
            bail!("session stopped on step {current_step} before submit")
        }
        SubmitOutcome::AlreadySubmitted => bail!("session was already submitted"),
    }
}

/// Load config and input, then fill `form_id` with the configured recorder.
pub fn fill_from_files(config_path: &Path, form_id: &str, input_path: &Path) -> Result<FillOutcome> {
    let cfg = load_config(config_path)?;
    let catalog = cfg.catalog()?;
    let schema = catalog
        .get(form_id)
        .cloned()
        .ok_or_else(|| anyhow!("unknown form '{form_id}' (see `formflow forms`)"))?;
    let values = load_values(input_path)?;
    info!(form = form_id, fields = values.len(), "filling form");

    let mut session = FormSession::new(Arc::new(schema))
        .with_submit_failure_message(cfg.messages.submit_failure.clone());
    let recorder = recorder_from_config(&cfg.recorder);
    fill_session(&mut session, &values, recorder.as_ref())
}
