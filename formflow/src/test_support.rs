//! Test-only helpers: fixture sessions and scripted recorders.

use std::cell::RefCell;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::core::catalog::FormCatalog;
use crate::core::session::{FormSession, Recorder};
use crate::core::types::FieldValues;

/// Recorder that keeps every submission in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: RefCell<Vec<(String, FieldValues)>>,
}

impl MemoryRecorder {
    pub fn records(&self) -> Vec<(String, FieldValues)> {
        self.records.borrow().clone()
    }
}

impl Recorder for MemoryRecorder {
    fn record(&self, form_id: &str, fields: &FieldValues) -> Result<()> {
        self.records
            .borrow_mut()
            .push((form_id.to_string(), fields.clone()));
        Ok(())
    }
}

/// Recorder that always fails, standing in for an unreachable backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRecorder;

impl Recorder for FailingRecorder {
    fn record(&self, form_id: &str, _fields: &FieldValues) -> Result<()> {
        Err(anyhow!("backend unavailable for {form_id}"))
    }
}

/// Fresh session of the built-in three-step checkout form.
pub fn checkout_session() -> FormSession {
    let schema = FormCatalog::builtin()
        .get("checkout")
        .cloned()
        .expect("checkout form is built in");
    FormSession::new(Arc::new(schema))
}

/// Valid values for one step of the checkout form.
pub fn valid_checkout_step(step: usize) -> &'static [(&'static str, &'static str)] {
    match step {
        1 => &[
            ("firstName", "Ada"),
            ("lastName", "Lovelace"),
            ("email", "ada@example.com"),
        ],
        2 => &[
            ("street", "1 Main St"),
            ("city", "Springfield"),
            ("state", "IL"),
            ("zipCode", "62701"),
        ],
        3 => &[
            ("cardNumber", "4111111111111111"),
            ("expiryDate", "12/30"),
            ("cvv", "123"),
        ],
        _ => &[],
    }
}

/// Apply `values` with `update_field`, panicking on unknown fields.
pub fn fill(session: &mut FormSession, values: &[(&str, &str)]) {
    for (name, value) in values {
        session
            .update_field(name, value)
            .unwrap_or_else(|err| panic!("fill {name}: {err}"));
    }
}
