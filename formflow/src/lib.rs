//! Schema-driven form sessions with step-gated validation.
//!
//! - **[`core`]**: Pure, deterministic logic (rules, schemas, sessions).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Configuration, input files and recorder backends.
//!
//! [`fill`] coordinates core and I/O for the `formflow fill` command. The
//! `formflow-ui` crate drives the same sessions over HTTP.

pub mod core;
pub mod exit_codes;
pub mod fill;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
