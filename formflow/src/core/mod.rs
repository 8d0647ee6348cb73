//! Deterministic, pure form logic.
//!
//! Core modules do no I/O. Persistence is reached only through the
//! [`session::Recorder`] trait, implemented in [`crate::io`].

pub mod catalog;
pub mod rules;
pub mod schema;
pub mod session;
pub mod types;
