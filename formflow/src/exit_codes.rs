//! Stable exit codes for formflow CLI commands.

/// Command succeeded, value accepted or form submitted.
pub const OK: i32 = 0;
/// Usage, config or I/O error.
pub const INVALID: i32 = 1;
/// Validation rejected the value or form.
pub const REJECTED: i32 = 2;
/// Form validated but the recorder failed.
pub const SUBMIT_FAILED: i32 = 3;
