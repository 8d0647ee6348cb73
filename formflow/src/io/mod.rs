//! I/O helpers: configuration, input files and recorder backends.

pub mod config;
pub mod input;
pub mod recorder;
