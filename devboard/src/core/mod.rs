//! Deterministic, pure logic shared by devboard.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! documents and take "today" as an argument so results are reproducible.

pub mod codec;
pub mod invariants;
pub mod messages;
pub mod snapshot;
pub mod types;
pub mod worklog;
