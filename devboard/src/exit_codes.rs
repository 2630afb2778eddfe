//! Stable exit codes for devboard CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid arguments, workspace layout, config or documents.
pub const INVALID: i32 = 1;
