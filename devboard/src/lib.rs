//! Plain-text project board with a tool-using model assistant.
//!
//! Each project keeps two Markdown documents, a task list and a dated work
//! log. The crate is split the same way throughout:
//!
//! - **[`core`]**: Pure logic (document grammar, snapshots, wire types).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (workspace files, config, the
//!   HTTP model transport, the briefing renderer).
//!
//! [`tools`], [`agent`] and [`ask`] combine the two into the assistant loop
//! that the `devboard` binary exposes.

pub mod agent;
pub mod ask;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
