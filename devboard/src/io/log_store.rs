//! Work-log document access.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use crate::core::worklog::{TaskEvent, append_entry};
use crate::io::write_atomic;

/// Subsection that write tools journal into.
pub const TASKS_SUBSECTION: &str = "Tasks";

/// Read the log document; `None` when the project has no log file.
pub fn read_log(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read log {}", path.display()))?;
    Ok(Some(contents))
}

/// Append a journal bullet with an event block under today's `### Tasks`.
pub fn record_task_event(
    path: &Path,
    today: NaiveDate,
    bullet: &str,
    event: &TaskEvent,
) -> Result<()> {
    let current = read_log(path)?.unwrap_or_default();
    let updated = append_entry(&current, today, TASKS_SUBSECTION, bullet, Some(event));
    write_atomic(path, &updated, "md.tmp")?;
    debug!(
        path = %path.display(),
        action = %event.action,
        task = event.task_id,
        "recorded task event"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_creates_log_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("LOG.md");
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");

        assert_eq!(read_log(&path).expect("read"), None);
        record_task_event(&path, today, "Added #1 Ship", &TaskEvent::new("add", 1))
            .expect("record");

        let log = read_log(&path).expect("read").expect("log exists");
        assert!(log.starts_with("## 2026-10-18\n\n### Tasks\n- Added #1 Ship\n<!-- TASK_EVENT"));
    }
}
