//! Task document load/save with grammar and invariant checks.
//!
//! Every call reads or rewrites the whole file; nothing is cached.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::codec::{parse_tasks, serialize_tasks};
use crate::core::invariants::validate_invariants;
use crate::core::types::Task;
use crate::io::write_atomic;

/// Load and validate a task document. A missing file is an empty project.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        debug!(path = %path.display(), "task document missing, treating as empty");
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read tasks {}", path.display()))?;
    let tasks =
        parse_tasks(&contents).with_context(|| format!("parse tasks {}", path.display()))?;
    validate_task_invariants(&tasks)?;
    debug!(path = %path.display(), count = tasks.len(), "tasks loaded");
    Ok(tasks)
}

/// Atomically rewrite the whole task document (temp file + rename).
pub fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    validate_task_invariants(tasks)?;
    let buf = serialize_tasks(tasks);
    write_atomic(path, &buf, "md.tmp")?;
    debug!(path = %path.display(), count = tasks.len(), "tasks written");
    Ok(())
}

fn validate_task_invariants(tasks: &[Task]) -> Result<()> {
    let errors = validate_invariants(tasks);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("task invariants failed: {}", errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TaskStatus;
    use crate::test_support::{task, task_with_status};

    /// Verifies write → load round-trip preserves the document.
    #[test]
    fn load_and_write_tasks_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("TASKS.md");
        let tasks = vec![
            task(1, "First"),
            task_with_status(2, "Second\nwith detail", TaskStatus::InProgress),
        ];

        write_tasks(&path, &tasks).expect("write");
        let loaded = load_tasks(&path).expect("load");

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].description, "Second\nwith detail");
        assert_eq!(loaded[1].status, TaskStatus::InProgress);
    }

    #[test]
    fn missing_document_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loaded = load_tasks(&temp.path().join("TASKS.md")).expect("load");
        assert!(loaded.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected_on_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("TASKS.md");
        fs::write(&path, "1. [ ] a\n\n1. [x] b\n").expect("write");
        let err = load_tasks(&path).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate task id 1"));
    }

    #[test]
    fn format_errors_carry_the_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("TASKS.md");
        fs::write(&path, "1. [!] nope\n").expect("write");
        let err = load_tasks(&path).unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("parse tasks"));
        assert!(rendered.contains("unknown status symbol '!'"));
    }
}
