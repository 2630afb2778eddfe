//! Document-level invariants the block grammar cannot express.

use std::collections::HashSet;

use crate::core::types::Task;

/// Check invariants across a parsed task document:
/// - Ids are positive and unique
/// - Priority within 1..=3
pub fn validate_invariants(tasks: &[Task]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for task in tasks {
        if task.id == 0 {
            errors.push("task id 0 is not allowed".to_string());
        }
        if !seen.insert(task.id) {
            errors.push(format!("duplicate task id {}", task.id));
        }
        if !(1..=3).contains(&task.priority) {
            errors.push(format!(
                "task {}: priority {} must be 1, 2 or 3",
                task.id, task.priority
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::task;

    #[test]
    fn reports_duplicate_ids_and_bad_priority() {
        let mut bad = task(2, "bad");
        bad.priority = 0;
        let errors = validate_invariants(&[task(1, "a"), task(1, "b"), bad]);
        assert_eq!(
            errors,
            vec![
                "duplicate task id 1".to_string(),
                "task 2: priority 0 must be 1, 2 or 3".to_string(),
            ]
        );
    }

    #[test]
    fn zero_id_is_rejected() {
        let errors = validate_invariants(&[task(0, "zero")]);
        assert_eq!(errors, vec!["task id 0 is not allowed".to_string()]);
    }
}
