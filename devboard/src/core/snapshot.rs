//! Read-only project summary derived from a parsed task document.

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::types::{Task, TaskStatus};
use crate::core::worklog::{render_sections, window};

/// A non-done task is stagnant once strictly more than this many days old.
pub const STAGNANT_AFTER_DAYS: i64 = 7;

/// Compact view of a task for summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDigest {
    pub id: u32,
    pub status: TaskStatus,
    pub priority: u8,
    pub title: String,
}

impl TaskDigest {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            status: task.status,
            priority: task.priority,
            title: task.title(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagnantTask {
    #[serde(flatten)]
    pub task: TaskDigest,
    pub days_idle: i64,
}

/// Status counts plus the high-priority and stagnant subsets, both in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSnapshot {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub done: usize,
    pub high_priority: Vec<TaskDigest>,
    pub stagnant: Vec<StagnantTask>,
}

impl ProjectSnapshot {
    pub fn build(tasks: &[Task], today: NaiveDate) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        let high_priority = tasks
            .iter()
            .filter(|task| !task.is_done() && task.priority == 1)
            .map(TaskDigest::from_task)
            .collect();

        let stagnant = tasks
            .iter()
            .filter(|task| !task.is_done())
            .filter_map(|task| {
                let days_idle = task.days_since_created(today)?;
                (days_idle > STAGNANT_AFTER_DAYS).then(|| StagnantTask {
                    task: TaskDigest::from_task(task),
                    days_idle,
                })
            })
            .collect();

        Self {
            total: tasks.len(),
            open: count(TaskStatus::Open),
            in_progress: count(TaskStatus::InProgress),
            done: count(TaskStatus::Done),
            high_priority,
            stagnant,
        }
    }

    /// Plain-text rendering used by the insights tool and the briefing fallback.
    pub fn render(&self) -> String {
        let mut buf = format!(
            "Tasks: {} total, {} open, {} in progress, {} done",
            self.total, self.open, self.in_progress, self.done
        );
        buf.push_str("\nHigh priority (not done):");
        if self.high_priority.is_empty() {
            buf.push_str(" none");
        }
        for task in &self.high_priority {
            buf.push_str(&format!("\n- #{} [{}] {}", task.id, task.status, task.title));
        }
        buf.push_str(&format!(
            "\nStagnant (open more than {STAGNANT_AFTER_DAYS} days):"
        ));
        if self.stagnant.is_empty() {
            buf.push_str(" none");
        }
        for entry in &self.stagnant {
            buf.push_str(&format!(
                "\n- #{} (P{}) {} - idle {} days",
                entry.task.id, entry.task.priority, entry.task.title, entry.days_idle
            ));
        }
        buf
    }
}

/// Rendered log sections from the last `days` days, or `None` when there are none.
pub fn recent_log(text: &str, today: NaiveDate, days: u64) -> Option<String> {
    let sections = window(text, today, days);
    if sections.is_empty() {
        return None;
    }
    Some(render_sections(&sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dated_task, task_with_status};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date")
    }

    #[test]
    fn stagnation_is_strictly_more_than_seven_days() {
        let tasks = vec![
            dated_task(1, "exactly seven", today(), 7),
            dated_task(2, "eight days", today(), 8),
        ];
        let snapshot = ProjectSnapshot::build(&tasks, today());
        let ids: Vec<u32> = snapshot.stagnant.iter().map(|s| s.task.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(snapshot.stagnant[0].days_idle, 8);
    }

    #[test]
    fn counts_and_high_priority_skip_done_tasks() {
        let mut urgent = task_with_status(1, "urgent", TaskStatus::InProgress);
        urgent.priority = 1;
        let mut finished = task_with_status(2, "finished", TaskStatus::Done);
        finished.priority = 1;
        let mut old_done = dated_task(3, "old but done", today(), 30);
        old_done.status = TaskStatus::Done;
        let tasks = vec![urgent, finished, old_done, task_with_status(4, "open", TaskStatus::Open)];

        let snapshot = ProjectSnapshot::build(&tasks, today());
        assert_eq!(
            (snapshot.total, snapshot.open, snapshot.in_progress, snapshot.done),
            (4, 1, 1, 2)
        );
        assert_eq!(snapshot.high_priority.len(), 1);
        assert_eq!(snapshot.high_priority[0].id, 1);
        assert!(snapshot.stagnant.is_empty());
    }

    #[test]
    fn render_lists_each_subset() {
        let mut urgent = dated_task(5, "Fix login", today(), 10);
        urgent.priority = 1;
        let rendered = ProjectSnapshot::build(&[urgent], today()).render();
        assert!(rendered.contains("- #5 [open] Fix login"));
        assert!(rendered.contains("- #5 (P1) Fix login - idle 10 days"));
    }

    #[test]
    fn recent_log_is_none_without_sections_in_window() {
        let log = "## 2026-01-01\n- ancient\n";
        assert_eq!(recent_log(log, today(), 7), None);
        assert_eq!(
            recent_log("## 2026-10-17\n- fresh\n", today(), 7).as_deref(),
            Some("## 2026-10-17\n- fresh")
        );
    }
}
