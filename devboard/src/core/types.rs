//! Task and subtask types shared by the codec, snapshot, and tools.
//!
//! These types carry no I/O and no clock. "Today" is always passed in by the
//! caller so every derived value stays deterministic in tests.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Priority assigned when a document or tool call does not name one.
pub const DEFAULT_PRIORITY: u8 = 2;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--.*?-->").expect("comment regex is valid"));

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Checkbox symbol used in task headers.
    pub fn symbol(self) -> char {
        match self {
            TaskStatus::Open => ' ',
            TaskStatus::InProgress => '~',
            TaskStatus::Done => 'x',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            ' ' => Some(TaskStatus::Open),
            '~' => Some(TaskStatus::InProgress),
            'x' => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!(
                "invalid status '{other}' (expected open, in_progress or done)"
            )),
        }
    }
}

/// Checklist item nested under a task, addressed by position only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    pub done: bool,
}

impl Subtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            done: false,
        }
    }
}

/// A uniquely identified unit of work.
///
/// Identity is the `id` alone: two tasks with the same id compare equal even
/// when their contents differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    /// Full free text. The first line is the title.
    pub description: String,
    pub status: TaskStatus,
    /// 1 = high, 3 = low.
    pub priority: u8,
    pub created: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Open,
            priority: DEFAULT_PRIORITY,
            created: None,
            tags: BTreeSet::new(),
            subtasks: Vec::new(),
        }
    }

    /// First description line with any `<!-- ... -->` markup removed.
    ///
    /// A line without comments is returned verbatim, surrounding spaces included.
    pub fn title(&self) -> String {
        let first = self.description.lines().next().unwrap_or("");
        if COMMENT_RE.is_match(first) {
            strip_comments(first)
        } else {
            first.to_string()
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Whole days between `created` and `today`; `None` without a creation date.
    pub fn days_since_created(&self, today: NaiveDate) -> Option<i64> {
        self.created.map(|created| (today - created).num_days())
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Remove HTML comments from a single line and normalize surrounding spaces.
pub fn strip_comments(line: &str) -> String {
    COMMENT_RE.replace_all(line, "").trim().to_string()
}

/// Next unused id: one past the highest id in the document.
pub fn next_task_id(tasks: &[Task]) -> u32 {
    tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_comment_markup() {
        let task = Task::new(1, "Ship it <!-- created: yesterday -->\nmore");
        assert_eq!(task.title(), "Ship it");
    }

    #[test]
    fn title_without_comments_keeps_spacing() {
        let task = Task::new(1, "Fix bug  \nmore");
        assert_eq!(task.title(), "Fix bug  ");
    }

    #[test]
    fn task_serializes_created_as_iso_date() {
        let mut task = Task::new(3, "Ship");
        task.created = NaiveDate::from_ymd_opt(2026, 10, 1);
        let value = serde_json::to_value(&task).expect("serialize");
        assert_eq!(value["created"], "2026-10-01");
        assert_eq!(value["status"], "open");
        let back: Task = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.created, task.created);
    }

    #[test]
    fn equality_is_by_id_only() {
        let a = Task::new(4, "one");
        let mut b = Task::new(4, "two");
        b.status = TaskStatus::Done;
        assert_eq!(a, b);
        assert_ne!(a, Task::new(5, "one"));
    }

    #[test]
    fn status_parses_common_spellings() {
        assert_eq!("in-progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(" DONE ".parse::<TaskStatus>(), Ok(TaskStatus::Done));
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn next_id_skips_past_highest() {
        let tasks = vec![Task::new(3, "a"), Task::new(7, "b"), Task::new(1, "c")];
        assert_eq!(next_task_id(&tasks), 8);
        assert_eq!(next_task_id(&[]), 1);
    }
}
