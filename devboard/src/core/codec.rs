//! Task document parser and serializer.
//!
//! A task document is a sequence of blocks:
//!
//! ```text
//! 1. [ ] Fix bug <!-- priority:1 created:2026-10-01 tags:backend -->
//!     extra detail line
//!     - [ ] write test
//!     - [x] reproduce issue
//! ```
//!
//! The trailing metadata comment is optional and only written when a task has
//! a non-default priority, a creation date, or tags. Other comments in the
//! header survive parsing but are dropped on serialization, because the header
//! is rebuilt from [`Task::title`].
//!
//! A description line that would read back as a subtask (`- [ ] ...`) is
//! written with a leading `\`, Markdown's list-marker escape. Lines that already
//! start with backslashes before such a checkbox gain one more, so parsing
//! strips exactly one.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::core::types::{DEFAULT_PRIORITY, Subtask, Task, TaskStatus};

static HEADER_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\x20").expect("header start regex is valid"));
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.\x20\[(.)\](?:\x20(.*))?$").expect("header regex is valid")
});
static SUBTASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x20{4}- \[( |x)\] (.*)$").expect("subtask regex is valid"));
static METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)<!--(.*?)-->\s*$").expect("metadata regex is valid"));
static ESCAPED_CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\*- \[[ x]\] ").expect("checkbox regex is valid"));

const INDENT: &str = "    ";

/// Malformed task document content. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("line {line}: malformed task header '{text}'")]
    MalformedHeader { line: usize, text: String },
    #[error("line {line}: unknown status symbol '{symbol}' (expected ' ', '~' or 'x')")]
    UnknownStatus { line: usize, symbol: char },
    #[error("line {line}: task id must be a positive integer")]
    InvalidId { line: usize },
    #[error("line {line}: subtask has no preceding task")]
    OrphanSubtask { line: usize },
    #[error("line {line}: invalid {key} '{value}' in metadata comment")]
    InvalidMetadata {
        line: usize,
        key: String,
        value: String,
    },
}

/// Attributes carried by a header's trailing metadata comment.
#[derive(Debug, Default)]
struct HeaderMetadata {
    priority: Option<u8>,
    created: Option<NaiveDate>,
    tags: BTreeSet<String>,
}

/// Parse a whole task document into tasks, in document order.
pub fn parse_tasks(text: &str) -> Result<Vec<Task>, FormatError> {
    let mut tasks = Vec::new();
    let mut current: Option<Task> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(task) = parse_header(line, line_no)? {
            tasks.extend(current.replace(task));
            continue;
        }

        let Some(task) = current.as_mut() else {
            if SUBTASK_RE.is_match(line) {
                return Err(FormatError::OrphanSubtask { line: line_no });
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                debug!(line = line_no, "skipping text outside a task block");
            }
            continue;
        };

        if let Some(caps) = SUBTASK_RE.captures(line) {
            task.subtasks.push(Subtask {
                title: caps[2].to_string(),
                done: &caps[1] == "x",
            });
        } else if let Some(rest) = line.strip_prefix(INDENT) {
            push_description_line(task, unescape_description_line(rest));
        } else if line.trim().is_empty() {
            tasks.extend(current.take());
        } else {
            // Hand-written documents are not always indented.
            push_description_line(task, line.trim());
        }
    }

    tasks.extend(current);
    Ok(tasks)
}

/// Render one task block. Lines are joined by `\n` with no trailing newline.
pub fn serialize_task(task: &Task) -> String {
    let mut header = format!("{}. [{}] {}", task.id, task.status.symbol(), task.title());
    if let Some(metadata) = render_metadata(task) {
        header.push_str(" <!-- ");
        header.push_str(&metadata);
        header.push_str(" -->");
    }

    let mut lines = vec![header];
    lines.extend(
        task.description
            .split('\n')
            .skip(1)
            .map(|line| format!("{INDENT}{}", escape_description_line(line))),
    );
    lines.extend(task.subtasks.iter().map(|subtask| {
        let mark = if subtask.done { 'x' } else { ' ' };
        format!("{INDENT}- [{mark}] {}", subtask.title)
    }));
    lines.join("\n")
}

/// Render a whole document: blocks separated by a blank line, newline-terminated.
pub fn serialize_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return String::new();
    }
    let mut buf = tasks
        .iter()
        .map(serialize_task)
        .collect::<Vec<_>>()
        .join("\n\n");
    buf.push('\n');
    buf
}

fn parse_header(line: &str, line_no: usize) -> Result<Option<Task>, FormatError> {
    if !HEADER_START_RE.is_match(line) {
        return Ok(None);
    }
    let caps = HEADER_RE
        .captures(line)
        .ok_or_else(|| FormatError::MalformedHeader {
            line: line_no,
            text: line.to_string(),
        })?;

    let id: u32 = caps[1]
        .parse()
        .map_err(|_| FormatError::InvalidId { line: line_no })?;
    if id == 0 {
        return Err(FormatError::InvalidId { line: line_no });
    }

    let symbol = caps[2].chars().next().unwrap_or_default();
    let status = TaskStatus::from_symbol(symbol).ok_or(FormatError::UnknownStatus {
        line: line_no,
        symbol,
    })?;

    let text = caps.get(3).map_or("", |m| m.as_str());
    let (text, metadata) = split_metadata(text, line_no)?;

    let mut task = Task::new(id, text);
    task.status = status;
    if let Some(metadata) = metadata {
        task.priority = metadata.priority.unwrap_or(DEFAULT_PRIORITY);
        task.created = metadata.created;
        task.tags = metadata.tags;
    }
    Ok(Some(task))
}

fn escape_description_line(line: &str) -> String {
    if ESCAPED_CHECKBOX_RE.is_match(line) {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}

fn unescape_description_line(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if ESCAPED_CHECKBOX_RE.is_match(line) => rest,
        _ => line,
    }
}

fn push_description_line(task: &mut Task, line: &str) {
    task.description.push('\n');
    task.description.push_str(line);
}

/// Split a trailing metadata comment off header text.
///
/// A trailing comment counts as metadata only when every token is a
/// `key:value` pair with a known key; otherwise the text is returned as is.
fn split_metadata(
    text: &str,
    line_no: usize,
) -> Result<(&str, Option<HeaderMetadata>), FormatError> {
    let Some(caps) = METADATA_RE.captures(text) else {
        return Ok((text, None));
    };
    let inner = caps.get(2).map_or("", |m| m.as_str()).trim();
    let pairs: Option<Vec<(&str, &str)>> = inner
        .split_whitespace()
        .map(|token| {
            token
                .split_once(':')
                .filter(|(key, _)| matches!(*key, "priority" | "created" | "tags"))
        })
        .collect();
    let pairs = match pairs {
        Some(pairs) if !pairs.is_empty() => pairs,
        _ => return Ok((text, None)),
    };

    let mut metadata = HeaderMetadata::default();
    for (key, value) in pairs {
        let invalid = || FormatError::InvalidMetadata {
            line: line_no,
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "priority" => {
                let priority: u8 = value.parse().map_err(|_| invalid())?;
                if !(1..=3).contains(&priority) {
                    return Err(invalid());
                }
                metadata.priority = Some(priority);
            }
            "created" => {
                let created =
                    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
                metadata.created = Some(created);
            }
            _ => {
                metadata.tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
    }

    let prefix = caps.get(1).map_or("", |m| m.as_str());
    Ok((prefix.strip_suffix(' ').unwrap_or(prefix), Some(metadata)))
}

fn render_metadata(task: &Task) -> Option<String> {
    let mut parts = Vec::new();
    if task.priority != DEFAULT_PRIORITY {
        parts.push(format!("priority:{}", task.priority));
    }
    if let Some(created) = task.created {
        parts.push(format!("created:{}", created.format("%Y-%m-%d")));
    }
    if !task.tags.is_empty() {
        let tags = task.tags.iter().cloned().collect::<Vec<_>>().join(",");
        parts.push(format!("tags:{tags}"));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}
