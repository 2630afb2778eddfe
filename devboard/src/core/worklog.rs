//! Work-log document grammar.
//!
//! ```text
//! ## 2026-10-14
//!
//! ### Tasks
//! - Moved #3 to done
//! <!-- TASK_EVENT
//! action: move
//! task: 3
//! -->
//! ```
//!
//! Metadata comments are opaque: every read path drops them, and a block that
//! is never closed swallows the rest of the document rather than leaking.

use chrono::{Days, NaiveDate};

/// One `## <date>` section with metadata removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSection {
    pub date: NaiveDate,
    /// The full header line, e.g. `## 2026-10-14 (release day)`.
    pub heading: String,
    pub lines: Vec<String>,
}

/// A log line matching a search keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHit {
    pub date: NaiveDate,
    pub subsection: Option<String>,
    pub line: String,
}

/// Machine-readable record of a document mutation, written as a comment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub action: String,
    pub task_id: u32,
    pub fields: Vec<(String, String)>,
}

impl TaskEvent {
    pub fn new(action: impl Into<String>, task_id: u32) -> Self {
        Self {
            action: action.into(),
            task_id,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    fn render(&self) -> Vec<String> {
        let mut lines = vec![
            "<!-- TASK_EVENT".to_string(),
            format!("action: {}", self.action),
            format!("task: {}", self.task_id),
        ];
        lines.extend(
            self.fields
                .iter()
                .map(|(key, value)| format!("{key}: {}", value.replace("-->", "- ->"))),
        );
        lines.push("-->".to_string());
        lines
    }
}

/// Parse all dated sections, dropping metadata blocks and undated content.
pub fn parse_log(text: &str) -> Vec<LogSection> {
    let mut sections = Vec::new();
    let mut current: Option<LogSection> = None;
    let mut in_metadata = false;

    for line in text.lines() {
        let Some(line) = visible_text(line, &mut in_metadata) else {
            continue;
        };
        let line = line.as_str();
        if let Some(rest) = line.strip_prefix("## ") {
            sections.extend(current.take().map(finish_section));
            current = parse_heading_date(rest).map(|date| LogSection {
                date,
                heading: line.trim_end().to_string(),
                lines: Vec::new(),
            });
            continue;
        }
        if let Some(section) = current.as_mut() {
            section.lines.push(line.trim_end().to_string());
        }
    }

    sections.extend(current.map(finish_section));
    sections
}

/// Sections dated on or after `today - days`, in document order.
pub fn window(text: &str, today: NaiveDate, days: u64) -> Vec<LogSection> {
    let cutoff = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
    parse_log(text)
        .into_iter()
        .filter(|section| section.date >= cutoff)
        .collect()
}

pub fn render_sections(sections: &[LogSection]) -> String {
    sections
        .iter()
        .map(|section| {
            if section.lines.is_empty() {
                section.heading.clone()
            } else {
                format!("{}\n{}", section.heading, section.lines.join("\n"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Case-insensitive keyword search over log content within an inclusive date range.
pub fn search(
    text: &str,
    keyword: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<LogHit> {
    let needle = keyword.to_lowercase();
    let mut hits = Vec::new();

    for section in parse_log(text) {
        if from.is_some_and(|from| section.date < from) || to.is_some_and(|to| section.date > to) {
            continue;
        }
        let mut subsection = None;
        for line in &section.lines {
            if let Some(label) = line.strip_prefix("### ") {
                subsection = Some(label.trim().to_string());
                continue;
            }
            if line.trim().is_empty() || !line.to_lowercase().contains(&needle) {
                continue;
            }
            hits.push(LogHit {
                date: section.date,
                subsection: subsection.clone(),
                line: line.trim().to_string(),
            });
        }
    }

    hits
}

/// Insert a bullet (and optional event block) under `## date` / `### subsection`.
///
/// Missing sections and subsections are created; the returned document always
/// ends with a newline.
pub fn append_entry(
    text: &str,
    date: NaiveDate,
    subsection: &str,
    bullet: &str,
    event: Option<&TaskEvent>,
) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut entry = vec![format!("- {bullet}")];
    if let Some(event) = event {
        entry.extend(event.render());
    }
    let subsection_heading = format!("### {subsection}");

    let section_start = lines.iter().position(|line| {
        line.strip_prefix("## ")
            .and_then(parse_heading_date)
            .is_some_and(|found| found == date)
    });

    match section_start {
        None => {
            if lines.last().is_some_and(|line| !line.trim().is_empty()) {
                lines.push(String::new());
            }
            lines.push(format!("## {}", date.format("%Y-%m-%d")));
            lines.push(String::new());
            lines.push(subsection_heading);
            lines.extend(entry);
        }
        Some(start) => {
            let section_end = next_heading(&lines, start + 1, lines.len(), "## ");
            let sub_start = (start + 1..section_end)
                .find(|&idx| lines[idx].trim_end() == subsection_heading);
            match sub_start {
                Some(sub_start) => {
                    let sub_end = next_heading(&lines, sub_start + 1, section_end, "### ");
                    let at = last_content_line(&lines, sub_start, sub_end) + 1;
                    lines.splice(at..at, entry);
                }
                None => {
                    let at = last_content_line(&lines, start, section_end) + 1;
                    let mut block = vec![String::new(), subsection_heading];
                    block.extend(entry);
                    lines.splice(at..at, block);
                }
            }
        }
    }

    let mut buf = lines.join("\n");
    buf.push('\n');
    buf
}

/// Drop comment spans from `line`, carrying an unclosed comment into the next
/// lines. `None` when a line touched by a comment has nothing else left.
fn visible_text(line: &str, in_metadata: &mut bool) -> Option<String> {
    let mut visible = String::new();
    let mut rest = line;
    let mut saw_comment = false;
    loop {
        if *in_metadata {
            saw_comment = true;
            let Some(end) = rest.find("-->") else {
                break;
            };
            *in_metadata = false;
            rest = &rest[end + "-->".len()..];
        } else {
            let Some(start) = rest.find("<!--") else {
                visible.push_str(rest);
                break;
            };
            visible.push_str(&rest[..start]);
            *in_metadata = true;
            rest = &rest[start + "<!--".len()..];
        }
    }
    if saw_comment && visible.trim().is_empty() {
        None
    } else {
        Some(visible)
    }
}

fn parse_heading_date(rest: &str) -> Option<NaiveDate> {
    let token = rest.split_whitespace().next()?;
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

fn finish_section(mut section: LogSection) -> LogSection {
    while section.lines.last().is_some_and(|line| line.trim().is_empty()) {
        section.lines.pop();
    }
    let leading = section
        .lines
        .iter()
        .take_while(|line| line.trim().is_empty())
        .count();
    section.lines.drain(..leading);
    section
}

fn next_heading(lines: &[String], from: usize, end: usize, prefix: &str) -> usize {
    (from..end)
        .find(|&idx| lines[idx].starts_with(prefix))
        .unwrap_or(end)
}

fn last_content_line(lines: &[String], start: usize, end: usize) -> usize {
    (start..end)
        .rev()
        .find(|&idx| !lines[idx].trim().is_empty())
        .unwrap_or(start)
}
