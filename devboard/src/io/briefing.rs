//! Briefing builder: project state plus behavioral instructions for the model.
//!
//! Building a briefing never fails. A section whose data cannot be loaded is
//! replaced by a short parenthetical note and the rest still renders.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use minijinja::{Environment, context};
use tracing::{debug, warn};

use crate::core::snapshot::{ProjectSnapshot, STAGNANT_AFTER_DAYS, recent_log};
use crate::io::log_store::read_log;
use crate::io::task_store::load_tasks;
use crate::io::workspace::Workspace;

const BRIEFING_TEMPLATE: &str = include_str!("prompts/briefing.md");

/// Days of work log included in the briefing.
pub const LOG_WINDOW_DAYS: u64 = 7;

pub const READ_ONLY_INSTRUCTIONS: &str = "\
You are the project assistant for this workspace.
You are in read-only mode: you may inspect tasks, logs and insights, nothing else.
Use list_tasks to see the task document, optionally filtered by status.
Use search_logs to find work-log entries by keyword and date range.
Use get_insights for status counts, urgent work and stagnant tasks.
Never claim to have created, edited or moved a task.
If the user asks for a change, explain what you would change and ask them
to rerun the request with write access enabled.
Refer to tasks by their #id and keep answers short and concrete.
Base every statement on tool results or the briefing above, not on guesses.";

pub const WRITE_INSTRUCTIONS: &str = "\
You are the project assistant for this workspace.
You are in write mode: you may inspect data and create or move tasks.
Use list_tasks, search_logs and get_insights to inspect the project.
Use add_task, add_subtask and move_task to change the task document.
Before creating more than one task, state your plan in one short list.
Never create a task that already exists; call list_tasks first when unsure.
Move a task to done only when the user says the work is finished.
Prefer subtasks over new tasks for steps of an existing task.
Refer to tasks by their #id and report every change you made.
Base every statement on tool results or the briefing above, not on guesses.";

/// Loaded (or degraded) sections of a briefing.
#[derive(Debug, Clone)]
struct BriefingSections {
    snapshot: Option<ProjectSnapshot>,
    board_note: Option<String>,
    recent_log: String,
}

/// Render the briefing for `project` as of `today`.
pub fn build_briefing(
    workspace: &Workspace,
    project: &str,
    today: NaiveDate,
    allow_write: bool,
) -> String {
    let sections = load_sections(workspace, project, today);
    let instructions = if allow_write {
        WRITE_INSTRUCTIONS
    } else {
        READ_ONLY_INSTRUCTIONS
    };

    match render_template(project, today, &sections, instructions) {
        Ok(rendered) => rendered,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "briefing template failed, using plain rendering");
            render_plain(project, today, &sections, instructions)
        }
    }
}

fn load_sections(workspace: &Workspace, project: &str, today: NaiveDate) -> BriefingSections {
    let paths = match workspace.existing_project(project) {
        Ok(paths) => paths,
        Err(err) => {
            return BriefingSections {
                snapshot: None,
                board_note: Some(format!("(task data unavailable: {err:#})")),
                recent_log: format!("(log unavailable: {err:#})"),
            };
        }
    };

    let (snapshot, board_note) = match load_tasks(&paths.tasks_path) {
        Ok(tasks) => (Some(ProjectSnapshot::build(&tasks, today)), None),
        Err(err) => {
            debug!(project, error = %format!("{err:#}"), "task board degraded");
            (None, Some(format!("(task data unavailable: {err:#})")))
        }
    };

    let recent_log = match read_log(&paths.log_path) {
        Ok(None) => "(no log file)".to_string(),
        Ok(Some(text)) => recent_log(&text, today, LOG_WINDOW_DAYS).unwrap_or_else(|| {
            format!("(no log entries in the last {LOG_WINDOW_DAYS} days)")
        }),
        Err(err) => format!("(log unavailable: {err:#})"),
    };

    BriefingSections {
        snapshot,
        board_note,
        recent_log,
    }
}

fn render_template(
    project: &str,
    today: NaiveDate,
    sections: &BriefingSections,
    instructions: &str,
) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("briefing", BRIEFING_TEMPLATE)
        .context("load briefing template")?;
    let template = env.get_template("briefing")?;
    let rendered = template
        .render(context! {
            today => today.format("%Y-%m-%d").to_string(),
            project => project,
            snapshot => &sections.snapshot,
            board_note => &sections.board_note,
            stagnant_days => STAGNANT_AFTER_DAYS,
            log_days => LOG_WINDOW_DAYS,
            recent_log => &sections.recent_log,
            instructions => instructions,
        })
        .context("render briefing template")?;
    Ok(rendered)
}

fn render_plain(
    project: &str,
    today: NaiveDate,
    sections: &BriefingSections,
    instructions: &str,
) -> String {
    let board = match (&sections.snapshot, &sections.board_note) {
        (_, Some(note)) => note.clone(),
        (Some(snapshot), None) => snapshot.render(),
        (None, None) => "(task data unavailable)".to_string(),
    };
    format!(
        "# Project briefing\n\nToday: {}\nProject: {project}\n\n## Task board\n{board}\n\n## Recent log (last {LOG_WINDOW_DAYS} days)\n{}\n\n## Instructions\n{instructions}",
        today.format("%Y-%m-%d"),
        sections.recent_log,
    )
}
