//! Tools the model may call against a project.
//!
//! The set is fixed: three read tools are always available, the three write
//! tools only when the caller opts into write mode. Every tool validates its
//! JSON arguments against the declared schema before running, and execution
//! never fails outward; errors come back as result text so the model can
//! correct itself on the next turn.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use jsonschema::validator_for;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::core::codec::serialize_task;
use crate::core::messages::ToolDeclaration;
use crate::core::snapshot::ProjectSnapshot;
use crate::core::types::{DEFAULT_PRIORITY, Subtask, Task, TaskStatus, next_task_id};
use crate::core::worklog::{TaskEvent, search};
use crate::io::events::{DocumentEvent, EventBus};
use crate::io::log_store::{read_log, record_task_event};
use crate::io::task_store::{load_tasks, write_tasks};
use crate::io::workspace::{ProjectPaths, Workspace};

/// Prefix of every failed tool result.
pub const ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListTasks,
    SearchLogs,
    GetInsights,
    AddTask,
    AddSubtask,
    MoveTask,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::ListTasks,
        ToolKind::SearchLogs,
        ToolKind::GetInsights,
        ToolKind::AddTask,
        ToolKind::AddSubtask,
        ToolKind::MoveTask,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListTasks => "list_tasks",
            ToolKind::SearchLogs => "search_logs",
            ToolKind::GetInsights => "get_insights",
            ToolKind::AddTask => "add_task",
            ToolKind::AddSubtask => "add_subtask",
            ToolKind::MoveTask => "move_task",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn is_write(self) -> bool {
        matches!(
            self,
            ToolKind::AddTask | ToolKind::AddSubtask | ToolKind::MoveTask
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::ListTasks => {
                "List the project's tasks with status, priority, description and subtasks. \
                 Optionally filter by status."
            }
            ToolKind::SearchLogs => {
                "Search the project's work log for a keyword (case-insensitive), \
                 optionally limited to an inclusive YYYY-MM-DD date range."
            }
            ToolKind::GetInsights => {
                "Summarize the task board: status counts, open high-priority tasks \
                 and tasks that have been open for more than a week."
            }
            ToolKind::AddTask => {
                "Create a new open task. Priority is 1 (high), 2 (normal, default) or 3 (low)."
            }
            ToolKind::AddSubtask => "Append a subtask to an existing task.",
            ToolKind::MoveTask => "Change a task's status to open, in_progress or done.",
        }
    }

    pub fn input_schema(self) -> Value {
        let status = json!({
            "type": "string",
            "enum": ["open", "in_progress", "done"]
        });
        match self {
            ToolKind::ListTasks => json!({
                "type": "object",
                "properties": { "status": status }
            }),
            ToolKind::SearchLogs => json!({
                "type": "object",
                "properties": {
                    "keyword": { "type": "string", "minLength": 1 },
                    "from": { "type": "string", "description": "YYYY-MM-DD" },
                    "to": { "type": "string", "description": "YYYY-MM-DD" }
                },
                "required": ["keyword"]
            }),
            ToolKind::GetInsights => json!({
                "type": "object",
                "properties": {}
            }),
            ToolKind::AddTask => json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "minLength": 1 },
                    "priority": { "type": "integer", "minimum": 1, "maximum": 3 },
                    "tags": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["title"]
            }),
            ToolKind::AddSubtask => json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "integer", "minimum": 1 },
                    "title": { "type": "string", "minLength": 1 }
                },
                "required": ["task_id", "title"]
            }),
            ToolKind::MoveTask => json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "integer", "minimum": 1 },
                    "status": status
                },
                "required": ["task_id", "status"]
            }),
        }
    }

    pub fn declaration(self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Run the tool. Failures are returned as `Error: <reason>` text.
    pub fn execute(self, ctx: &ToolContext<'_>, args: &Value) -> String {
        match self.try_execute(ctx, args) {
            Ok(text) => text,
            Err(err) => {
                debug!(tool = self.name(), error = %format!("{err:#}"), "tool failed");
                format!("{ERROR_PREFIX}{err:#}")
            }
        }
    }

    fn try_execute(self, ctx: &ToolContext<'_>, args: &Value) -> Result<String> {
        validate_args(&self.input_schema(), args)?;
        match self {
            ToolKind::ListTasks => list_tasks(ctx, parse_args(args)?),
            ToolKind::SearchLogs => search_logs(ctx, parse_args(args)?),
            ToolKind::GetInsights => get_insights(ctx),
            ToolKind::AddTask => add_task(ctx, parse_args(args)?),
            ToolKind::AddSubtask => add_subtask(ctx, parse_args(args)?),
            ToolKind::MoveTask => move_task(ctx, parse_args(args)?),
        }
    }
}

/// The tools offered to the model for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: Vec<ToolKind>,
}

impl ToolRegistry {
    pub fn new(allow_write: bool) -> Self {
        let tools = ToolKind::ALL
            .into_iter()
            .filter(|kind| allow_write || !kind.is_write())
            .collect();
        Self { tools }
    }

    /// Registered tool with this name; write tools are absent in read-only mode.
    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        self.tools.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn tools(&self) -> &[ToolKind] {
        &self.tools
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|kind| kind.declaration()).collect()
    }
}

/// Everything a tool needs, passed explicitly on every call.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub workspace: &'a Workspace,
    pub project: &'a str,
    pub today: NaiveDate,
    pub events: Option<&'a EventBus>,
}

impl ToolContext<'_> {
    fn paths(&self) -> Result<ProjectPaths> {
        self.workspace.existing_project(self.project)
    }

    fn publish(&self, event: DocumentEvent) {
        if let Some(events) = self.events {
            events.publish(&event);
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListTasksArgs {
    status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
struct SearchLogsArgs {
    keyword: String,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddTaskArgs {
    title: String,
    priority: Option<u8>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AddSubtaskArgs {
    task_id: u32,
    title: String,
}

#[derive(Debug, Deserialize)]
struct MoveTaskArgs {
    task_id: u32,
    status: TaskStatus,
}

fn validate_args(schema: &Value, args: &Value) -> Result<()> {
    let compiled = validator_for(schema).map_err(|err| anyhow!("invalid tool schema: {err}"))?;
    if !compiled.is_valid(args) {
        let messages = compiled
            .iter_errors(args)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!("invalid arguments: {}", messages.join("; ")));
    }
    Ok(())
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T> {
    serde_json::from_value(args.clone()).context("invalid arguments")
}

fn list_tasks(ctx: &ToolContext<'_>, args: ListTasksArgs) -> Result<String> {
    let tasks = load_tasks(&ctx.paths()?.tasks_path)?;
    let selected = tasks
        .iter()
        .filter(|task| args.status.is_none_or(|status| task.status == status))
        .map(serialize_task)
        .collect::<Vec<_>>();
    if selected.is_empty() {
        return Ok(match args.status {
            Some(status) => format!("No tasks with status {status}."),
            None => "No tasks yet.".to_string(),
        });
    }
    Ok(selected.join("\n\n"))
}

fn search_logs(ctx: &ToolContext<'_>, args: SearchLogsArgs) -> Result<String> {
    let from = args.from.as_deref().map(parse_date).transpose()?;
    let to = args.to.as_deref().map(parse_date).transpose()?;
    let Some(text) = read_log(&ctx.paths()?.log_path)? else {
        return Ok("The project has no work log.".to_string());
    };

    let hits = search(&text, &args.keyword, from, to);
    if hits.is_empty() {
        return Ok(format!("No log entries match '{}'.", args.keyword));
    }
    let lines = hits
        .iter()
        .map(|hit| match &hit.subsection {
            Some(label) => format!("{} [{label}] {}", hit.date, hit.line),
            None => format!("{} {}", hit.date, hit.line),
        })
        .collect::<Vec<_>>();
    Ok(lines.join("\n"))
}

fn get_insights(ctx: &ToolContext<'_>) -> Result<String> {
    let tasks = load_tasks(&ctx.paths()?.tasks_path)?;
    Ok(ProjectSnapshot::build(&tasks, ctx.today).render())
}

fn add_task(ctx: &ToolContext<'_>, args: AddTaskArgs) -> Result<String> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(anyhow!("title must not be empty"));
    }
    let paths = ctx.paths()?;
    let mut tasks = load_tasks(&paths.tasks_path)?;

    let id = next_task_id(&tasks);
    let mut task = Task::new(id, title);
    task.priority = args.priority.unwrap_or(DEFAULT_PRIORITY);
    task.created = Some(ctx.today);
    task.tags = args.tags.iter().filter_map(|tag| sanitize_tag(tag)).collect();
    let headline = task.title();
    let priority = task.priority;
    tasks.push(task);
    write_tasks(&paths.tasks_path, &tasks)?;
    info!(project = ctx.project, id, "task added");

    let event = TaskEvent::new("add", id).with_field("priority", priority.to_string());
    journal(ctx, &paths, &format!("Added #{id} {headline}"), &event);
    Ok(format!("Created task #{id}: {headline}"))
}

fn add_subtask(ctx: &ToolContext<'_>, args: AddSubtaskArgs) -> Result<String> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(anyhow!("title must not be empty"));
    }
    let paths = ctx.paths()?;
    let mut tasks = load_tasks(&paths.tasks_path)?;
    let task = find_task(&mut tasks, args.task_id)?;
    task.subtasks.push(Subtask::new(title));
    let index = task.subtasks.len() - 1;
    write_tasks(&paths.tasks_path, &tasks)?;
    info!(project = ctx.project, id = args.task_id, index, "subtask added");

    let event =
        TaskEvent::new("add_subtask", args.task_id).with_field("subtask", index.to_string());
    journal(
        ctx,
        &paths,
        &format!("Added subtask to #{}: {title}", args.task_id),
        &event,
    );
    Ok(format!(
        "Added subtask {index} to task #{}: {title}",
        args.task_id
    ))
}

fn move_task(ctx: &ToolContext<'_>, args: MoveTaskArgs) -> Result<String> {
    let paths = ctx.paths()?;
    let mut tasks = load_tasks(&paths.tasks_path)?;
    let task = find_task(&mut tasks, args.task_id)?;
    let previous = task.status;
    if previous == args.status {
        return Ok(format!("Task #{} is already {previous}.", args.task_id));
    }
    task.status = args.status;
    let headline = task.title();
    write_tasks(&paths.tasks_path, &tasks)?;
    info!(
        project = ctx.project,
        id = args.task_id,
        from = %previous,
        to = %args.status,
        "task moved"
    );

    let event = TaskEvent::new("move", args.task_id)
        .with_field("from", previous.as_str())
        .with_field("to", args.status.as_str());
    journal(
        ctx,
        &paths,
        &format!("Moved #{} {headline} to {}", args.task_id, args.status),
        &event,
    );
    Ok(format!(
        "Moved task #{} from {previous} to {}.",
        args.task_id, args.status
    ))
}

fn find_task(tasks: &mut [Task], id: u32) -> Result<&mut Task> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or_else(|| anyhow!("task #{id} not found"))
}

/// Record a completed write in the log and notify listeners.
///
/// The task document is already written at this point, so a log failure is
/// reported but does not fail the tool.
fn journal(ctx: &ToolContext<'_>, paths: &ProjectPaths, bullet: &str, event: &TaskEvent) {
    ctx.publish(DocumentEvent::TasksChanged {
        project: ctx.project.to_string(),
    });
    match record_task_event(&paths.log_path, ctx.today, bullet, event) {
        Ok(()) => ctx.publish(DocumentEvent::LogChanged {
            project: ctx.project.to_string(),
        }),
        Err(err) => {
            warn!(project = ctx.project, error = %format!("{err:#}"), "journal write failed");
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{value}' (expected YYYY-MM-DD)"))
}

/// Tags live in a space- and comma-separated metadata comment.
fn sanitize_tag(tag: &str) -> Option<String> {
    let cleaned = tag
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .replace([',', '<', '>'], "");
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_support::{TestWorkspace, task, task_with_status};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date")
    }

    fn ctx<'a>(ws: &'a TestWorkspace, events: Option<&'a EventBus>) -> ToolContext<'a> {
        ToolContext {
            workspace: ws.workspace(),
            project: "alpha",
            today: today(),
            events,
        }
    }

    #[test]
    fn registry_gates_write_tools() {
        let read_only = ToolRegistry::new(false);
        assert_eq!(read_only.tools().len(), 3);
        assert!(read_only.lookup("add_task").is_none());
        assert_eq!(read_only.lookup("list_tasks"), Some(ToolKind::ListTasks));

        let write = ToolRegistry::new(true);
        assert_eq!(write.tools().len(), 6);
        let names = write
            .declarations()
            .into_iter()
            .map(|decl| decl.name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "list_tasks",
                "search_logs",
                "get_insights",
                "add_task",
                "add_subtask",
                "move_task"
            ]
        );
    }

    #[test]
    fn names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_task"), None);
    }

    #[test]
    fn list_tasks_filters_by_status() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        ws.write_tasks(&[
            task(1, "Write docs"),
            task_with_status(2, "Ship release", TaskStatus::Done),
        ])
        .expect("tasks");

        let all = ToolKind::ListTasks.execute(&ctx(&ws, None), &json!({}));
        assert!(all.contains("1. [ ] Write docs"));
        assert!(all.contains("2. [x] Ship release"));

        let done = ToolKind::ListTasks.execute(&ctx(&ws, None), &json!({ "status": "done" }));
        assert_eq!(done, "2. [x] Ship release");

        let progress =
            ToolKind::ListTasks.execute(&ctx(&ws, None), &json!({ "status": "in_progress" }));
        assert_eq!(progress, "No tasks with status in_progress.");
    }

    #[test]
    fn schema_violations_become_error_text() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let result = ToolKind::ListTasks.execute(&ctx(&ws, None), &json!({ "status": "blocked" }));
        assert!(result.starts_with("Error: invalid arguments"));

        let result = ToolKind::AddTask.execute(&ctx(&ws, None), &json!({ "priority": 1 }));
        assert!(result.starts_with(ERROR_PREFIX));
        assert!(ws.read_tasks().expect("tasks").is_empty());
    }

    #[test]
    fn missing_project_is_reported() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let ghost = ToolContext {
            project: "ghost",
            ..ctx(&ws, None)
        };
        let result = ToolKind::GetInsights.execute(&ghost, &json!({}));
        assert_eq!(result, "Error: project 'ghost' not found");
    }

    #[test]
    fn search_logs_respects_keyword_and_range() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        ws.write_log(
            "## 2026-10-10\n### Done\n- Fixed login bug\n\n## 2026-10-16\n### Notes\n- login flaky again\n",
        )
        .expect("log");

        let result = ToolKind::SearchLogs.execute(
            &ctx(&ws, None),
            &json!({ "keyword": "LOGIN", "from": "2026-10-15" }),
        );
        assert_eq!(result, "2026-10-16 [Notes] - login flaky again");

        let result = ToolKind::SearchLogs.execute(
            &ctx(&ws, None),
            &json!({ "keyword": "login", "to": "10/16" }),
        );
        assert!(result.starts_with("Error: invalid date '10/16'"));
    }

    #[test]
    fn insights_render_snapshot() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let mut urgent = task(1, "Fix login");
        urgent.priority = 1;
        ws.write_tasks(&[urgent]).expect("tasks");

        let result = ToolKind::GetInsights.execute(&ctx(&ws, None), &json!({}));
        assert!(result.starts_with("Tasks: 1 total, 1 open"));
        assert!(result.contains("- #1 [open] Fix login"));
    }

    #[test]
    fn add_task_allocates_next_id_and_journals() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        ws.write_tasks(&[task(4, "Existing")]).expect("tasks");
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |event| sink.lock().expect("lock").push(event.clone()));

        let result = ToolKind::AddTask.execute(
            &ctx(&ws, Some(&bus)),
            &json!({
                "title": "Write release notes",
                "priority": 1,
                "tags": ["docs", "q4 launch"]
            }),
        );
        assert_eq!(result, "Created task #5: Write release notes");

        let tasks = ws.read_tasks().expect("tasks");
        let added = &tasks[1];
        assert_eq!(added.id, 5);
        assert_eq!(added.status, TaskStatus::Open);
        assert_eq!(added.priority, 1);
        assert_eq!(added.created, Some(today()));
        assert!(added.tags.contains("q4-launch"));

        let log = ws.read_log().expect("log");
        assert!(log.contains("## 2026-10-18"));
        assert!(log.contains("- Added #5 Write release notes"));
        assert!(log.contains("action: add"));

        let seen = seen.lock().expect("lock");
        assert_eq!(
            *seen,
            vec![
                DocumentEvent::TasksChanged {
                    project: "alpha".to_string()
                },
                DocumentEvent::LogChanged {
                    project: "alpha".to_string()
                },
            ]
        );
    }

    #[test]
    fn add_subtask_appends_in_order() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        ws.write_tasks(&[task(1, "Fix bug")]).expect("tasks");

        let first = ToolKind::AddSubtask.execute(
            &ctx(&ws, None),
            &json!({ "task_id": 1, "title": "reproduce" }),
        );
        assert_eq!(first, "Added subtask 0 to task #1: reproduce");
        ToolKind::AddSubtask.execute(&ctx(&ws, None), &json!({ "task_id": 1, "title": "fix" }));

        let tasks = ws.read_tasks().expect("tasks");
        let titles = tasks[0]
            .subtasks
            .iter()
            .map(|subtask| subtask.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["reproduce", "fix"]);

        let missing = ToolKind::AddSubtask.execute(
            &ctx(&ws, None),
            &json!({ "task_id": 9, "title": "nope" }),
        );
        assert_eq!(missing, "Error: task #9 not found");
    }

    #[test]
    fn move_task_changes_status_once() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        ws.write_tasks(&[task(1, "Fix bug")]).expect("tasks");

        let moved = ToolKind::MoveTask.execute(
            &ctx(&ws, None),
            &json!({ "task_id": 1, "status": "in_progress" }),
        );
        assert_eq!(moved, "Moved task #1 from open to in_progress.");
        assert_eq!(
            ws.read_tasks().expect("tasks")[0].status,
            TaskStatus::InProgress
        );
        assert!(ws.read_log().expect("log").contains("from: open"));

        let again = ToolKind::MoveTask.execute(
            &ctx(&ws, None),
            &json!({ "task_id": 1, "status": "in_progress" }),
        );
        assert_eq!(again, "Task #1 is already in_progress.");
    }

    #[test]
    fn sanitize_tag_keeps_metadata_parseable() {
        assert_eq!(sanitize_tag("  q4 launch "), Some("q4-launch".to_string()));
        assert_eq!(sanitize_tag("a,b"), Some("ab".to_string()));
        assert_eq!(sanitize_tag(" , "), None);
    }
}
