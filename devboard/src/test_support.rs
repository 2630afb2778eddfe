//! Test-only builders, a scratch workspace and a scripted model transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde_json::Value;
use tempfile::TempDir;

use crate::core::messages::{ContentBlock, ModelRequest, ModelResponse};
use crate::core::types::{Task, TaskStatus};
use crate::io::log_store::read_log;
use crate::io::task_store::{load_tasks, write_tasks};
use crate::io::transport::{ModelTransport, TransportError};
use crate::io::workspace::{InitOptions, ProjectPaths, Workspace, init_project};

/// Open task with default attributes.
pub fn task(id: u32, description: &str) -> Task {
    Task::new(id, description)
}

pub fn task_with_status(id: u32, description: &str, status: TaskStatus) -> Task {
    let mut task = task(id, description);
    task.status = status;
    task
}

/// Open task created `days_ago` days before `today`.
pub fn dated_task(id: u32, description: &str, today: NaiveDate, days_ago: u64) -> Task {
    let mut task = task(id, description);
    task.created = today.checked_sub_days(Days::new(days_ago));
    task
}

/// A temporary workspace root with one initialized project.
pub struct TestWorkspace {
    temp: TempDir,
    workspace: Workspace,
    paths: ProjectPaths,
}

impl TestWorkspace {
    pub fn new(project: &str) -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let paths = init_project(temp.path(), project, &InitOptions { force: false })?;
        Ok(Self {
            workspace: Workspace::new(temp.path()),
            temp,
            paths,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn write_tasks(&self, tasks: &[Task]) -> Result<()> {
        write_tasks(&self.paths.tasks_path, tasks)
    }

    /// Write the task document verbatim, bypassing serialization.
    pub fn write_raw_tasks(&self, contents: &str) -> Result<()> {
        fs::write(&self.paths.tasks_path, contents)
            .with_context(|| format!("write {}", self.paths.tasks_path.display()))
    }

    pub fn read_tasks(&self) -> Result<Vec<Task>> {
        load_tasks(&self.paths.tasks_path)
    }

    pub fn write_log(&self, contents: &str) -> Result<()> {
        fs::write(&self.paths.log_path, contents)
            .with_context(|| format!("write {}", self.paths.log_path.display()))
    }

    /// Current log text; empty when the file is missing.
    pub fn read_log(&self) -> Result<String> {
        Ok(read_log(&self.paths.log_path)?.unwrap_or_default())
    }

    pub fn remove_log(&self) -> Result<()> {
        fs::remove_file(&self.paths.log_path)
            .with_context(|| format!("remove {}", self.paths.log_path.display()))
    }
}

/// Final answer with `stop_reason = end_turn`.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: Some("end_turn".to_string()),
    }
}

/// A single tool call with `stop_reason = tool_use`.
pub fn tool_use_response(id: &str, name: &str, input: Value) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: Some("tool_use".to_string()),
    }
}

/// Transport that replays queued results and records every request.
///
/// Once the queue is empty it answers with the fallback response, or with a
/// transport error when no fallback is set.
pub struct ScriptedTransport {
    queue: RefCell<VecDeque<Result<ModelResponse, TransportError>>>,
    fallback: Option<ModelResponse>,
    requests: RefCell<Vec<ModelRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<ModelResponse, TransportError>>) -> Self {
        Self {
            queue: RefCell::new(responses.into()),
            fallback: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Answer every request with `response`.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ModelTransport for ScriptedTransport {
    fn send(&self, request: &ModelRequest) -> Result<ModelResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(next) = self.queue.borrow_mut().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| TransportError::Other("scripted transport exhausted".to_string()))
    }
}
