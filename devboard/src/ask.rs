//! Public entry points: free-form questions plus canned requests.
//!
//! Every entry point returns display text and never an error. A missing API
//! key short-circuits before any document is read; any other failure becomes
//! a one-line `Agent error: ...` reply.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::{info, instrument, warn};

use crate::agent::{AgentInputs, AgentRun, run_agent};
use crate::io::briefing::build_briefing;
use crate::io::config::DevboardConfig;
use crate::io::events::EventBus;
use crate::io::transport::ModelTransport;
use crate::io::workspace::Workspace;
use crate::tools::{ToolContext, ToolRegistry};

pub const MISSING_CREDENTIAL_MESSAGE: &str = "No API key configured. Set the ANTHROPIC_API_KEY \
     environment variable or add `api_key` under [agent] in config.toml, then try again.";

/// Project assistant bound to one workspace and one model transport.
#[derive(Debug)]
pub struct Assistant<T: ModelTransport> {
    workspace: Workspace,
    config: DevboardConfig,
    transport: T,
    today: Option<NaiveDate>,
    events: Option<Arc<EventBus>>,
}

impl<T: ModelTransport> Assistant<T> {
    pub fn new(workspace: Workspace, config: DevboardConfig, transport: T) -> Self {
        Self {
            workspace,
            config,
            transport,
            today: None,
            events: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Publish document changes made by write tools on `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Answer `message` about `project`; write tools are offered only when `allow_write`.
    pub fn ask(&self, project: &str, message: &str, allow_write: bool) -> String {
        if !self.has_credential() {
            warn!("no API key configured");
            return MISSING_CREDENTIAL_MESSAGE.to_string();
        }
        match self.run(project, message, allow_write) {
            Ok(run) => run.reply,
            Err(err) => format!("Agent error: {err:#}"),
        }
    }

    /// Summarize logged work between `from` and `to`, inclusive.
    pub fn weekly_summary(&self, project: &str, from: NaiveDate, to: NaiveDate) -> String {
        let message = format!(
            "Summarize the work logged between {from} and {to}. Use search_logs with that \
             date range to find the entries, then report what was finished, what is still \
             in progress and anything that looks blocked."
        );
        self.ask(project, &message, false)
    }

    /// Break `goal` into tasks and subtasks on the board. Always write-enabled.
    pub fn decompose_goal(&self, project: &str, goal: &str) -> String {
        let message = format!(
            "Break this goal down into concrete tasks with subtasks and add them to the \
             board: {goal}\nCall list_tasks first and do not duplicate existing tasks."
        );
        self.ask(project, &message, true)
    }

    /// Health check of the board with suggested next steps.
    pub fn insights(&self, project: &str) -> String {
        let message = "Review the project's health with get_insights. Call out urgent and \
                       stagnant tasks and suggest the next three things to work on.";
        self.ask(project, message, false)
    }

    /// Run one conversation and return the full report.
    #[instrument(skip(self, message))]
    pub fn run(&self, project: &str, message: &str, allow_write: bool) -> Result<AgentRun> {
        self.workspace.existing_project(project)?;
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        let system = build_briefing(&self.workspace, project, today, allow_write);
        let registry = ToolRegistry::new(allow_write);
        let inputs = AgentInputs {
            config: &self.config.agent,
            registry: &registry,
            tools: ToolContext {
                workspace: &self.workspace,
                project,
                today,
                events: self.events.as_deref(),
            },
            system: &system,
        };

        let run = run_agent(&self.transport, inputs, message);
        info!(round_trips = run.round_trips, "question answered");
        Ok(run)
    }

    fn has_credential(&self) -> bool {
        self.config
            .agent
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::messages::ContentBlock;
    use crate::test_support::{ScriptedTransport, TestWorkspace, text_response, tool_use_response};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
    }

    fn keyed_config() -> DevboardConfig {
        let mut config = DevboardConfig::default();
        config.agent.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn missing_key_short_circuits_before_any_io() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let transport = ScriptedTransport::new(vec![Ok(text_response("unused"))]);
        let assistant = Assistant::new(
            ws.workspace().clone(),
            DevboardConfig::default(),
            transport,
        );

        let reply = assistant.ask("ghost", "hello", false);

        assert_eq!(reply, MISSING_CREDENTIAL_MESSAGE);
        assert_eq!(assistant.transport().calls(), 0);
    }

    #[test]
    fn unknown_project_becomes_agent_error() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let transport = ScriptedTransport::new(Vec::new());
        let assistant = Assistant::new(ws.workspace().clone(), keyed_config(), transport);

        let reply = assistant.ask("ghost", "hello", false);

        assert_eq!(reply, "Agent error: project 'ghost' not found");
        assert_eq!(assistant.transport().calls(), 0);
    }

    #[test]
    fn ask_sends_briefing_and_mode_specific_tools() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let transport = ScriptedTransport::new(vec![Ok(text_response("All quiet."))]);
        let assistant =
            Assistant::new(ws.workspace().clone(), keyed_config(), transport).with_today(today());

        let reply = assistant.ask("alpha", "status?", false);

        assert_eq!(reply, "All quiet.");
        let requests = assistant.transport().requests();
        let request = &requests[0];
        assert!(request.system.contains("Project: alpha"));
        assert!(request.system.contains("Today: 2026-10-18"));
        assert!(request.system.contains("read-only mode"));
        assert_eq!(request.tools.len(), 3);
    }

    #[test]
    fn decompose_goal_enables_write_tools() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let transport = ScriptedTransport::new(vec![
            Ok(tool_use_response("t1", "add_task", json!({ "title": "Draft outline" }))),
            Ok(text_response("Added one task.")),
        ]);
        let assistant =
            Assistant::new(ws.workspace().clone(), keyed_config(), transport).with_today(today());

        let reply = assistant.decompose_goal("alpha", "Write the handbook");

        assert_eq!(reply, "Added one task.");
        let requests = assistant.transport().requests();
        assert_eq!(requests[0].tools.len(), 6);
        let tasks = ws.read_tasks().expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title(), "Draft outline");
    }

    #[test]
    fn weekly_summary_names_the_range() {
        let ws = TestWorkspace::new("alpha").expect("workspace");
        let transport = ScriptedTransport::new(vec![Ok(text_response("Quiet week."))]);
        let assistant =
            Assistant::new(ws.workspace().clone(), keyed_config(), transport).with_today(today());
        let from = NaiveDate::from_ymd_opt(2026, 10, 12).expect("date");

        assistant.weekly_summary("alpha", from, today());

        let requests = assistant.transport().requests();
        let request = &requests[0];
        let ContentBlock::Text { text } = &request.messages[0].content[0] else {
            panic!("expected text message");
        };
        assert!(text.contains("between 2026-10-12 and 2026-10-18"));
        assert_eq!(request.tools.len(), 3);
    }
}
