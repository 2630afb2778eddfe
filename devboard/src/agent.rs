//! Bounded tool-using conversation with the model.
//!
//! ```text
//! AwaitingModel --end_turn / other--> Done
//!      |   ^                 \--transport error--> Aborted(Transport)
//!  tool_use |
//!      v   |
//! ExecutingTools --round trips == MAX_ITERATIONS--> Aborted(MaxIterations)
//! ```
//!
//! The loop performs at most [`MAX_ITERATIONS`] model calls per run no matter
//! how many tool calls each model turn requests.

use tracing::{debug, info, instrument, warn};

use crate::core::messages::{ContentBlock, Message, ModelRequest, Role, StopReason};
use crate::io::config::AgentConfig;
use crate::io::transport::ModelTransport;
use crate::tools::{ERROR_PREFIX, ToolContext, ToolRegistry};

/// Upper bound on model round trips per run.
pub const MAX_ITERATIONS: u32 = 5;

pub const MAX_ITERATIONS_MESSAGE: &str = "Stopped after reaching the maximum of 5 model round \
     trips without a final answer. Try a simpler query.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    AwaitingModel,
    ExecutingTools,
    Done,
    Aborted(AbortReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The model call failed; carries the transport's description.
    Transport(String),
    MaxIterations,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    /// Text shown to the user.
    pub reply: String,
    pub round_trips: u32,
    /// Terminal state (`Done` or `Aborted`).
    pub state: AgentState,
    /// Every turn exchanged, starting with the user message.
    pub conversation: Vec<Message>,
}

/// Static inputs of a run.
#[derive(Debug, Clone, Copy)]
pub struct AgentInputs<'a> {
    pub config: &'a AgentConfig,
    pub registry: &'a ToolRegistry,
    pub tools: ToolContext<'a>,
    /// Briefing placed in the system slot.
    pub system: &'a str,
}

struct Conversation<'a, T: ModelTransport> {
    transport: &'a T,
    inputs: AgentInputs<'a>,
    messages: Vec<Message>,
    round_trips: u32,
    reply: String,
}

/// Drive the conversation for `message` until it finishes or aborts.
#[instrument(
    skip_all,
    fields(project = inputs.tools.project, tools = inputs.registry.tools().len())
)]
pub fn run_agent<T: ModelTransport>(
    transport: &T,
    inputs: AgentInputs<'_>,
    message: &str,
) -> AgentRun {
    let mut conversation = Conversation {
        transport,
        inputs,
        messages: vec![Message::user_text(message)],
        round_trips: 0,
        reply: String::new(),
    };

    let mut state = AgentState::AwaitingModel;
    let state = loop {
        state = match state {
            AgentState::AwaitingModel => conversation.await_model(),
            AgentState::ExecutingTools => conversation.execute_tools(),
            terminal @ (AgentState::Done | AgentState::Aborted(_)) => break terminal,
        };
    };

    info!(round_trips = conversation.round_trips, state = ?state, "agent run finished");
    AgentRun {
        reply: conversation.reply,
        round_trips: conversation.round_trips,
        state,
        conversation: conversation.messages,
    }
}

impl<T: ModelTransport> Conversation<'_, T> {
    fn await_model(&mut self) -> AgentState {
        let request = ModelRequest {
            model: self.inputs.config.model.clone(),
            max_tokens: self.inputs.config.max_tokens,
            system: self.inputs.system.to_string(),
            messages: self.messages.clone(),
            tools: self.inputs.registry.declarations(),
        };
        self.round_trips += 1;
        debug!(round_trip = self.round_trips, "awaiting model");

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "model request failed");
                self.reply = format!("Model request failed: {err}");
                return AgentState::Aborted(AbortReason::Transport(err.to_string()));
            }
        };

        match response.stop() {
            StopReason::EndTurn => {
                self.reply = response.text();
                AgentState::Done
            }
            StopReason::ToolUse => {
                let content = response
                    .content
                    .into_iter()
                    .filter(|block| !matches!(block, ContentBlock::Unsupported))
                    .collect::<Vec<_>>();
                if !content
                    .iter()
                    .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
                {
                    warn!("tool_use stop without tool calls, finishing");
                    self.reply = text_of(&content);
                    return AgentState::Done;
                }
                self.messages.push(Message {
                    role: Role::Assistant,
                    content,
                });
                AgentState::ExecutingTools
            }
            StopReason::Other(reason) => {
                debug!(?reason, "model stopped for another reason");
                self.reply = response.text();
                AgentState::Done
            }
        }
    }

    fn execute_tools(&mut self) -> AgentState {
        let calls = self
            .messages
            .last()
            .map(|turn| turn.content.as_slice())
            .unwrap_or_default();
        let results = calls
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(self.tool_result(id, name, input))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        self.messages.push(Message {
            role: Role::User,
            content: results,
        });

        if self.round_trips >= MAX_ITERATIONS {
            warn!(round_trips = self.round_trips, "iteration limit reached");
            self.reply = MAX_ITERATIONS_MESSAGE.to_string();
            return AgentState::Aborted(AbortReason::MaxIterations);
        }
        AgentState::AwaitingModel
    }

    fn tool_result(&self, id: &str, name: &str, input: &serde_json::Value) -> ContentBlock {
        let content = match self.inputs.registry.lookup(name) {
            Some(kind) => {
                debug!(tool = name, "executing tool");
                kind.execute(&self.inputs.tools, input)
            }
            None => {
                warn!(tool = name, "model requested an unknown tool");
                format!("Unknown tool: {name}")
            }
        };
        let failed = content.starts_with(ERROR_PREFIX) || content.starts_with("Unknown tool");
        ContentBlock::ToolResult {
            tool_use_id: id.to_string(),
            content,
            is_error: failed.then_some(true),
        }
    }
}

fn text_of(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .concat()
}
