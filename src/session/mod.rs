//! One bounded interaction with the coding agent.
//!
//! Submits a prompt, then consumes the agent's event stream until it ends,
//! echoing to the console and recording to the task log as events arrive.

use crate::agent::Agent;
use crate::audit::{SessionPhase, TaskLogger};
use crate::errors::SessionError;
use crate::stream::{AgentEvent, tool_emoji};
use crate::ui::ConsoleUI;
use futures::StreamExt;
use serde_json::Value;

/// Paths longer than this are shown as `...` plus their tail.
const DISPLAY_PATH_MAX: usize = 50;
/// Characters of a failed tool's output shown on the console.
const ERROR_PREVIEW_CHARS: usize = 500;
/// Characters of a successful tool's output shown in verbose mode.
const DONE_PREVIEW_CHARS: usize = 200;
/// Characters of raw tool input shown in verbose mode.
const INPUT_PREVIEW_CHARS: usize = 300;
/// Successful tool output at or above this size is not persisted.
const DETAIL_MAX_CHARS: usize = 50_000;
/// Tools whose successful output is worth keeping in the task log.
const DETAIL_TOOLS: [&str; 5] = ["Read", "Grep", "Bash", "Edit", "Write"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Completed,
    Error(String),
}

impl SessionStatus {
    fn label(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionResult {
    pub status: SessionStatus,
    /// Concatenated agent prose.
    pub transcript: String,
    pub tool_count: usize,
}

/// What the console shows for a tool call's input.
pub fn display_tool_input(input: &Value) -> Option<String> {
    if let Some(path) = input.get("file_path").and_then(|v| v.as_str()) {
        return Some(display_path(path));
    }
    input
        .get("pattern")
        .and_then(|v| v.as_str())
        .map(|pattern| format!("pattern: {}", pattern))
}

/// Shorten long paths to `...` plus the last 47 characters.
pub fn display_path(path: &str) -> String {
    if path.chars().count() > DISPLAY_PATH_MAX {
        format!("...{}", tail_chars(path, DISPLAY_PATH_MAX - 3))
    } else {
        path.to_string()
    }
}

/// The first 500 characters of a failed tool's output.
pub fn error_preview(content: &str) -> String {
    head_chars(content, ERROR_PREVIEW_CHARS)
}

/// The tool output kept in the task log for a successful call, if any.
pub fn persisted_detail(tool: &str, content: &str) -> Option<String> {
    if DETAIL_TOOLS.contains(&tool) && content.chars().count() < DETAIL_MAX_CHARS {
        Some(content.to_string())
    } else {
        None
    }
}

fn head_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

/// Tracks one session's progress through the event stream.
struct SessionState<'a> {
    ui: &'a ConsoleUI,
    logger: &'a mut TaskLogger,
    transcript: String,
    /// Results are attributed to the most recently started tool.
    current_tool: Option<String>,
    tool_count: usize,
}

impl<'a> SessionState<'a> {
    fn new(ui: &'a ConsoleUI, logger: &'a mut TaskLogger) -> Self {
        Self {
            ui,
            logger,
            transcript: String::new(),
            current_tool: None,
            tool_count: 0,
        }
    }

    fn record(&self, result: anyhow::Result<()>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write task log");
        }
    }

    /// Handle one event; returns the terminal status on `Finished`.
    fn handle(&mut self, event: AgentEvent) -> Option<SessionStatus> {
        match event {
            AgentEvent::Text(text) => {
                self.transcript.push_str(&text);
                self.ui.agent_text(&text);
                if !text.trim().is_empty() {
                    let result = self.logger.text(&text);
                    self.record(result);
                }
                None
            }
            AgentEvent::ToolStart { name, input } => {
                self.tool_count += 1;
                let detail = display_tool_input(&input);
                tracing::debug!(tool = %name, count = self.tool_count, input = ?detail, "tool call");
                self.ui
                    .tool_start(tool_emoji(&name), &name, detail.as_deref());
                if self.ui.verbose() {
                    let raw = input.to_string();
                    let shown = if raw.chars().count() > INPUT_PREVIEW_CHARS {
                        format!("{}...", head_chars(&raw, INPUT_PREVIEW_CHARS))
                    } else {
                        raw
                    };
                    self.ui.tool_input(&shown);
                }
                let result = self.logger.tool_start(&name, &input);
                self.record(result);
                self.current_tool = Some(name);
                None
            }
            AgentEvent::ToolResult { is_error, content } => {
                let tool = self
                    .current_tool
                    .take()
                    .unwrap_or_else(|| "unknown".to_string());
                if is_error {
                    tracing::debug!(tool = %tool, "tool error");
                    self.ui.tool_error(&error_preview(&content));
                    let result = self.logger.tool_end(&tool, false, Some(content));
                    self.record(result);
                } else {
                    let preview = head_chars(&content, DONE_PREVIEW_CHARS);
                    self.ui.tool_done(Some(preview.as_str()));
                    let detail = persisted_detail(&tool, &content);
                    let result = self.logger.tool_end(&tool, true, detail);
                    self.record(result);
                }
                None
            }
            AgentEvent::Finished { is_error, result } => {
                if is_error {
                    let message = result.unwrap_or_else(|| "unknown error".to_string());
                    Some(SessionStatus::Error(
                        SessionError::AgentReportedError { message }.to_string(),
                    ))
                } else {
                    Some(SessionStatus::Completed)
                }
            }
        }
    }

    fn finish(mut self, status: SessionStatus) -> SessionResult {
        if let SessionStatus::Error(message) = &status {
            self.ui.error(&format!("Session error: {}", message));
            let result = self.logger.error(message);
            self.record(result);
        }
        let result = self.logger.end_session(status.label());
        self.record(result);
        self.ui.info(&format!("\n{}\n", "-".repeat(70)));
        SessionResult {
            status,
            transcript: self.transcript,
            tool_count: self.tool_count,
        }
    }
}

/// Run one agent session to completion.
///
/// Never fails: spawn errors, stream errors and a stream that stops without
/// a result all become [`SessionStatus::Error`].
pub async fn run_session(
    agent: &dyn Agent,
    prompt: &str,
    phase: SessionPhase,
    session_number: u32,
    ui: &ConsoleUI,
    logger: &mut TaskLogger,
) -> SessionResult {
    if let Err(e) = logger.start_session(phase, session_number) {
        tracing::warn!(error = %e, "failed to write task log");
    }
    let mut state = SessionState::new(ui, logger);

    tracing::info!(session = session_number, ?phase, "starting agent session");
    let mut events = match agent.submit(prompt).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(error = %e, "failed to start agent session");
            return state.finish(SessionStatus::Error(e.to_string()));
        }
    };

    let mut status = None;
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if let Some(terminal) = state.handle(event) {
                    status = Some(terminal);
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "agent stream failed");
                status = Some(SessionStatus::Error(e.to_string()));
                break;
            }
        }
    }

    let status = status
        .unwrap_or_else(|| SessionStatus::Error(SessionError::StreamEndedWithoutResult.to_string()));
    tracing::info!(
        session = session_number,
        status = status.label(),
        tools = state.tool_count,
        "agent session ended"
    );
    state.finish(status)
}
