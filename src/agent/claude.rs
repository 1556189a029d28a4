use crate::agent::{Agent, EventStream};
use crate::config::Config;
use crate::errors::SessionError;
use crate::stream::{AgentEvent, parse_line};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

/// Runs each session as a `claude --print --output-format stream-json` process.
pub struct ClaudeCli {
    claude_cmd: String,
    flags: Vec<String>,
    working_dir: PathBuf,
}

impl ClaudeCli {
    pub fn new(config: &Config) -> Self {
        Self {
            claude_cmd: config.claude_cmd.clone(),
            flags: config.claude_flags(),
            working_dir: config.project_dir.clone(),
        }
    }

    pub fn command_line(&self) -> String {
        format!("{} {}", self.claude_cmd, self.flags.join(" "))
    }
}

/// Streaming state: the child is owned here so dropping the stream kills it.
struct ProcessStream {
    lines: Lines<BufReader<ChildStdout>>,
    child: Child,
    pending: VecDeque<AgentEvent>,
    done: bool,
}

impl ProcessStream {
    async fn next_event(&mut self) -> Option<Result<AgentEvent, SessionError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            match self.lines.next_line().await {
                Ok(Some(line)) => self.pending.extend(parse_line(&line)),
                Ok(None) => {
                    self.done = true;
                    return match self.child.wait().await {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(Err(SessionError::AgentExited {
                            code: status.code().unwrap_or(-1),
                        })),
                        Err(e) => Some(Err(SessionError::StreamRead(e))),
                    };
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(SessionError::StreamRead(e)));
                }
            }
        }
    }
}

#[async_trait]
impl Agent for ClaudeCli {
    async fn submit(&self, prompt: &str) -> Result<EventStream, SessionError> {
        tracing::debug!(command = %self.command_line(), prompt_chars = prompt.len(), "spawning agent");

        let mut child = Command::new(&self.claude_cmd)
            .args(&self.flags)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(SessionError::SpawnFailed)?;

        tracing::debug!(pid = child.id().unwrap_or(0), "agent process spawned");

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(SessionError::PromptWriteFailed)?;
            stdin
                .shutdown()
                .await
                .map_err(SessionError::PromptWriteFailed)?;
        }

        let stdout = child.stdout.take().ok_or_else(|| {
            SessionError::StreamRead(std::io::Error::other("agent stdout unavailable"))
        })?;

        let state = ProcessStream {
            lines: BufReader::new(stdout).lines(),
            child,
            pending: VecDeque::new(),
            done: false,
        };

        Ok(Box::pin(stream::unfold(state, |mut state| async move {
            state.next_event().await.map(|item| (item, state))
        })))
    }
}
