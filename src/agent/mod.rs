//! The coding-agent capability boundary.
//!
//! An [`Agent`] accepts a prompt and returns an ordered stream of typed
//! events. Every `submit` is a fresh session: nothing carries over between
//! calls except what the agent wrote to disk.

pub mod claude;
#[cfg(test)]
pub mod scripted;

pub use claude::ClaudeCli;

use crate::errors::SessionError;
use crate::stream::AgentEvent;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Ordered events of one session. The stream ends when the agent stops.
pub type EventStream = BoxStream<'static, Result<AgentEvent, SessionError>>;

/// Abstraction over the coding agent for testability.
/// Real implementation: `ClaudeCli`. Test double: `ScriptedAgent`.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn submit(&self, prompt: &str) -> Result<EventStream, SessionError>;
}
