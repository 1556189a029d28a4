//! Typed error hierarchy for the auto-build orchestrator.
//!
//! Two enums cover the two failure domains:
//! - `OrchestratorError`: precondition and artifact failures around the run
//! - `SessionError`: failures talking to the agent process inside one session

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the orchestrator subsystem (preconditions, spec resolution, artifacts).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Spec '{identifier}' not found")]
    SpecNotFound { identifier: String },

    #[error("{var} environment variable not set")]
    MissingCredential { var: &'static str },

    #[error("spec.md not found in {}", dir.display())]
    SpecFileMissing { dir: PathBuf },

    #[error("Failed to read prompt template at {path}: {source}")]
    PromptReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write human input at {path}: {source}")]
    HumanInputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from a single agent session.
///
/// These never escape the session runner: they are converted into an
/// `Error` session outcome so the orchestration loop keeps going.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to spawn agent process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Failed to send prompt to agent: {0}")]
    PromptWriteFailed(#[source] std::io::Error),

    #[error("Failed to read agent output: {0}")]
    StreamRead(#[source] std::io::Error),

    #[error("Agent process exited with code {code}")]
    AgentExited { code: i32 },

    #[error("Agent stream ended without a result")]
    StreamEndedWithoutResult,

    #[error("Agent reported an error: {message}")]
    AgentReportedError { message: String },
}
