//! Persistent per-spec task log (`task_logs.json`).
//!
//! A JSON document of sessions, each holding timestamped entries for agent
//! text, tool calls, errors and orchestrator notes.

pub mod logger;

pub use logger::TaskLogger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const TASK_LOG_FILE: &str = "task_logs.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Build sessions (initializer or coder prompt).
    Coding,
    /// QA review sessions.
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Text,
    ToolStart,
    ToolEnd,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    /// Full tool output, when it is worth keeping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl LogEntry {
    pub fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            content: content.into(),
            tool_name: None,
            tool_input: None,
            detail: None,
            success: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub session_number: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// `completed` or `error`, set when the session ends.
    pub status: Option<String>,
    pub entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new(phase: SessionPhase, session_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase,
            session_number,
            started_at: Utc::now(),
            ended_at: None,
            status: None,
            entries: Vec::new(),
        }
    }

    pub fn finish(&mut self, status: &str) {
        self.ended_at = Some(Utc::now());
        self.status = Some(status.to_string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub spec: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sessions: Vec<SessionLog>,
}

impl TaskLog {
    pub fn new(spec: &str) -> Self {
        let now = Utc::now();
        Self {
            spec: spec.to_string(),
            created_at: now,
            updated_at: now,
            sessions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_type_tag_and_skips_empty_fields() {
        let entry = LogEntry::new(EntryKind::ToolStart, "Read");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "tool_start");
        assert_eq!(json["content"], "Read");
        assert!(json.get("detail").is_none());
        assert!(json.get("tool_input").is_none());
    }

    #[test]
    fn test_session_phase_names() {
        assert_eq!(
            serde_json::to_string(&SessionPhase::Validation).unwrap(),
            "\"validation\""
        );
        assert_eq!(
            serde_json::to_string(&SessionPhase::Coding).unwrap(),
            "\"coding\""
        );
    }

    #[test]
    fn test_session_finish_sets_status() {
        let mut session = SessionLog::new(SessionPhase::Coding, 2);
        assert!(session.ended_at.is_none());
        session.finish("completed");
        assert!(session.ended_at.is_some());
        assert_eq!(session.status.as_deref(), Some("completed"));
    }
}
