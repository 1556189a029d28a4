use super::{EntryKind, LogEntry, SessionLog, SessionPhase, TASK_LOG_FILE, TaskLog};
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Appends session entries to `task_logs.json`, rewriting the file after
/// every entry so a killed run loses nothing already logged.
///
/// Each save goes to a sibling temp file that is renamed over the log, so
/// the log on disk is always a complete document.
pub struct TaskLogger {
    path: PathBuf,
    log: TaskLog,
}

impl TaskLogger {
    /// Open the spec's task log, continuing an existing one.
    ///
    /// An unreadable or malformed log is replaced by a fresh document.
    pub fn open(spec_dir: &Path) -> Self {
        let path = spec_dir.join(TASK_LOG_FILE);
        let spec = spec_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let log = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<TaskLog>(&content) {
                Ok(log) => log,
                Err(e) => {
                    set_aside(&path, &e);
                    TaskLog::new(&spec)
                }
            },
            Err(_) => TaskLog::new(&spec),
        };

        Self { path, log }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn task_log(&self) -> &TaskLog {
        &self.log
    }

    pub fn start_session(&mut self, phase: SessionPhase, session_number: u32) -> Result<()> {
        self.log
            .sessions
            .push(SessionLog::new(phase, session_number));
        self.save()
    }

    /// Append an entry to the current session.
    ///
    /// Returns an error if no session was started, which indicates a caller bug.
    pub fn log(&mut self, entry: LogEntry) -> Result<()> {
        let session = self
            .log
            .sessions
            .last_mut()
            .ok_or_else(|| anyhow::anyhow!("log called with no active session"))?;
        session.entries.push(entry);
        self.save()
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        self.log(LogEntry::new(EntryKind::Text, text))
    }

    pub fn info(&mut self, msg: &str) -> Result<()> {
        self.log(LogEntry::new(EntryKind::Info, msg))
    }

    pub fn error(&mut self, msg: &str) -> Result<()> {
        self.log(LogEntry::new(EntryKind::Error, msg))
    }

    /// Record a tool call with its full, untruncated input.
    pub fn tool_start(&mut self, name: &str, input: &Value) -> Result<()> {
        let mut entry = LogEntry::new(EntryKind::ToolStart, format!("[Tool: {}]", name));
        entry.tool_name = Some(name.to_string());
        entry.tool_input = Some(input.clone());
        self.log(entry)
    }

    pub fn tool_end(&mut self, name: &str, success: bool, detail: Option<String>) -> Result<()> {
        let content = if success { "[Done]" } else { "[Error]" };
        let mut entry = LogEntry::new(EntryKind::ToolEnd, content);
        entry.tool_name = Some(name.to_string());
        entry.success = Some(success);
        entry.detail = detail;
        self.log(entry)
    }

    pub fn end_session(&mut self, status: &str) -> Result<()> {
        let session = self
            .log
            .sessions
            .last_mut()
            .ok_or_else(|| anyhow::anyhow!("end_session called with no active session"))?;
        session.finish(status);
        self.save()
    }

    pub fn save(&mut self) -> Result<()> {
        self.log.updated_at = Utc::now();
        let json =
            serde_json::to_string_pretty(&self.log).context("Failed to serialize task log")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Path a malformed log is moved to before a fresh one is started.
pub fn backup_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("json.bak")
}

fn set_aside(path: &Path, err: &serde_json::Error) {
    let backup = backup_path(path);
    match fs::rename(path, &backup) {
        Ok(()) => tracing::warn!(
            path = %path.display(),
            backup = %backup.display(),
            error = %err,
            "malformed task log moved aside, starting fresh"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "malformed task log could not be moved aside"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn reload(dir: &Path) -> TaskLog {
        let content = fs::read_to_string(dir.join(TASK_LOG_FILE)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_log_without_session_is_error() {
        let dir = tempdir().unwrap();
        let mut logger = TaskLogger::open(dir.path());
        assert!(logger.text("hello").is_err());
        assert!(logger.end_session("completed").is_err());
    }

    #[test]
    fn test_entries_are_saved_immediately() {
        let dir = tempdir().unwrap();
        let mut logger = TaskLogger::open(dir.path());
        logger.start_session(SessionPhase::Coding, 1).unwrap();
        logger.text("Working on it").unwrap();

        let saved = reload(dir.path());
        assert_eq!(saved.sessions.len(), 1);
        assert_eq!(saved.sessions[0].entries.len(), 1);
        assert_eq!(saved.sessions[0].entries[0].content, "Working on it");
        assert!(saved.sessions[0].ended_at.is_none());
    }

    #[test]
    fn test_tool_entries_keep_full_input_and_detail() {
        let dir = tempdir().unwrap();
        let mut logger = TaskLogger::open(dir.path());
        logger.start_session(SessionPhase::Validation, 4).unwrap();
        let input = json!({"file_path": "/a/very/long/path/that/is/kept/in/full.rs"});
        logger.tool_start("Read", &input).unwrap();
        logger
            .tool_end("Read", true, Some("fn main() {}".into()))
            .unwrap();
        logger.end_session("completed").unwrap();

        let saved = reload(dir.path());
        let session = &saved.sessions[0];
        assert_eq!(session.phase, SessionPhase::Validation);
        assert_eq!(session.session_number, 4);
        assert_eq!(session.status.as_deref(), Some("completed"));
        assert_eq!(session.entries[0].tool_input.as_ref(), Some(&input));
        assert_eq!(session.entries[1].kind, EntryKind::ToolEnd);
        assert_eq!(session.entries[1].success, Some(true));
        assert_eq!(session.entries[1].detail.as_deref(), Some("fn main() {}"));
    }

    #[test]
    fn test_open_continues_existing_log() {
        let dir = tempdir().unwrap();
        {
            let mut logger = TaskLogger::open(dir.path());
            logger.start_session(SessionPhase::Coding, 1).unwrap();
            logger.end_session("completed").unwrap();
        }
        let mut logger = TaskLogger::open(dir.path());
        logger.start_session(SessionPhase::Coding, 2).unwrap();
        assert_eq!(reload(dir.path()).sessions.len(), 2);
    }

    #[test]
    fn test_malformed_log_is_kept_aside() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join(TASK_LOG_FILE);
        fs::write(&log_path, "{\"sessions\": [{\"trunc").unwrap();
        let mut logger = TaskLogger::open(dir.path());
        assert!(logger.task_log().sessions.is_empty());
        logger.start_session(SessionPhase::Coding, 1).unwrap();

        assert_eq!(reload(dir.path()).sessions.len(), 1);
        assert_eq!(
            fs::read_to_string(backup_path(&log_path)).unwrap(),
            "{\"sessions\": [{\"trunc"
        );
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let mut logger = TaskLogger::open(dir.path());
        logger.start_session(SessionPhase::Coding, 1).unwrap();
        logger.info("state: building").unwrap();
        assert_eq!(logger.path(), dir.path().join(TASK_LOG_FILE));
        assert!(!dir.path().join("task_logs.json.tmp").exists());
        assert_eq!(reload(dir.path()).sessions[0].entries[0].kind, EntryKind::Info);
    }
}
