//! Project-level configuration file for auto-build.
//!
//! Reads `auto-build/auto-build.toml`. Every field is optional; values left out
//! fall back to environment variables and then to built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [agent]
//! claude_cmd = "claude"
//! model = "claude-opus-4-5-20251101"
//! skip_permissions = true
//!
//! [run]
//! max_iterations = 25
//! max_qa_iterations = 50
//! session_delay_secs = 3
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "auto-build.toml";

/// Agent invocation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSection {
    /// Claude CLI command (default: "claude")
    #[serde(default)]
    pub claude_cmd: Option<String>,
    /// Model passed to the agent
    #[serde(default)]
    pub model: Option<String>,
    /// Whether to pass --dangerously-skip-permissions
    #[serde(default)]
    pub skip_permissions: Option<bool>,
}

/// Orchestration loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Build-session budget; unset means run until all tests pass
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Cap on QA review sessions
    #[serde(default = "default_max_qa_iterations")]
    pub max_qa_iterations: u32,
    /// Pause between sessions
    #[serde(default = "default_session_delay_secs")]
    pub session_delay_secs: u64,
}

fn default_max_qa_iterations() -> u32 {
    50
}

fn default_session_delay_secs() -> u64 {
    3
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_iterations: None,
            max_qa_iterations: default_max_qa_iterations(),
            session_delay_secs: default_session_delay_secs(),
        }
    }
}

/// The complete auto-build.toml configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoBuildToml {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub run: RunSection,
}

impl AutoBuildToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse auto-build.toml")
    }

    /// Load from `<auto_build_dir>/auto-build.toml`, or defaults when absent.
    pub fn load_or_default(auto_build_dir: &Path) -> Result<Self> {
        let config_path = auto_build_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the Claude command (env → file → default).
    pub fn claude_cmd(&self) -> String {
        self.resolve_claude_cmd(std::env::var("CLAUDE_CMD").ok())
    }

    fn resolve_claude_cmd(&self, env: Option<String>) -> String {
        env.filter(|cmd| !cmd.trim().is_empty())
            .or_else(|| self.agent.claude_cmd.clone())
            .unwrap_or_else(|| "claude".to_string())
    }

    /// Get skip_permissions (env → file → default).
    pub fn skip_permissions(&self) -> bool {
        self.resolve_skip_permissions(std::env::var("SKIP_PERMISSIONS").ok())
    }

    fn resolve_skip_permissions(&self, env: Option<String>) -> bool {
        match env {
            Some(value) => value != "false",
            None => self.agent.skip_permissions.unwrap_or(true),
        }
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.run.max_iterations == Some(0) {
            warnings.push(
                "run.max_iterations = 0 allows no build sessions; remove it to run until complete"
                    .to_string(),
            );
        }
        if self.run.max_qa_iterations == 0 {
            warnings.push("run.max_qa_iterations = 0 disables QA review entirely".to_string());
        }
        if let Some(model) = &self.agent.model
            && model.trim().is_empty()
        {
            warnings.push("agent.model is empty".to_string());
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempdir().unwrap();
        let cfg = AutoBuildToml::load_or_default(dir.path()).unwrap();
        assert!(cfg.run.max_iterations.is_none());
        assert_eq!(cfg.run.max_qa_iterations, 50);
        assert_eq!(cfg.run.session_delay_secs, 3);
        assert!(cfg.agent.model.is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let cfg = AutoBuildToml::parse(
            r#"
            [agent]
            claude_cmd = "/opt/claude"
            model = "claude-sonnet"
            skip_permissions = false

            [run]
            max_iterations = 7
            max_qa_iterations = 4
            session_delay_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.agent.claude_cmd.as_deref(), Some("/opt/claude"));
        assert_eq!(cfg.claude_cmd(), "/opt/claude");
        assert_eq!(cfg.agent.model.as_deref(), Some("claude-sonnet"));
        assert_eq!(cfg.run.max_iterations, Some(7));
        assert_eq!(cfg.run.max_qa_iterations, 4);
        assert_eq!(cfg.run.session_delay_secs, 0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = AutoBuildToml::parse("[run]\nmax_iterations = 2\n").unwrap();
        assert_eq!(cfg.run.max_iterations, Some(2));
        assert_eq!(cfg.run.max_qa_iterations, 50);
        assert_eq!(cfg.run.session_delay_secs, 3);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = AutoBuildToml::parse("[run\nmax_iterations = ").unwrap_err();
        assert!(err.to_string().contains("auto-build.toml"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[agent]\nmodel = \"m\"\n").unwrap();
        let cfg = AutoBuildToml::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.agent.model.as_deref(), Some("m"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let cfg = AutoBuildToml::parse(
            "[agent]\nclaude_cmd = \"/opt/claude\"\nskip_permissions = false\n",
        )
        .unwrap();
        assert_eq!(cfg.resolve_claude_cmd(None), "/opt/claude");
        assert_eq!(cfg.resolve_claude_cmd(Some("./fake".into())), "./fake");
        assert_eq!(cfg.resolve_claude_cmd(Some(" ".into())), "/opt/claude");
        assert!(!cfg.resolve_skip_permissions(None));
        assert!(cfg.resolve_skip_permissions(Some("true".into())));

        let defaults = AutoBuildToml::default();
        assert_eq!(defaults.resolve_claude_cmd(None), "claude");
        assert!(defaults.resolve_skip_permissions(None));
        assert!(!defaults.resolve_skip_permissions(Some("false".into())));
    }

    #[test]
    fn test_validate_warnings() {
        let mut cfg = AutoBuildToml::default();
        assert!(cfg.validate().is_empty());

        cfg.run.max_iterations = Some(0);
        cfg.run.max_qa_iterations = 0;
        cfg.agent.model = Some("  ".into());
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("max_iterations"));
    }
}
