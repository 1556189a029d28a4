use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::OrchestratorError;
use crate::project_config::AutoBuildToml;
use crate::spec::{AUTO_BUILD_DIR, SPEC_FILE};

pub const DEFAULT_MODEL: &str = "claude-opus-4-5-20251101";
pub const CREDENTIAL_VAR: &str = "CLAUDE_CODE_OAUTH_TOKEN";
pub const MODEL_VAR: &str = "AUTO_BUILD_MODEL";

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub model: Option<String>,
    pub max_iterations: Option<u32>,
    pub verbose: bool,
}

/// Runtime configuration for one orchestration run.
///
/// Built once per run and passed into each component. Each setting resolves
/// as CLI flag → environment → auto-build.toml → default, skipping sources
/// that do not carry it.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub spec_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub claude_cmd: String,
    pub model: String,
    pub skip_permissions: bool,
    /// Build-session budget; `None` runs until all tests pass.
    pub max_iterations: Option<u32>,
    pub max_qa_iterations: u32,
    pub session_delay: Duration,
    pub verbose: bool,
}

impl Config {
    pub fn new(project_dir: &Path, spec_dir: &Path, options: RunOptions) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let spec_dir = spec_dir
            .canonicalize()
            .context("Failed to resolve spec directory")?;

        let auto_build_dir = project_dir.join(AUTO_BUILD_DIR);
        let toml = AutoBuildToml::load_or_default(&auto_build_dir)?;
        for warning in toml.validate() {
            tracing::warn!("auto-build.toml: {}", warning);
        }

        let model = options
            .model
            .or_else(|| std::env::var(MODEL_VAR).ok().filter(|m| !m.trim().is_empty()))
            .or_else(|| toml.agent.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            prompts_dir: auto_build_dir.join("prompts"),
            claude_cmd: toml.claude_cmd(),
            skip_permissions: toml.skip_permissions(),
            max_iterations: options.max_iterations.or(toml.run.max_iterations),
            max_qa_iterations: toml.run.max_qa_iterations,
            session_delay: Duration::from_secs(toml.run.session_delay_secs),
            verbose: options.verbose,
            model,
            project_dir,
            spec_dir,
        })
    }

    /// Folder name of the spec, e.g. `001-initial-app`.
    pub fn spec_name(&self) -> String {
        self.spec_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn claude_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.skip_permissions {
            flags.push("--dangerously-skip-permissions".to_string());
        }
        flags.push("--print".to_string());
        flags.push("--output-format".to_string());
        flags.push("stream-json".to_string());
        flags.push("--verbose".to_string());
        flags.push("--model".to_string());
        flags.push(self.model.clone());
        flags
    }
}

/// Check run preconditions before any agent session starts.
pub fn validate_environment(spec_dir: &Path) -> Result<(), OrchestratorError> {
    let token = std::env::var(CREDENTIAL_VAR).unwrap_or_default();
    if token.trim().is_empty() {
        return Err(OrchestratorError::MissingCredential {
            var: CREDENTIAL_VAR,
        });
    }
    if !spec_dir.join(SPEC_FILE).is_file() {
        return Err(OrchestratorError::SpecFileMissing {
            dir: spec_dir.to_path_buf(),
        });
    }
    Ok(())
}
