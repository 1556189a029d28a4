//! Operator steering after an interruption.
//!
//! The only channel into a resumed run is `HUMAN_INPUT.md` in the spec
//! folder: written here, read into the next build prompt, and removed once
//! a build session has used it successfully.

use crate::errors::OrchestratorError;
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub const HUMAN_INPUT_FILE: &str = "HUMAN_INPUT.md";

/// The operator's answer to the steering menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringChoice {
    /// Type (or paste) instructions, ended by an empty line.
    Type,
    /// Read instructions from a file.
    File,
    Skip,
    /// Stop without printing resume instructions.
    Quit,
}

impl SteeringChoice {
    /// Anything unrecognised means skip.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "1" | "2" | "y" | "yes" => SteeringChoice::Type,
            "3" => SteeringChoice::File,
            "q" => SteeringChoice::Quit,
            _ => SteeringChoice::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteeringOutcome {
    Saved(PathBuf),
    NoInput,
    Quit,
}

pub fn human_input_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(HUMAN_INPUT_FILE)
}

/// Read lines until the first empty line or end of input.
pub fn read_typed_instructions<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader
            .read_line(&mut line)
            .context("Failed to read instructions")?
            == 0
        {
            break;
        }
        let text = line.trim_end_matches(['\n', '\r']);
        if text.is_empty() {
            break;
        }
        lines.push(text.to_string());
    }
    Ok(lines.join("\n").trim().to_string())
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Read instructions from the file named on the first line of `reader`.
///
/// A blank answer, a missing file or an unreadable file yields empty input.
pub fn read_instructions_file<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut answer = String::new();
    reader
        .read_line(&mut answer)
        .context("Failed to read file path")?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(String::new());
    }

    let path = expand_home(answer);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(content.trim().to_string()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read instructions file");
            Ok(String::new())
        }
    }
}

pub fn save_human_input(spec_dir: &Path, text: &str) -> Result<PathBuf, OrchestratorError> {
    let path = human_input_path(spec_dir);
    std::fs::write(&path, text)
        .map_err(|source| OrchestratorError::HumanInputWriteFailed {
            path: path.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), "saved human input");
    Ok(path)
}

/// Pending instructions, if any. Blank files count as none.
pub fn read_human_input(spec_dir: &Path) -> Option<String> {
    std::fs::read_to_string(human_input_path(spec_dir))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Remove instructions a build session has acted on.
pub fn consume_human_input(spec_dir: &Path) -> Result<()> {
    let path = human_input_path(spec_dir);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        tracing::info!(path = %path.display(), "consumed human input");
    }
    Ok(())
}

/// Run the steering sub-protocol for an already-chosen option.
pub fn collect_steering<R: BufRead>(
    choice: SteeringChoice,
    reader: &mut R,
    spec_dir: &Path,
) -> Result<SteeringOutcome> {
    let text = match choice {
        SteeringChoice::Quit => return Ok(SteeringOutcome::Quit),
        SteeringChoice::Skip => String::new(),
        SteeringChoice::Type => read_typed_instructions(reader)?,
        SteeringChoice::File => read_instructions_file(reader)?,
    };

    if text.is_empty() {
        return Ok(SteeringOutcome::NoInput);
    }
    let path = save_human_input(spec_dir, &text)?;
    Ok(SteeringOutcome::Saved(path))
}
