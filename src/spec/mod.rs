//! Spec discovery: resolve `NNN-slug` folders under `auto-build/specs/`.

use crate::errors::OrchestratorError;
use crate::progress::{Progress, SpecStatus};
use std::path::{Path, PathBuf};

pub const AUTO_BUILD_DIR: &str = "auto-build";
pub const SPECS_DIR: &str = "specs";
pub const SPEC_FILE: &str = "spec.md";

/// Directory holding all spec folders for a project.
pub fn specs_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(AUTO_BUILD_DIR).join(SPECS_DIR)
}

/// A spec folder together with its tracked progress.
#[derive(Debug, Clone)]
pub struct SpecInfo {
    pub number: String,
    pub name: String,
    pub folder: String,
    pub path: PathBuf,
    pub status: SpecStatus,
    pub progress: Progress,
}

impl SpecInfo {
    /// Progress column for listings: `-` before a feature list exists.
    pub fn progress_label(&self) -> String {
        match self.status {
            SpecStatus::Pending => "-".to_string(),
            _ => self.progress.to_string(),
        }
    }
}

/// Split `"001-initial-app"` into `("001", "initial-app")`.
pub fn parse_folder_name(folder: &str) -> Option<(&str, &str)> {
    let (number, name) = folder.split_once('-')?;
    if number.is_empty() || name.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((number, name))
}

fn has_spec_file(dir: &Path) -> bool {
    dir.is_dir() && dir.join(SPEC_FILE).is_file()
}

/// Folder names under the specs directory, sorted.
fn sorted_folders(specs_dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(specs_dir) else {
        return Vec::new();
    };

    let mut folders: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            Some((name, p))
        })
        .collect();
    folders.sort_by(|a, b| a.0.cmp(&b.0));
    folders
}

/// List every valid spec in the project, sorted by folder name.
///
/// Folders without a numeric prefix or without `spec.md` are skipped.
pub fn list_specs(project_dir: &Path) -> Vec<SpecInfo> {
    sorted_folders(&specs_dir(project_dir))
        .into_iter()
        .filter_map(|(folder, path)| {
            let (number, name) = parse_folder_name(&folder)?;
            if !has_spec_file(&path) {
                return None;
            }
            let (status, progress) = SpecStatus::for_spec(&path);
            Some(SpecInfo {
                number: number.to_string(),
                name: name.to_string(),
                folder: folder.clone(),
                path,
                status,
                progress,
            })
        })
        .collect()
}

/// Resolve a spec identifier (`"001"` or `"001-feature-name"`) to its folder.
///
/// Exact folder names win; otherwise the numeric prefix is matched against
/// `NNN-` and the lexicographically first match is returned. Bare slugs
/// (`"feature-name"`) never match.
pub fn find_spec(project_dir: &Path, identifier: &str) -> Result<PathBuf, OrchestratorError> {
    let not_found = || OrchestratorError::SpecNotFound {
        identifier: identifier.to_string(),
    };

    let identifier = identifier.trim();
    if identifier.is_empty() || identifier.contains(['/', '\\']) || identifier.starts_with('.') {
        return Err(not_found());
    }

    let specs_dir = specs_dir(project_dir);
    let exact = specs_dir.join(identifier);
    if parse_folder_name(identifier).is_some() && has_spec_file(&exact) {
        return Ok(exact);
    }

    let mut matches = sorted_folders(&specs_dir).into_iter().filter(|(name, path)| {
        parse_folder_name(name).is_some_and(|(number, _)| number == identifier)
            && has_spec_file(path)
    });

    match matches.next() {
        Some((name, path)) => {
            if let Some((other, _)) = matches.next() {
                tracing::warn!(
                    identifier,
                    chosen = %name,
                    also_matched = %other,
                    "ambiguous spec prefix, using first match"
                );
            }
            Ok(path)
        }
        None => Err(not_found()),
    }
}
