//! Progress tracking over a spec's `feature_list.json`.
//!
//! The feature list is written by the coding agent and only ever read here.
//! A missing or half-written file is never an error: it simply means the run
//! has not converged yet.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

pub const FEATURE_LIST_FILE: &str = "feature_list.json";

/// Pass/fail counts over the feature list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub passing: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(passing: usize, total: usize) -> Self {
        Self { passing, total }
    }

    /// `(0, 0)`: the agent has not produced any test descriptors yet.
    pub fn is_uninitialized(&self) -> bool {
        self.total == 0
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.passing == self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passing as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.passing, self.total)
    }
}

/// One acceptance test descriptor. Only `passes` matters to the tracker.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub passes: Value,
}

impl Feature {
    pub fn is_passing(&self) -> bool {
        self.passes.as_bool().unwrap_or(false)
    }
}

/// Accepted on-disk shapes: a bare array, or an object wrapping the array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureListFile {
    List(Vec<Feature>),
    Wrapped { features: Vec<Feature> },
}

pub fn feature_list_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(FEATURE_LIST_FILE)
}

/// Parse feature-list content. Returns `None` when the content is not a feature list.
pub fn parse_feature_list(content: &str) -> Option<Vec<Feature>> {
    match serde_json::from_str::<FeatureListFile>(content).ok()? {
        FeatureListFile::List(features) => Some(features),
        FeatureListFile::Wrapped { features } => Some(features),
    }
}

/// Count `(passing, total)` tests in a spec directory.
///
/// Absent and malformed files both yield `(0, 0)`.
pub fn count_passing_tests(spec_dir: &Path) -> Progress {
    let path = feature_list_path(spec_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Progress::default(),
    };

    match parse_feature_list(&content) {
        Some(features) => Progress::new(
            features.iter().filter(|f| f.is_passing()).count(),
            features.len(),
        ),
        None => {
            tracing::debug!(path = %path.display(), "feature list unreadable, treating as 0/0");
            Progress::default()
        }
    }
}

/// Lifecycle status of a spec as seen through its feature list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecStatus {
    /// No feature list on disk yet.
    Pending,
    /// Feature list exists but holds no tests.
    Initialized,
    InProgress,
    Complete,
}

impl SpecStatus {
    pub fn from_progress(progress: Progress) -> Self {
        if progress.is_uninitialized() {
            SpecStatus::Initialized
        } else if progress.is_complete() {
            SpecStatus::Complete
        } else {
            SpecStatus::InProgress
        }
    }

    pub fn for_spec(spec_dir: &Path) -> (Self, Progress) {
        if !feature_list_path(spec_dir).exists() {
            return (SpecStatus::Pending, Progress::default());
        }
        let progress = count_passing_tests(spec_dir);
        (Self::from_progress(progress), progress)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SpecStatus::Complete => "[OK]",
            SpecStatus::InProgress => "[..]",
            SpecStatus::Initialized => "[--]",
            SpecStatus::Pending => "[  ]",
        }
    }
}

impl fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecStatus::Pending => write!(f, "pending"),
            SpecStatus::Initialized => write!(f, "initialized"),
            SpecStatus::InProgress => write!(f, "in_progress"),
            SpecStatus::Complete => write!(f, "complete"),
        }
    }
}
