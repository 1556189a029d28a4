use crate::tracker::FileChangeSummary;
use anyhow::{Context, Result};
use git2::{Delta, DiffOptions, Repository, Sort};
use std::path::Path;

/// Read-only view of the project repository.
///
/// The orchestrator never commits; the agent owns every write. This only
/// reports what changed while a session ran.
pub struct GitTracker {
    repo: Repository,
}

impl GitTracker {
    pub fn new(project_dir: &Path) -> Result<Self> {
        let repo = Repository::discover(project_dir).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    /// Open the repository if the project is under git, otherwise `None`.
    pub fn open(project_dir: &Path) -> Option<Self> {
        match Self::new(project_dir) {
            Ok(tracker) => Some(tracker),
            Err(e) => {
                tracing::debug!(error = %e, "git tracking disabled");
                None
            }
        }
    }

    /// Get the HEAD commit if it exists (returns None for unborn branches)
    fn get_head_commit(&self) -> Option<git2::Commit<'_>> {
        self.repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
    }

    /// Get current HEAD SHA (returns None for unborn branches)
    pub fn head_sha(&self) -> Option<String> {
        self.get_head_commit().map(|c| c.id().to_string())
    }

    /// `abc1234 commit summary` for the HEAD commit.
    pub fn head_summary(&self) -> Option<String> {
        let commit = self.get_head_commit()?;
        let id = commit.id().to_string();
        Some(format!(
            "{} {}",
            &id[..7.min(id.len())],
            commit.summary().unwrap_or("")
        ))
    }

    /// Number of commits reachable from HEAD but not from `base_sha`.
    pub fn commits_since(&self, base_sha: Option<&str>) -> Result<usize> {
        let Some(head) = self.get_head_commit() else {
            return Ok(0);
        };
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL)?;
        walk.push(head.id())?;
        if let Some(base) = base_sha {
            walk.hide(git2::Oid::from_str(base)?)?;
        }
        Ok(walk.filter_map(|oid| oid.ok()).count())
    }

    /// Compute changes between `base_sha` (or the empty tree) and the working directory.
    pub fn compute_changes(&self, base_sha: Option<&str>) -> Result<FileChangeSummary> {
        let base_tree = match base_sha {
            Some(sha) => {
                let oid = git2::Oid::from_str(sha)?;
                Some(self.repo.find_commit(oid)?.tree()?)
            }
            None => None,
        };

        let mut opts = DiffOptions::new();
        opts.include_untracked(true);

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(base_tree.as_ref(), Some(&mut opts))?;

        let mut summary = FileChangeSummary::default();

        diff.foreach(
            &mut |delta, _progress| {
                if let Some(path) = delta.new_file().path() {
                    let path_buf = path.to_path_buf();
                    match delta.status() {
                        Delta::Added | Delta::Untracked => summary.files_added.push(path_buf),
                        Delta::Modified => summary.files_modified.push(path_buf),
                        Delta::Deleted => summary.files_deleted.push(path_buf),
                        _ => {}
                    }
                }
                true
            },
            None,
            None,
            Some(&mut |_delta, _hunk, line| {
                match line.origin() {
                    '+' => summary.total_lines_added += 1,
                    '-' => summary.total_lines_removed += 1,
                    _ => {}
                }
                true
            }),
        )?;

        Ok(summary)
    }
}
