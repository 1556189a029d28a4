pub mod git;

pub use git::GitTracker;

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct FileChangeSummary {
    pub files_added: Vec<PathBuf>,
    pub files_modified: Vec<PathBuf>,
    pub files_deleted: Vec<PathBuf>,
    pub total_lines_added: usize,
    pub total_lines_removed: usize,
}

impl FileChangeSummary {
    pub fn total_files(&self) -> usize {
        self.files_added.len() + self.files_modified.len() + self.files_deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_files() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_change_summary() {
        let mut summary = FileChangeSummary::default();
        assert!(summary.is_empty());

        summary.files_added.push(PathBuf::from("new.rs"));
        summary.files_modified.push(PathBuf::from("old.rs"));
        assert_eq!(summary.total_files(), 2);
    }
}
