//! Reading the QA verdict the agent records in `implementation_plan.json`.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const IMPLEMENTATION_PLAN_FILE: &str = "implementation_plan.json";
pub const QA_NOT_UPDATED: &str = "QA agent did not update implementation_plan.json";

/// Characters of QA transcript used as findings when the signoff lists none.
const TRANSCRIPT_TAIL_CHARS: usize = 2_000;
/// Findings handed to the next build when the reviewer gave no detail at all.
pub const UNSPECIFIED_FINDINGS: &str =
    "QA rejected the build without listing issues. Re-run the full test suite and re-check every acceptance criterion in spec.md.";

/// Outcome of one QA review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QaVerdict {
    Approved,
    /// Rejected with the issues to hand to the next build session.
    Rejected { findings: String },
    /// No usable verdict. Never treated as a rejection.
    Error(String),
}

impl QaVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            QaVerdict::Approved => "approved",
            QaVerdict::Rejected { .. } => "rejected",
            QaVerdict::Error(_) => "error",
        }
    }
}

pub fn implementation_plan_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(IMPLEMENTATION_PLAN_FILE)
}

/// Last modification time of the plan, if it exists.
pub fn plan_modified(spec_dir: &Path) -> Option<SystemTime> {
    std::fs::metadata(implementation_plan_path(spec_dir))
        .and_then(|m| m.modified())
        .ok()
}

/// The `qa_signoff` object, if the plan exists, parses and has one.
pub fn read_qa_signoff(spec_dir: &Path) -> Option<Value> {
    let path = implementation_plan_path(spec_dir);
    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<Value>(&content) {
        Ok(plan) => plan.get("qa_signoff").filter(|s| !s.is_null()).cloned(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "implementation plan is not valid JSON");
            None
        }
    }
}

/// Classify a signoff object. Anything but an explicit approval or
/// rejection is an error.
pub fn classify_signoff(signoff: Option<&Value>) -> QaVerdict {
    let status = signoff
        .and_then(|s| s.get("status"))
        .and_then(|s| s.as_str());
    match status {
        Some("approved") => QaVerdict::Approved,
        Some("rejected") => QaVerdict::Rejected {
            findings: signoff.map(format_issues).unwrap_or_default(),
        },
        _ => QaVerdict::Error(QA_NOT_UPDATED.to_string()),
    }
}

/// Whether the spec already carries an approval.
pub fn is_approved(spec_dir: &Path) -> bool {
    classify_signoff(read_qa_signoff(spec_dir).as_ref()) == QaVerdict::Approved
}

/// Render `issues_found` as a bullet list.
pub fn format_issues(signoff: &Value) -> String {
    let Some(issues) = signoff.get("issues_found").and_then(|i| i.as_array()) else {
        return String::new();
    };
    issues
        .iter()
        .map(|issue| match issue {
            Value::String(s) => format!("- {}", s),
            Value::Object(_) => {
                let title = ["title", "description", "issue"]
                    .iter()
                    .find_map(|k| issue.get(*k).and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .unwrap_or_else(|| issue.to_string());
                match issue.get("location").and_then(|v| v.as_str()) {
                    Some(location) => format!("- {} ({})", title, location),
                    None => format!("- {}", title),
                }
            }
            other => format!("- {}", other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Findings for the next build prompt: listed issues, else the end of the
/// reviewer's transcript, else a generic instruction. Never blank.
pub fn findings_or_transcript(findings: String, transcript: &str) -> String {
    if !findings.trim().is_empty() {
        return findings;
    }
    let count = transcript.chars().count();
    let tail = transcript
        .chars()
        .skip(count.saturating_sub(TRANSCRIPT_TAIL_CHARS))
        .collect::<String>()
        .trim()
        .to_string();
    if tail.is_empty() {
        UNSPECIFIED_FINDINGS.to_string()
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_classify_approved_and_rejected() {
        assert_eq!(
            classify_signoff(Some(&json!({"status": "approved"}))),
            QaVerdict::Approved
        );
        match classify_signoff(Some(&json!({"status": "rejected"}))) {
            QaVerdict::Rejected { findings } => assert!(findings.is_empty()),
            other => panic!("expected rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_or_pending_signoff_is_error_not_rejection() {
        for signoff in [
            None,
            Some(json!({})),
            Some(json!({"status": "pending"})),
            Some(json!({"status": "APPROVED"})),
            Some(json!({"status": 1})),
        ] {
            assert_eq!(
                classify_signoff(signoff.as_ref()),
                QaVerdict::Error(QA_NOT_UPDATED.to_string())
            );
        }
    }

    #[test]
    fn test_read_qa_signoff_from_plan() {
        let dir = tempdir().unwrap();
        assert!(read_qa_signoff(dir.path()).is_none());

        std::fs::write(implementation_plan_path(dir.path()), "{ broken").unwrap();
        assert!(read_qa_signoff(dir.path()).is_none());

        std::fs::write(
            implementation_plan_path(dir.path()),
            r#"{"phases": [], "qa_signoff": null}"#,
        )
        .unwrap();
        assert!(read_qa_signoff(dir.path()).is_none());

        std::fs::write(
            implementation_plan_path(dir.path()),
            r#"{"phases": [], "qa_signoff": {"status": "approved"}}"#,
        )
        .unwrap();
        assert_eq!(
            read_qa_signoff(dir.path()),
            Some(json!({"status": "approved"}))
        );
        assert!(is_approved(dir.path()));
    }

    #[test]
    fn test_format_issues_variants() {
        let signoff = json!({
            "status": "rejected",
            "issues_found": [
                {"title": "Login accepts empty password", "location": "src/auth.rs"},
                {"description": "No pagination"},
                "Missing README"
            ]
        });
        assert_eq!(
            format_issues(&signoff),
            "- Login accepts empty password (src/auth.rs)\n- No pagination\n- Missing README"
        );
        match classify_signoff(Some(&signoff)) {
            QaVerdict::Rejected { findings } => assert!(findings.contains("src/auth.rs")),
            other => panic!("expected rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_findings_fall_back_to_transcript_tail() {
        assert_eq!(findings_or_transcript("- a".into(), "ignored"), "- a");
        assert_eq!(
            findings_or_transcript(String::new(), "  the tests are flaky  "),
            "the tests are flaky"
        );
        let long = "x".repeat(5_000);
        assert_eq!(
            findings_or_transcript(String::new(), &long).len(),
            TRANSCRIPT_TAIL_CHARS
        );
    }

    #[test]
    fn test_findings_never_blank() {
        assert_eq!(
            findings_or_transcript("  ".into(), " \n "),
            UNSPECIFIED_FINDINGS
        );
    }

    #[test]
    fn test_plan_modified_tracks_file() {
        let dir = tempdir().unwrap();
        assert!(plan_modified(dir.path()).is_none());
        std::fs::write(implementation_plan_path(dir.path()), "{}").unwrap();
        assert!(plan_modified(dir.path()).is_some());
    }
}
