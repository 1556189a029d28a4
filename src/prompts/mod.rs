//! Prompt construction for build and QA sessions.
//!
//! Templates are looked up in `auto-build/prompts/` so a project can tune
//! them; missing files fall back to the copies compiled into the binary.
//! Each template is followed by a generated context block.

use crate::errors::OrchestratorError;
use crate::progress::Progress;
use std::path::Path;

pub const INITIALIZER_TEMPLATE: &str = "initializer.md";
pub const CODER_TEMPLATE: &str = "coder.md";
pub const QA_REVIEWER_TEMPLATE: &str = "qa_reviewer.md";

const BUILTIN_INITIALIZER: &str = include_str!("../../prompts/initializer.md");
const BUILTIN_CODER: &str = include_str!("../../prompts/coder.md");
const BUILTIN_QA_REVIEWER: &str = include_str!("../../prompts/qa_reviewer.md");

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        INITIALIZER_TEMPLATE => Some(BUILTIN_INITIALIZER),
        CODER_TEMPLATE => Some(BUILTIN_CODER),
        QA_REVIEWER_TEMPLATE => Some(BUILTIN_QA_REVIEWER),
        _ => None,
    }
}

/// Load a template, preferring the project's override.
pub fn load_template(prompts_dir: &Path, name: &str) -> Result<String, OrchestratorError> {
    let path = prompts_dir.join(name);
    if path.is_file() {
        tracing::debug!(path = %path.display(), "using project prompt template");
        return std::fs::read_to_string(&path)
            .map_err(|source| OrchestratorError::PromptReadFailed { path, source });
    }
    builtin(name)
        .map(str::to_string)
        .ok_or_else(|| OrchestratorError::PromptReadFailed {
            path,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such template"),
        })
}

/// Everything a build session's prompt is assembled from.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub spec_dir: &'a Path,
    pub session_number: u32,
    pub progress: Progress,
    pub max_iterations: Option<u32>,
    /// Operator instructions from `HUMAN_INPUT.md`.
    pub human_input: Option<&'a str>,
    /// Issues from the most recent rejected QA review.
    pub qa_findings: Option<&'a str>,
}

impl BuildContext<'_> {
    /// The initializer runs until the agent has written test descriptors.
    pub fn template_name(&self) -> &'static str {
        if self.progress.is_uninitialized() {
            INITIALIZER_TEMPLATE
        } else {
            CODER_TEMPLATE
        }
    }
}

fn spec_location_hint(prompt: &mut String, spec_dir: &Path) {
    prompt.push_str(&format!(
        "\n**IMPORTANT**: All spec files (spec.md, feature_list.json, implementation_plan.json, etc.) are located in: `{}/`\n",
        spec_dir.display()
    ));
    prompt.push_str(&format!(
        "Use the full path when reading files, e.g.: `cat {}/spec.md`\n",
        spec_dir.display()
    ));
}

fn spec_name(spec_dir: &Path) -> String {
    spec_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn budget_label(max_iterations: Option<u32>) -> String {
    match max_iterations {
        Some(n) => n.to_string(),
        None => "unlimited".to_string(),
    }
}

/// Build the prompt for one build session.
pub fn build_prompt(prompts_dir: &Path, ctx: &BuildContext<'_>) -> Result<String, OrchestratorError> {
    let mut prompt = load_template(prompts_dir, ctx.template_name())?;

    prompt.push_str("\n\n---\n\n");
    prompt.push_str(&format!("**Session**: {}\n", ctx.session_number));
    prompt.push_str(&format!("**Spec Directory**: {}\n", ctx.spec_dir.display()));
    prompt.push_str(&format!("**Spec Name**: {}\n", spec_name(ctx.spec_dir)));
    prompt.push_str(&format!(
        "**Max Iterations**: {}\n",
        budget_label(ctx.max_iterations)
    ));
    if ctx.progress.is_uninitialized() {
        prompt.push_str("**Progress**: feature_list.json not initialized\n");
    } else {
        prompt.push_str(&format!(
            "**Progress**: {} tests passing\n",
            ctx.progress
        ));
    }
    spec_location_hint(&mut prompt, ctx.spec_dir);

    if let Some(input) = ctx.human_input {
        prompt.push_str("\n## HUMAN INPUT\n\n");
        prompt.push_str(
            "The operator paused the run and left these instructions. Follow them before anything else:\n\n",
        );
        prompt.push_str(input.trim());
        prompt.push('\n');
    }

    if let Some(findings) = ctx.qa_findings.filter(|f| !f.trim().is_empty()) {
        prompt.push_str("\n## QA FINDINGS\n\n");
        prompt.push_str("The last QA review rejected the build. Fix these issues first:\n\n");
        prompt.push_str(findings.trim());
        prompt.push('\n');
    }

    Ok(prompt)
}

/// Build the prompt for one QA review session.
pub fn qa_prompt(
    prompts_dir: &Path,
    spec_dir: &Path,
    qa_session: u32,
    max_iterations: u32,
) -> Result<String, OrchestratorError> {
    let mut prompt = load_template(prompts_dir, QA_REVIEWER_TEMPLATE)?;

    prompt.push_str("\n\n---\n\n");
    prompt.push_str(&format!("**QA Session**: {}\n", qa_session));
    prompt.push_str(&format!("**Spec Directory**: {}\n", spec_dir.display()));
    prompt.push_str(&format!("**Spec Name**: {}\n", spec_name(spec_dir)));
    prompt.push_str(&format!("**Max Iterations**: {}\n", max_iterations));
    spec_location_hint(&mut prompt, spec_dir);

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn ctx<'a>(spec_dir: &'a Path, progress: Progress) -> BuildContext<'a> {
        BuildContext {
            spec_dir,
            session_number: 2,
            progress,
            max_iterations: Some(5),
            human_input: None,
            qa_findings: None,
        }
    }

    #[test]
    fn test_builtin_templates_are_used_without_overrides() {
        let dir = tempdir().unwrap();
        let text = load_template(dir.path(), CODER_TEMPLATE).unwrap();
        assert_eq!(text, BUILTIN_CODER);
        assert!(load_template(dir.path(), "nope.md").is_err());
    }

    #[test]
    fn test_project_override_wins() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CODER_TEMPLATE), "custom coder").unwrap();
        assert_eq!(
            load_template(dir.path(), CODER_TEMPLATE).unwrap(),
            "custom coder"
        );
    }

    #[test]
    fn test_initializer_until_feature_list_exists() {
        let spec = PathBuf::from("/p/auto-build/specs/001-app");
        assert_eq!(
            ctx(&spec, Progress::new(0, 0)).template_name(),
            INITIALIZER_TEMPLATE
        );
        assert_eq!(
            ctx(&spec, Progress::new(0, 10)).template_name(),
            CODER_TEMPLATE
        );
    }

    #[test]
    fn test_build_prompt_context_block() {
        let dir = tempdir().unwrap();
        let spec = PathBuf::from("/p/auto-build/specs/001-app");
        let prompt = build_prompt(dir.path(), &ctx(&spec, Progress::new(3, 10))).unwrap();
        assert!(prompt.starts_with(BUILTIN_CODER));
        assert!(prompt.contains("**Session**: 2"));
        assert!(prompt.contains("**Spec Name**: 001-app"));
        assert!(prompt.contains("**Max Iterations**: 5"));
        assert!(prompt.contains("3/10 tests passing"));
        assert!(prompt.contains("cat /p/auto-build/specs/001-app/spec.md"));
        assert!(!prompt.contains("## HUMAN INPUT"));
        assert!(!prompt.contains("## QA FINDINGS"));
    }

    #[test]
    fn test_build_prompt_includes_steering_and_findings() {
        let dir = tempdir().unwrap();
        let spec = PathBuf::from("/p/auto-build/specs/001-app");
        let mut context = ctx(&spec, Progress::new(10, 10));
        context.human_input = Some("Use PostgreSQL, not SQLite.\n");
        context.qa_findings = Some("- Login accepts empty password");
        let prompt = build_prompt(dir.path(), &context).unwrap();
        assert!(prompt.contains("## HUMAN INPUT"));
        assert!(prompt.contains("Use PostgreSQL, not SQLite."));
        assert!(prompt.contains("## QA FINDINGS"));
        assert!(prompt.contains("Login accepts empty password"));
    }

    #[test]
    fn test_blank_findings_add_no_section() {
        let dir = tempdir().unwrap();
        let spec = PathBuf::from("/p/auto-build/specs/001-app");
        let mut context = ctx(&spec, Progress::new(4, 4));
        context.qa_findings = Some("  \n");
        let prompt = build_prompt(dir.path(), &context).unwrap();
        assert!(!prompt.contains("## QA FINDINGS"));
    }

    #[test]
    fn test_qa_prompt_metadata() {
        let dir = tempdir().unwrap();
        let spec = PathBuf::from("/p/auto-build/specs/002-api");
        let prompt = qa_prompt(dir.path(), &spec, 3, 50).unwrap();
        assert!(prompt.starts_with(BUILTIN_QA_REVIEWER));
        assert!(prompt.contains("**QA Session**: 3"));
        assert!(prompt.contains("**Spec Directory**: /p/auto-build/specs/002-api"));
        assert!(prompt.contains("**Spec Name**: 002-api"));
        assert!(prompt.contains("**Max Iterations**: 50"));
        assert!(prompt.contains("Use the full path"));
    }
}
