//! QA review: a session variant that checks the build against the acceptance
//! criteria and reads back the verdict the agent records.

pub mod criteria;

pub use criteria::{
    QA_NOT_UPDATED, QaVerdict, classify_signoff, is_approved, plan_modified, read_qa_signoff,
};

use crate::agent::Agent;
use crate::audit::{SessionPhase, TaskLogger};
use crate::config::Config;
use crate::errors::OrchestratorError;
use crate::prompts;
use crate::session::{self, SessionStatus};
use crate::ui::ConsoleUI;

/// Run one QA review session and classify its outcome.
///
/// A plan the session never wrote (same modification time as before it
/// started) counts as "not updated", so a verdict from an earlier review is
/// never reused. A rewritten plan is classified on its content alone, even
/// when it repeats the previous verdict.
pub async fn run_qa_session(
    agent: &dyn Agent,
    config: &Config,
    qa_session: u32,
    session_number: u32,
    ui: &ConsoleUI,
    logger: &mut TaskLogger,
) -> Result<QaVerdict, OrchestratorError> {
    let prompt = prompts::qa_prompt(
        &config.prompts_dir,
        &config.spec_dir,
        qa_session,
        config.max_qa_iterations,
    )?;
    let before = plan_modified(&config.spec_dir);

    ui.session_header(
        session_number,
        &format!("QA REVIEW {}", qa_session),
        true,
    );
    ui.info("  Validating all acceptance criteria...\n");

    let result = session::run_session(
        agent,
        &prompt,
        SessionPhase::Validation,
        session_number,
        ui,
        logger,
    )
    .await;

    if let SessionStatus::Error(message) = result.status {
        tracing::error!(qa_session, error = %message, "QA session failed");
        return Ok(QaVerdict::Error(message));
    }

    if before.is_some() && plan_modified(&config.spec_dir) == before {
        tracing::error!(qa_session, "implementation plan not written by review session");
        return Ok(QaVerdict::Error(QA_NOT_UPDATED.to_string()));
    }

    let signoff = read_qa_signoff(&config.spec_dir);
    let verdict = match classify_signoff(signoff.as_ref()) {
        QaVerdict::Rejected { findings } => QaVerdict::Rejected {
            findings: criteria::findings_or_transcript(findings, &result.transcript),
        },
        other => other,
    };
    tracing::info!(qa_session, verdict = verdict.label(), "QA review finished");
    Ok(verdict)
}
