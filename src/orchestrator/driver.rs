use crate::agent::Agent;
use crate::audit::{SessionPhase, TaskLogger};
use crate::config::Config;
use crate::orchestrator::state::{self, DriverState, FailureReason};
use crate::progress::{Progress, count_passing_tests};
use crate::prompts::{self, BuildContext};
use crate::qa::{self, QaVerdict};
use crate::session::{self, SessionStatus};
use crate::steering;
use crate::tracker::GitTracker;
use crate::ui::ConsoleUI;
use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    Failed(FailureReason),
    /// Stopped by the operator; resumable from disk.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub build_sessions: u32,
    pub qa_sessions: u32,
    pub progress: Progress,
}

/// Alternates build and QA sessions against one spec until the run
/// converges, fails or is interrupted.
pub struct Orchestrator<'a> {
    agent: &'a dyn Agent,
    config: &'a Config,
    ui: &'a ConsoleUI,
    build_sessions: AtomicU32,
    qa_sessions: AtomicU32,
}

impl<'a> Orchestrator<'a> {
    pub fn new(agent: &'a dyn Agent, config: &'a Config, ui: &'a ConsoleUI) -> Self {
        Self {
            agent,
            config,
            ui,
            build_sessions: AtomicU32::new(0),
            qa_sessions: AtomicU32::new(0),
        }
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            outcome,
            build_sessions: self.build_sessions.load(Ordering::SeqCst),
            qa_sessions: self.qa_sessions.load(Ordering::SeqCst),
            progress: count_passing_tests(&self.config.spec_dir),
        }
    }

    /// Run until done or failed, or until `interrupt` resolves.
    ///
    /// On interrupt the loop future is dropped, which kills any running
    /// agent process; only what the agent already wrote survives.
    pub async fn run_until(&self, interrupt: impl Future<Output = ()>) -> Result<RunSummary> {
        tokio::select! {
            result = self.run() => result,
            _ = interrupt => {
                tracing::warn!(
                    build_sessions = self.build_sessions.load(Ordering::SeqCst),
                    qa_sessions = self.qa_sessions.load(Ordering::SeqCst),
                    "run interrupted"
                );
                Ok(self.summary(RunOutcome::Interrupted))
            }
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let spec_dir = &self.config.spec_dir;
        let mut logger = TaskLogger::open(spec_dir);
        tracing::debug!(task_log = %logger.path().display(), "task log opened");
        let git = GitTracker::open(&self.config.project_dir);
        let mut qa_findings: Option<String> = None;

        let progress = count_passing_tests(spec_dir);
        let mut state = state::initial_state(progress, qa::is_approved(spec_dir));
        tracing::info!(spec = %self.config.spec_name(), %progress, ?state, "starting run");

        match state {
            DriverState::Done => {
                self.ui
                    .success("All tests pass and QA already approved this spec. Nothing to do.");
            }
            DriverState::QaReview => {
                self.ui
                    .info("\nAll tests already pass. Resuming with QA review.");
            }
            _ => {
                if !progress.is_uninitialized() {
                    self.ui.progress_summary(progress);
                }
            }
        }

        while !state.is_terminal() {
            state = match state {
                DriverState::Building => {
                    self.build_step(&mut logger, git.as_ref(), &mut qa_findings)
                        .await?
                }
                DriverState::QaReview => self.qa_step(&mut logger, &mut qa_findings).await?,
                terminal => terminal,
            };
            tracing::info!(?state, "state transition");

            if !state.is_terminal() {
                self.ui
                    .pause(self.config.session_delay, "Preparing next session...")
                    .await;
            }
        }

        let outcome = match state {
            DriverState::Failed(reason) => RunOutcome::Failed(reason),
            _ => RunOutcome::Done,
        };
        Ok(self.summary(outcome))
    }

    fn next_session_number(logger: &TaskLogger) -> u32 {
        logger.task_log().sessions.len() as u32 + 1
    }

    async fn build_step(
        &self,
        logger: &mut TaskLogger,
        git: Option<&GitTracker>,
        qa_findings: &mut Option<String>,
    ) -> Result<DriverState> {
        let config = self.config;
        let built = self.build_sessions.load(Ordering::SeqCst);
        if !state::build_budget_left(built, config.max_iterations) {
            let iterations = config.max_iterations.unwrap_or(built);
            return Ok(DriverState::Failed(FailureReason::BudgetExhausted {
                iterations,
            }));
        }

        let progress = count_passing_tests(&config.spec_dir);
        let human_input = steering::read_human_input(&config.spec_dir);
        let session_number = Self::next_session_number(logger);
        let ctx = BuildContext {
            spec_dir: &config.spec_dir,
            session_number,
            progress,
            max_iterations: config.max_iterations,
            human_input: human_input.as_deref(),
            qa_findings: qa_findings.as_deref(),
        };
        let prompt = prompts::build_prompt(&config.prompts_dir, &ctx)?;

        let label = if progress.is_uninitialized() {
            "INITIALIZER"
        } else if qa_findings.is_some() {
            "CODING (QA FIXES)"
        } else {
            "CODING"
        };
        self.ui.session_header(session_number, label, false);
        if human_input.is_some() {
            self.ui
                .info("Including operator instructions from HUMAN_INPUT.md\n");
        }

        let base_sha = git.and_then(|g| g.head_sha());
        let result = session::run_session(
            self.agent,
            &prompt,
            SessionPhase::Coding,
            session_number,
            self.ui,
            logger,
        )
        .await;
        let build_sessions = self.build_sessions.fetch_add(1, Ordering::SeqCst) + 1;

        match &result.status {
            SessionStatus::Completed => {
                if human_input.is_some() {
                    match steering::consume_human_input(&config.spec_dir) {
                        Ok(()) => note(logger, "Operator instructions consumed"),
                        Err(e) => tracing::warn!(error = %e, "failed to remove HUMAN_INPUT.md"),
                    }
                }
                *qa_findings = None;
            }
            SessionStatus::Error(message) => {
                tracing::warn!(session = session_number, error = %message, "build session failed");
                self.ui
                    .warn("Build session ended with an error; the next session will retry.");
            }
        }

        if let Some(git) = git {
            match (
                git.compute_changes(base_sha.as_deref()),
                git.commits_since(base_sha.as_deref()),
            ) {
                (Ok(changes), Ok(commits)) => self.ui.file_changes(&changes, commits),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::debug!(error = %e, "could not compute git changes")
                }
            }
        }

        let progress = count_passing_tests(&config.spec_dir);
        self.ui.progress_summary(progress);
        tracing::info!(session = session_number, build_sessions, %progress, "build session finished");

        let next = state::after_build(progress, build_sessions, config.max_iterations);
        note(logger, &format!("Progress {}, next: {:?}", progress, next));
        Ok(next)
    }

    async fn qa_step(
        &self,
        logger: &mut TaskLogger,
        qa_findings: &mut Option<String>,
    ) -> Result<DriverState> {
        let config = self.config;
        let done = self.qa_sessions.load(Ordering::SeqCst);
        if done >= config.max_qa_iterations {
            return Ok(DriverState::Failed(FailureReason::QaBudgetExhausted {
                qa_sessions: done,
            }));
        }

        let qa_session = self.qa_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        let session_number = Self::next_session_number(logger);
        let verdict = qa::run_qa_session(
            self.agent,
            config,
            qa_session,
            session_number,
            self.ui,
            logger,
        )
        .await?;

        match &verdict {
            QaVerdict::Approved => self.ui.success("QA APPROVED"),
            QaVerdict::Rejected { findings } => {
                self.ui.warn("QA REJECTED: returning to build with findings");
                *qa_findings = Some(findings.clone());
            }
            QaVerdict::Error(message) => self.ui.error(&format!("QA ERROR: {}", message)),
        }

        let next = state::after_qa(&verdict, qa_session, config.max_qa_iterations);
        note(
            logger,
            &format!("QA verdict: {}, next: {:?}", verdict.label(), next),
        );
        Ok(next)
    }
}

/// Append an orchestrator note to the session that just ended.
fn note(logger: &mut TaskLogger, message: &str) {
    if let Err(e) = logger.info(message) {
        tracing::warn!(error = %e, "failed to write task log");
    }
}
