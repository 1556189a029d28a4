//! Orchestration states and the pure transitions between them.
//!
//! All run state is derived from disk (feature list and QA signoff), so a
//! resumed run rebuilds its starting point with [`initial_state`].

use crate::progress::Progress;
use crate::qa::QaVerdict;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// `max_iterations` build sessions ran without all tests passing.
    BudgetExhausted { iterations: u32 },
    /// QA produced no usable verdict. Not retried.
    QaError(String),
    /// `max_qa_iterations` QA sessions ran without an approval.
    QaBudgetExhausted { qa_sessions: u32 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::BudgetExhausted { iterations } => {
                write!(f, "reached max iterations ({})", iterations)
            }
            FailureReason::QaError(message) => write!(f, "QA error: {}", message),
            FailureReason::QaBudgetExhausted { qa_sessions } => {
                write!(f, "QA did not approve after {} review(s)", qa_sessions)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Building,
    QaReview,
    Done,
    Failed(FailureReason),
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Done | DriverState::Failed(_))
    }
}

/// Where a (possibly resumed) run starts.
pub fn initial_state(progress: Progress, already_approved: bool) -> DriverState {
    match (progress.is_complete(), already_approved) {
        (true, true) => DriverState::Done,
        (true, false) => DriverState::QaReview,
        (false, _) => DriverState::Building,
    }
}

/// Whether another build session fits in the budget.
pub fn build_budget_left(build_sessions: u32, max_iterations: Option<u32>) -> bool {
    max_iterations.is_none_or(|max| build_sessions < max)
}

/// Next state after a build session.
pub fn after_build(
    progress: Progress,
    build_sessions: u32,
    max_iterations: Option<u32>,
) -> DriverState {
    if progress.is_complete() {
        return DriverState::QaReview;
    }
    match max_iterations {
        Some(max) if build_sessions >= max => {
            DriverState::Failed(FailureReason::BudgetExhausted { iterations: max })
        }
        _ => DriverState::Building,
    }
}

/// Next state after a QA review.
pub fn after_qa(verdict: &QaVerdict, qa_sessions: u32, max_qa_iterations: u32) -> DriverState {
    match verdict {
        QaVerdict::Approved => DriverState::Done,
        QaVerdict::Rejected { .. } if qa_sessions >= max_qa_iterations => {
            DriverState::Failed(FailureReason::QaBudgetExhausted { qa_sessions })
        }
        QaVerdict::Rejected { .. } => DriverState::Building,
        QaVerdict::Error(message) => DriverState::Failed(FailureReason::QaError(message.clone())),
    }
}
