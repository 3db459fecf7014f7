//! Brine Review
//!
//! Quality gating for a brine run, in two layers:
//!
//! - [`FeedbackEvaluator`] scores each stage output against the stage's
//!   [`StageExpectation`] as soon as it is produced.
//! - [`ApprovalSupervisor`] combines the latest stage feedback, a check of
//!   the final report and optional user feedback into a weighted verdict.
//!
//! [`OutputValidator`] is the hook for hard, unit-specific checks that a
//! scheduler applies before accepting an output.

mod evaluator;
mod expectation;
mod report;
mod scoring;
mod supervisor;
mod validator;

pub use evaluator::{Evaluation, FeedbackEvaluator, FeedbackRecord};
pub use expectation::{StageExpectation, builtin_expectations};
pub use report::{ReportChecks, ReportHandle};
pub use scoring::{
  APPROVAL_THRESHOLD, AUTO_WEIGHT, MINOR_REVISION_FACTOR, QUALITY_WEIGHT, USER_WEIGHT,
  final_score, verdict,
};
pub use supervisor::{
  ApprovalStatus, ApprovalSupervisor, AutomatedReview, QualityEvaluation, ReviewResult,
  UserFeedback,
};
pub use validator::OutputValidator;
