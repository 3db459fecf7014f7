//! Brine Config
//!
//! This crate contains the serializable workflow configuration types for brine.
//! These types represent a workflow file before it is locked and validated into
//! an ordered plan.
//!
//! A workflow file declares:
//! - the units of work and their dependencies
//! - the stages that group units into sequential or parallel batches
//! - run settings (timeouts, worker count, artifact locations)
//! - configuration sections forwarded verbatim to units
//! - optional per-stage feedback expectations

mod enums;
mod expectation;
mod settings;
mod stage;
mod unit;
mod workflow;

pub use enums::{FeedbackGate, RetryBackoff};
pub use expectation::{ConsistencyRule, ExpectationDef, QualityRule, ThresholdsDef};
pub use settings::{DEFAULT_REQUIRED_ARTIFACTS, DEFAULT_MAX_WORKERS, ReportDef, RunSettings};
pub use stage::StageDef;
pub use unit::{CommandDef, RetryDef, UnitDef};
pub use workflow::{RECOGNIZED_SECTIONS, Sections, WorkflowDef};
