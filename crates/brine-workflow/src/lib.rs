//! Brine Workflow
//!
//! This crate provides the validated ("locked") representation of a brine
//! workflow. A locked workflow is an [`OrderedPlan`]: the stages exactly as
//! declared, plus the unit descriptors they reference, checked so that every
//! dependency is produced before it is consumed.
//!
//! Key differences from `brine-config`:
//! - every stage member is a declared unit, placed exactly once
//! - every dependency resolves to a unit that runs strictly earlier
//! - configuration sections are already merged into each unit's options
//! - no reordering happens; the declared stage order is the execution order

mod error;
mod graph;
mod lock;
mod plan;
mod retry;
mod stage;
mod unit;

pub use error::WorkflowError;
pub use graph::DependencyGraph;
pub use lock::lock;
pub use plan::OrderedPlan;
pub use retry::RetryPolicy;
pub use stage::StageDefinition;
pub use unit::{Invocation, UnitDescriptor};
