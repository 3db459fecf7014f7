//! Brine Unit
//!
//! The contract between the scheduler and the processing steps it runs.
//! A unit of work is opaque to the orchestrator: it receives the run's
//! payload plus the outputs of earlier units and returns one JSON payload or
//! fails. Optional lifecycle hooks are declared through [`Capabilities`]
//! rather than discovered at run time.

mod capability;
mod command;
mod error;
mod options;
mod registry;
mod unit;

pub use capability::{Capabilities, Capability};
pub use command::CommandUnit;
pub use error::{RegistryError, UnitError};
pub use options::{Options, merge_options};
pub use registry::UnitRegistry;
pub use unit::{ContextView, UnitInput, UnitOfWork};
