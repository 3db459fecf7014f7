use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::capability::{Capabilities, Capability};
use crate::error::UnitError;
use crate::options::Options;

/// Outputs of units that have already run, keyed by unit name.
pub type ContextView = BTreeMap<String, Value>;

/// What a unit receives when it runs.
///
/// Both halves are shared snapshots; units cannot modify the run context.
#[derive(Debug, Clone)]
pub struct UnitInput {
  /// The payload the run was started with.
  pub payload: Arc<Value>,
  /// Outputs of every unit that completed before this one started.
  pub context: Arc<ContextView>,
}

impl UnitInput {
  pub fn new(payload: Arc<Value>, context: Arc<ContextView>) -> Self {
    Self { payload, context }
  }

  /// Input with no prior outputs.
  pub fn from_payload(payload: Value) -> Self {
    Self::new(Arc::new(payload), Arc::new(ContextView::new()))
  }

  pub fn output_of(&self, unit: &str) -> Option<&Value> {
    self.context.get(unit)
  }
}

/// A named processing step the scheduler can run.
///
/// Lifecycle hooks other than `run` are optional. The scheduler calls a hook
/// only if the unit lists the matching [`Capability`]:
/// - `configure` for [`Capability::Configurable`]
/// - `set_output_dir` for [`Capability::PathAware`], after the directory exists
/// - `initialize` for [`Capability::Initializable`], once per run
#[async_trait]
pub trait UnitOfWork: Send + Sync {
  fn name(&self) -> &str;

  fn capabilities(&self) -> Capabilities {
    Capabilities::none().with(Capability::Configurable)
  }

  fn configure(&mut self, options: &Options) {
    let _ = options;
  }

  fn set_output_dir(&mut self, path: &Path) {
    let _ = path;
  }

  async fn initialize(&mut self) -> Result<(), UnitError> {
    Ok(())
  }

  /// Produce this unit's output.
  async fn run(&self, input: UnitInput) -> Result<Value, UnitError>;
}
