use std::collections::BTreeMap;
use std::sync::Arc;

use brine_unit::ContextView;
use serde::Serialize;
use serde_json::Value;

/// Outputs of completed units, keyed by unit name.
///
/// Grows monotonically and is only written by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunContext {
  outputs: BTreeMap<String, Value>,
}

impl RunContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, unit: &str) -> Option<&Value> {
    self.outputs.get(unit)
  }

  pub fn contains(&self, unit: &str) -> bool {
    self.outputs.contains_key(unit)
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }

  pub fn units(&self) -> impl Iterator<Item = &str> {
    self.outputs.keys().map(String::as_str)
  }

  /// Read-only copy handed to units.
  pub fn snapshot(&self) -> Arc<ContextView> {
    Arc::new(self.outputs.clone())
  }

  pub fn into_outputs(self) -> BTreeMap<String, Value> {
    self.outputs
  }

  /// Record a unit's output. Existing entries are never replaced.
  pub(crate) fn insert(&mut self, unit: &str, output: Value) -> bool {
    if self.outputs.contains_key(unit) {
      return false;
    }
    self.outputs.insert(unit.to_string(), output);
    true
  }
}

impl From<ContextView> for RunContext {
  fn from(outputs: ContextView) -> Self {
    Self { outputs }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_insert_is_monotonic() {
    let mut context = RunContext::new();

    assert!(context.insert("qc", json!({"n_valid": 9})));
    assert!(!context.insert("qc", json!({"n_valid": 0})));
    assert_eq!(context.get("qc"), Some(&json!({"n_valid": 9})));
  }

  #[test]
  fn test_snapshot_is_detached() {
    let mut context = RunContext::new();
    context.insert("ingest", json!([1, 2]));
    let snapshot = context.snapshot();

    context.insert("qc", json!({}));

    assert_eq!(snapshot.len(), 1);
    assert_eq!(context.len(), 2);
    assert_eq!(serde_json::to_value(&context).unwrap()["ingest"], json!([1, 2]));
  }
}
