use std::collections::BTreeSet;
use std::time::Duration;

use brine_config::FeedbackGate;
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Entry point the scheduler invokes on a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invocation {
  #[default]
  Analyze,
}

/// A unit of work as the plan sees it: identity, wiring and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDescriptor {
  pub name: String,
  #[serde(rename = "capability")]
  pub invocation: Invocation,
  /// Options handed to the unit's `configure`.
  pub config: serde_json::Map<String, serde_json::Value>,
  pub dependencies: BTreeSet<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  pub retry: RetryPolicy,
  #[serde(default)]
  pub gate: FeedbackGate,
}

impl UnitDescriptor {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      invocation: Invocation::Analyze,
      config: serde_json::Map::new(),
      dependencies: BTreeSet::new(),
      timeout_ms: None,
      retry: RetryPolicy::none(),
      gate: FeedbackGate::Continue,
    }
  }

  pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
    self.dependencies.insert(dependency.into());
    self
  }

  pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.timeout_ms = Some(timeout_ms);
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_gate(mut self, gate: FeedbackGate) -> Self {
    self.gate = gate;
    self
  }

  pub fn with_config(mut self, config: serde_json::Map<String, serde_json::Value>) -> Self {
    self.config = config;
    self
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }
}
