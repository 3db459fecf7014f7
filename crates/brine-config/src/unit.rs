use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{FeedbackGate, RetryBackoff};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
  pub name: String,
  /// External program backing this unit. Units registered in-process leave this empty.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub command: Option<CommandDef>,
  #[serde(default)]
  pub dependencies: Vec<String>,
  /// Name of the top-level section forwarded to `configure`. Defaults to the
  /// section named after the unit, when there is one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub section: Option<String>,
  /// Unit-level options, merged over the section.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub options: serde_json::Map<String, serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry: Option<RetryDef>,
  /// Whether feedback issues on this unit's output stop the run.
  #[serde(default)]
  pub on_feedback_issues: FeedbackGate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDef {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryDef {
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  #[serde(default = "default_initial_delay_ms")]
  pub initial_delay_ms: u64,
  #[serde(default)]
  pub backoff: RetryBackoff,
}

impl Default for RetryDef {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      initial_delay_ms: default_initial_delay_ms(),
      backoff: RetryBackoff::default(),
    }
  }
}

fn default_max_attempts() -> u32 {
  1
}

fn default_initial_delay_ms() -> u64 {
  2_000
}
