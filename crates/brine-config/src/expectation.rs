use serde::{Deserialize, Serialize};

/// What a stage's output is expected to look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationDef {
  #[serde(default)]
  pub expected_keys: Vec<String>,
  #[serde(default)]
  pub quality: QualityRule,
  #[serde(default)]
  pub consistency: ConsistencyRule,
  #[serde(default)]
  pub thresholds: ThresholdsDef,
}

/// How the quality finding of a stage output is derived.
///
/// Pointers are JSON pointers (RFC 6901) into the output payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum QualityRule {
  /// 1.0 when the output carries any data, 0.0 otherwise.
  #[default]
  NonEmpty,
  /// Ratio of two counters, e.g. valid samples over total samples.
  PassRatio { passed: String, total: String },
  /// Mean absolute value of the numbers found under the pointer.
  CorrelationStrength { pointer: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ConsistencyRule {
  #[default]
  Unchecked,
  /// Fraction of the arrays whose length equals the declared count.
  CountMatchesLength { count: String, arrays: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsDef {
  #[serde(default = "default_completeness")]
  pub completeness: f64,
  #[serde(default = "default_quality")]
  pub quality: f64,
  #[serde(default = "default_consistency")]
  pub consistency: f64,
}

impl Default for ThresholdsDef {
  fn default() -> Self {
    Self {
      completeness: default_completeness(),
      quality: default_quality(),
      consistency: default_consistency(),
    }
  }
}

fn default_completeness() -> f64 {
  1.0
}

fn default_quality() -> f64 {
  0.5
}

fn default_consistency() -> f64 {
  1.0
}
