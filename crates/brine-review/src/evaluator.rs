use std::collections::BTreeMap;

use brine_config::{ConsistencyRule, QualityRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expectation::{StageExpectation, builtin_expectations};

/// The three findings for one stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
  pub completeness: f64,
  pub quality: f64,
  pub consistency: f64,
  pub issues: Vec<String>,
}

/// Evaluation of one stage output at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
  pub stage: String,
  pub timestamp: DateTime<Utc>,
  pub evaluation: Evaluation,
  pub quality_metrics: BTreeMap<String, f64>,
}

/// Scores stage outputs against per-stage expectations.
///
/// Evaluation is a pure function of the expectation, the output and the
/// timestamp.
#[derive(Debug, Clone)]
pub struct FeedbackEvaluator {
  expectations: BTreeMap<String, StageExpectation>,
  fallback: StageExpectation,
}

impl FeedbackEvaluator {
  /// Evaluator with the built-in ocean-analysis expectations.
  pub fn new() -> Self {
    Self {
      expectations: builtin_expectations(),
      fallback: catch_all(),
    }
  }

  /// Evaluator with no stage-specific expectations.
  pub fn empty() -> Self {
    Self {
      expectations: BTreeMap::new(),
      fallback: catch_all(),
    }
  }

  /// Replace or add expectations by stage name.
  pub fn with_expectations(mut self, overrides: &BTreeMap<String, StageExpectation>) -> Self {
    for (stage, expectation) in overrides {
      self.expectations.insert(stage.clone(), expectation.clone());
    }
    self
  }

  pub fn set_expectation(&mut self, stage: impl Into<String>, expectation: StageExpectation) {
    self.expectations.insert(stage.into(), expectation);
  }

  pub fn expectation(&self, stage: &str) -> &StageExpectation {
    self.expectations.get(stage).unwrap_or(&self.fallback)
  }

  pub fn evaluate(&self, stage: &str, output: &Value) -> FeedbackRecord {
    self.evaluate_at(stage, output, Utc::now())
  }

  pub fn evaluate_at(&self, stage: &str, output: &Value, timestamp: DateTime<Utc>) -> FeedbackRecord {
    let expectation = self.expectation(stage);
    let mut metrics = BTreeMap::new();
    let mut issues = Vec::new();

    let missing: Vec<&String> = expectation
      .expected_keys
      .iter()
      .filter(|key| output.get(key.as_str()).is_none())
      .collect();
    for key in &missing {
      issues.push(format!("missing expected key '{}'", key));
    }
    let completeness = if expectation.expected_keys.is_empty() {
      1.0
    } else {
      let expected = expectation.expected_keys.len();
      (expected - missing.len()) as f64 / expected as f64
    };

    let quality = score_quality(&expectation.quality, output, &mut metrics, &mut issues);
    let consistency = score_consistency(&expectation.consistency, output, &mut metrics, &mut issues);

    let thresholds = &expectation.thresholds;
    for (name, value, threshold) in [
      ("completeness", completeness, thresholds.completeness),
      ("quality", quality, thresholds.quality),
      ("consistency", consistency, thresholds.consistency),
    ] {
      if value < threshold {
        issues.push(format!(
          "{} {:.2} below threshold {:.2}",
          name, value, threshold
        ));
      }
      metrics.insert(name.to_string(), value);
    }

    FeedbackRecord {
      stage: stage.to_string(),
      timestamp,
      evaluation: Evaluation {
        completeness,
        quality,
        consistency,
        issues,
      },
      quality_metrics: metrics,
    }
  }
}

impl Default for FeedbackEvaluator {
  fn default() -> Self {
    Self::new()
  }
}

/// Stages without an expectation only need to produce something.
fn catch_all() -> StageExpectation {
  StageExpectation {
    expected_keys: Vec::new(),
    quality: QualityRule::NonEmpty,
    consistency: ConsistencyRule::Unchecked,
    thresholds: Default::default(),
  }
}

fn score_quality(
  rule: &QualityRule,
  output: &Value,
  metrics: &mut BTreeMap<String, f64>,
  issues: &mut Vec<String>,
) -> f64 {
  match rule {
    QualityRule::NonEmpty => {
      if is_empty(output) {
        issues.push("output is empty".to_string());
        0.0
      } else {
        1.0
      }
    }
    QualityRule::PassRatio { passed, total } => {
      let (Some(passed_n), Some(total_n)) = (number_at(output, passed), number_at(output, total))
      else {
        issues.push(format!("pass ratio inputs '{}' / '{}' not found", passed, total));
        return 0.0;
      };
      metrics.insert("passed".to_string(), passed_n);
      metrics.insert("total".to_string(), total_n);
      if total_n <= 0.0 {
        issues.push("no samples to compute a pass ratio".to_string());
        return 0.0;
      }
      let ratio = (passed_n / total_n).clamp(0.0, 1.0);
      metrics.insert("pass_ratio".to_string(), ratio);
      ratio
    }
    QualityRule::CorrelationStrength { pointer } => {
      let values = numbers_under(output, pointer);
      if values.is_empty() {
        issues.push(format!("no correlation values at '{}'", pointer));
        return 0.0;
      }
      let strength =
        (values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64).clamp(0.0, 1.0);
      metrics.insert("correlation_strength".to_string(), strength);
      metrics.insert("correlation_values".to_string(), values.len() as f64);
      strength
    }
  }
}

fn score_consistency(
  rule: &ConsistencyRule,
  output: &Value,
  metrics: &mut BTreeMap<String, f64>,
  issues: &mut Vec<String>,
) -> f64 {
  match rule {
    ConsistencyRule::Unchecked => 1.0,
    ConsistencyRule::CountMatchesLength { count, arrays } => {
      let Some(declared) = number_at(output, count) else {
        issues.push(format!("declared count '{}' not found", count));
        return 0.0;
      };
      metrics.insert("declared_count".to_string(), declared);
      if arrays.is_empty() {
        return 1.0;
      }

      let mut matching = 0usize;
      for pointer in arrays {
        match output.pointer(pointer).and_then(Value::as_array) {
          Some(values) if values.len() as f64 == declared => matching += 1,
          Some(values) => issues.push(format!(
            "'{}' has {} entries, expected {}",
            pointer,
            values.len(),
            declared
          )),
          None => issues.push(format!("array '{}' not found", pointer)),
        }
      }
      metrics.insert("matching_arrays".to_string(), matching as f64);
      matching as f64 / arrays.len() as f64
    }
  }
}

fn number_at(output: &Value, pointer: &str) -> Option<f64> {
  output.pointer(pointer).and_then(Value::as_f64)
}

/// Numbers at the pointer, or directly beneath it for arrays and objects.
fn numbers_under(output: &Value, pointer: &str) -> Vec<f64> {
  match output.pointer(pointer) {
    Some(Value::Number(n)) => n.as_f64().into_iter().collect(),
    Some(Value::Array(items)) => items.iter().filter_map(Value::as_f64).collect(),
    Some(Value::Object(map)) => map.values().filter_map(Value::as_f64).collect(),
    _ => Vec::new(),
  }
}

fn is_empty(output: &Value) -> bool {
  match output {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    Value::Array(items) => items.is_empty(),
    Value::Object(map) => map.is_empty(),
    Value::Bool(_) | Value::Number(_) => false,
  }
}
