use std::collections::BTreeMap;

use brine_config::{ConsistencyRule, ExpectationDef, QualityRule, ThresholdsDef};

/// What a stage's output must contain and how it is scored.
pub type StageExpectation = ExpectationDef;

/// Expectations for the six ocean-analysis stages.
pub fn builtin_expectations() -> BTreeMap<String, StageExpectation> {
  let profile_arrays = |prefix: &str| {
    ["temperature", "salinity", "depth", "latitude", "longitude"]
      .iter()
      .map(|var| format!("{}/{}", prefix, var))
      .collect::<Vec<_>>()
  };

  BTreeMap::from([
    (
      "ingest".to_string(),
      StageExpectation {
        expected_keys: keys(&["temperature", "salinity", "pressure", "latitude", "longitude", "metadata"]),
        quality: QualityRule::NonEmpty,
        consistency: ConsistencyRule::CountMatchesLength {
          count: "/metadata/total_samples".to_string(),
          arrays: keys(&["/temperature", "/salinity", "/pressure", "/latitude", "/longitude"]),
        },
        thresholds: ThresholdsDef::default(),
      },
    ),
    (
      "qc".to_string(),
      StageExpectation {
        expected_keys: keys(&["clean_data", "stats", "flags"]),
        quality: QualityRule::PassRatio {
          passed: "/stats/n_valid".to_string(),
          total: "/stats/n_total".to_string(),
        },
        consistency: ConsistencyRule::CountMatchesLength {
          count: "/stats/n_valid".to_string(),
          arrays: profile_arrays("/clean_data"),
        },
        thresholds: ThresholdsDef {
          quality: 0.8,
          ..ThresholdsDef::default()
        },
      },
    ),
    (
      "analysis".to_string(),
      StageExpectation {
        expected_keys: keys(&["statistics", "correlations", "visualizations"]),
        quality: QualityRule::CorrelationStrength {
          pointer: "/correlations".to_string(),
        },
        consistency: ConsistencyRule::Unchecked,
        thresholds: ThresholdsDef {
          quality: 0.3,
          ..ThresholdsDef::default()
        },
      },
    ),
    (
      "statistics".to_string(),
      StageExpectation {
        expected_keys: keys(&["basic_stats", "correlation", "stratification", "summary"]),
        quality: QualityRule::CorrelationStrength {
          pointer: "/correlation/correlation_coefficient".to_string(),
        },
        consistency: ConsistencyRule::Unchecked,
        thresholds: ThresholdsDef {
          quality: 0.3,
          ..ThresholdsDef::default()
        },
      },
    ),
    (
      "water_mass".to_string(),
      StageExpectation {
        expected_keys: keys(&["water_masses", "figures", "density"]),
        quality: QualityRule::NonEmpty,
        consistency: ConsistencyRule::Unchecked,
        thresholds: ThresholdsDef::default(),
      },
    ),
    (
      "report".to_string(),
      StageExpectation {
        expected_keys: keys(&["report_path"]),
        quality: QualityRule::NonEmpty,
        consistency: ConsistencyRule::Unchecked,
        thresholds: ThresholdsDef::default(),
      },
    ),
  ])
}

fn keys(names: &[&str]) -> Vec<String> {
  names.iter().map(|name| name.to_string()).collect()
}
