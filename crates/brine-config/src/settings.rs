use serde::{Deserialize, Serialize};

/// Worker count used for parallel stages when the workflow file omits one.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Figures a complete ocean-analysis run is expected to leave behind.
pub const DEFAULT_REQUIRED_ARTIFACTS: [&str; 4] = [
  "figures/ctd_profiles.png",
  "figures/ts_diagram.png",
  "figures/vertical_sections.png",
  "figures/spatial_distribution.png",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
  /// Wall-clock budget for the whole run.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Timeout applied to units that do not declare their own.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit_timeout_ms: Option<u64>,
  #[serde(default = "default_max_workers")]
  pub max_workers: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output_dir: Option<String>,
  #[serde(default = "default_required_artifacts")]
  pub required_artifacts: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report: Option<ReportDef>,
}

impl Default for RunSettings {
  fn default() -> Self {
    Self {
      timeout_ms: None,
      unit_timeout_ms: None,
      max_workers: default_max_workers(),
      output_dir: None,
      required_artifacts: default_required_artifacts(),
      report: None,
    }
  }
}

/// Location of the final report, relative to the run's artifact root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDef {
  pub path: String,
  #[serde(default)]
  pub required_sections: Vec<String>,
}

fn default_max_workers() -> usize {
  DEFAULT_MAX_WORKERS
}

fn default_required_artifacts() -> Vec<String> {
  DEFAULT_REQUIRED_ARTIFACTS
    .iter()
    .map(|path| path.to_string())
    .collect()
}
