use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expectation::ExpectationDef;
use crate::settings::RunSettings;
use crate::stage::StageDef;
use crate::unit::UnitDef;

/// Top-level configuration sections understood by the built-in units.
///
/// Section contents are never validated here; they are handed to the unit
/// that names them.
pub const RECOGNIZED_SECTIONS: [&str; 5] = ["ingest", "qc", "analysis", "output", "research"];

pub type Sections = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub units: Vec<UnitDef>,
  pub stages: Vec<StageDef>,
  #[serde(default)]
  pub settings: RunSettings,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub sections: Sections,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub expectations: BTreeMap<String, ExpectationDef>,
}

impl WorkflowDef {
  pub fn unit(&self, name: &str) -> Option<&UnitDef> {
    self.units.iter().find(|unit| unit.name == name)
  }

  pub fn section(&self, name: &str) -> Option<&serde_json::Value> {
    self.sections.get(name)
  }

  /// Sections present in the file that no built-in unit recognizes.
  pub fn unrecognized_sections(&self) -> Vec<&str> {
    self
      .sections
      .keys()
      .map(String::as_str)
      .filter(|name| !RECOGNIZED_SECTIONS.contains(name))
      .collect()
  }
}
