use brine_config::StageDef;
use serde::{Deserialize, Serialize};

/// A named group of units sharing one execution mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
  pub name: String,
  pub members: Vec<String>,
  pub parallel: bool,
}

impl StageDefinition {
  pub fn sequential(name: impl Into<String>, members: &[&str]) -> Self {
    Self {
      name: name.into(),
      members: members.iter().map(|m| m.to_string()).collect(),
      parallel: false,
    }
  }

  pub fn parallel(name: impl Into<String>, members: &[&str]) -> Self {
    Self {
      parallel: true,
      ..Self::sequential(name, members)
    }
  }

  pub fn contains(&self, unit: &str) -> bool {
    self.members.iter().any(|m| m == unit)
  }
}

impl From<&StageDef> for StageDefinition {
  fn from(def: &StageDef) -> Self {
    Self {
      name: def.name.clone(),
      members: def.units.clone(),
      parallel: def.parallel,
    }
  }
}
