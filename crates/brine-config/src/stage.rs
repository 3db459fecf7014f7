use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
  pub name: String,
  pub units: Vec<String>,
  #[serde(default)]
  pub parallel: bool,
}
