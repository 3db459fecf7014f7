use brine_config::{UnitDef, WorkflowDef};

use crate::error::WorkflowError;
use crate::graph::DependencyGraph;
use crate::plan::OrderedPlan;
use crate::retry::RetryPolicy;
use crate::stage::StageDefinition;
use crate::unit::{Invocation, UnitDescriptor};

/// Lock a workflow definition into a validated plan.
///
/// Each unit's options are its section with the unit's own `options` laid
/// over the top. The section is the one the unit names, or else the one
/// sharing the unit's name. The run-wide unit timeout fills in for units
/// that do not set one.
pub fn lock(def: &WorkflowDef) -> Result<OrderedPlan, WorkflowError> {
  let descriptors = def
    .units
    .iter()
    .map(|unit| describe(def, unit))
    .collect::<Result<Vec<_>, _>>()?;

  let stages = def.stages.iter().map(StageDefinition::from).collect();

  let plan = DependencyGraph::new(descriptors)?.validate(stages)?;
  Ok(plan.named(def.name.clone()))
}

fn describe(def: &WorkflowDef, unit: &UnitDef) -> Result<UnitDescriptor, WorkflowError> {
  let mut config = match &unit.section {
    Some(section) => match def.section(section) {
      Some(serde_json::Value::Object(map)) => map.clone(),
      Some(_) => return Err(invalid_section(unit, section)),
      None => {
        return Err(WorkflowError::UnknownSection {
          unit: unit.name.clone(),
          section: section.clone(),
        });
      }
    },
    // Without an explicit section a unit picks up the one named after it.
    None => match def.section(&unit.name) {
      Some(serde_json::Value::Object(map)) => map.clone(),
      Some(_) => return Err(invalid_section(unit, &unit.name)),
      None => serde_json::Map::new(),
    },
  };

  for (key, value) in &unit.options {
    config.insert(key.clone(), value.clone());
  }

  Ok(UnitDescriptor {
    name: unit.name.clone(),
    invocation: Invocation::Analyze,
    config,
    dependencies: unit.dependencies.iter().cloned().collect(),
    timeout_ms: unit.timeout_ms.or(def.settings.unit_timeout_ms),
    retry: unit.retry.map(RetryPolicy::from).unwrap_or_default(),
    gate: unit.on_feedback_issues,
  })
}

fn invalid_section(unit: &UnitDef, section: &str) -> WorkflowError {
  WorkflowError::InvalidSection {
    unit: unit.name.clone(),
    section: section.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn workflow(value: serde_json::Value) -> WorkflowDef {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_lock_merges_section_and_options() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [
        {
          "name": "qc",
          "section": "qc",
          "options": { "max_gap": 5 },
          "timeout_ms": 45000,
          "on_feedback_issues": "fail"
        }
      ],
      "stages": [{ "name": "processing", "units": ["qc"] }],
      "sections": { "qc": { "max_gap": 3, "spike_threshold": 2.5 } }
    }));

    let plan = lock(&def).unwrap();
    let qc = plan.unit("qc").unwrap();

    assert_eq!(plan.name(), "ocean");
    assert_eq!(qc.config["max_gap"], json!(5));
    assert_eq!(qc.config["spike_threshold"], json!(2.5));
    assert_eq!(qc.timeout_ms, Some(45_000));
    assert_eq!(qc.retry, RetryPolicy::none());
    assert_eq!(qc.gate, brine_config::FeedbackGate::Fail);
  }

  #[test]
  fn test_lock_defaults_section_to_unit_name() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [
        { "name": "qc", "options": { "max_gap": 5 } },
        { "name": "water_mass", "dependencies": ["qc"] }
      ],
      "stages": [{ "name": "processing", "units": ["qc", "water_mass"] }],
      "sections": {
        "qc": { "temperature_range": [-2, 35], "max_gap": 3 },
        "analysis": { "min_depth": 10 }
      }
    }));

    let plan = lock(&def).unwrap();
    let qc = plan.unit("qc").unwrap();

    assert_eq!(qc.config["temperature_range"], json!([-2, 35]));
    assert_eq!(qc.config["max_gap"], json!(5));
    assert!(plan.unit("water_mass").unwrap().config.is_empty());
  }

  #[test]
  fn test_lock_rejects_non_object_implicit_section() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [{ "name": "qc" }],
      "stages": [{ "name": "processing", "units": ["qc"] }],
      "sections": { "qc": "strict" }
    }));

    assert_eq!(
      lock(&def).unwrap_err(),
      WorkflowError::InvalidSection {
        unit: "qc".to_string(),
        section: "qc".to_string(),
      }
    );
  }

  #[test]
  fn test_lock_applies_default_unit_timeout() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [{ "name": "ingest" }],
      "stages": [{ "name": "processing", "units": ["ingest"] }],
      "settings": { "unit_timeout_ms": 30000 }
    }));

    let plan = lock(&def).unwrap();
    let ingest = plan.unit("ingest").unwrap();
    assert_eq!(ingest.timeout_ms, Some(30_000));
    assert_eq!(ingest.gate, brine_config::FeedbackGate::Continue);
  }

  #[test]
  fn test_lock_rejects_unknown_section() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [{ "name": "ingest", "section": "ingest" }],
      "stages": [{ "name": "processing", "units": ["ingest"] }]
    }));

    assert_eq!(
      lock(&def).unwrap_err(),
      WorkflowError::UnknownSection {
        unit: "ingest".to_string(),
        section: "ingest".to_string(),
      }
    );
  }

  #[test]
  fn test_lock_rejects_non_object_section() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [{ "name": "ingest", "section": "ingest" }],
      "stages": [{ "name": "processing", "units": ["ingest"] }],
      "sections": { "ingest": [1, 2, 3] }
    }));

    assert!(matches!(
      lock(&def),
      Err(WorkflowError::InvalidSection { .. })
    ));
  }

  #[test]
  fn test_lock_surfaces_validation_errors() {
    let def = workflow(json!({
      "name": "ocean",
      "units": [
        { "name": "report", "dependencies": ["analysis"] },
        { "name": "analysis" }
      ],
      "stages": [
        { "name": "reporting", "units": ["report"] },
        { "name": "analysis", "units": ["analysis"] }
      ]
    }));

    assert!(matches!(lock(&def), Err(WorkflowError::Cycle { .. })));
  }
}
