use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::error::WorkflowError;
use crate::plan::OrderedPlan;
use crate::stage::StageDefinition;
use crate::unit::UnitDescriptor;

/// Dependency structure between declared units.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
  units: BTreeMap<String, UnitDescriptor>,
  /// unit -> units it consumes.
  #[serde(skip)]
  upstream: HashMap<String, Vec<String>>,
  /// unit -> units consuming it.
  #[serde(skip)]
  downstream: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
  /// Build a graph from unit descriptors.
  ///
  /// Dependencies are recorded as declared; whether they resolve is decided
  /// by [`DependencyGraph::validate`].
  pub fn new(descriptors: Vec<UnitDescriptor>) -> Result<Self, WorkflowError> {
    let mut units = BTreeMap::new();
    for descriptor in descriptors {
      if units.contains_key(&descriptor.name) {
        return Err(WorkflowError::DuplicateUnit {
          unit: descriptor.name,
        });
      }
      units.insert(descriptor.name.clone(), descriptor);
    }

    let mut upstream: HashMap<String, Vec<String>> = HashMap::new();
    let mut downstream: HashMap<String, Vec<String>> = HashMap::new();

    for (name, descriptor) in &units {
      upstream.entry(name.clone()).or_default();
      downstream.entry(name.clone()).or_default();
      for dependency in &descriptor.dependencies {
        upstream
          .entry(name.clone())
          .or_default()
          .push(dependency.clone());
        downstream
          .entry(dependency.clone())
          .or_default()
          .push(name.clone());
      }
    }

    Ok(Self {
      units,
      upstream,
      downstream,
    })
  }

  pub fn unit(&self, name: &str) -> Option<&UnitDescriptor> {
    self.units.get(name)
  }

  pub fn units(&self) -> impl Iterator<Item = &UnitDescriptor> {
    self.units.values()
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  /// Units the given unit consumes.
  pub fn upstream(&self, unit: &str) -> &[String] {
    self
      .upstream
      .get(unit)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Units consuming the given unit's output.
  pub fn downstream(&self, unit: &str) -> &[String] {
    self
      .downstream
      .get(unit)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Check that the stage layout can run and lock it into a plan.
  ///
  /// Every dependency must be a member of a strictly earlier stage, or sit at
  /// an earlier position of the same sequential stage. Stages are never
  /// reordered.
  pub fn validate(self, stages: Vec<StageDefinition>) -> Result<OrderedPlan, WorkflowError> {
    self.check_layout(&stages)?;
    Ok(OrderedPlan::new(stages, self))
  }

  fn check_layout(&self, stages: &[StageDefinition]) -> Result<(), WorkflowError> {
    let mut stage_names = HashSet::new();
    // unit -> (stage index, position within stage)
    let mut placement: HashMap<&str, (usize, usize)> = HashMap::new();

    for (stage_index, stage) in stages.iter().enumerate() {
      if !stage_names.insert(stage.name.as_str()) {
        return Err(WorkflowError::DuplicateStage {
          stage: stage.name.clone(),
        });
      }
      if stage.members.is_empty() {
        return Err(WorkflowError::EmptyStage {
          stage: stage.name.clone(),
        });
      }
      for (position, member) in stage.members.iter().enumerate() {
        if !self.units.contains_key(member) {
          return Err(WorkflowError::UndeclaredMember {
            stage: stage.name.clone(),
            unit: member.clone(),
          });
        }
        if placement
          .insert(member.as_str(), (stage_index, position))
          .is_some()
        {
          return Err(WorkflowError::DuplicateUnit {
            unit: member.clone(),
          });
        }
      }
    }

    for (stage_index, stage) in stages.iter().enumerate() {
      for (position, member) in stage.members.iter().enumerate() {
        for dependency in self.upstream(member) {
          if !self.units.contains_key(dependency) {
            return Err(WorkflowError::UnknownDependency {
              unit: member.clone(),
              dependency: dependency.clone(),
            });
          }

          let satisfied = match placement.get(dependency.as_str()) {
            Some(&(dep_stage, dep_position)) => {
              dep_stage < stage_index
                || (dep_stage == stage_index && !stage.parallel && dep_position < position)
            }
            // Declared but never scheduled: nothing will ever produce it.
            None => false,
          };

          if !satisfied {
            return Err(WorkflowError::Cycle {
              unit: member.clone(),
              dependency: dependency.clone(),
            });
          }
        }
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ocean_units() -> Vec<UnitDescriptor> {
    vec![
      UnitDescriptor::new("ingest"),
      UnitDescriptor::new("qc").depends_on("ingest"),
      UnitDescriptor::new("analysis").depends_on("qc"),
      UnitDescriptor::new("water_mass").depends_on("qc"),
      UnitDescriptor::new("statistics").depends_on("qc"),
      UnitDescriptor::new("report")
        .depends_on("analysis")
        .depends_on("water_mass")
        .depends_on("statistics"),
    ]
  }

  fn ocean_stages() -> Vec<StageDefinition> {
    vec![
      StageDefinition::sequential("data_processing", &["ingest", "qc"]),
      StageDefinition::parallel("analysis", &["analysis", "water_mass", "statistics"]),
      StageDefinition::sequential("reporting", &["report"]),
    ]
  }

  fn graph(units: Vec<UnitDescriptor>) -> DependencyGraph {
    DependencyGraph::new(units).unwrap()
  }

  #[test]
  fn test_validate_ocean_layout() {
    let plan = graph(ocean_units()).validate(ocean_stages()).unwrap();

    assert_eq!(plan.stages().len(), 3);
    assert_eq!(
      plan.execution_order(),
      vec!["ingest", "qc", "analysis", "water_mass", "statistics", "report"]
    );
  }

  #[test]
  fn test_forward_reference_is_cycle() {
    let units = vec![
      UnitDescriptor::new("a").depends_on("b"),
      UnitDescriptor::new("b"),
    ];
    let stages = vec![
      StageDefinition::sequential("first", &["a"]),
      StageDefinition::sequential("second", &["b"]),
    ];

    let err = graph(units).validate(stages).unwrap_err();
    assert_eq!(
      err,
      WorkflowError::Cycle {
        unit: "a".to_string(),
        dependency: "b".to_string(),
      }
    );
  }

  #[test]
  fn test_later_position_in_sequential_stage_is_cycle() {
    let units = vec![
      UnitDescriptor::new("a").depends_on("b"),
      UnitDescriptor::new("b"),
    ];
    let stages = vec![StageDefinition::sequential("only", &["a", "b"])];

    let err = graph(units).validate(stages).unwrap_err();
    assert!(matches!(err, WorkflowError::Cycle { .. }));
  }

  #[test]
  fn test_earlier_position_in_sequential_stage_is_valid() {
    let units = vec![
      UnitDescriptor::new("a"),
      UnitDescriptor::new("b").depends_on("a"),
    ];
    let stages = vec![StageDefinition::sequential("only", &["a", "b"])];

    assert!(graph(units).validate(stages).is_ok());
  }

  #[test]
  fn test_intra_parallel_dependency_is_cycle() {
    let units = vec![
      UnitDescriptor::new("a"),
      UnitDescriptor::new("b").depends_on("a"),
    ];
    let stages = vec![StageDefinition::parallel("fan", &["a", "b"])];

    let err = graph(units).validate(stages).unwrap_err();
    assert_eq!(
      err,
      WorkflowError::Cycle {
        unit: "b".to_string(),
        dependency: "a".to_string(),
      }
    );
  }

  #[test]
  fn test_self_dependency_is_cycle() {
    let units = vec![UnitDescriptor::new("a").depends_on("a")];
    let stages = vec![StageDefinition::sequential("only", &["a"])];

    assert!(matches!(
      graph(units).validate(stages),
      Err(WorkflowError::Cycle { .. })
    ));
  }

  #[test]
  fn test_unscheduled_dependency_is_cycle() {
    let units = vec![
      UnitDescriptor::new("a"),
      UnitDescriptor::new("b").depends_on("a"),
    ];
    let stages = vec![StageDefinition::sequential("only", &["b"])];

    assert!(matches!(
      graph(units).validate(stages),
      Err(WorkflowError::Cycle { .. })
    ));
  }

  #[test]
  fn test_unknown_dependency() {
    let units = vec![UnitDescriptor::new("a").depends_on("ghost")];
    let stages = vec![StageDefinition::sequential("only", &["a"])];

    let err = graph(units).validate(stages).unwrap_err();
    assert_eq!(
      err,
      WorkflowError::UnknownDependency {
        unit: "a".to_string(),
        dependency: "ghost".to_string(),
      }
    );
  }

  #[test]
  fn test_stage_layout_errors() {
    let units = || vec![UnitDescriptor::new("a"), UnitDescriptor::new("b")];

    let err = graph(units())
      .validate(vec![
        StageDefinition::sequential("one", &["a"]),
        StageDefinition::sequential("two", &["a"]),
      ])
      .unwrap_err();
    assert_eq!(err, WorkflowError::DuplicateUnit { unit: "a".to_string() });

    let err = graph(units())
      .validate(vec![StageDefinition::sequential("one", &["a", "c"])])
      .unwrap_err();
    assert!(matches!(err, WorkflowError::UndeclaredMember { .. }));

    let err = graph(units())
      .validate(vec![StageDefinition::parallel("empty", &[])])
      .unwrap_err();
    assert_eq!(
      err,
      WorkflowError::EmptyStage {
        stage: "empty".to_string()
      }
    );

    let err = graph(units())
      .validate(vec![
        StageDefinition::sequential("one", &["a"]),
        StageDefinition::sequential("one", &["b"]),
      ])
      .unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateStage { .. }));
  }

  #[test]
  fn test_duplicate_declaration() {
    let err = DependencyGraph::new(vec![UnitDescriptor::new("a"), UnitDescriptor::new("a")])
      .unwrap_err();
    assert_eq!(err, WorkflowError::DuplicateUnit { unit: "a".to_string() });
  }

  #[test]
  fn test_upstream_and_downstream() {
    let graph = graph(ocean_units());

    assert_eq!(graph.upstream("qc"), &["ingest".to_string()]);
    assert_eq!(
      graph.upstream("report"),
      &[
        "analysis".to_string(),
        "statistics".to_string(),
        "water_mass".to_string()
      ]
    );

    let mut consumers = graph.downstream("qc").to_vec();
    consumers.sort();
    assert_eq!(consumers, vec!["analysis", "statistics", "water_mass"]);
    assert!(graph.downstream("report").is_empty());
    assert!(graph.upstream("missing").is_empty());
  }
}
