use serde::Serialize;

use crate::graph::DependencyGraph;
use crate::stage::StageDefinition;
use crate::unit::UnitDescriptor;

/// A validated workflow: stages in execution order and the units they run.
///
/// Only [`DependencyGraph::validate`] constructs one, so holding an
/// `OrderedPlan` means every dependency is produced before it is consumed.
#[derive(Debug, Clone, Serialize)]
pub struct OrderedPlan {
  name: String,
  stages: Vec<StageDefinition>,
  #[serde(flatten)]
  graph: DependencyGraph,
}

impl OrderedPlan {
  pub(crate) fn new(stages: Vec<StageDefinition>, graph: DependencyGraph) -> Self {
    Self {
      name: "workflow".to_string(),
      stages,
      graph,
    }
  }

  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn stages(&self) -> &[StageDefinition] {
    &self.stages
  }

  pub fn stage(&self, name: &str) -> Option<&StageDefinition> {
    self.stages.iter().find(|stage| stage.name == name)
  }

  /// The stage a unit is scheduled in.
  pub fn stage_of(&self, unit: &str) -> Option<&StageDefinition> {
    self.stages.iter().find(|stage| stage.contains(unit))
  }

  pub fn stage_names(&self) -> Vec<String> {
    self.stages.iter().map(|stage| stage.name.clone()).collect()
  }

  pub fn unit(&self, name: &str) -> Option<&UnitDescriptor> {
    self.graph.unit(name)
  }

  pub fn graph(&self) -> &DependencyGraph {
    &self.graph
  }

  /// Scheduled units, flattened in stage order then member order.
  pub fn execution_order(&self) -> Vec<&str> {
    self
      .stages
      .iter()
      .flat_map(|stage| stage.members.iter().map(String::as_str))
      .collect()
  }

  /// Descriptors of the scheduled units, in execution order.
  pub fn scheduled_units(&self) -> impl Iterator<Item = &UnitDescriptor> {
    self
      .execution_order()
      .into_iter()
      .filter_map(|name| self.graph.unit(name))
  }
}
