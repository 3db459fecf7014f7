use std::collections::BTreeMap;
use std::sync::Arc;

use brine_config::WorkflowDef;

use crate::command::CommandUnit;
use crate::error::RegistryError;
use crate::unit::UnitOfWork;

/// Named units available to a run.
///
/// Units stay mutable while registered so the scheduler can configure and
/// initialize them; [`UnitRegistry::into_shared`] freezes them for execution.
#[derive(Default)]
pub struct UnitRegistry {
  units: BTreeMap<String, Box<dyn UnitOfWork>>,
}

impl UnitRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a [`CommandUnit`] for every unit definition that names a command.
  pub fn from_workflow(def: &WorkflowDef) -> Result<Self, RegistryError> {
    let mut registry = Self::new();
    for unit in &def.units {
      if let Some(command) = &unit.command {
        registry.register(Box::new(CommandUnit::from_def(unit.name.clone(), command)))?;
      }
    }
    Ok(registry)
  }

  pub fn register(&mut self, unit: Box<dyn UnitOfWork>) -> Result<(), RegistryError> {
    let name = unit.name().to_string();
    if self.units.contains_key(&name) {
      return Err(RegistryError::AlreadyRegistered(name));
    }
    self.units.insert(name, unit);
    Ok(())
  }

  /// Builder-style [`UnitRegistry::register`].
  pub fn with(mut self, unit: impl UnitOfWork + 'static) -> Result<Self, RegistryError> {
    self.register(Box::new(unit))?;
    Ok(self)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.units.contains_key(name)
  }

  pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn UnitOfWork>> {
    self.units.get_mut(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.units.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  /// Freeze the registered units for concurrent use.
  pub fn into_shared(self) -> BTreeMap<String, Arc<dyn UnitOfWork>> {
    self
      .units
      .into_iter()
      .map(|(name, unit)| (name, Arc::from(unit)))
      .collect()
  }
}

impl std::fmt::Debug for UnitRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UnitRegistry")
      .field("units", &self.units.keys().collect::<Vec<_>>())
      .finish()
  }
}
