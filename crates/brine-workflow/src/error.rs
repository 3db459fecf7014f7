use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
  #[error("unit '{unit}' depends on '{dependency}', which does not run before it")]
  Cycle { unit: String, dependency: String },

  #[error("unit '{unit}' depends on unknown unit '{dependency}'")]
  UnknownDependency { unit: String, dependency: String },

  #[error("unit '{unit}' is declared or scheduled more than once")]
  DuplicateUnit { unit: String },

  #[error("stage '{stage}' references undeclared unit '{unit}'")]
  UndeclaredMember { stage: String, unit: String },

  #[error("stage '{stage}' has no units")]
  EmptyStage { stage: String },

  #[error("stage '{stage}' is declared more than once")]
  DuplicateStage { stage: String },

  #[error("unit '{unit}' references unknown section '{section}'")]
  UnknownSection { unit: String, section: String },

  #[error("section '{section}' used by unit '{unit}' must be a JSON object")]
  InvalidSection { unit: String, section: String },
}
