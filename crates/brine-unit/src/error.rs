use thiserror::Error;

/// Failure reported by a unit of work.
#[derive(Debug, Error)]
pub enum UnitError {
  #[error("{message}")]
  Failed { message: String },

  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  #[error("invalid output: {message}")]
  InvalidOutput { message: String },

  #[error("initialization failed: {message}")]
  Initialization { message: String },

  #[error("failed to spawn '{program}'")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("process exited with code {code:?}: {stderr}")]
  ProcessExit { code: Option<i32>, stderr: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl UnitError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("unit '{0}' is already registered")]
  AlreadyRegistered(String),
}
