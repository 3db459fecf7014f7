//! Brine Artifact
//!
//! Filesystem side of a brine run. [`ArtifactLayout`] owns the per-run
//! session directory that path-aware units write into, and
//! [`OutputVerifier`] checks that the artifacts a complete run must leave
//! behind are actually there. The layout also keeps a plain-text session
//! log under `logs/`.

mod layout;
mod verifier;

pub use layout::{Area, ArtifactLayout, SYSTEM_SOURCE};
pub use verifier::OutputVerifier;

/// Error type for artifact operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("io error at {path}: {source}")]
  Io {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to encode '{name}': {source}")]
  Encode {
    name: String,
    #[source]
    source: serde_json::Error,
  },
}
