use std::path::{Component, Path};

use tracing::{info, warn};

/// Checks that required artifacts exist under an artifact root.
#[derive(Debug, Clone, Default)]
pub struct OutputVerifier {
  missing: Vec<String>,
}

impl OutputVerifier {
  pub fn new() -> Self {
    Self::default()
  }

  /// True when every required path exists under `artifact_root`.
  ///
  /// Never fails: paths that cannot be checked count as missing, and so do
  /// absolute paths or paths that climb out of the root.
  pub async fn verify<S: AsRef<str>>(&mut self, artifact_root: &Path, required: &[S]) -> bool {
    self.missing.clear();

    for relative in required {
      let relative = relative.as_ref();
      if !is_contained(relative) {
        warn!(path = %relative, "artifact_path_outside_root");
        self.missing.push(relative.to_string());
        continue;
      }
      let path = artifact_root.join(relative);
      match tokio::fs::try_exists(&path).await {
        Ok(true) => {}
        Ok(false) => self.missing.push(relative.to_string()),
        Err(e) => {
          warn!(path = %path.display(), error = %e, "artifact_check_failed");
          self.missing.push(relative.to_string());
        }
      }
    }

    if self.missing.is_empty() {
      info!(root = %artifact_root.display(), checked = required.len(), "outputs_verified");
    } else {
      warn!(
        root = %artifact_root.display(),
        missing = ?self.missing,
        "outputs_incomplete"
      );
    }
    self.missing.is_empty()
  }

  /// Paths found missing by the last [`OutputVerifier::verify`], in required order.
  pub fn missing(&self) -> &[String] {
    &self.missing
  }
}

/// A plain relative path: no root, prefix or `..` components.
fn is_contained(relative: &str) -> bool {
  !relative.is_empty()
    && Path::new(relative)
      .components()
      .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
