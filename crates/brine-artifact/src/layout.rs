use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{Level, info};

use crate::Error;

/// Source name of run-level log events.
pub const SYSTEM_SOURCE: &str = "system";

/// Top-level areas of a session directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
  Figures,
  Data,
  Reports,
  Logs,
}

impl Area {
  pub const ALL: [Area; 4] = [Area::Figures, Area::Data, Area::Reports, Area::Logs];

  pub fn dir_name(&self) -> &'static str {
    match self {
      Area::Figures => "figures",
      Area::Data => "data",
      Area::Reports => "reports",
      Area::Logs => "logs",
    }
  }

  /// Subdirectories created up front.
  pub fn categories(&self) -> &'static [&'static str] {
    match self {
      Area::Figures => &["ctd_profiles", "water_masses", "statistics", "qa"],
      Area::Data => &["processed", "qa_results", "analysis_results"],
      Area::Reports => &["qa", "analysis", "final"],
      Area::Logs => &["system", "units", "errors"],
    }
  }
}

/// Directory layout of one run: `<base>/<session_id>/{figures,data,reports,logs}`.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
  session_id: String,
  session_dir: PathBuf,
}

impl ArtifactLayout {
  /// Layout for a new session named after the current UTC time.
  pub fn new(base_dir: impl AsRef<Path>) -> Self {
    let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    Self::with_session(base_dir, session_id)
  }

  pub fn with_session(base_dir: impl AsRef<Path>, session_id: impl Into<String>) -> Self {
    let session_id = session_id.into();
    Self {
      session_dir: base_dir.as_ref().join(&session_id),
      session_id,
    }
  }

  pub fn session_id(&self) -> &str {
    &self.session_id
  }

  /// Root of the session; also the output directory of path-aware units.
  pub fn session_dir(&self) -> &Path {
    &self.session_dir
  }

  pub fn path(&self, area: Area, category: &str, filename: &str) -> PathBuf {
    self
      .session_dir
      .join(area.dir_name())
      .join(category)
      .join(filename)
  }

  /// Create the session directory tree.
  pub async fn prepare(&self) -> Result<(), Error> {
    for area in Area::ALL {
      for category in area.categories() {
        let dir = self.session_dir.join(area.dir_name()).join(category);
        create_dir(&dir).await?;
      }
    }
    info!(session_id = %self.session_id, dir = %self.session_dir.display(), "session_prepared");
    Ok(())
  }

  /// Write `data` as pretty JSON to `data/<category>/<name>.json`.
  pub async fn save_data(
    &self,
    name: &str,
    category: &str,
    data: &serde_json::Value,
  ) -> Result<PathBuf, Error> {
    let path = self.path(Area::Data, category, &format!("{}.json", name));
    let body = serde_json::to_vec_pretty(data).map_err(|source| Error::Encode {
      name: name.to_string(),
      source,
    })?;
    self.write(&path, &body).await?;
    Ok(path)
  }

  /// Write a text report to `reports/<category>/<name>.md`.
  pub async fn save_report(&self, name: &str, category: &str, content: &str) -> Result<PathBuf, Error> {
    let path = self.path(Area::Reports, category, &format!("{}.md", name));
    self.write(&path, content.as_bytes()).await?;
    Ok(path)
  }

  /// Append one line to the session log `logs/system/<session_id>.log`.
  ///
  /// Error-level events are copied to `logs/errors/`, and events from a named
  /// unit to `logs/units/<source>.log`.
  pub async fn log_event(&self, source: &str, level: Level, message: &str) -> Result<(), Error> {
    let line = format!(
      "{} [{}] {}: {}\n",
      Utc::now().to_rfc3339(),
      level,
      source,
      message
    );
    let log_name = format!("{}.log", self.session_id);

    self.append(&self.path(Area::Logs, "system", &log_name), &line).await?;
    if level == Level::ERROR {
      self.append(&self.path(Area::Logs, "errors", &log_name), &line).await?;
    }
    if source != SYSTEM_SOURCE {
      self
        .append(&self.path(Area::Logs, "units", &format!("{}.log", source)), &line)
        .await?;
    }
    Ok(())
  }

  async fn append(&self, path: &Path, line: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
      create_dir(parent).await?;
    }
    let io_err = |source| Error::Io {
      path: path.to_path_buf(),
      source,
    };
    let mut file = tokio::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .await
      .map_err(io_err)?;
    file.write_all(line.as_bytes()).await.map_err(io_err)
  }

  async fn write(&self, path: &Path, body: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
      create_dir(parent).await?;
    }
    tokio::fs::write(path, body).await.map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })
  }
}

async fn create_dir(dir: &Path) -> Result<(), Error> {
  tokio::fs::create_dir_all(dir).await.map_err(|source| Error::Io {
    path: dir.to_path_buf(),
    source,
  })
}
