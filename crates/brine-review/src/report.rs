use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The final report a review inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHandle {
  pub path: PathBuf,
  /// Headings the report must contain, matched case-insensitively.
  #[serde(default)]
  pub required_sections: Vec<String>,
}

impl ReportHandle {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      required_sections: Vec::new(),
    }
  }

  pub fn with_sections<I, S>(mut self, sections: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.required_sections = sections.into_iter().map(Into::into).collect();
    self
  }

  /// Read the report and check it against the requirements.
  pub async fn inspect(&self) -> ReportChecks {
    let content = tokio::fs::read(&self.path)
      .await
      .ok()
      .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

    let headings: Vec<String> = content
      .as_deref()
      .map(|text| {
        text
          .lines()
          .filter_map(|line| line.trim().strip_prefix('#'))
          .map(|heading| heading.trim_start_matches('#').trim().to_lowercase())
          .collect()
      })
      .unwrap_or_default();

    let (present, missing): (Vec<String>, Vec<String>) = self
      .required_sections
      .iter()
      .cloned()
      .partition(|section| headings.contains(&section.trim().to_lowercase()));

    ReportChecks {
      exists: content.is_some(),
      non_empty: content.as_deref().is_some_and(|text| !text.trim().is_empty()),
      sections_present: present,
      sections_missing: missing,
    }
  }
}

/// Outcome of inspecting a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportChecks {
  pub exists: bool,
  pub non_empty: bool,
  pub sections_present: Vec<String>,
  pub sections_missing: Vec<String>,
}

impl ReportChecks {
  /// Fraction of checks satisfied: existence, non-emptiness, one per section.
  pub fn factor(&self) -> f64 {
    let total = 2 + self.sections_present.len() + self.sections_missing.len();
    let satisfied =
      usize::from(self.exists) + usize::from(self.non_empty) + self.sections_present.len();
    satisfied as f64 / total as f64
  }

  pub fn findings(&self, handle: &ReportHandle) -> Vec<String> {
    let mut findings = Vec::new();
    if !self.exists {
      findings.push(format!("report not found at {}", handle.path.display()));
    } else if !self.non_empty {
      findings.push("report is empty".to_string());
    }
    for section in &self.sections_missing {
      findings.push(format!("report is missing section '{}'", section));
    }
    findings
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_inspect_complete_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.md");
    tokio::fs::write(&path, "# Summary\ntext\n## Water Masses\nmore\n")
      .await
      .unwrap();

    let handle = ReportHandle::new(&path).with_sections(["summary", "Water masses"]);
    let checks = handle.inspect().await;

    assert!(checks.exists && checks.non_empty);
    assert!(checks.sections_missing.is_empty());
    assert_eq!(checks.factor(), 1.0);
    assert!(checks.findings(&handle).is_empty());
  }

  #[tokio::test]
  async fn test_inspect_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.md");
    tokio::fs::write(&path, "# Summary\n").await.unwrap();

    let handle = ReportHandle::new(&path).with_sections(["Summary", "Methods"]);
    let checks = handle.inspect().await;

    assert_eq!(checks.sections_missing, vec!["Methods".to_string()]);
    assert_eq!(checks.factor(), 0.75);
    assert_eq!(
      checks.findings(&handle),
      vec!["report is missing section 'Methods'".to_string()]
    );
  }

  #[tokio::test]
  async fn test_inspect_report_with_invalid_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.md");
    let mut body = b"# Summary\nsalinity \xB0 anomaly\n".to_vec();
    body.push(0xFF);
    tokio::fs::write(&path, &body).await.unwrap();

    let handle = ReportHandle::new(&path).with_sections(["Summary"]);
    let checks = handle.inspect().await;

    assert!(checks.exists && checks.non_empty);
    assert!(checks.sections_missing.is_empty());
    assert_eq!(checks.factor(), 1.0);
  }

  #[tokio::test]
  async fn test_inspect_missing_report() {
    let dir = tempfile::tempdir().unwrap();
    let handle = ReportHandle::new(dir.path().join("absent.md"));
    let checks = handle.inspect().await;

    assert!(!checks.exists);
    assert_eq!(checks.factor(), 0.0);
    assert_eq!(checks.findings(&handle).len(), 1);
  }
}
