use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::evaluator::{FeedbackEvaluator, FeedbackRecord};
use crate::report::{ReportChecks, ReportHandle};
use crate::scoring::{final_score, verdict};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
  Approved,
  NeedsMinorRevision,
  NeedsMajorRevision,
  #[default]
  Pending,
}

/// Rating supplied by a human reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
  pub rating: f64,
  #[serde(default = "default_scale")]
  pub scale: f64,
  #[serde(default)]
  pub comments: Vec<String>,
}

fn default_scale() -> f64 {
  5.0
}

impl UserFeedback {
  pub fn new(rating: f64) -> Self {
    Self {
      rating,
      scale: default_scale(),
      comments: Vec::new(),
    }
  }

  /// Rating normalized to [0, 1].
  pub fn score(&self) -> f64 {
    if self.scale <= 0.0 {
      return 0.0;
    }
    (self.rating / self.scale).clamp(0.0, 1.0)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedReview {
  /// Stages considered, in the order their latest feedback was produced.
  pub stages: Vec<String>,
  pub completeness: f64,
  pub consistency: f64,
  pub score: f64,
  pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEvaluation {
  pub stage_quality: f64,
  pub report: ReportChecks,
  pub report_factor: f64,
  pub score: f64,
  pub findings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
  pub timestamp: DateTime<Utc>,
  pub automated_review: AutomatedReview,
  pub quality_evaluation: QualityEvaluation,
  pub user_feedback: Option<UserFeedback>,
  pub recommendations: Vec<String>,
  pub final_score: f64,
  pub approval_status: ApprovalStatus,
}

/// Keeps the run's feedback and review histories and issues verdicts.
///
/// Both histories are append-only.
#[derive(Debug, Clone, Default)]
pub struct ApprovalSupervisor {
  evaluator: FeedbackEvaluator,
  feedback_history: Vec<FeedbackRecord>,
  review_history: Vec<ReviewResult>,
}

impl ApprovalSupervisor {
  pub fn new(evaluator: FeedbackEvaluator) -> Self {
    Self {
      evaluator,
      feedback_history: Vec::new(),
      review_history: Vec::new(),
    }
  }

  pub fn feedback_history(&self) -> &[FeedbackRecord] {
    &self.feedback_history
  }

  pub fn review_history(&self) -> &[ReviewResult] {
    &self.review_history
  }

  /// Evaluate a stage output and keep the record.
  pub fn provide_feedback(&mut self, stage: &str, output: &Value) -> &FeedbackRecord {
    let record = self.evaluator.evaluate(stage, output);
    self.feedback_history.push(record);
    &self.feedback_history[self.feedback_history.len() - 1]
  }

  /// Keep records evaluated elsewhere, e.g. by the scheduler during a run.
  pub fn record_feedback(&mut self, records: impl IntoIterator<Item = FeedbackRecord>) {
    self.feedback_history.extend(records);
  }

  /// The most recent record of every stage, in production order.
  fn latest_records(&self) -> Vec<&FeedbackRecord> {
    let mut latest: HashMap<&str, usize> = HashMap::new();
    for (index, record) in self.feedback_history.iter().enumerate() {
      latest.insert(record.stage.as_str(), index);
    }
    let mut indices: Vec<usize> = latest.into_values().collect();
    indices.sort_unstable();
    indices
      .into_iter()
      .map(|index| &self.feedback_history[index])
      .collect()
  }

  pub fn automated_review(&self) -> AutomatedReview {
    let records = self.latest_records();

    let completeness = mean(records.iter().map(|r| r.evaluation.completeness));
    let consistency = mean(records.iter().map(|r| r.evaluation.consistency));
    let score = mean(
      records
        .iter()
        .map(|r| (r.evaluation.completeness + r.evaluation.consistency) / 2.0),
    );

    let issues = records
      .iter()
      .flat_map(|r| {
        r.evaluation
          .issues
          .iter()
          .map(move |issue| format!("{}: {}", r.stage, issue))
      })
      .collect();

    AutomatedReview {
      stages: records.iter().map(|r| r.stage.clone()).collect(),
      completeness,
      consistency,
      score,
      issues,
    }
  }

  pub async fn quality_evaluation(&self, report: &ReportHandle) -> QualityEvaluation {
    let stage_quality = mean(self.latest_records().iter().map(|r| r.evaluation.quality));
    let checks = report.inspect().await;
    let report_factor = checks.factor();
    let findings = checks.findings(report);

    QualityEvaluation {
      stage_quality,
      report: checks,
      report_factor,
      score: stage_quality * report_factor,
      findings,
    }
  }

  /// Score the run and decide whether its report is accepted.
  pub async fn review(
    &mut self,
    report: &ReportHandle,
    user_feedback: Option<UserFeedback>,
  ) -> ReviewResult {
    self.review_at(report, user_feedback, Utc::now()).await
  }

  pub async fn review_at(
    &mut self,
    report: &ReportHandle,
    user_feedback: Option<UserFeedback>,
    timestamp: DateTime<Utc>,
  ) -> ReviewResult {
    let automated_review = self.automated_review();
    let quality_evaluation = self.quality_evaluation(report).await;
    let user_score = user_feedback.as_ref().map_or(1.0, UserFeedback::score);

    let score = final_score(automated_review.score, quality_evaluation.score, user_score);
    let approval_status = verdict(score);

    let mut recommendations = automated_review.issues.clone();
    recommendations.extend(quality_evaluation.findings.iter().cloned());
    if let Some(feedback) = &user_feedback {
      recommendations.extend(feedback.comments.iter().cloned());
    }

    let result = ReviewResult {
      timestamp,
      automated_review,
      quality_evaluation,
      user_feedback,
      recommendations,
      final_score: score,
      approval_status,
    };

    info!(
      final_score = result.final_score,
      approval_status = ?result.approval_status,
      recommendations = result.recommendations.len(),
      "review_completed"
    );

    self.review_history.push(result.clone());
    result
  }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
  let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
  if count == 0 { 0.0 } else { sum / count as f64 }
}
