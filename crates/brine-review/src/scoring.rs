//! Weighted approval scoring.

use crate::supervisor::ApprovalStatus;

pub const AUTO_WEIGHT: f64 = 0.4;
pub const QUALITY_WEIGHT: f64 = 0.4;
pub const USER_WEIGHT: f64 = 0.2;

pub const APPROVAL_THRESHOLD: f64 = 0.8;
/// Fraction of the approval threshold that still earns a minor revision.
pub const MINOR_REVISION_FACTOR: f64 = 0.8;

pub fn final_score(auto: f64, quality: f64, user: f64) -> f64 {
  auto * AUTO_WEIGHT + quality * QUALITY_WEIGHT + user * USER_WEIGHT
}

pub fn verdict(score: f64) -> ApprovalStatus {
  if score >= APPROVAL_THRESHOLD {
    ApprovalStatus::Approved
  } else if score >= APPROVAL_THRESHOLD * MINOR_REVISION_FACTOR {
    ApprovalStatus::NeedsMinorRevision
  } else {
    ApprovalStatus::NeedsMajorRevision
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_high_scores_are_approved() {
    let score = final_score(0.9, 0.9, 1.0);
    assert!((score - 0.92).abs() < 1e-9);
    assert_eq!(verdict(score), ApprovalStatus::Approved);
  }

  #[test]
  fn test_middling_scores_need_major_revision() {
    let score = final_score(0.5, 0.5, 0.5);
    assert!((score - 0.5).abs() < 1e-9);
    assert_eq!(verdict(score), ApprovalStatus::NeedsMajorRevision);
  }

  #[test]
  fn test_near_threshold_needs_minor_revision() {
    let score = final_score(0.7, 0.7, 0.7);
    assert!((score - 0.7).abs() < 1e-9);
    assert_eq!(verdict(score), ApprovalStatus::NeedsMinorRevision);
  }

  #[test]
  fn test_threshold_boundaries() {
    assert_eq!(verdict(0.8), ApprovalStatus::Approved);
    assert_eq!(verdict(0.65), ApprovalStatus::NeedsMinorRevision);
    assert_eq!(verdict(0.6), ApprovalStatus::NeedsMajorRevision);
  }
}
