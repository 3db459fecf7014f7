//! Single-unit execution with timeout and retry.

use std::sync::Arc;
use std::time::Duration;

use brine_bus::CommunicationBus;
use brine_unit::{UnitError, UnitInput, UnitOfWork};
use brine_workflow::RetryPolicy;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::RunError;
use crate::events::ExecutionEvent;

/// Handle for a spawned unit task.
pub(crate) type UnitHandle = tokio::task::JoinHandle<Result<Value, RunError>>;

enum AttemptError {
  Failed(UnitError),
  TimedOut(u64),
}

/// One unit, ready to run within a stage.
pub(crate) struct UnitTask {
  pub run_id: String,
  pub stage: String,
  pub name: String,
  pub unit: Arc<dyn UnitOfWork>,
  pub timeout_ms: Option<u64>,
  pub retry: RetryPolicy,
  pub bus: Arc<CommunicationBus>,
}

impl UnitTask {
  /// Run the unit until it succeeds, fails, or runs out of attempts.
  ///
  /// Each attempt gets its own timeout budget. Only timeouts are retried.
  #[instrument(
    name = "unit_execute",
    skip(self, input, cancel),
    fields(
      run_id = %self.run_id,
      stage = %self.stage,
      unit = %self.name,
    )
  )]
  pub async fn execute(self, input: UnitInput, cancel: CancellationToken) -> Result<Value, RunError> {
    let mut attempt = 1;

    loop {
      self.emit_started(attempt);
      info!(attempt, "unit_started");

      let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          warn!(attempt, "unit_cancelled");
          return Err(RunError::Cancelled);
        }
        outcome = self.attempt(input.clone()) => outcome,
      };

      match outcome {
        Ok(output) => {
          info!(attempt, "unit_completed");
          ExecutionEvent::UnitCompleted {
            run_id: self.run_id.clone(),
            stage: self.stage.clone(),
            unit: self.name.clone(),
          }
          .publish(&self.bus);
          return Ok(output);
        }
        Err(AttemptError::Failed(source)) => {
          error!(attempt, error = %source, "unit_failed");
          self.emit_failed(source.to_string());
          return Err(RunError::Unit {
            stage: self.stage.clone(),
            unit: self.name.clone(),
            source,
          });
        }
        Err(AttemptError::TimedOut(timeout_ms)) if self.retry.allows_retry_after(attempt) => {
          let delay = self.retry.delay_for_attempt(attempt);
          warn!(
            attempt,
            timeout_ms,
            delay_ms = delay.as_millis() as u64,
            "unit_timed_out_retrying"
          );
          ExecutionEvent::UnitRetrying {
            run_id: self.run_id.clone(),
            stage: self.stage.clone(),
            unit: self.name.clone(),
            attempt,
            delay_ms: delay.as_millis() as u64,
          }
          .publish(&self.bus);

          tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
          }
          attempt += 1;
        }
        Err(AttemptError::TimedOut(timeout_ms)) => {
          error!(attempt, timeout_ms, "unit_timed_out");
          let error = RunError::Timeout {
            stage: self.stage.clone(),
            unit: self.name.clone(),
            timeout_ms,
          };
          self.emit_failed(error.to_string());
          return Err(error);
        }
      }
    }
  }

  async fn attempt(&self, input: UnitInput) -> Result<Value, AttemptError> {
    match self.timeout_ms {
      Some(timeout_ms) => {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.unit.run(input)).await {
          Ok(result) => result.map_err(AttemptError::Failed),
          Err(_) => Err(AttemptError::TimedOut(timeout_ms)),
        }
      }
      None => self.unit.run(input).await.map_err(AttemptError::Failed),
    }
  }

  fn emit_started(&self, attempt: u32) {
    ExecutionEvent::UnitStarted {
      run_id: self.run_id.clone(),
      stage: self.stage.clone(),
      unit: self.name.clone(),
      attempt,
    }
    .publish(&self.bus);
  }

  fn emit_failed(&self, error: String) {
    ExecutionEvent::UnitFailed {
      run_id: self.run_id.clone(),
      stage: self.stage.clone(),
      unit: self.name.clone(),
      error,
    }
    .publish(&self.bus);
  }
}
