//! Workflow scheduler.
//!
//! The [`WorkflowScheduler`] walks an [`OrderedPlan`] stage by stage and is
//! the only writer of the run's [`RunState`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use brine_bus::{Channel, CommunicationBus, MessageKind};
use brine_config::{DEFAULT_MAX_WORKERS, FeedbackGate, RunSettings};
use brine_review::{FeedbackEvaluator, OutputValidator};
use brine_unit::{Capability, ContextView, UnitInput, UnitOfWork, UnitRegistry};
use brine_workflow::{OrderedPlan, StageDefinition, UnitDescriptor};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::context::RunContext;
use crate::error::{RunError, RunFailure};
use crate::events::{ExecutionEvent, SCHEDULER, SUPERVISOR};
use crate::state::RunState;
use crate::status::WorkflowStatus;
use crate::task::{UnitHandle, UnitTask};

type SharedUnits = BTreeMap<String, Arc<dyn UnitOfWork>>;

/// Configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  /// Upper bound on units running at once within a parallel stage.
  pub max_workers: usize,
  /// Wall-clock budget for a whole run.
  pub run_timeout: Option<Duration>,
  /// Output directory handed to path-aware units.
  pub artifact_dir: Option<PathBuf>,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      max_workers: DEFAULT_MAX_WORKERS,
      run_timeout: None,
      artifact_dir: None,
    }
  }
}

impl SchedulerConfig {
  pub fn from_settings(settings: &RunSettings, artifact_dir: Option<PathBuf>) -> Self {
    Self {
      max_workers: settings.max_workers,
      run_timeout: settings.timeout_ms.map(Duration::from_millis),
      artifact_dir,
    }
  }
}

/// The workflow scheduler.
///
/// Handles stage ordering, unit lifecycle, fan-out/fan-in and feedback
/// evaluation, and publishes progress on the [`CommunicationBus`].
pub struct WorkflowScheduler {
  config: SchedulerConfig,
  bus: Arc<CommunicationBus>,
  evaluator: Arc<FeedbackEvaluator>,
  validators: BTreeMap<String, Arc<dyn OutputValidator>>,
}

impl WorkflowScheduler {
  pub fn new(config: SchedulerConfig) -> Self {
    Self {
      config,
      bus: Arc::new(CommunicationBus::new()),
      evaluator: Arc::new(FeedbackEvaluator::new()),
      validators: BTreeMap::new(),
    }
  }

  pub fn with_bus(mut self, bus: Arc<CommunicationBus>) -> Self {
    self.bus = bus;
    self
  }

  pub fn with_evaluator(mut self, evaluator: FeedbackEvaluator) -> Self {
    self.evaluator = Arc::new(evaluator);
    self
  }

  /// Check every output of `unit` before it is accepted; a rejection fails
  /// the unit's stage.
  pub fn with_validator(
    mut self,
    unit: impl Into<String>,
    validator: impl OutputValidator + 'static,
  ) -> Self {
    self.validators.insert(unit.into(), Arc::new(validator));
    self
  }

  pub fn bus(&self) -> &Arc<CommunicationBus> {
    &self.bus
  }

  pub fn config(&self) -> &SchedulerConfig {
    &self.config
  }

  /// Execute the plan with the given initial payload.
  ///
  /// Units are configured, given their output directory and initialized
  /// before the first stage starts. On failure the returned [`RunFailure`]
  /// carries the partial state: status `failed`, `current_stage` at the
  /// failing stage, and every output merged so far.
  #[instrument(
    name = "scheduler_execute",
    skip(self, plan, registry, initial_input, cancel),
    fields(workflow = %plan.name())
  )]
  pub async fn execute(
    &self,
    plan: &OrderedPlan,
    registry: UnitRegistry,
    initial_input: Value,
    cancel: CancellationToken,
  ) -> Result<RunState, RunFailure> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut state = RunState::new(WorkflowStatus::new(&run_id, plan));

    info!(
      run_id = %run_id,
      workflow = %plan.name(),
      stages = plan.stages().len(),
      "run_started"
    );
    ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
      workflow: plan.name().to_string(),
    }
    .publish(&self.bus);
    self.bus.send(
      Channel::Data,
      SCHEDULER,
      "units",
      MessageKind::Data,
      initial_input.clone(),
    );

    let payload = Arc::new(initial_input);
    let run_cancel = cancel.child_token();

    // Preparation counts against the run budget and honours cancellation.
    let outcome = {
      let guarded = async {
        tokio::select! {
          biased;
          _ = run_cancel.cancelled() => Err(RunError::Cancelled),
          outcome = self.run_plan(&run_id, plan, registry, &payload, &mut state, &run_cancel) => outcome,
        }
      };
      match self.config.run_timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
          Ok(outcome) => outcome,
          Err(_) => Err(RunError::GlobalTimeoutExceeded {
            timeout_ms: limit.as_millis() as u64,
          }),
        },
        None => guarded.await,
      }
    };

    match outcome {
      Ok(()) => {
        state.status.mark_completed();
        info!(
          run_id = %run_id,
          outputs = state.context.len(),
          feedback = state.feedback.len(),
          "run_completed"
        );
        ExecutionEvent::RunCompleted { run_id }.publish(&self.bus);
        Ok(state)
      }
      Err(error) => {
        // Stop any unit task still running on its own.
        run_cancel.cancel();
        Err(self.fail(run_id, state, error))
      }
    }
  }

  /// Execute a single unit in isolation.
  ///
  /// This is for debugging: the unit runs against the given context without
  /// graph traversal, dependency checks or feedback evaluation.
  #[instrument(
    name = "scheduler_execute_unit",
    skip(self, plan, registry, payload, context, cancel),
    fields(unit = %unit)
  )]
  pub async fn execute_unit(
    &self,
    plan: &OrderedPlan,
    mut registry: UnitRegistry,
    unit: &str,
    payload: Value,
    context: ContextView,
    cancel: CancellationToken,
  ) -> Result<Value, RunError> {
    let descriptor = plan.unit(unit).ok_or_else(|| RunError::UnitNotInPlan {
      unit: unit.to_string(),
    })?;
    let stage = plan
      .stage_of(unit)
      .map(|stage| stage.name.clone())
      .unwrap_or_default();

    self.prepare_unit(descriptor, &mut registry).await?;
    let shared = registry.into_shared();

    let task = UnitTask {
      run_id: uuid::Uuid::new_v4().to_string(),
      stage,
      name: unit.to_string(),
      unit: lookup(&shared, unit)?,
      timeout_ms: descriptor.timeout_ms,
      retry: descriptor.retry,
      bus: self.bus.clone(),
    };
    let input = UnitInput::new(Arc::new(payload), Arc::new(context));

    let result = run_detached(task, input, cancel).await;
    match &result {
      Ok(output) => info!(unit = %unit, output = %output, "execute_unit_completed"),
      Err(e) => error!(unit = %unit, error = %e, "execute_unit_failed"),
    }
    result
  }

  /// Prepare every unit, then run every stage in declared order.
  async fn run_plan(
    &self,
    run_id: &str,
    plan: &OrderedPlan,
    registry: UnitRegistry,
    payload: &Arc<Value>,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<(), RunError> {
    let units = self.prepare_units(plan, registry).await?;
    self
      .run_stages(run_id, plan, &units, payload, state, cancel)
      .await
  }

  /// Configure, place and initialize every scheduled unit, then freeze them.
  async fn prepare_units(
    &self,
    plan: &OrderedPlan,
    mut registry: UnitRegistry,
  ) -> Result<SharedUnits, RunError> {
    for descriptor in plan.scheduled_units() {
      self.prepare_unit(descriptor, &mut registry).await?;
    }

    let mut shared = registry.into_shared();
    shared.retain(|name, _| plan.stage_of(name).is_some());
    Ok(shared)
  }

  async fn prepare_unit(
    &self,
    descriptor: &UnitDescriptor,
    registry: &mut UnitRegistry,
  ) -> Result<(), RunError> {
    let name = &descriptor.name;
    let unit = registry
      .get_mut(name)
      .ok_or_else(|| RunError::UnitNotRegistered { unit: name.clone() })?;
    let capabilities = unit.capabilities();

    if capabilities.contains(Capability::Configurable) {
      unit.configure(&descriptor.config);
    }

    if capabilities.contains(Capability::PathAware) {
      let dir = self
        .config
        .artifact_dir
        .as_ref()
        .ok_or_else(|| RunError::NoArtifactDir { unit: name.clone() })?;
      tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| RunError::OutputDirectory {
          unit: name.clone(),
          source,
        })?;
      unit.set_output_dir(dir);
    }

    if capabilities.contains(Capability::Initializable) {
      unit
        .initialize()
        .await
        .map_err(|source| RunError::Initialization {
          unit: name.clone(),
          source,
        })?;
    }

    debug!(
      unit = %name,
      capabilities = ?capabilities.iter().collect::<Vec<_>>(),
      "unit_prepared"
    );
    Ok(())
  }

  /// Run every stage in declared order.
  async fn run_stages(
    &self,
    run_id: &str,
    plan: &OrderedPlan,
    units: &SharedUnits,
    payload: &Arc<Value>,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<(), RunError> {
    for stage in plan.stages() {
      if cancel.is_cancelled() {
        warn!(run_id = %run_id, stage = %stage.name, "run_cancelled");
        return Err(RunError::Cancelled);
      }

      state.status.begin_stage(&stage.name);
      info!(
        run_id = %run_id,
        stage = %stage.name,
        parallel = stage.parallel,
        members = ?stage.members,
        "stage_started"
      );
      ExecutionEvent::StageStarted {
        run_id: run_id.to_string(),
        stage: stage.name.clone(),
        parallel: stage.parallel,
      }
      .publish(&self.bus);

      if stage.parallel {
        self
          .run_parallel(run_id, plan, stage, units, payload, state, cancel)
          .await?;
      } else {
        self
          .run_sequential(run_id, plan, stage, units, payload, state, cancel)
          .await?;
      }

      state.status.complete_stage(&stage.name);
      info!(run_id = %run_id, stage = %stage.name, "stage_completed");
      ExecutionEvent::StageCompleted {
        run_id: run_id.to_string(),
        stage: stage.name.clone(),
      }
      .publish(&self.bus);
    }

    Ok(())
  }

  /// Run members one at a time, merging each output before the next starts.
  #[allow(clippy::too_many_arguments)]
  async fn run_sequential(
    &self,
    run_id: &str,
    plan: &OrderedPlan,
    stage: &StageDefinition,
    units: &SharedUnits,
    payload: &Arc<Value>,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<(), RunError> {
    for member in &stage.members {
      let task = self.unit_task(run_id, plan, stage, member, units, &state.context)?;
      let input = UnitInput::new(payload.clone(), state.context.snapshot());
      let output = run_detached(task, input, cancel.clone()).await?;
      self.review_output(run_id, plan, &stage.name, member, &output, state)?;
      state.context.insert(member, output);
    }
    Ok(())
  }

  /// Fan members out against one snapshot and merge at the stage barrier.
  ///
  /// All members run to completion before an error is surfaced; the first
  /// error in member order wins and nothing from the stage is merged.
  #[allow(clippy::too_many_arguments)]
  async fn run_parallel(
    &self,
    run_id: &str,
    plan: &OrderedPlan,
    stage: &StageDefinition,
    units: &SharedUnits,
    payload: &Arc<Value>,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<(), RunError> {
    let tasks = stage
      .members
      .iter()
      .map(|member| self.unit_task(run_id, plan, stage, member, units, &state.context))
      .collect::<Result<Vec<_>, _>>()?;

    let snapshot = state.context.snapshot();
    let workers = self.config.max_workers.clamp(1, Semaphore::MAX_PERMITS);
    let permits = Arc::new(Semaphore::new(workers));

    let handles: Vec<UnitHandle> = tasks
      .into_iter()
      .map(|task| {
        let input = UnitInput::new(payload.clone(), snapshot.clone());
        let permits = permits.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
          let _permit = permits
            .acquire_owned()
            .await
            .map_err(|_| RunError::Cancelled)?;
          task.execute(input, cancel).await
        })
      })
      .collect();

    let results = futures::future::join_all(handles).await;

    let mut outputs = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (member, joined) in stage.members.iter().zip(results) {
      let result = joined.unwrap_or_else(|e| Err(join_error(&stage.name, member, e)));
      match result {
        Ok(output) => outputs.push((member, output)),
        Err(error) => {
          if first_error.is_none() {
            first_error = Some(error);
          }
        }
      }
    }

    if let Some(error) = first_error {
      return Err(error);
    }

    // Every output passes review before any of them is merged.
    for (member, output) in &outputs {
      self.review_output(run_id, plan, &stage.name, member, output, state)?;
    }
    for (member, output) in outputs {
      state.context.insert(member, output);
    }
    Ok(())
  }

  /// Build the task for one stage member after checking its inputs exist.
  fn unit_task(
    &self,
    run_id: &str,
    plan: &OrderedPlan,
    stage: &StageDefinition,
    member: &str,
    units: &SharedUnits,
    context: &RunContext,
  ) -> Result<UnitTask, RunError> {
    let descriptor = plan.unit(member).ok_or_else(|| RunError::UnitNotInPlan {
      unit: member.to_string(),
    })?;
    ensure_dependencies(stage, descriptor, context)?;

    Ok(UnitTask {
      run_id: run_id.to_string(),
      stage: stage.name.clone(),
      name: member.to_string(),
      unit: lookup(units, member)?,
      timeout_ms: descriptor.timeout_ms,
      retry: descriptor.retry,
      bus: self.bus.clone(),
    })
  }

  /// Validate, publish and evaluate one unit output.
  ///
  /// The feedback record is kept even when the unit's gate then rejects the
  /// output.
  fn review_output(
    &self,
    run_id: &str,
    plan: &OrderedPlan,
    stage: &str,
    unit: &str,
    output: &Value,
    state: &mut RunState,
  ) -> Result<(), RunError> {
    if let Some(validator) = self.validators.get(unit) {
      if let Err(reason) = validator.validate(output) {
        warn!(run_id = %run_id, stage = %stage, unit = %unit, reason = %reason, "output_rejected");
        let error = RunError::OutputRejected {
          stage: stage.to_string(),
          unit: unit.to_string(),
          reason,
        };
        self.emit_unit_failed(run_id, stage, unit, &error);
        return Err(error);
      }
    }

    self.bus.send(
      Channel::Results,
      unit,
      SUPERVISOR,
      MessageKind::Result,
      output.clone(),
    );

    let record = self.evaluator.evaluate(unit, output);
    let issues = record.evaluation.issues.clone();
    if issues.is_empty() {
      info!(
        run_id = %run_id,
        unit = %unit,
        completeness = record.evaluation.completeness,
        quality = record.evaluation.quality,
        consistency = record.evaluation.consistency,
        "feedback_recorded"
      );
    } else {
      warn!(run_id = %run_id, unit = %unit, issues = ?issues, "feedback_issues");
    }

    self.bus.send(
      Channel::Feedback,
      SUPERVISOR,
      unit,
      MessageKind::Feedback,
      serde_json::to_value(&record).unwrap_or(Value::Null),
    );
    state.feedback.push(record);

    let gate = plan.unit(unit).map(|descriptor| descriptor.gate).unwrap_or_default();
    if gate == FeedbackGate::Fail && !issues.is_empty() {
      let error = RunError::FeedbackRejected {
        stage: stage.to_string(),
        unit: unit.to_string(),
        issues,
      };
      self.emit_unit_failed(run_id, stage, unit, &error);
      return Err(error);
    }
    Ok(())
  }

  fn emit_unit_failed(&self, run_id: &str, stage: &str, unit: &str, error: &RunError) {
    ExecutionEvent::UnitFailed {
      run_id: run_id.to_string(),
      stage: stage.to_string(),
      unit: unit.to_string(),
      error: error.to_string(),
    }
    .publish(&self.bus);
  }

  fn fail(&self, run_id: String, mut state: RunState, error: RunError) -> RunFailure {
    state.status.mark_failed();
    let stage = state.status.current_stage.clone();

    error!(
      run_id = %run_id,
      stage = ?stage,
      unit = ?error.unit(),
      error = %error,
      "run_failed"
    );
    ExecutionEvent::RunFailed {
      run_id: run_id.clone(),
      stage,
      error: error.to_string(),
    }
    .publish(&self.bus);

    RunFailure {
      run_id,
      error,
      state: Box::new(state),
    }
  }
}

/// Run a unit task on its own tokio task so a panicking unit surfaces as
/// [`RunError::Join`] instead of unwinding through the scheduler.
async fn run_detached(
  task: UnitTask,
  input: UnitInput,
  cancel: CancellationToken,
) -> Result<Value, RunError> {
  let stage = task.stage.clone();
  let unit = task.name.clone();
  let handle: UnitHandle = tokio::spawn(task.execute(input, cancel));
  handle
    .await
    .unwrap_or_else(|e| Err(join_error(&stage, &unit, e)))
}

fn join_error(stage: &str, unit: &str, error: JoinError) -> RunError {
  RunError::Join {
    stage: stage.to_string(),
    unit: unit.to_string(),
    message: error.to_string(),
  }
}

fn lookup(units: &SharedUnits, name: &str) -> Result<Arc<dyn UnitOfWork>, RunError> {
  units
    .get(name)
    .cloned()
    .ok_or_else(|| RunError::UnitNotRegistered {
      unit: name.to_string(),
    })
}

/// Every dependency of `descriptor` must already have an output.
fn ensure_dependencies(
  stage: &StageDefinition,
  descriptor: &UnitDescriptor,
  context: &RunContext,
) -> Result<(), RunError> {
  match descriptor
    .dependencies
    .iter()
    .find(|dependency| !context.contains(dependency))
  {
    Some(dependency) => Err(RunError::MissingDependency {
      stage: stage.name.clone(),
      unit: descriptor.name.clone(),
      dependency: dependency.clone(),
    }),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_missing_dependency_detected() {
    let stage = StageDefinition::sequential("analysis", &["report"]);
    let descriptor = UnitDescriptor::new("report")
      .depends_on("qc")
      .depends_on("statistics");
    let mut context = RunContext::new();
    context.insert("qc", json!({}));

    let err = ensure_dependencies(&stage, &descriptor, &context).unwrap_err();
    match err {
      RunError::MissingDependency {
        stage,
        unit,
        dependency,
      } => {
        assert_eq!(stage, "analysis");
        assert_eq!(unit, "report");
        assert_eq!(dependency, "statistics");
      }
      other => panic!("unexpected error: {other}"),
    }

    context.insert("statistics", json!({}));
    assert!(ensure_dependencies(&stage, &descriptor, &context).is_ok());
  }

  #[test]
  fn test_config_from_settings() {
    let settings: RunSettings =
      serde_json::from_value(json!({ "timeout_ms": 300000, "max_workers": 2 })).unwrap();

    let config = SchedulerConfig::from_settings(&settings, Some(PathBuf::from("/tmp/out")));

    assert_eq!(config.max_workers, 2);
    assert_eq!(config.run_timeout, Some(Duration::from_secs(300)));
    assert_eq!(config.artifact_dir, Some(PathBuf::from("/tmp/out")));
  }
}
