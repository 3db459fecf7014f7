use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use brine_artifact::{ArtifactLayout, OutputVerifier, SYSTEM_SOURCE};
use brine_bus::Channel;
use brine_config::{DEFAULT_REQUIRED_ARTIFACTS, WorkflowDef};
use brine_orchestrator::{RunState, SchedulerConfig, WorkflowScheduler};
use brine_review::{ApprovalSupervisor, FeedbackEvaluator, ReportHandle, UserFeedback};
use brine_unit::{ContextView, UnitRegistry};
use brine_workflow::OrderedPlan;

/// Report location inside the session directory when the workflow names none.
const DEFAULT_REPORT: &str = "reports/final/report.md";

/// Brine - staged oceanographic data workflows with feedback gating
#[derive(Parser)]
#[command(name = "brine")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.brine)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow or a single unit
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },

  /// Validate a workflow and print its execution order
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Check that required artifacts exist under a directory
  Verify {
    /// Directory the artifact paths are relative to
    root: PathBuf,

    /// Required artifact (repeatable; defaults to the standard figures)
    #[arg(long = "require")]
    required: Vec<String>,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run an entire workflow; the initial payload is read from stdin
  Workflow {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Base directory for run sessions (overrides the workflow setting)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// User rating on a 1-5 scale, folded into the final review
    #[arg(long)]
    rating: Option<f64>,

    /// Free-form reviewer comment (repeatable)
    #[arg(long = "comment")]
    comments: Vec<String>,
  },

  /// Run a single unit from a workflow against a given context
  Unit {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The unit to execute
    #[arg(long)]
    unit: String,

    /// JSON file holding upstream outputs keyed by unit name
    #[arg(long)]
    context: Option<PathBuf>,

    /// Output directory for path-aware units
    #[arg(long)]
    output_dir: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".brine"),
  };

  let rt = tokio::runtime::Runtime::new()?;
  match cli.command {
    Some(Commands::Run { target }) => match target {
      RunTarget::Workflow {
        workflow_file,
        output_dir,
        rating,
        comments,
      } => {
        let feedback = rating.map(|rating| UserFeedback {
          comments,
          ..UserFeedback::new(rating)
        });
        let approved = rt.block_on(run_workflow(workflow_file, output_dir, feedback, data_dir))?;
        if !approved {
          std::process::exit(1);
        }
      }
      RunTarget::Unit {
        workflow_file,
        unit,
        context,
        output_dir,
      } => {
        rt.block_on(run_unit(workflow_file, unit, context, output_dir, data_dir))?;
      }
    },
    Some(Commands::Validate { workflow_file }) => {
      rt.block_on(validate(workflow_file))?;
    }
    Some(Commands::Verify { root, required }) => {
      let complete = rt.block_on(verify(root, required));
      if !complete {
        std::process::exit(1);
      }
    }
    None => {
      println!("brine - use --help to see available commands");
    }
  }

  Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();
}

async fn load_workflow(workflow_file: &Path) -> Result<(WorkflowDef, OrderedPlan)> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  for section in def.unrecognized_sections() {
    tracing::warn!(section = %section, "unrecognized_config_section");
  }

  let plan = brine_workflow::lock(&def)
    .with_context(|| format!("workflow '{}' is not valid", def.name))?;
  Ok((def, plan))
}

fn registry_for(def: &WorkflowDef) -> Result<UnitRegistry> {
  if let Some(unit) = def.units.iter().find(|unit| unit.command.is_none()) {
    bail!("unit '{}' has no command to run", unit.name);
  }
  UnitRegistry::from_workflow(def).context("failed to register units")
}

/// Returns whether the run was approved.
async fn run_workflow(
  workflow_file: PathBuf,
  output_dir: Option<PathBuf>,
  user_feedback: Option<UserFeedback>,
  data_dir: PathBuf,
) -> Result<bool> {
  let (def, plan) = load_workflow(&workflow_file).await?;
  eprintln!("Loaded workflow: {} ({} stages)", def.name, plan.stages().len());

  let payload = read_payload_from_stdin()?;

  let base_dir = output_dir
    .or_else(|| def.settings.output_dir.as_ref().map(PathBuf::from))
    .unwrap_or_else(|| data_dir.join("runs"));
  let layout = ArtifactLayout::new(&base_dir);
  layout
    .prepare()
    .await
    .context("failed to prepare session directory")?;
  eprintln!("Session: {}", layout.session_dir().display());

  let registry = registry_for(&def)?;
  let evaluator = FeedbackEvaluator::new().with_expectations(&def.expectations);
  let scheduler = WorkflowScheduler::new(SchedulerConfig::from_settings(
    &def.settings,
    Some(layout.session_dir().to_path_buf()),
  ))
  .with_evaluator(evaluator.clone());

  let outcome = scheduler
    .execute(&plan, registry, payload, CancellationToken::new())
    .await;
  write_session_log(&layout, &scheduler).await;

  let state = match outcome {
    Ok(state) => state,
    Err(failure) => {
      save_state(&layout, &failure.state).await?;
      eprintln!(
        "Run {} failed at stage {}",
        failure.run_id,
        failure
          .state
          .status()
          .current_stage
          .as_deref()
          .unwrap_or("-")
      );
      return Err(failure).context("workflow execution failed");
    }
  };
  save_state(&layout, &state).await?;

  let report = match &def.settings.report {
    Some(report) => ReportHandle::new(layout.session_dir().join(&report.path))
      .with_sections(report.required_sections.iter()),
    None => ReportHandle::new(layout.session_dir().join(DEFAULT_REPORT)),
  };

  let mut supervisor = ApprovalSupervisor::new(evaluator);
  supervisor.record_feedback(state.feedback().iter().cloned());
  let review = supervisor.review(&report, user_feedback).await;
  layout
    .save_data("review", "final", &serde_json::to_value(&review)?)
    .await?;

  let mut verifier = OutputVerifier::new();
  let complete = verifier
    .verify(layout.session_dir(), &def.settings.required_artifacts)
    .await;

  let summary = json!({
    "run_id": state.status().run_id,
    "session": layout.session_dir(),
    "status": state.status().status,
    "completed_stages": state.status().completed_stages,
    "final_score": review.final_score,
    "approval_status": review.approval_status,
    "recommendations": review.recommendations,
    "artifacts_complete": complete,
    "missing_artifacts": verifier.missing(),
  });
  println!("{}", serde_json::to_string_pretty(&summary)?);

  Ok(complete && review.approval_status == brine_review::ApprovalStatus::Approved)
}

/// Copy the run's status events into the session log.
async fn write_session_log(layout: &ArtifactLayout, scheduler: &WorkflowScheduler) {
  for envelope in scheduler.bus().drain(Channel::Status).await {
    let content = &envelope.content;
    let source = content["unit"].as_str().unwrap_or(SYSTEM_SOURCE);
    let level = match content["event"].as_str() {
      Some("unit_failed" | "run_failed") => tracing::Level::ERROR,
      _ => tracing::Level::INFO,
    };
    if let Err(e) = layout.log_event(source, level, &content.to_string()).await {
      tracing::warn!(error = %e, "session_log_failed");
      return;
    }
  }
}

async fn save_state(layout: &ArtifactLayout, state: &RunState) -> Result<()> {
  layout
    .save_data("context", "results", &serde_json::to_value(state.context())?)
    .await?;
  layout
    .save_data("status", "results", &serde_json::to_value(state.status())?)
    .await?;
  layout
    .save_data("feedback", "results", &serde_json::to_value(state.feedback())?)
    .await?;
  Ok(())
}

async fn run_unit(
  workflow_file: PathBuf,
  unit: String,
  context_file: Option<PathBuf>,
  output_dir: Option<PathBuf>,
  data_dir: PathBuf,
) -> Result<()> {
  let (def, plan) = load_workflow(&workflow_file).await?;
  eprintln!("Running unit: {}", unit);

  let context: ContextView = match context_file {
    Some(path) => {
      let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read context file: {}", path.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse context file: {}", path.display()))?
    }
    None => ContextView::new(),
  };
  let payload = read_payload_from_stdin()?;

  let artifact_dir = output_dir.unwrap_or_else(|| data_dir.join("scratch"));
  let scheduler = WorkflowScheduler::new(SchedulerConfig::from_settings(
    &def.settings,
    Some(artifact_dir),
  ));

  let output = scheduler
    .execute_unit(
      &plan,
      registry_for(&def)?,
      &unit,
      payload,
      context,
      CancellationToken::new(),
    )
    .await
    .with_context(|| format!("unit '{}' failed", unit))?;

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn validate(workflow_file: PathBuf) -> Result<()> {
  let (_, plan) = load_workflow(&workflow_file).await?;

  for stage in plan.stages() {
    let mode = if stage.parallel { "parallel" } else { "sequential" };
    eprintln!("{} ({}): {}", stage.name, mode, stage.members.join(", "));
  }
  println!("{}", serde_json::to_string_pretty(&plan.execution_order())?);
  Ok(())
}

async fn verify(root: PathBuf, required: Vec<String>) -> bool {
  let required = if required.is_empty() {
    DEFAULT_REQUIRED_ARTIFACTS
      .iter()
      .map(|path| path.to_string())
      .collect()
  } else {
    required
  };

  let mut verifier = OutputVerifier::new();
  let complete = verifier.verify(&root, &required).await;
  for path in verifier.missing() {
    eprintln!("missing: {}", path);
  }
  println!(
    "{}",
    json!({ "complete": complete, "missing": verifier.missing() })
  );
  complete
}

fn read_payload_from_stdin() -> Result<Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    Ok(json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
