use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use brine_config::CommandDef;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::capability::{Capabilities, Capability};
use crate::error::UnitError;
use crate::options::{Options, merge_options};
use crate::unit::{UnitInput, UnitOfWork};

/// A unit backed by an external program.
///
/// The program receives one JSON document on stdin:
/// `{"unit", "options", "payload", "context", "output_dir"}` and must print
/// its output as JSON on stdout. A non-zero exit status or unparseable stdout
/// fails the unit. The child is killed if the run stops waiting for it.
#[derive(Debug, Clone)]
pub struct CommandUnit {
  name: String,
  program: String,
  args: Vec<String>,
  env: BTreeMap<String, String>,
  working_dir: Option<PathBuf>,
  options: Options,
  output_dir: Option<PathBuf>,
}

impl CommandUnit {
  pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      program: program.into(),
      args: Vec::new(),
      env: BTreeMap::new(),
      working_dir: None,
      options: Options::new(),
      output_dir: None,
    }
  }

  pub fn from_def(name: impl Into<String>, def: &CommandDef) -> Self {
    Self {
      args: def.args.clone(),
      env: def.env.clone(),
      working_dir: def.working_dir.as_ref().map(PathBuf::from),
      ..Self::new(name, def.program.clone())
    }
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args = args.into_iter().map(Into::into).collect();
    self
  }

  pub fn options(&self) -> &Options {
    &self.options
  }

  pub fn output_dir(&self) -> Option<&Path> {
    self.output_dir.as_deref()
  }

  fn request(&self, input: &UnitInput) -> Value {
    json!({
      "unit": self.name,
      "options": self.options,
      "payload": input.payload.as_ref(),
      "context": input.context.as_ref(),
      "output_dir": self.output_dir,
    })
  }
}

#[async_trait]
impl UnitOfWork for CommandUnit {
  fn name(&self) -> &str {
    &self.name
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::none()
      .with(Capability::Configurable)
      .with(Capability::Initializable)
      .with(Capability::PathAware)
  }

  fn configure(&mut self, options: &Options) {
    merge_options(&mut self.options, options);
  }

  fn set_output_dir(&mut self, path: &Path) {
    self.output_dir = Some(path.to_path_buf());
  }

  async fn initialize(&mut self) -> Result<(), UnitError> {
    // Bare program names are resolved through PATH at spawn time.
    let program = Path::new(&self.program);
    if program.components().count() > 1 && !tokio::fs::try_exists(program).await? {
      return Err(UnitError::Initialization {
        message: format!("program '{}' does not exist", self.program),
      });
    }
    Ok(())
  }

  async fn run(&self, input: UnitInput) -> Result<Value, UnitError> {
    let body = serde_json::to_vec(&self.request(&input)).map_err(|e| UnitError::InvalidInput {
      message: e.to_string(),
    })?;

    let mut command = Command::new(&self.program);
    command
      .args(&self.args)
      .envs(&self.env)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(dir) = &self.working_dir {
      command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|source| UnitError::Spawn {
      program: self.program.clone(),
      source,
    })?;
    debug!(unit = %self.name, program = %self.program, "unit_process_spawned");

    let stdin = child.stdin.take();
    let write = async move {
      if let Some(mut stdin) = stdin {
        stdin.write_all(&body).await?;
      }
      Ok::<_, std::io::Error>(())
    };
    let (written, output) = tokio::join!(write, child.wait_with_output());
    let output = output?;

    if !output.status.success() {
      return Err(UnitError::ProcessExit {
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    // A program may exit successfully without reading its input.
    if let Err(e) = written {
      if e.kind() != std::io::ErrorKind::BrokenPipe {
        return Err(UnitError::Io(e));
      }
    }

    serde_json::from_slice(&output.stdout).map_err(|e| UnitError::InvalidOutput {
      message: format!("stdout is not valid JSON: {}", e),
    })
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn shell(name: &str, script: &str) -> CommandUnit {
    CommandUnit::new(name, "sh").args(["-c", script])
  }

  #[tokio::test]
  async fn test_run_returns_stdout_json() {
    let unit = shell("qc", r#"cat > /dev/null; echo '{"stats": {"n_valid": 9, "n_total": 10}}'"#);

    let output = unit
      .run(UnitInput::from_payload(json!({"files": []})))
      .await
      .unwrap();

    assert_eq!(output["stats"]["n_valid"], json!(9));
  }

  #[tokio::test]
  async fn test_run_passes_request_on_stdin() {
    let mut unit = shell("echo", "cat");
    let mut options = Options::new();
    options.insert("threshold".to_string(), json!(0.5));
    unit.configure(&options);
    unit.set_output_dir(Path::new("/tmp/brine-session"));

    let output = unit
      .run(UnitInput::from_payload(json!({"cruise": "A1"})))
      .await
      .unwrap();

    assert_eq!(output["unit"], json!("echo"));
    assert_eq!(output["options"]["threshold"], json!(0.5));
    assert_eq!(output["payload"]["cruise"], json!("A1"));
    assert_eq!(output["output_dir"], json!("/tmp/brine-session"));
    assert_eq!(output["context"], json!({}));
  }

  #[tokio::test]
  async fn test_non_zero_exit_is_failure() {
    let unit = shell("broken", "echo 'bad input' >&2; exit 3");

    let err = unit
      .run(UnitInput::from_payload(Value::Null))
      .await
      .unwrap_err();

    match err {
      UnitError::ProcessExit { code, stderr } => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "bad input");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn test_invalid_stdout_is_failure() {
    let unit = shell("chatty", "echo not json");

    let err = unit
      .run(UnitInput::from_payload(Value::Null))
      .await
      .unwrap_err();

    assert!(matches!(err, UnitError::InvalidOutput { .. }));
  }

  #[tokio::test]
  async fn test_initialize_checks_program_path() {
    let mut missing = CommandUnit::new("ghost", "/nonexistent/brine-unit");
    assert!(matches!(
      missing.initialize().await,
      Err(UnitError::Initialization { .. })
    ));

    let mut on_path = CommandUnit::new("sh", "sh");
    assert!(on_path.initialize().await.is_ok());
  }
}
