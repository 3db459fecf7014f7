use serde_json::Value;

/// A check a unit's output must pass before the run accepts it.
///
/// Any `Fn(&Value) -> Result<(), String>` closure is a validator.
pub trait OutputValidator: Send + Sync {
  /// `Err` carries the reason the output is rejected.
  fn validate(&self, output: &Value) -> Result<(), String>;
}

impl<F> OutputValidator for F
where
  F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
  fn validate(&self, output: &Value) -> Result<(), String> {
    self(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn has_profiles(output: &Value) -> Result<(), String> {
    match output.pointer("/clean_data/temperature").and_then(Value::as_array) {
      Some(values) if !values.is_empty() => Ok(()),
      _ => Err("no temperature profile".to_string()),
    }
  }

  #[test]
  fn test_closure_validator() {
    let validator: &dyn OutputValidator = &has_profiles;

    assert!(validator.validate(&json!({ "clean_data": { "temperature": [4.1] } })).is_ok());
    assert_eq!(
      validator.validate(&json!({ "clean_data": {} })),
      Err("no temperature profile".to_string())
    );
  }
}
