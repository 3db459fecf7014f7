use serde_json::Value;

/// Unit configuration as handed to `configure`.
pub type Options = serde_json::Map<String, Value>;

/// Merge `overrides` into `base`.
///
/// Nested objects merge key by key; any other value replaces what was there.
/// Keys unknown to `base` are kept, so units tolerate options they do not
/// read.
pub fn merge_options(base: &mut Options, overrides: &Options) {
  for (key, value) in overrides {
    match (base.get_mut(key), value) {
      (Some(Value::Object(existing)), Value::Object(incoming)) => {
        merge_options(existing, incoming);
      }
      _ => {
        base.insert(key.clone(), value.clone());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn options(value: Value) -> Options {
    match value {
      Value::Object(map) => map,
      _ => panic!("expected object"),
    }
  }

  #[test]
  fn test_merge_nested_and_unknown_keys() {
    let mut base = options(json!({
      "batch_size": 100,
      "ranges": { "temperature": [-2, 35], "salinity": [0, 42] }
    }));
    let overrides = options(json!({
      "ranges": { "temperature": [0, 30] },
      "colormap": "viridis"
    }));

    merge_options(&mut base, &overrides);

    assert_eq!(
      Value::Object(base),
      json!({
        "batch_size": 100,
        "ranges": { "temperature": [0, 30], "salinity": [0, 42] },
        "colormap": "viridis"
      })
    );
  }

  #[test]
  fn test_scalar_replaces_object() {
    let mut base = options(json!({ "limits": { "max": 1 } }));
    merge_options(&mut base, &options(json!({ "limits": null })));
    assert_eq!(base["limits"], Value::Null);
  }
}
