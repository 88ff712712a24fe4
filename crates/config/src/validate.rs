//! Schema validation and coercion applied to raw YAML documents before
//! they are mapped into typed structures.
//!
//! Two passes run before a document is deserialised into its typed shape:
//! `normalise` drops null-valued mapping entries and coerces scalar values
//! under `vars`/`backend_config` keys to strings, then `validate_*`
//! checks required structure and reports violations with dotted paths.

use std::path::Path;

use serde_yaml::Value;

use crate::error::{ConfigError, Result};
use crate::raw::MonorepoDocument;
use infraglue_model::WorkspaceDocument;

/// Recursively strip null-valued mapping entries and coerce scalars under
/// `vars`/`backend_config` keys to strings.
pub fn normalise(value: &mut Value) {
    strip_nulls(value);
    coerce_var_maps(value);
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            let keys_to_remove: Vec<Value> =
                map.iter().filter(|(_, v)| v.is_null()).map(|(k, _)| k.clone()).collect();
            for key in keys_to_remove {
                map.remove(&key);
            }
            for (_, v) in map.iter_mut() {
                strip_nulls(v);
            }
        }
        Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                strip_nulls(v);
            }
        }
        _ => {}
    }
}

const VAR_MAP_KEYS: [&str; 2] = ["vars", "backend_config"];

fn coerce_var_maps(value: &mut Value) {
    if let Value::Mapping(map) = value {
        let var_map_keys: Vec<Value> = map
            .iter()
            .filter(|(k, _)| matches!(k, Value::String(s) if VAR_MAP_KEYS.contains(&s.as_str())))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &var_map_keys {
            if let Some(entry) = map.get_mut(key) {
                coerce_scalars(entry);
            }
        }
        for (key, v) in map.iter_mut() {
            if !var_map_keys.contains(key) {
                coerce_var_maps(v);
            }
        }
    } else if let Value::Sequence(seq) = value {
        for v in seq.iter_mut() {
            coerce_var_maps(v);
        }
    }
}

fn coerce_scalars(value: &mut Value) {
    if let Value::Mapping(map) = value {
        for (_, v) in map.iter_mut() {
            *v = Value::String(scalar_to_string(v));
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

fn field_error(path: &Path, field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation { path: path.to_path_buf(), field: field.to_string(), message: message.into() }
}

/// Validate and map the monorepo-root document. A missing or empty
/// `workspace` list is a validation error (the loader treats a wholly
/// missing file differently, as "no monorepo here").
pub fn validate_monorepo(mut value: Value, path: &Path) -> Result<MonorepoDocument> {
    normalise(&mut value);

    let Value::Mapping(_) = &value else {
        return Err(field_error(path, "$", "expected a mapping at the document root"));
    };

    let doc: MonorepoDocument =
        serde_yaml::from_value(value).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    if doc.workspace.is_empty() {
        return Err(field_error(path, "workspace", "must be a non-empty list of glob patterns"));
    }

    Ok(doc)
}

/// Validate and map a per-workspace document. Any top-level shape other
/// than a mapping is rejected; individual fields fall back to empty
/// defaults via `#[serde(default)]` on [`WorkspaceDocument`].
pub fn validate_workspace(mut value: Value, path: &Path) -> Result<WorkspaceDocument> {
    normalise(&mut value);

    let Value::Mapping(_) = &value else {
        return Err(field_error(path, "$", "expected a mapping at the document root"));
    };

    let doc: WorkspaceDocument =
        serde_yaml::from_value(value).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    if let Some(provider) = &doc.provider {
        if provider != "terraform" && provider != "pulumi" {
            return Err(ConfigError::UnknownProvider { path: path.to_path_buf(), name: provider.clone() });
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workspace_list_is_rejected() {
        let value: Value = serde_yaml::from_str("workspace: []").expect("parse");
        let err = validate_monorepo(value, Path::new("ig.yaml")).expect_err("should reject");
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn null_entries_are_stripped() {
        let mut value: Value = serde_yaml::from_str("alias: null\nprovider: terraform").expect("parse");
        normalise(&mut value);
        let Value::Mapping(map) = &value else { panic!("expected mapping") };
        assert!(!map.contains_key(&Value::String("alias".to_string())));
        assert!(map.contains_key(&Value::String("provider".to_string())));
    }

    #[test]
    fn vars_scalars_are_coerced_to_strings() {
        let mut value: Value = serde_yaml::from_str("envs:\n  dev:\n    vars:\n      port: 8080\n      debug: true\n").expect("parse");
        normalise(&mut value);
        let doc: WorkspaceDocument = serde_yaml::from_value(value).expect("maps cleanly");
        let env = &doc.envs["dev"];
        assert_eq!(env.vars["port"], "8080");
        assert_eq!(env.vars["debug"], "true");
    }

    #[test]
    fn unknown_provider_name_is_rejected() {
        let value: Value = serde_yaml::from_str("provider: cloudformation").expect("parse");
        let err = validate_workspace(value, Path::new("ig.yaml")).expect_err("should reject");
        assert!(matches!(err, ConfigError::UnknownProvider { .. }));
    }
}
