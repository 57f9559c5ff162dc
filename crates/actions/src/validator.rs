//! Schema validation for proposed actions.
//!
//! Validation never has side effects and always runs before dispatch.
//! Type mismatches are deliberately lenient: they are logged as warnings
//! but do not block execution.

use autoforge_core::{ActionCatalog, ActionKind, ParamType, SessionState, ValidationError};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Validate a proposed action name and argument mapping against the catalog.
///
/// Fails with:
/// - [`ValidationError::InvalidAction`] when the name is not in the catalog
/// - [`ValidationError::MissingParameter`] when a required parameter is
///   absent or a blank string
/// - [`ValidationError::InvalidPath`] when a path parameter carries a
///   parent-traversal segment or control characters
pub fn validate(
    catalog: &ActionCatalog,
    action: &str,
    args: &Map<String, Value>,
) -> Result<ActionKind, ValidationError> {
    let def = catalog
        .lookup(action)
        .ok_or_else(|| ValidationError::InvalidAction(action.to_string()))?;

    for param in &def.params {
        let value = args.get(param.name);

        if param.required {
            let blank = match value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if blank {
                return Err(ValidationError::MissingParameter {
                    action: action.to_string(),
                    param: param.name.to_string(),
                });
            }
        }

        let Some(value) = value else { continue };

        if param.path
            && let Some(raw) = value.as_str()
            && let Err(violation) = autoforge_security::check_raw(raw)
        {
            return Err(ValidationError::InvalidPath {
                path: raw.to_string(),
                reason: violation.to_string(),
            });
        }

        if !type_matches(param.kind, value) {
            warn!(
                action,
                param = param.name,
                expected = ?param.kind,
                got = json_type(value),
                "Parameter type mismatch, proceeding anyway"
            );
        }
    }

    Ok(def.kind)
}

/// Redundancy guard consulted by the batch protocol before execution.
///
/// Returns a reason when the task duplicates recorded work: a `modify_file`
/// whose content hashes to the recorded hash for that path, or a task
/// re-implementing an already-recorded feature tag.
pub fn check_redundancy(
    state: &SessionState,
    kind: ActionKind,
    args: &Map<String, Value>,
) -> Option<String> {
    if let Some(feature) = args.get("feature").and_then(Value::as_str)
        && state.has_feature(feature)
        && matches!(kind, ActionKind::CreateFile | ActionKind::InstallDependency)
    {
        return Some(format!("feature '{feature}' is already implemented"));
    }

    if kind == ActionKind::ModifyFile
        && let (Some(raw), Some(content)) = (
            args.get("path").and_then(Value::as_str),
            args.get("content").and_then(Value::as_str),
        )
        && let Ok(resolved) = autoforge_security::resolve_in_root(&state.project_root, raw)
        && let Some(recorded) = state.file_hashes.get(&resolved.to_string_lossy().to_string())
    {
        let hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        if &hash == recorded {
            return Some(format!("content of '{raw}' is unchanged"));
        }
    }

    None
}

fn type_matches(expected: ParamType, value: &Value) -> bool {
    match expected {
        ParamType::String => value.is_string(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Number => value.is_number(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
