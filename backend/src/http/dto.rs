//! Request and response bodies of the HTTP transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AppError;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Repository status: `connected`, `disconnected` or `error: ...`.
    pub database: String,
}

/// Query string of `/api/trpc/{paths}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcQuery {
    #[serde(default)]
    pub batch: Option<String>,
    /// JSON-encoded input, used by GET requests.
    #[serde(default)]
    pub input: Option<String>,
}

impl RpcQuery {
    pub fn is_batch(&self) -> bool {
        matches!(self.batch.as_deref(), Some("1") | Some("true"))
    }
}

/// Split `a.b,c.d` into procedure paths.
pub fn split_paths(paths: &str) -> Vec<String> {
    paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a raw input. An empty body is a `null` input.
pub fn parse_input(raw: &[u8]) -> Result<Value, AppError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw).map_err(|e| AppError::BadRequest(format!("Invalid JSON input: {}", e)))
}

/// Pair each path with its input from a `{"0": ..., "1": ...}` batch object.
/// Missing indexes get `null`.
pub fn batch_calls(paths: Vec<String>, input: Value) -> Result<Vec<(String, Value)>, AppError> {
    let mut inputs = match input {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => {
            return Err(AppError::BadRequest(
                "Batch input must be an object keyed by call index".to_string(),
            ))
        }
    };
    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let input = inputs.remove(&i.to_string()).unwrap_or(Value::Null);
            (path, input)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_paths() {
        assert_eq!(
            split_paths("project.getProjects,task.getTask"),
            vec!["project.getProjects", "task.getTask"]
        );
        assert!(split_paths("").is_empty());
    }

    #[test]
    fn test_batch_calls_fill_missing_inputs() {
        let calls = batch_calls(
            vec!["a.x".into(), "b.y".into()],
            json!({ "1": { "taskId": "t" } }),
        )
        .unwrap();
        assert_eq!(calls[0], ("a.x".to_string(), Value::Null));
        assert_eq!(calls[1].1, json!({ "taskId": "t" }));
        assert!(batch_calls(vec!["a.x".into()], json!([1])).is_err());
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(parse_input(b"  ").unwrap(), Value::Null);
        assert!(parse_input(b"{oops").is_err());
    }
}
