//! Per-call response envelope of the batch transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ErrorShape, ProcedureError, ProcedureResult};

/// `{"result":{"data":...}}` on success, `{"error":{...}}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Envelope {
    Result {
        #[serde(default)]
        data: Value,
    },
    Error(ErrorShape),
}

impl Envelope {
    pub fn from_result(path: &str, result: ProcedureResult<Value>) -> Self {
        match result {
            Ok(data) => Envelope::Result { data },
            Err(err) => Envelope::Error(ErrorShape::from_error(&err, path)),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Result { .. })
    }

    /// HTTP status of a lone envelope.
    pub fn http_status(&self) -> u16 {
        match self {
            Envelope::Result { .. } => 200,
            Envelope::Error(shape) => shape.http_status,
        }
    }

    pub fn into_result(self) -> ProcedureResult<Value> {
        match self {
            Envelope::Result { data } => Ok(data),
            Envelope::Error(shape) => Err(shape.into_error()),
        }
    }
}

/// 200 when every call succeeded, 207 otherwise.
pub fn batch_status(envelopes: &[Envelope]) -> u16 {
    if envelopes.iter().all(Envelope::is_ok) {
        200
    } else {
        207
    }
}

impl From<(&str, ProcedureError)> for Envelope {
    fn from((path, err): (&str, ProcedureError)) -> Self {
        Envelope::Error(ErrorShape::from_error(&err, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let env = Envelope::from_result("task.getTask", Ok(json!({ "id": "t1" })));
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({ "result": { "data": { "id": "t1" } } })
        );
    }

    #[test]
    fn test_error_shape_and_status() {
        let env = Envelope::from(("task.getTask", ProcedureError::new(ErrorCode::NotFound, "Failed to get task")));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["error"]["code"], "NOT_FOUND");
        assert_eq!(value["error"]["path"], "task.getTask");
        assert_eq!(env.http_status(), 404);

        let ok = Envelope::Result { data: Value::Null };
        assert_eq!(batch_status(&[ok.clone()]), 200);
        assert_eq!(batch_status(&[ok, env]), 207);
    }

    #[test]
    fn test_parse_back() {
        let env: Envelope = serde_json::from_value(json!({
            "error": { "message": "UNAUTHORIZED", "code": "UNAUTHORIZED", "httpStatus": 401, "path": "me.isCreatorOfProject" }
        }))
        .unwrap();
        assert_eq!(env.into_result().unwrap_err().code, ErrorCode::Unauthorized);
    }
}
