//! How calls reach the server.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use super::error::{ClientError, ClientResult};
use crate::api::User;
use crate::rpc::{self, Context, Envelope, Services, Session};

/// Sends a batch of `(path, input)` calls and returns one envelope per call,
/// in order.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn batch(&self, calls: Vec<(String, Value)>) -> ClientResult<Vec<Envelope>>;

    async fn call(&self, path: &str, input: Value) -> ClientResult<Value> {
        let mut envelopes = self.batch(vec![(path.to_string(), input)]).await?;
        if envelopes.len() != 1 {
            return Err(ClientError::BatchMismatch);
        }
        let envelope = envelopes.pop().ok_or(ClientError::BatchMismatch)?;
        Ok(envelope.into_result()?)
    }
}

/// Batch transport over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    user: Option<User>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, user: Option<User>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user,
        }
    }

    fn session_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Some(user) = &self.user else {
            return headers;
        };
        let fields = [
            ("x-user-id", Some(user.id.as_str())),
            ("x-user-name", user.name.as_deref()),
            ("x-user-email", user.email.as_deref()),
            ("x-user-image", user.image.as_deref()),
        ];
        for (name, value) in fields {
            if let Some(value) = value.and_then(|v| v.parse().ok()) {
                headers.insert(name, value);
            }
        }
        headers
    }

    pub fn batch_url(&self, paths: &[&str]) -> String {
        format!("{}/api/trpc/{}?batch=1", self.base_url, paths.join(","))
    }
}

/// `{"0": input0, "1": input1, ...}`
pub fn batch_body(calls: &[(String, Value)]) -> Value {
    let body: Map<String, Value> = calls
        .iter()
        .enumerate()
        .map(|(i, (_, input))| (i.to_string(), input.clone()))
        .collect();
    Value::Object(body)
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn batch(&self, calls: Vec<(String, Value)>) -> ClientResult<Vec<Envelope>> {
        let paths: Vec<&str> = calls.iter().map(|(p, _)| p.as_str()).collect();
        let response = self
            .client
            .post(self.batch_url(&paths))
            .headers(self.session_headers())
            .json(&batch_body(&calls))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if status != 200 && status != 207 {
            // Transport rejections come back as a single error envelope.
            if let Ok(envelope) = serde_json::from_str::<Envelope>(&body) {
                if let Err(err) = envelope.into_result() {
                    return Err(err.into());
                }
            }
            return Err(ClientError::Status { status, body });
        }

        let envelopes: Vec<Envelope> = serde_json::from_str(&body)?;
        if envelopes.len() != calls.len() {
            return Err(ClientError::BatchMismatch);
        }
        Ok(envelopes)
    }
}

/// Runs calls in-process against the dispatcher.
pub struct LocalTransport {
    services: Services,
    session: Option<Session>,
}

impl LocalTransport {
    pub fn new(services: Services, user: Option<User>) -> Self {
        Self {
            services,
            session: user.map(Session::new),
        }
    }
}

#[async_trait]
impl RpcTransport for LocalTransport {
    async fn batch(&self, calls: Vec<(String, Value)>) -> ClientResult<Vec<Envelope>> {
        let ctx = Context::new(self.services.clone(), self.session.clone());
        rpc::refresh_session_user(&ctx).await;
        Ok(rpc::call_batch(&ctx, calls).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserId;
    use crate::rpc::ErrorCode;
    use crate::services::test_support;
    use serde_json::json;

    fn owner() -> User {
        test_support::other_user("owner")
    }

    #[test]
    fn test_batch_body_and_url() {
        let calls = vec![
            ("project.getProjects".to_string(), Value::Null),
            ("task.getTask".to_string(), json!({ "taskId": "t1" })),
        ];
        assert_eq!(
            batch_body(&calls),
            json!({ "0": null, "1": { "taskId": "t1" } })
        );
        let transport = HttpTransport::new("http://localhost:8080/", None);
        assert_eq!(
            transport.batch_url(&["project.getProjects", "task.getTask"]),
            "http://localhost:8080/api/trpc/project.getProjects,task.getTask?batch=1"
        );
    }

    #[test]
    fn test_session_headers() {
        let user = User {
            id: UserId::new("u1"),
            name: Some("Ada".to_string()),
            email: None,
            image: None,
        };
        let headers = HttpTransport::new("http://x", Some(user)).session_headers();
        assert_eq!(headers.get("x-user-id").unwrap(), "u1");
        assert_eq!(headers.get("x-user-name").unwrap(), "Ada");
        assert!(headers.get("x-user-email").is_none());
        assert!(HttpTransport::new("http://x", None).session_headers().is_empty());
    }

    #[tokio::test]
    async fn test_local_transport_round_trip() {
        let transport = LocalTransport::new(test_support::services(), Some(owner()));
        let created = transport
            .call("project.createProject", json!({ "projectName": "Depot" }))
            .await
            .unwrap();
        assert_eq!(created["project"]["name"], "Depot");

        let projects = transport.call("project.getProjects", Value::Null).await.unwrap();
        assert_eq!(projects.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_transport_without_session() {
        let transport = LocalTransport::new(test_support::services(), None);
        let err = transport
            .call("project.getProjects", Value::Null)
            .await
            .unwrap_err();
        match err {
            ClientError::Procedure(err) => assert_eq!(err.code, ErrorCode::Unauthorized),
            other => panic!("unexpected error: {other}"),
        }
    }
}
