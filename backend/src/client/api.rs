use serde::Serialize;
use std::sync::Arc;

use super::cache::{QueryCache, QueryKey};
use super::error::ClientResult;
use super::notifier::Notifier;
use super::transport::{HttpTransport, LocalTransport, RpcTransport};
use crate::api::{User, UserId, UserSummary};
use crate::rpc::Services;

/// Typed access to every procedure, backed by one query cache.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) cache: Arc<QueryCache>,
    user: Option<User>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn RpcTransport>, user: Option<User>) -> Self {
        Self {
            cache: Arc::new(QueryCache::new(transport)),
            user,
        }
    }

    pub fn http(base_url: &str, user: Option<User>) -> Self {
        Self::new(Arc::new(HttpTransport::new(base_url, user.clone())), user)
    }

    /// Calls run in-process against `services`.
    pub fn local(services: Services, user: Option<User>) -> Self {
        Self::new(Arc::new(LocalTransport::new(services, user.clone())), user)
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn notifier(&self) -> &Notifier {
        self.cache.notifier()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Creator shown on placeholder rows until the server answers.
    pub(crate) fn me_summary(&self) -> UserSummary {
        UserSummary {
            name: Some(
                self.user
                    .as_ref()
                    .and_then(|u| u.name.clone())
                    .unwrap_or_else(|| "You".to_string()),
            ),
            image: self.user.as_ref().and_then(|u| u.image.clone()),
        }
    }

    /// Author id stamped on placeholder rows.
    pub(crate) fn my_id(&self) -> UserId {
        self.user
            .as_ref()
            .map(|u| u.id.clone())
            .unwrap_or_default()
    }

    pub(crate) fn key<I: Serialize>(&self, procedure: &str, input: &I) -> ClientResult<QueryKey> {
        QueryKey::of(procedure, input)
    }
}
