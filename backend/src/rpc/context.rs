//! Per-call context handed to every procedure.

use std::sync::Arc;

use crate::api::{User, UserId};
use crate::db::FullRepository;
use crate::rpc::error::{ProcedureError, ProcedureResult};
use crate::services::extraction::{ExtractionError, InvoiceExtractor};
use crate::services::storage::FileStorage;

/// Long-lived backends shared by all calls.
#[derive(Clone)]
pub struct Services {
    pub repo: Arc<dyn FullRepository>,
    pub storage: FileStorage,
    pub extractor: Option<Arc<InvoiceExtractor>>,
}

impl Services {
    pub fn new(repo: Arc<dyn FullRepository>, storage: FileStorage) -> Self {
        Self {
            repo,
            storage,
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<InvoiceExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }
}

/// The signed-in user, as asserted by the upstream auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

#[derive(Clone)]
pub struct Context {
    services: Services,
    session: Option<Session>,
}

impl Context {
    pub fn new(services: Services, session: Option<Session>) -> Self {
        Self { services, session }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn repo(&self) -> &dyn FullRepository {
        self.services.repo.as_ref()
    }

    pub fn storage(&self) -> &FileStorage {
        &self.services.storage
    }

    pub fn extractor(&self) -> Result<&InvoiceExtractor, ExtractionError> {
        self.services
            .extractor
            .as_deref()
            .ok_or(ExtractionError::NotConfigured)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The caller, or `UNAUTHORIZED` when the call carries no session.
    pub fn user(&self) -> ProcedureResult<&User> {
        self.session
            .as_ref()
            .map(|s| &s.user)
            .ok_or_else(ProcedureError::unauthorized)
    }

    pub fn user_id(&self) -> ProcedureResult<&UserId> {
        self.user().map(|u| &u.id)
    }
}
