//! Application state for the HTTP server.

use crate::rpc::{Context, Services, Session};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Context for one request.
    pub fn context(&self, session: Option<Session>) -> Context {
        Context::new(self.services.clone(), session)
    }
}
