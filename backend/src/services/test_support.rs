//! Contexts backed by the in-memory repository and object store.

use object_store::memory::InMemory;
use std::sync::Arc;

use crate::api::{User, UserId};
use crate::db::LocalRepository;
use crate::rpc::context::{Context, Services, Session};
use crate::services::storage::FileStorage;

pub(crate) fn other_user(id: &str) -> User {
    User {
        id: UserId::new(id),
        name: Some(format!("User {}", id)),
        email: Some(format!("{}@example.test", id)),
        image: None,
    }
}

pub(crate) fn services() -> Services {
    Services::new(
        Arc::new(LocalRepository::new()),
        FileStorage::new(Arc::new(InMemory::new())),
    )
}

/// A signed-in "owner" on fresh stores.
pub(crate) async fn context() -> Context {
    let services = services();
    let user = other_user("owner");
    services.repo.upsert_user(&user).await.unwrap();
    Context::new(services, Some(Session::new(user)))
}

/// Another signed-in user sharing `ctx`'s stores.
pub(crate) async fn context_as(ctx: &Context, user: User) -> Context {
    ctx.repo().upsert_user(&user).await.unwrap();
    Context::new(ctx.services().clone(), Some(Session::new(user)))
}

pub(crate) async fn anonymous() -> Context {
    Context::new(services(), None)
}
