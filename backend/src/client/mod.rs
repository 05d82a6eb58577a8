//! Client for the procedure API with an optimistic query cache.
//!
//! [`ApiClient`] wraps a [`QueryCache`] over an [`RpcTransport`]. Queries are
//! served from the cache while fresh; mutations apply a speculative edit to
//! the cached lists, roll it back if the server refuses, and refetch the
//! affected queries once they settle. Every failure is reported to the
//! [`Notifier`].

pub mod api;
pub mod budgets;
pub mod cache;
pub mod error;
pub mod files;
pub mod invoices;
pub mod notifier;
pub mod optimistic;
pub mod projects;
pub mod site_diaries;
pub mod tasks;
pub mod transport;

pub use api::ApiClient;
pub use budgets::BudgetView;
pub use cache::{MutationGuard, QueryCache, QueryKey};
pub use error::{ClientError, ClientResult};
pub use notifier::{Notification, NotificationLevel, Notifier};
pub use optimistic::OptimisticMutation;
pub use transport::{HttpTransport, LocalTransport, RpcTransport};
