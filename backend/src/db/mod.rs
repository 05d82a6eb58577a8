//! Persistence for projects, site diaries, tasks, budgets and invoices.
//!
//! Storage sits behind the repository traits in [`repository`], so the
//! procedures never know which backend they talk to.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  RPC procedures (services::*)                           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/*.rs)                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────┐
//!     │                              │
//! ┌───▼──────────────┐   ┌───────────▼──────────────────────┐
//! │ LocalRepository  │   │ PostgresRepository (Diesel, r2d2)│
//! │ (in-memory)      │   │ feature = "postgres-repo"        │
//! └──────────────────┘   └──────────────────────────────────┘
//! ```
//!
//! Use [`RepositoryFactory`] to build the backend selected by configuration:
//!
//! ```ignore
//! use buildtrack::db::{RepositoryFactory, RepositoryType};
//!
//! let repo = RepositoryFactory::create(RepositoryType::Local, None).await?;
//! assert!(repo.health_check().await?);
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::{PostgresSettings, RepositorySettings};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::site_diary::WeatherReport;
pub use repository::{
    BudgetRepository, ErrorContext, FullRepository, ProjectRepository, RepositoryError,
    RepositoryResult, SiteDiaryRepository, SupplierInvoiceRepository, TaskRepository,
};
