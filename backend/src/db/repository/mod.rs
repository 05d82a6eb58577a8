//! Repository trait definitions for database operations.
//!
//! Persistence is split into focused traits, one per aggregate, so each
//! backend implementation stays readable and each service only names what
//! it needs.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`project`]: Users, projects and memberships
//! - [`site_diary`]: Site diaries and the entries logged against them
//! - [`task`]: The project task board
//! - [`budget`]: Cost-code budgets
//! - [`invoice`]: Supplier invoices and their line items
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn bootstrap<R: FullRepository>(repo: &R, user: &User) -> RepositoryResult<()> {
//!     repo.upsert_user(user).await?;
//!     let project = repo.create_project("Tower B", &user.id).await?;
//!     repo.create_budget(&project.id, "Piling", 1.0, 1.0, &user.id).await?;
//!     Ok(())
//! }
//! ```

pub mod budget;
pub mod error;
pub mod invoice;
pub mod project;
pub mod site_diary;
pub mod task;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use budget::BudgetRepository;
pub use invoice::SupplierInvoiceRepository;
pub use project::ProjectRepository;
pub use site_diary::SiteDiaryRepository;
pub use task::TaskRepository;

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// every aggregate trait.
pub trait FullRepository:
    ProjectRepository
    + SiteDiaryRepository
    + TaskRepository
    + BudgetRepository
    + SupplierInvoiceRepository
{
}

// Blanket implementation: any type implementing all aggregate traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: ProjectRepository
        + SiteDiaryRepository
        + TaskRepository
        + BudgetRepository
        + SupplierInvoiceRepository
{
}
