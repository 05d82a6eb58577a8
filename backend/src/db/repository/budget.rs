//! Cost-code budgets.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{BudgetId, ProjectId, UserId};
use crate::models::{Budget, BudgetPage, BudgetTotals};
use crate::routes::budget::GetBudgetsInput;

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Create a budget line. The cost code is assigned from the project's
    /// running sequence.
    async fn create_budget(
        &self,
        project_id: &ProjectId,
        description: &str,
        expected_budget: f64,
        costs_incurred: f64,
        created_by: &UserId,
    ) -> RepositoryResult<Budget>;

    /// A page of budgets, newest first, filtered by a case-insensitive match
    /// on description or cost code. `count` is the number of matching rows.
    async fn list_budgets(&self, query: &GetBudgetsInput) -> RepositoryResult<BudgetPage>;

    async fn get_budget(&self, budget_id: &BudgetId) -> RepositoryResult<Budget>;

    async fn update_budget(
        &self,
        budget_id: &BudgetId,
        description: &str,
        expected_budget: f64,
        costs_incurred: f64,
    ) -> RepositoryResult<Budget>;

    /// Delete a budget and the supplier invoices booked against it.
    async fn delete_budget(&self, budget_id: &BudgetId) -> RepositoryResult<Budget>;

    async fn budget_totals(&self, project_id: &ProjectId) -> RepositoryResult<BudgetTotals>;
}
