//! Inputs of the `budget` router.

use serde::{Deserialize, Serialize};

use super::validation::{positive, required, required_id, InputResult, Validate};
use crate::api::{BudgetId, ProjectId};

pub const CREATE_BUDGET: &str = "budget.createBudget";
pub const GET_BUDGETS: &str = "budget.getBudgets";
pub const GET_BUDGET: &str = "budget.getBudget";
pub const UPDATE_BUDGET: &str = "budget.updateBudget";
pub const DELETE_BUDGET: &str = "budget.deleteBudget";
pub const GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM: &str =
    "budget.getExpectedBudgetSumAndCostsIncurredSum";

/// Rows per page when the caller does not say.
pub const DEFAULT_BUDGET_PAGE_SIZE: usize = 10;

fn check_amounts(expected_budget: f64, costs_incurred: f64) -> InputResult<()> {
    positive(expected_budget, "expectedBudget", "Budget must be positive")?;
    positive(costs_incurred, "costsIncurred", "Costs incurred must be positive")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetInput {
    pub project_id: ProjectId,
    pub description: String,
    pub expected_budget: f64,
    pub costs_incurred: f64,
}

impl Validate for CreateBudgetInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.description, "description", "A description is required")?;
        check_amounts(self.expected_budget, self.costs_incurred)?;
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetInput {
    pub budget_id: BudgetId,
    pub description: String,
    pub expected_budget: f64,
    pub costs_incurred: f64,
}

impl Validate for UpdateBudgetInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.description, "description", "A description is required")?;
        check_amounts(self.expected_budget, self.costs_incurred)?;
        required_id(self.budget_id.as_str(), "budgetId", "A budgetId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBudgetsInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub search_key: String,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub page_index: usize,
}

impl GetBudgetsInput {
    pub fn effective_page_size(&self) -> usize {
        self.page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_BUDGET_PAGE_SIZE)
    }
}

impl Validate for GetBudgetsInput {
    fn validate(mut self) -> InputResult<Self> {
        self.search_key = self.search_key.trim().to_string();
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetIdInput {
    pub budget_id: BudgetId,
}

impl Validate for BudgetIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.budget_id.as_str(), "budgetId", "A budgetId is required")?;
        Ok(self)
    }
}
