use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{BudgetId, ProjectId, UserId};

/// A cost-code line tracking expected against incurred cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,
    pub cost_code: String,
    pub description: String,
    pub expected_budget: f64,
    pub costs_incurred: f64,
    pub project_id: ProjectId,
    pub created_by_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Budget row of the paginated budget table, with the derived difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRow {
    pub id: BudgetId,
    pub cost_code: String,
    pub description: String,
    pub expected_budget: f64,
    pub costs_incurred: f64,
    pub difference: f64,
}

impl From<&Budget> for BudgetRow {
    fn from(budget: &Budget) -> Self {
        Self {
            id: budget.id.clone(),
            cost_code: budget.cost_code.clone(),
            description: budget.description.clone(),
            expected_budget: budget.expected_budget,
            costs_incurred: budget.costs_incurred,
            difference: budget.expected_budget - budget.costs_incurred,
        }
    }
}

/// One page of budgets plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPage {
    pub budgets: Vec<BudgetRow>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTotals {
    pub expected_budget_sum: f64,
    pub costs_incurred_sum: f64,
}

/// Cost code for the `sequence`-th budget of a project, e.g. `CC-0007`.
pub fn cost_code_for(sequence: usize) -> String {
    format!("CC-{:04}", sequence)
}
