//! Budget table hooks.

use serde_json::json;

use super::api::ApiClient;
use super::error::ClientResult;
use super::optimistic::OptimisticMutation;
use crate::api::{Budget, BudgetId, BudgetPage, BudgetRow, BudgetTotals, ProjectId};
use crate::routes::budget::{
    BudgetIdInput, CreateBudgetInput, GetBudgetsInput, UpdateBudgetInput, CREATE_BUDGET,
    DEFAULT_BUDGET_PAGE_SIZE, DELETE_BUDGET, GET_BUDGET, GET_BUDGETS,
    GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM, UPDATE_BUDGET,
};

/// Cost code shown on a row the server has not numbered yet.
pub const PENDING_COST_CODE: &str = "UPDATING";

/// The budget page a screen is showing.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetView {
    pub project_id: ProjectId,
    pub page_index: usize,
    pub page_size: usize,
    pub search_key: String,
}

impl BudgetView {
    pub fn first_page(project_id: ProjectId) -> Self {
        Self {
            project_id,
            page_index: 0,
            page_size: DEFAULT_BUDGET_PAGE_SIZE,
            search_key: String::new(),
        }
    }

    pub fn input(&self) -> GetBudgetsInput {
        GetBudgetsInput {
            project_id: self.project_id.clone(),
            search_key: self.search_key.clone(),
            page_size: Some(self.page_size),
            page_index: self.page_index,
        }
    }

    /// New rows only show up on the unfiltered first page.
    fn shows_new_rows(&self) -> bool {
        self.page_index == 0 && self.search_key.is_empty()
    }
}

/// Speculative page after creating `row`.
pub fn page_with_new_row(page: Option<BudgetPage>, row: BudgetRow, view: &BudgetView) -> BudgetPage {
    let Some(mut page) = page else {
        return BudgetPage {
            budgets: vec![row],
            count: 1,
        };
    };
    page.count += 1;
    if view.shows_new_rows() {
        if page.budgets.len() >= view.page_size {
            page.budgets.truncate(view.page_size.saturating_sub(1));
        }
        page.budgets.insert(0, row);
    }
    page
}

fn apply_update(page: Option<BudgetPage>, input: &UpdateBudgetInput) -> Option<BudgetPage> {
    page.map(|mut page| {
        if let Some(row) = page.budgets.iter_mut().find(|b| b.id == input.budget_id) {
            row.description = input.description.clone();
            row.expected_budget = input.expected_budget;
            row.costs_incurred = input.costs_incurred;
            row.difference = input.expected_budget - input.costs_incurred;
        }
        page
    })
}

impl ApiClient {
    pub async fn budgets(&self, view: &BudgetView) -> ClientResult<BudgetPage> {
        self.cache.query(GET_BUDGETS, &view.input()).await
    }

    pub async fn budget(&self, budget_id: &BudgetId) -> ClientResult<Budget> {
        self.cache
            .query(
                GET_BUDGET,
                &BudgetIdInput {
                    budget_id: budget_id.clone(),
                },
            )
            .await
    }

    pub async fn budget_totals(&self, project_id: &ProjectId) -> ClientResult<BudgetTotals> {
        self.cache
            .query(
                GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM,
                &json!({ "projectId": project_id }),
            )
            .await
    }

    pub async fn create_budget(&self, view: &BudgetView, input: CreateBudgetInput) -> ClientResult<Budget> {
        let row = BudgetRow {
            id: BudgetId::generate(),
            cost_code: PENDING_COST_CODE.to_string(),
            description: input.description.clone(),
            expected_budget: input.expected_budget,
            costs_incurred: input.costs_incurred,
            difference: input.expected_budget - input.costs_incurred,
        };
        let view_for_edit = view.clone();
        OptimisticMutation::new(CREATE_BUDGET, &input)?
            .cancel(GET_BUDGETS)
            .edit(self.key(GET_BUDGETS, &view.input())?, move |page| {
                Some(page_with_new_row(page, row, &view_for_edit))
            })
            .invalidate(GET_BUDGETS, None)
            .invalidate(GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM, None)
            .run(&self.cache)
            .await
    }

    pub async fn update_budget(&self, view: &BudgetView, input: UpdateBudgetInput) -> ClientResult<Budget> {
        let key = self.key(GET_BUDGETS, &view.input())?;
        let (edit_input, reconcile_input) = (input.clone(), input.clone());
        OptimisticMutation::new(UPDATE_BUDGET, &input)?
            .cancel(GET_BUDGETS)
            .edit(key.clone(), move |page| apply_update(page, &edit_input))
            .reconcile(key, move |page, _: Budget| apply_update(page, &reconcile_input))
            .invalidate(GET_BUDGETS, None)
            .invalidate(
                GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM,
                Some(json!({ "projectId": view.project_id })),
            )
            .run(&self.cache)
            .await
    }

    /// No speculative edit: deleting shifts every later page.
    pub async fn delete_budget(&self, budget_id: &BudgetId) -> ClientResult<Budget> {
        OptimisticMutation::new(
            DELETE_BUDGET,
            &BudgetIdInput {
                budget_id: budget_id.clone(),
            },
        )?
        .invalidate(GET_BUDGETS, None)
        .invalidate(GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM, None)
        .run(&self.cache)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> BudgetRow {
        BudgetRow {
            id: BudgetId::new(id),
            cost_code: "CC-0001".to_string(),
            description: id.to_string(),
            expected_budget: 10.0,
            costs_incurred: 0.0,
            difference: 10.0,
        }
    }

    fn view(page_index: usize, search_key: &str) -> BudgetView {
        BudgetView {
            project_id: ProjectId::new("p1"),
            page_index,
            page_size: 2,
            search_key: search_key.to_string(),
        }
    }

    #[test]
    fn test_first_page_prepends_and_trims() {
        let page = BudgetPage {
            budgets: vec![row("a"), row("b")],
            count: 2,
        };
        let next = page_with_new_row(Some(page), row("new"), &view(0, ""));
        let ids: Vec<&str> = next.budgets.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "a"]);
        assert_eq!(next.count, 3);
    }

    #[test]
    fn test_other_pages_only_count() {
        let page = BudgetPage {
            budgets: vec![row("a")],
            count: 3,
        };
        let next = page_with_new_row(Some(page.clone()), row("new"), &view(1, ""));
        assert_eq!(next.budgets, page.budgets);
        assert_eq!(next.count, 4);

        let searched = page_with_new_row(Some(page.clone()), row("new"), &view(0, "conc"));
        assert_eq!(searched.budgets, page.budgets);
    }

    #[test]
    fn test_empty_cache_starts_page() {
        let next = page_with_new_row(None, row("new"), &view(3, "x"));
        assert_eq!(next.count, 1);
        assert_eq!(next.budgets.len(), 1);
    }
}
