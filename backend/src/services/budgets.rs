//! Procedures of the `budget` router.

use crate::api::{Budget, BudgetPage, BudgetTotals};
use crate::routes::budget::{BudgetIdInput, CreateBudgetInput, GetBudgetsInput, UpdateBudgetInput};
use crate::routes::project::ProjectIdInput;
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::permissions::require_member;
use super::trycatch::try_catch;

pub async fn create_budget(ctx: &Context, input: CreateBudgetInput) -> ProcedureResult<Budget> {
    let user = ctx.user()?;
    try_catch(&["Failed to create budget"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let budget = ctx
            .repo()
            .create_budget(
                &input.project_id,
                &input.description,
                input.expected_budget,
                input.costs_incurred,
                &user.id,
            )
            .await?;
        tracing::debug!(budget = %budget.id, cost_code = %budget.cost_code, "budget created");
        Ok(budget)
    })
    .await
}

pub async fn get_budgets(ctx: &Context, input: GetBudgetsInput) -> ProcedureResult<BudgetPage> {
    let user = ctx.user()?;
    try_catch(&["Failed to get budgets"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().list_budgets(&input).await?)
    })
    .await
}

pub async fn get_budget(ctx: &Context, input: BudgetIdInput) -> ProcedureResult<Budget> {
    ctx.user()?;
    try_catch(&["Failed to get budget"], async {
        Ok(ctx.repo().get_budget(&input.budget_id).await?)
    })
    .await
}

pub async fn update_budget(ctx: &Context, input: UpdateBudgetInput) -> ProcedureResult<Budget> {
    ctx.user()?;
    try_catch(&["Failed to update budget"], async {
        Ok(ctx
            .repo()
            .update_budget(
                &input.budget_id,
                &input.description,
                input.expected_budget,
                input.costs_incurred,
            )
            .await?)
    })
    .await
}

pub async fn delete_budget(ctx: &Context, input: BudgetIdInput) -> ProcedureResult<Budget> {
    ctx.user()?;
    try_catch(&["Failed to delete budget"], async {
        Ok(ctx.repo().delete_budget(&input.budget_id).await?)
    })
    .await
}

pub async fn get_expected_budget_sum_and_costs_incurred_sum(
    ctx: &Context,
    input: ProjectIdInput,
) -> ProcedureResult<BudgetTotals> {
    let user = ctx.user()?;
    try_catch(&["Failed to get budget totals"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().budget_totals(&input.project_id).await?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProjectId;
    use crate::services::test_support::context;

    fn new_budget(project_id: &ProjectId, description: &str, expected: f64) -> CreateBudgetInput {
        CreateBudgetInput {
            project_id: project_id.clone(),
            description: description.to_string(),
            expected_budget: expected,
            costs_incurred: 1.0,
        }
    }

    #[tokio::test]
    async fn test_cost_codes_and_search() {
        let ctx = context().await;
        let project_id = ctx
            .repo()
            .create_project("Budgeted", ctx.user_id().unwrap())
            .await
            .unwrap()
            .id;

        let first = create_budget(&ctx, new_budget(&project_id, "Piling", 100.0)).await.unwrap();
        let second = create_budget(&ctx, new_budget(&project_id, "Roofing", 50.0)).await.unwrap();
        assert_eq!(first.cost_code, "CC-0001");
        assert_eq!(second.cost_code, "CC-0002");

        let page = get_budgets(
            &ctx,
            GetBudgetsInput {
                project_id: project_id.clone(),
                search_key: "cc-0002".to_string(),
                page_size: Some(10),
                page_index: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.budgets[0].description, "Roofing");
        assert_eq!(page.budgets[0].difference, 49.0);

        let totals = get_expected_budget_sum_and_costs_incurred_sum(
            &ctx,
            ProjectIdInput {
                project_id: project_id.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(totals.expected_budget_sum, 150.0);
        assert_eq!(totals.costs_incurred_sum, 2.0);

        delete_budget(&ctx, BudgetIdInput { budget_id: first.id }).await.unwrap();
        let third = create_budget(&ctx, new_budget(&project_id, "Glazing", 10.0)).await.unwrap();
        assert_eq!(third.cost_code, "CC-0003");
    }
}
