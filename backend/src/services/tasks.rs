//! Procedures of the `task` router.

use crate::api::{Task, TaskListItem, TaskPage};
use crate::routes::task::{CreateTaskInput, GetTasksInput, TaskIdInput, UpdateTaskInput};
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::permissions::require_member;
use super::trycatch::try_catch;

pub async fn create_task(ctx: &Context, input: CreateTaskInput) -> ProcedureResult<Task> {
    let user = ctx.user()?;
    try_catch(&["Failed to create task"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx
            .repo()
            .create_task(
                &input.project_id,
                &input.task_description,
                input.task_status,
                input.task_assigned_to.as_ref().map(|a| &a.id),
                &user.id,
            )
            .await?)
    })
    .await
}

pub async fn get_tasks(ctx: &Context, input: GetTasksInput) -> ProcedureResult<TaskPage> {
    let user = ctx.user()?;
    try_catch(&["Failed to get tasks"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().list_tasks(&input).await?)
    })
    .await
}

pub async fn get_task(ctx: &Context, input: TaskIdInput) -> ProcedureResult<TaskListItem> {
    ctx.user()?;
    try_catch(&["Failed to get task"], async {
        Ok(ctx.repo().get_task(&input.task_id).await?)
    })
    .await
}

/// A missing assignee clears the assignment.
pub async fn update_task(ctx: &Context, input: UpdateTaskInput) -> ProcedureResult<Task> {
    ctx.user()?;
    try_catch(&["Failed to update task"], async {
        Ok(ctx
            .repo()
            .update_task(
                &input.task_id,
                &input.task_description,
                input.task_status,
                input.task_assigned_to.as_ref().map(|a| &a.id),
            )
            .await?)
    })
    .await
}

pub async fn delete_task(ctx: &Context, input: TaskIdInput) -> ProcedureResult<Task> {
    ctx.user()?;
    try_catch(&["Failed to delete task"], async {
        Ok(ctx.repo().delete_task(&input.task_id).await?)
    })
    .await
}
