//! The project task board.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{ProjectId, TaskId, UserId};
use crate::models::{Task, TaskListItem, TaskPage, TaskStatus};
use crate::routes::task::GetTasksInput;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(
        &self,
        project_id: &ProjectId,
        description: &str,
        status: TaskStatus,
        assigned_to: Option<&UserId>,
        created_by: &UserId,
    ) -> RepositoryResult<Task>;

    /// One page of tasks, newest first.
    ///
    /// Statuses are OR-ed, searches are AND-ed. Text matching is a
    /// case-insensitive substring match. The page after `cursor` starts with
    /// the task that follows it in the ordering.
    async fn list_tasks(&self, query: &GetTasksInput) -> RepositoryResult<TaskPage>;

    async fn get_task(&self, task_id: &TaskId) -> RepositoryResult<TaskListItem>;

    async fn update_task(
        &self,
        task_id: &TaskId,
        description: &str,
        status: TaskStatus,
        assigned_to: Option<&UserId>,
    ) -> RepositoryResult<Task>;

    async fn delete_task(&self, task_id: &TaskId) -> RepositoryResult<Task>;
}
