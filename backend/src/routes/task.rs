//! Inputs of the `task` router.

use serde::{Deserialize, Serialize};

use super::validation::{in_range, required, required_id, InputResult, Validate};
use crate::api::{ProjectId, TaskId, UserId};
use crate::models::{TaskSearchCategory, TaskStatus};

pub const CREATE_TASK: &str = "task.createTask";
pub const GET_TASKS: &str = "task.getTasks";
pub const GET_TASK: &str = "task.getTask";
pub const UPDATE_TASK: &str = "task.updateTask";
pub const DELETE_TASK: &str = "task.deleteTask";

pub const DEFAULT_TASK_PAGE_SIZE: i64 = 10;
pub const DEFAULT_UPDATE_LIMIT: i64 = 5;

fn default_page_size() -> i64 {
    DEFAULT_TASK_PAGE_SIZE
}

fn default_update_limit() -> i64 {
    DEFAULT_UPDATE_LIMIT
}

/// The person picked in the assignee selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignee {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub project_id: ProjectId,
    pub task_description: String,
    #[serde(default)]
    pub task_status: TaskStatus,
    #[serde(default)]
    pub task_assigned_to: Option<TaskAssignee>,
}

impl Validate for CreateTaskInput {
    fn validate(mut self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        required(
            &mut self.task_description,
            "taskDescription",
            "A description is required",
        )?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSearch {
    pub category: TaskSearchCategory,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTasksInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub statuses: Vec<TaskStatus>,
    #[serde(default)]
    pub searches: Vec<TaskSearch>,
    #[serde(default = "default_page_size")]
    pub limit: i64,
    #[serde(default)]
    pub cursor: Option<TaskId>,
}

impl Validate for GetTasksInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        in_range(self.limit, 1, 100, "limit", "Limit must be between 1 and 100")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdInput {
    pub task_id: TaskId,
}

impl Validate for TaskIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.task_id.as_str(), "taskId", "A taskId is required")?;
        Ok(self)
    }
}

/// `limit` identifies the task board page the edit was made from, so the
/// client can patch that cached page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    pub task_id: TaskId,
    pub task_description: String,
    #[serde(default)]
    pub task_status: TaskStatus,
    #[serde(default)]
    pub task_assigned_to: Option<TaskAssignee>,
    #[serde(default = "default_update_limit")]
    pub limit: i64,
}

impl Validate for UpdateTaskInput {
    fn validate(mut self) -> InputResult<Self> {
        required(
            &mut self.task_description,
            "taskDescription",
            "A description is required",
        )?;
        required_id(self.task_id.as_str(), "taskId", "A taskId is required")?;
        in_range(self.limit, 1, 10, "limit", "Limit must be between 1 and 10")?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_task_defaults() {
        let input: CreateTaskInput = serde_json::from_value(json!({
            "projectId": "p1",
            "taskDescription": "Pour slab level 3"
        }))
        .unwrap();
        assert_eq!(input.task_status, TaskStatus::NotStarted);
        assert!(input.task_assigned_to.is_none());
    }

    #[test]
    fn test_get_tasks_defaults() {
        let input: GetTasksInput = serde_json::from_value(json!({ "projectId": "p1" })).unwrap();
        assert_eq!(input.limit, DEFAULT_TASK_PAGE_SIZE);
        assert!(input.cursor.is_none());
        assert!(input.statuses.is_empty());
    }

    #[test]
    fn test_update_limit_bounds() {
        let input = UpdateTaskInput {
            task_id: TaskId::new("t1"),
            task_description: "Inspect rebar".to_string(),
            task_status: TaskStatus::InProgress,
            task_assigned_to: None,
            limit: 11,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_search_categories_from_wire() {
        let input: GetTasksInput = serde_json::from_value(json!({
            "projectId": "p1",
            "searches": [{ "category": "ASSIGNED_TO", "value": "@acme.com" }],
            "statuses": ["COMPLETED"]
        }))
        .unwrap();
        assert_eq!(input.searches[0].category, TaskSearchCategory::AssignedTo);
        assert_eq!(input.statuses, vec![TaskStatus::Completed]);
    }
}
