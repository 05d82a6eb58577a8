use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TaskStatus;
use crate::api::{ProjectId, TaskId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub project_id: ProjectId,
    pub created_by_id: UserId,
    pub assigned_to_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Person reference on a task card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPerson {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub created_by: TaskPerson,
    pub assigned_to: Option<TaskPerson>,
}

/// One page of the task board. `next_cursor` is the id to pass back to
/// fetch the following page; absent on the last page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<TaskListItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<TaskId>,
}
