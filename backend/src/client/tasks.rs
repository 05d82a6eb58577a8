//! Task board hooks.

use serde_json::json;

use super::api::ApiClient;
use super::error::ClientResult;
use super::optimistic::OptimisticMutation;
use crate::api::{Task, TaskId, TaskListItem, TaskPage, TaskPerson};
use crate::routes::task::{
    CreateTaskInput, GetTasksInput, TaskAssignee, TaskIdInput, UpdateTaskInput, CREATE_TASK,
    DELETE_TASK, GET_TASK, GET_TASKS, UPDATE_TASK,
};

const SCOPE: &str = "task";

fn person(assignee: &TaskAssignee) -> TaskPerson {
    TaskPerson {
        id: assignee.id.clone(),
        name: assignee.name.clone(),
        email: assignee.email.clone(),
        image: assignee.image.clone(),
    }
}

fn apply_update(page: Option<TaskPage>, input: &UpdateTaskInput) -> Option<TaskPage> {
    page.map(|mut page| {
        if let Some(task) = page.tasks.iter_mut().find(|t| t.id == input.task_id) {
            task.description = input.task_description.clone();
            task.status = input.task_status;
            task.assigned_to = input.task_assigned_to.as_ref().map(person);
        }
        page
    })
}

fn without_task(page: Option<TaskPage>, id: &TaskId) -> Option<TaskPage> {
    page.map(|mut page| {
        page.tasks.retain(|t| &t.id != id);
        page
    })
}

impl ApiClient {
    pub async fn tasks(&self, view: &GetTasksInput) -> ClientResult<TaskPage> {
        self.cache.query(GET_TASKS, view).await
    }

    pub async fn task(&self, task_id: &TaskId) -> ClientResult<TaskListItem> {
        self.cache
            .query(
                GET_TASK,
                &TaskIdInput {
                    task_id: task_id.clone(),
                },
            )
            .await
    }

    /// The placeholder card goes to the top of the first page of `view`.
    pub async fn create_task(&self, view: &GetTasksInput, input: CreateTaskInput) -> ClientResult<Task> {
        let me = self.user();
        let placeholder = TaskListItem {
            id: TaskId::generate(),
            description: input.task_description.clone(),
            status: input.task_status,
            created_by: TaskPerson {
                id: self.my_id(),
                name: self.me_summary().name,
                email: me.and_then(|u| u.email.clone()),
                image: me.and_then(|u| u.image.clone()),
            },
            assigned_to: input.task_assigned_to.as_ref().map(person),
        };
        let first_page = view.cursor.is_none();
        OptimisticMutation::new(CREATE_TASK, &input)?
            .scope(SCOPE)
            .cancel(GET_TASKS)
            .edit(self.key(GET_TASKS, view)?, move |page: Option<TaskPage>| {
                if !first_page {
                    return page;
                }
                let mut page = page.unwrap_or(TaskPage {
                    tasks: Vec::new(),
                    next_cursor: None,
                });
                page.tasks.insert(0, placeholder);
                Some(page)
            })
            .invalidate(GET_TASKS, None)
            .run(&self.cache)
            .await
    }

    pub async fn update_task(&self, view: &GetTasksInput, input: UpdateTaskInput) -> ClientResult<Task> {
        let key = self.key(GET_TASKS, view)?;
        let (edit_input, reconcile_input) = (input.clone(), input.clone());
        OptimisticMutation::new(UPDATE_TASK, &input)?
            .scope(SCOPE)
            .cancel(GET_TASKS)
            .edit(key.clone(), move |page| apply_update(page, &edit_input))
            .reconcile(key, move |page, _: Task| apply_update(page, &reconcile_input))
            .invalidate(GET_TASKS, None)
            .invalidate(GET_TASK, Some(json!({ "taskId": input.task_id })))
            .run(&self.cache)
            .await
    }

    pub async fn delete_task(&self, view: &GetTasksInput, task_id: &TaskId) -> ClientResult<Task> {
        let key = self.key(GET_TASKS, view)?;
        let (edit_id, reconcile_id) = (task_id.clone(), task_id.clone());
        OptimisticMutation::new(
            DELETE_TASK,
            &TaskIdInput {
                task_id: task_id.clone(),
            },
        )?
        .scope(SCOPE)
        .cancel(GET_TASKS)
        .edit(key.clone(), move |page| without_task(page, &edit_id))
        .reconcile(key, move |page, _: Task| without_task(page, &reconcile_id))
        .invalidate(GET_TASKS, None)
        .run(&self.cache)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ProjectId, TaskStatus};
    use crate::routes::task::DEFAULT_TASK_PAGE_SIZE;
    use crate::services::test_support::{other_user, services};

    fn board(project_id: &ProjectId) -> GetTasksInput {
        GetTasksInput {
            project_id: project_id.clone(),
            statuses: Vec::new(),
            searches: Vec::new(),
            limit: DEFAULT_TASK_PAGE_SIZE,
            cursor: None,
        }
    }

    #[tokio::test]
    async fn test_task_board_lifecycle() {
        let client = ApiClient::local(services(), Some(other_user("owner")));
        let project = client.create_project("Depot").await.unwrap().project;
        let view = board(&project.id);
        assert!(client.tasks(&view).await.unwrap().tasks.is_empty());

        let task = client
            .create_task(
                &view,
                CreateTaskInput {
                    project_id: project.id.clone(),
                    task_description: "Pour slab".to_string(),
                    task_status: TaskStatus::NotStarted,
                    task_assigned_to: None,
                },
            )
            .await
            .unwrap();
        let page = client.tasks(&view).await.unwrap();
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].id, task.id);
        assert_eq!(page.tasks[0].created_by.id, other_user("owner").id);

        client
            .update_task(
                &view,
                UpdateTaskInput {
                    task_id: task.id.clone(),
                    task_description: "Pour slab".to_string(),
                    task_status: TaskStatus::Completed,
                    task_assigned_to: None,
                    limit: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(client.task(&task.id).await.unwrap().status, TaskStatus::Completed);

        client.delete_task(&view, &task.id).await.unwrap();
        assert!(client.tasks(&view).await.unwrap().tasks.is_empty());
    }

    #[test]
    fn test_update_patches_only_the_named_task() {
        let page = TaskPage {
            tasks: vec![
                TaskListItem {
                    id: TaskId::new("t1"),
                    description: "a".to_string(),
                    status: TaskStatus::NotStarted,
                    created_by: person(&TaskAssignee {
                        id: other_user("owner").id,
                        name: None,
                        email: None,
                        image: None,
                    }),
                    assigned_to: None,
                },
            ],
            next_cursor: None,
        };
        let input = UpdateTaskInput {
            task_id: TaskId::new("t2"),
            task_description: "b".to_string(),
            task_status: TaskStatus::Completed,
            task_assigned_to: None,
            limit: 1,
        };
        let next = apply_update(Some(page.clone()), &input).unwrap();
        assert_eq!(next, page);
        assert!(without_task(None, &TaskId::new("t1")).is_none());
    }
}
