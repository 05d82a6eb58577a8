//! Project, team and account hooks.

use serde_json::{json, Value};

use super::api::ApiClient;
use super::cache::QueryKey;
use super::error::ClientResult;
use super::optimistic::OptimisticMutation;
use crate::api::{
    CreatedProject, Membership, ProfessionalRole, Project, ProjectId, ProjectListItem,
    ProjectMember, User,
};
use crate::routes::me::{
    GetUsersInput, UpdateMyProfessionalRoleInput, DELETE_MY_ACCOUNT, GET_MY_PROFESSIONAL_ROLE,
    GET_USERS, HAS_PERMISSION_TO_PROJECT, IS_CREATOR_OF_PROJECT, UPDATE_MY_PROFESSIONAL_ROLE,
};
use crate::routes::project::{
    AddToProjectInput, CreateProjectInput, ProjectIdInput, RemoveFromProjectInput,
    UpdateProjectInput, ADD_TO_PROJECT, CREATE_PROJECT, DELETE_PROJECT, GET_PROJECT,
    GET_PROJECTS, GET_PROJECT_CREATOR, GET_USERS_FOR_PROJECT, REMOVE_FROM_PROJECT,
    UPDATE_PROJECT,
};

const SCOPE: &str = "project";

fn projects_key() -> QueryKey {
    QueryKey::new(GET_PROJECTS, Value::Null)
}

fn project_input(project_id: &ProjectId) -> ProjectIdInput {
    ProjectIdInput {
        project_id: project_id.clone(),
    }
}

fn members_key(project_id: &ProjectId) -> QueryKey {
    QueryKey::new(GET_USERS_FOR_PROJECT, json!({ "projectId": project_id }))
}

fn rename(projects: Option<Vec<ProjectListItem>>, id: &ProjectId, name: &str) -> Option<Vec<ProjectListItem>> {
    projects.map(|mut projects| {
        if let Some(project) = projects.iter_mut().find(|p| &p.id == id) {
            project.name = name.to_string();
        }
        projects
    })
}

fn without_project(projects: Option<Vec<ProjectListItem>>, id: &ProjectId) -> Option<Vec<ProjectListItem>> {
    projects.map(|projects| projects.into_iter().filter(|p| &p.id != id).collect())
}

impl ApiClient {
    pub async fn projects(&self) -> ClientResult<Vec<ProjectListItem>> {
        self.cache.query(GET_PROJECTS, &Value::Null).await
    }

    pub async fn project(&self, project_id: &ProjectId) -> ClientResult<Project> {
        self.cache.query(GET_PROJECT, &project_input(project_id)).await
    }

    /// The new row is appended once the server returns its id.
    pub async fn create_project(&self, project_name: &str) -> ClientResult<CreatedProject> {
        let created_by = self.me_summary();
        OptimisticMutation::new(
            CREATE_PROJECT,
            &CreateProjectInput {
                project_name: project_name.to_string(),
            },
        )?
        .reconcile(
            projects_key(),
            move |projects: Option<Vec<ProjectListItem>>, created: CreatedProject| {
                let mut projects = projects.unwrap_or_default();
                projects.push(ProjectListItem {
                    id: created.project.id,
                    name: created.project.name,
                    created_by,
                    created_at: created.project.created_at,
                });
                Some(projects)
            },
        )
        .invalidate(GET_PROJECTS, None)
        .run(&self.cache)
        .await
    }

    pub async fn update_project(&self, input: UpdateProjectInput) -> ClientResult<Project> {
        let (id, name) = (input.project_id.clone(), input.project_name.clone());
        let (reconcile_id, reconcile_name) = (id.clone(), name.clone());
        OptimisticMutation::new(UPDATE_PROJECT, &input)?
            .cancel(GET_PROJECTS)
            .edit(projects_key(), move |projects| rename(projects, &id, &name))
            .reconcile(projects_key(), move |projects, _: Project| {
                rename(projects, &reconcile_id, &reconcile_name)
            })
            .notify_success("Project updated!")
            .invalidate(GET_PROJECTS, None)
            .run(&self.cache)
            .await
    }

    pub async fn delete_project(&self, project_id: &ProjectId) -> ClientResult<Project> {
        let (id, reconcile_id) = (project_id.clone(), project_id.clone());
        OptimisticMutation::new(DELETE_PROJECT, &project_input(project_id))?
            .scope(SCOPE)
            .cancel(GET_PROJECTS)
            .edit(projects_key(), move |projects| without_project(projects, &id))
            .reconcile(projects_key(), move |projects, _: Project| {
                without_project(projects, &reconcile_id)
            })
            .notify_success("Project deleted")
            .invalidate(GET_PROJECTS, None)
            .run(&self.cache)
            .await
    }

    pub async fn users_for_project(&self, project_id: &ProjectId) -> ClientResult<Vec<ProjectMember>> {
        self.cache
            .query(GET_USERS_FOR_PROJECT, &project_input(project_id))
            .await
    }

    pub async fn project_creator(&self, project_id: &ProjectId) -> ClientResult<User> {
        self.cache
            .query(GET_PROJECT_CREATOR, &project_input(project_id))
            .await
    }

    pub async fn add_to_project(&self, input: AddToProjectInput) -> ClientResult<Membership> {
        let placeholder = ProjectMember {
            id: input.user_id.clone(),
            name: Some(input.user_name.clone()),
            email: Some(input.user_email.clone()),
            image: Some(input.user_image.clone()).filter(|i| !i.is_empty()),
            professional_role: ProfessionalRole::ProjectMember,
        };
        OptimisticMutation::new(ADD_TO_PROJECT, &input)?
            .cancel(GET_USERS_FOR_PROJECT)
            .edit(members_key(&input.project_id), move |members: Option<Vec<ProjectMember>>| {
                let mut members = members.unwrap_or_default();
                members.push(placeholder);
                Some(members)
            })
            .invalidate(GET_USERS_FOR_PROJECT, None)
            .run(&self.cache)
            .await
    }

    pub async fn remove_from_project(&self, input: RemoveFromProjectInput) -> ClientResult<Membership> {
        let removed = input.user_to_be_removed_id.clone();
        let filter = move |members: Option<Vec<ProjectMember>>| {
            members.map(|m| m.into_iter().filter(|m| m.id != removed).collect::<Vec<_>>())
        };
        let reconcile_filter = filter.clone();
        OptimisticMutation::new(REMOVE_FROM_PROJECT, &input)?
            .scope(SCOPE)
            .cancel(GET_USERS_FOR_PROJECT)
            .edit(members_key(&input.project_id), filter)
            .reconcile(members_key(&input.project_id), move |members, _: Membership| {
                reconcile_filter(members)
            })
            .invalidate(GET_USERS_FOR_PROJECT, None)
            .run(&self.cache)
            .await
    }

    pub async fn has_permission_to_project(&self, project_id: &ProjectId) -> ClientResult<bool> {
        self.cache
            .query(HAS_PERMISSION_TO_PROJECT, &project_input(project_id))
            .await
    }

    pub async fn is_creator_of_project(&self, project_id: &ProjectId) -> ClientResult<bool> {
        self.cache
            .query(IS_CREATOR_OF_PROJECT, &project_input(project_id))
            .await
    }

    pub async fn my_professional_role(
        &self,
        project_id: &ProjectId,
    ) -> ClientResult<Option<ProfessionalRole>> {
        self.cache
            .query(GET_MY_PROFESSIONAL_ROLE, &project_input(project_id))
            .await
    }

    pub async fn update_my_professional_role(
        &self,
        input: UpdateMyProfessionalRoleInput,
    ) -> ClientResult<Membership> {
        let role = input.user_professional_role;
        let my_id = self.user().map(|u| u.id.clone());
        let role_key = self.key(GET_MY_PROFESSIONAL_ROLE, &project_input(&input.project_id))?;
        OptimisticMutation::new(UPDATE_MY_PROFESSIONAL_ROLE, &input)?
            .cancel(GET_MY_PROFESSIONAL_ROLE)
            .edit(role_key, move |_: Option<Option<ProfessionalRole>>| Some(Some(role)))
            .edit(members_key(&input.project_id), move |members: Option<Vec<ProjectMember>>| {
                members.map(|mut members| {
                    if let Some(me) = members.iter_mut().find(|m| Some(&m.id) == my_id.as_ref()) {
                        me.professional_role = role;
                    }
                    members
                })
            })
            .invalidate(GET_MY_PROFESSIONAL_ROLE, Some(json!({ "projectId": input.project_id })))
            .invalidate(GET_USERS_FOR_PROJECT, Some(json!({ "projectId": input.project_id })))
            .run(&self.cache)
            .await
    }

    /// Leave a project. It disappears from the project list right away.
    pub async fn delete_my_account(&self, project_id: &ProjectId) -> ClientResult<Membership> {
        let id = project_id.clone();
        OptimisticMutation::new(DELETE_MY_ACCOUNT, &project_input(project_id))?
            .scope(SCOPE)
            .cancel(GET_PROJECTS)
            .edit(projects_key(), move |projects| without_project(projects, &id))
            .invalidate(GET_PROJECTS, None)
            .run(&self.cache)
            .await
    }

    pub async fn search_users(&self, user_email: &str) -> ClientResult<Vec<User>> {
        self.cache
            .query(
                GET_USERS,
                &GetUsersInput {
                    user_email: user_email.to_string(),
                },
            )
            .await
    }

    /// Project list as currently cached, without fetching.
    pub fn cached_projects(&self) -> Option<Vec<ProjectListItem>> {
        self.cache.get_typed(&projects_key())
    }
}
