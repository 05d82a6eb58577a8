//! Procedures of the `project`, `me` and `user` routers.

use crate::api::{
    CreatedProject, Membership, ProfessionalRole, Project, ProjectListItem, ProjectMember, User,
};
use crate::db::RepositoryError;
use crate::routes::me::{GetUsersInput, UpdateMyProfessionalRoleInput};
use crate::routes::project::{
    AddToProjectInput, CreateProjectInput, ProjectIdInput, RemoveFromProjectInput,
    UpdateProjectInput,
};
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::permissions::{has_permission, is_creator, require_creator, require_member};
use super::trycatch::try_catch;

/// Role given to people added from the team page.
pub const DEFAULT_MEMBER_ROLE: ProfessionalRole = ProfessionalRole::ProjectMember;

// ==================== project ====================

pub async fn create_project(ctx: &Context, input: CreateProjectInput) -> ProcedureResult<CreatedProject> {
    let user = ctx.user()?;
    try_catch(&["Failed to create project"], async {
        let project = ctx.repo().create_project(&input.project_name, &user.id).await?;
        tracing::info!(project = %project.id, "project created");
        Ok(CreatedProject { project })
    })
    .await
}

pub async fn get_projects(ctx: &Context) -> ProcedureResult<Vec<ProjectListItem>> {
    let user = ctx.user()?;
    try_catch(&["Failed to get projects"], async {
        Ok(ctx.repo().list_projects_for_user(&user.id).await?)
    })
    .await
}

pub async fn get_project(ctx: &Context, input: ProjectIdInput) -> ProcedureResult<Project> {
    let user = ctx.user()?;
    try_catch(&["Failed to get project"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().get_project(&input.project_id).await?)
    })
    .await
}

pub async fn update_project(ctx: &Context, input: UpdateProjectInput) -> ProcedureResult<Project> {
    let user = ctx.user()?;
    try_catch(&["Failed to update project"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx
            .repo()
            .update_project_name(&input.project_id, &input.project_name)
            .await?)
    })
    .await
}

pub async fn delete_project(ctx: &Context, input: ProjectIdInput) -> ProcedureResult<Project> {
    let user = ctx.user()?;
    try_catch(&["Failed to delete project"], async {
        require_creator(ctx.repo(), &user.id, &input.project_id).await?;
        let project = ctx.repo().delete_project(&input.project_id).await?;
        tracing::info!(project = %project.id, "project deleted");
        Ok(project)
    })
    .await
}

pub async fn add_to_project(ctx: &Context, input: AddToProjectInput) -> ProcedureResult<Membership> {
    let user = ctx.user()?;
    try_catch(&["Failed to add user to project"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let member = User {
            id: input.user_id.clone(),
            name: Some(input.user_name.clone()),
            email: Some(input.user_email.clone()),
            image: Some(input.user_image.clone()),
        };
        Ok(ctx
            .repo()
            .add_member(&input.project_id, &member, DEFAULT_MEMBER_ROLE)
            .await?)
    })
    .await
}

pub async fn remove_from_project(
    ctx: &Context,
    input: RemoveFromProjectInput,
) -> ProcedureResult<Membership> {
    let user = ctx.user()?;
    try_catch(&["Failed to remove user from project"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        if is_creator(ctx.repo(), &input.user_to_be_removed_id, &input.project_id).await? {
            return Err(RepositoryError::validation("The project creator cannot be removed").into());
        }
        Ok(ctx
            .repo()
            .remove_member(&input.project_id, &input.user_to_be_removed_id)
            .await?)
    })
    .await
}

pub async fn get_project_creator(ctx: &Context, input: ProjectIdInput) -> ProcedureResult<User> {
    let user = ctx.user()?;
    try_catch(&["Failed to get project creator"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let project = ctx.repo().get_project(&input.project_id).await?;
        Ok(ctx.repo().get_user(&project.created_by_id).await?)
    })
    .await
}

pub async fn get_users_for_project(
    ctx: &Context,
    input: ProjectIdInput,
) -> ProcedureResult<Vec<ProjectMember>> {
    let user = ctx.user()?;
    try_catch(&["Failed to get users for project"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().list_members(&input.project_id).await?)
    })
    .await
}

// ==================== me ====================

pub async fn has_permission_to_project(ctx: &Context, input: ProjectIdInput) -> ProcedureResult<bool> {
    let user = ctx.user()?;
    try_catch(&["Failed to check if user has permission to project"], async {
        Ok(has_permission(ctx.repo(), &user.id, &input.project_id).await?)
    })
    .await
}

pub async fn is_creator_of_project(ctx: &Context, input: ProjectIdInput) -> ProcedureResult<bool> {
    let user = ctx.user()?;
    try_catch(&["Failed to check if user is creator of project"], async {
        Ok(is_creator(ctx.repo(), &user.id, &input.project_id).await?)
    })
    .await
}

/// `None` when the caller is not on the project.
pub async fn get_my_professional_role(
    ctx: &Context,
    input: ProjectIdInput,
) -> ProcedureResult<Option<ProfessionalRole>> {
    let user = ctx.user()?;
    try_catch(&["Failed to get my professional role"], async {
        let membership = ctx.repo().get_membership(&user.id, &input.project_id).await?;
        Ok(membership.map(|m| m.professional_role))
    })
    .await
}

pub async fn update_my_professional_role(
    ctx: &Context,
    input: UpdateMyProfessionalRoleInput,
) -> ProcedureResult<Membership> {
    let user = ctx.user()?;
    try_catch(&["Failed to update project"], async {
        Ok(ctx
            .repo()
            .update_member_role(&input.project_id, &user.id, input.user_professional_role)
            .await?)
    })
    .await
}

/// Leave the project. The creator cannot leave their own project.
pub async fn delete_my_account(ctx: &Context, input: ProjectIdInput) -> ProcedureResult<Membership> {
    let user = ctx.user()?;
    try_catch(&["Failed to delete my account"], async {
        if is_creator(ctx.repo(), &user.id, &input.project_id).await? {
            return Err(RepositoryError::validation("The project creator cannot leave the project").into());
        }
        Ok(ctx.repo().remove_member(&input.project_id, &user.id).await?)
    })
    .await
}

// ==================== user ====================

pub async fn get_users(ctx: &Context, input: GetUsersInput) -> ProcedureResult<Vec<User>> {
    ctx.user()?;
    try_catch(&["Failed to get users"], async {
        if input.user_email.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ctx.repo().search_users_by_email(&input.user_email).await?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ProjectId, UserId};
    use crate::rpc::error::ErrorCode;
    use crate::services::test_support::{context, context_as, other_user};

    #[tokio::test]
    async fn test_create_and_list_projects() {
        let ctx = context().await;
        let created = create_project(
            &ctx,
            CreateProjectInput {
                project_name: "Riverside".to_string(),
            },
        )
        .await
        .unwrap();

        let projects = get_projects(&ctx).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, created.project.id);

        let role = get_my_professional_role(
            &ctx,
            ProjectIdInput {
                project_id: created.project.id.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(role, Some(ProfessionalRole::ProjectManager));
    }

    #[tokio::test]
    async fn test_non_member_is_rejected() {
        let ctx = context().await;
        let project = create_project(
            &ctx,
            CreateProjectInput {
                project_name: "Private".to_string(),
            },
        )
        .await
        .unwrap()
        .project;

        let stranger = context_as(&ctx, other_user("stranger")).await;
        let err = get_project(
            &stranger,
            ProjectIdInput {
                project_id: project.id.clone(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.message, "Failed to get project");

        assert!(!has_permission_to_project(
            &stranger,
            ProjectIdInput {
                project_id: project.id
            }
        )
        .await
        .unwrap());
    }

    #[tokio::test]
    async fn test_membership_lifecycle() {
        let ctx = context().await;
        let project = create_project(
            &ctx,
            CreateProjectInput {
                project_name: "Team".to_string(),
            },
        )
        .await
        .unwrap()
        .project;

        add_to_project(
            &ctx,
            AddToProjectInput {
                project_id: project.id.clone(),
                user_id: UserId::new("u-2"),
                user_name: "Sam".to_string(),
                user_email: "sam@site.test".to_string(),
                user_image: "https://img.test/sam.png".to_string(),
            },
        )
        .await
        .unwrap();

        let members = get_users_for_project(
            &ctx,
            ProjectIdInput {
                project_id: project.id.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(members.len(), 2);

        let found = get_users(
            &ctx,
            GetUsersInput {
                user_email: "SAM@".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);

        let sam = context_as(&ctx, other_user("u-2")).await;
        update_my_professional_role(
            &sam,
            UpdateMyProfessionalRoleInput {
                project_id: project.id.clone(),
                user_professional_role: ProfessionalRole::Foreman,
            },
        )
        .await
        .unwrap();
        assert!(!is_creator_of_project(
            &sam,
            ProjectIdInput {
                project_id: project.id.clone()
            }
        )
        .await
        .unwrap());

        let err = delete_project(
            &sam,
            ProjectIdInput {
                project_id: project.id.clone(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "Failed to delete project");

        delete_my_account(
            &sam,
            ProjectIdInput {
                project_id: project.id.clone(),
            },
        )
        .await
        .unwrap();
        let err = remove_from_project(
            &ctx,
            RemoveFromProjectInput {
                project_id: project.id.clone(),
                user_to_be_removed_id: ctx.user_id().unwrap().clone(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);

        delete_project(&ctx, ProjectIdInput { project_id: project.id }).await.unwrap();
        assert!(get_projects(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_email_search() {
        let ctx = context().await;
        let found = get_users(
            &ctx,
            GetUsersInput {
                user_email: String::new(),
            },
        )
        .await
        .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let ctx = crate::services::test_support::anonymous().await;
        let err = get_project(
            &ctx,
            ProjectIdInput {
                project_id: ProjectId::new("p"),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.message, "UNAUTHORIZED");
    }
}
