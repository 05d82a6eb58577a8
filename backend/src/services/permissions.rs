//! Project access checks.
//!
//! Membership is the only access rule: anyone on the team can read and
//! write the project's records. Deleting the project is reserved to its
//! creator.

use super::trycatch::{ServiceError, ServiceResult};
use crate::api::{ProjectId, UserId};
use crate::db::{FullRepository, RepositoryResult};

pub async fn has_permission(
    repo: &dyn FullRepository,
    user_id: &UserId,
    project_id: &ProjectId,
) -> RepositoryResult<bool> {
    Ok(repo.get_membership(user_id, project_id).await?.is_some())
}

/// A missing project is "not the creator", not an error.
pub async fn is_creator(
    repo: &dyn FullRepository,
    user_id: &UserId,
    project_id: &ProjectId,
) -> RepositoryResult<bool> {
    match repo.get_project(project_id).await {
        Ok(project) => Ok(project.created_by_id == *user_id),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

pub async fn require_member(
    repo: &dyn FullRepository,
    user_id: &UserId,
    project_id: &ProjectId,
) -> ServiceResult<()> {
    if has_permission(repo, user_id, project_id).await? {
        Ok(())
    } else {
        tracing::debug!(user = %user_id, project = %project_id, "not a project member");
        Err(ServiceError::NotMember(project_id.clone()))
    }
}

pub async fn require_creator(
    repo: &dyn FullRepository,
    user_id: &UserId,
    project_id: &ProjectId,
) -> ServiceResult<()> {
    if is_creator(repo, user_id, project_id).await? {
        Ok(())
    } else {
        Err(ServiceError::NotCreator(project_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LocalRepository, ProjectRepository};
    use crate::models::{ProfessionalRole, User};

    fn user(id: &str) -> User {
        User {
            id: UserId::new(id),
            name: Some(id.to_uppercase()),
            email: Some(format!("{}@site.test", id)),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_membership_and_creator() {
        let repo = LocalRepository::new();
        let owner = repo.upsert_user(&user("owner")).await.unwrap();
        let project = repo.create_project("Depot", &owner.id).await.unwrap();
        let guest = user("guest");

        assert!(has_permission(&repo, &owner.id, &project.id).await.unwrap());
        assert!(!has_permission(&repo, &guest.id, &project.id).await.unwrap());

        repo.add_member(&project.id, &guest, ProfessionalRole::Foreman)
            .await
            .unwrap();
        require_member(&repo, &guest.id, &project.id).await.unwrap();

        assert!(is_creator(&repo, &owner.id, &project.id).await.unwrap());
        let err = require_creator(&repo, &guest.id, &project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotCreator(_)));
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let repo = LocalRepository::new();
        let id = ProjectId::new("missing");
        assert!(!is_creator(&repo, &UserId::new("u"), &id).await.unwrap());
        assert!(matches!(
            require_member(&repo, &UserId::new("u"), &id).await.unwrap_err(),
            ServiceError::NotMember(_)
        ));
    }
}
