//! Users, projects and team membership.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{ProjectId, UserId};
use crate::models::{
    Membership, ProfessionalRole, Project, ProjectListItem, ProjectMember, User,
};

/// Repository trait for projects and the people on them.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Users ====================

    /// Insert the user or refresh the profile fields of an existing row.
    async fn upsert_user(&self, user: &User) -> RepositoryResult<User>;

    async fn get_user(&self, user_id: &UserId) -> RepositoryResult<User>;

    /// Users whose email contains `fragment`, case-insensitively.
    async fn search_users_by_email(&self, fragment: &str) -> RepositoryResult<Vec<User>>;

    // ==================== Projects ====================

    /// Create a project and enrol its creator as `PROJECT_MANAGER`.
    async fn create_project(&self, name: &str, created_by: &UserId) -> RepositoryResult<Project>;

    /// Projects the user is a member of, oldest first.
    async fn list_projects_for_user(
        &self,
        user_id: &UserId,
    ) -> RepositoryResult<Vec<ProjectListItem>>;

    async fn get_project(&self, project_id: &ProjectId) -> RepositoryResult<Project>;

    async fn update_project_name(
        &self,
        project_id: &ProjectId,
        name: &str,
    ) -> RepositoryResult<Project>;

    /// Delete a project together with everything it owns.
    async fn delete_project(&self, project_id: &ProjectId) -> RepositoryResult<Project>;

    // ==================== Membership ====================

    async fn get_membership(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> RepositoryResult<Option<Membership>>;

    /// Add `user` to the project, creating the user row when needed.
    async fn add_member(
        &self,
        project_id: &ProjectId,
        user: &User,
        role: ProfessionalRole,
    ) -> RepositoryResult<Membership>;

    async fn remove_member(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> RepositoryResult<Membership>;

    async fn update_member_role(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProfessionalRole,
    ) -> RepositoryResult<Membership>;

    /// Team members ordered by the date they joined.
    async fn list_members(&self, project_id: &ProjectId) -> RepositoryResult<Vec<ProjectMember>>;
}
