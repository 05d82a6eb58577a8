//! Inputs of the `project` router.

use serde::{Deserialize, Serialize};

use super::validation::{required, required_id, InputResult, Validate};
use crate::api::{ProjectId, UserId};

pub const CREATE_PROJECT: &str = "project.createProject";
pub const GET_PROJECTS: &str = "project.getProjects";
pub const GET_PROJECT: &str = "project.getProject";
pub const UPDATE_PROJECT: &str = "project.updateProject";
pub const DELETE_PROJECT: &str = "project.deleteProject";
pub const ADD_TO_PROJECT: &str = "project.addToProject";
pub const REMOVE_FROM_PROJECT: &str = "project.removeFromProject";
pub const GET_PROJECT_CREATOR: &str = "project.getProjectCreator";
pub const GET_USERS_FOR_PROJECT: &str = "project.getUsersForProject";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectInput {
    pub project_name: String,
}

impl Validate for CreateProjectInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.project_name, "projectName", "A project name is required")?;
        Ok(self)
    }
}

/// Input of every procedure addressed by project alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdInput {
    pub project_id: ProjectId,
}

impl Validate for ProjectIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectInput {
    pub project_id: ProjectId,
    pub project_name: String,
}

impl Validate for UpdateProjectInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.project_name, "projectName", "A project name is required")?;
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToProjectInput {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub user_image: String,
}

impl Validate for AddToProjectInput {
    fn validate(mut self) -> InputResult<Self> {
        required_id(self.user_id.as_str(), "userId", "A userId is required")?;
        required(&mut self.user_name, "userName", "A userName is required")?;
        required(&mut self.user_email, "userEmail", "A userEmail is required")?;
        required(&mut self.user_image, "userImage", "A userImage is required")?;
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromProjectInput {
    pub project_id: ProjectId,
    pub user_to_be_removed_id: UserId,
}

impl Validate for RemoveFromProjectInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_project_input_from_wire() {
        let input: CreateProjectInput =
            serde_json::from_value(json!({ "projectName": "  Riverside Block C " })).unwrap();
        let input = input.validate().unwrap();
        assert_eq!(input.project_name, "Riverside Block C");
    }

    #[test]
    fn test_create_project_requires_name() {
        let err = CreateProjectInput {
            project_name: " ".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "A project name is required");
    }

    #[test]
    fn test_add_to_project_checks_fields_in_order() {
        let input = AddToProjectInput {
            project_id: ProjectId::new("p1"),
            user_id: UserId::new("u2"),
            user_name: "".to_string(),
            user_email: "".to_string(),
            user_image: "".to_string(),
        };
        assert_eq!(input.validate().unwrap_err().message, "A userName is required");
    }

    #[test]
    fn test_const_values() {
        assert_eq!(CREATE_PROJECT, "project.createProject");
        assert_eq!(GET_USERS_FOR_PROJECT, "project.getUsersForProject");
    }
}
