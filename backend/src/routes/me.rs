//! Inputs of the `me` and `user` routers.

use serde::{Deserialize, Serialize};

use super::validation::{required_id, InputResult, Validate};
use crate::api::ProjectId;
use crate::models::ProfessionalRole;

pub const HAS_PERMISSION_TO_PROJECT: &str = "me.hasPermissionToProject";
pub const IS_CREATOR_OF_PROJECT: &str = "me.isCreatorOfProject";
pub const GET_MY_PROFESSIONAL_ROLE: &str = "me.getMyProfessionalRole";
pub const UPDATE_MY_PROFESSIONAL_ROLE: &str = "me.updateMyProfessionalRole";
pub const DELETE_MY_ACCOUNT: &str = "me.deleteMyAccount";

pub const GET_USERS: &str = "user.getUsers";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMyProfessionalRoleInput {
    pub project_id: ProjectId,
    pub user_professional_role: ProfessionalRole,
}

impl Validate for UpdateMyProfessionalRoleInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

/// Email fragment typed into the "add member" search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUsersInput {
    pub user_email: String,
}

impl Validate for GetUsersInput {
    fn validate(mut self) -> InputResult<Self> {
        self.user_email = self.user_email.trim().to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_is_read_from_wire_name() {
        let input: UpdateMyProfessionalRoleInput = serde_json::from_value(json!({
            "projectId": "p1",
            "userProfessionalRole": "QUANTITY_SURVEYOR"
        }))
        .unwrap();
        assert_eq!(
            input.user_professional_role,
            ProfessionalRole::QuantitySurveyor
        );
    }

    #[test]
    fn test_unknown_role_fails_to_parse() {
        let parsed: Result<UpdateMyProfessionalRoleInput, _> = serde_json::from_value(json!({
            "projectId": "p1",
            "userProfessionalRole": "ARCHITECT"
        }));
        assert!(parsed.is_err());
    }
}
