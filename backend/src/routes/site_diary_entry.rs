//! Inputs of the per-diary entry routers: `plant`, `laborer`, `material`,
//! `siteProblem` and `workProgress`.

use serde::{Deserialize, Serialize};

use super::validation::{
    bounded_amount, bounded_count, required, required_id, InputResult, Validate,
};
use crate::api::{LaborerId, MaterialId, PlantId, SiteDiaryId, SiteProblemId, WorkProgressId};
use crate::models::MaterialUnit;

pub const CREATE_PLANT: &str = "plant.createPlant";
pub const UPDATE_PLANT: &str = "plant.updatePlant";
pub const DELETE_PLANT: &str = "plant.deletePlant";

pub const CREATE_LABORER: &str = "laborer.createLaborer";
pub const UPDATE_LABORER: &str = "laborer.updateLaborer";
pub const DELETE_LABORER: &str = "laborer.deleteLaborer";

pub const CREATE_MATERIAL: &str = "material.createMaterial";
pub const UPDATE_MATERIAL: &str = "material.updateMaterial";
pub const DELETE_MATERIAL: &str = "material.deleteMaterial";

pub const CREATE_SITE_PROBLEM: &str = "siteProblem.createSiteProblem";
pub const UPDATE_SITE_PROBLEM: &str = "siteProblem.updateSiteProblem";
pub const DELETE_SITE_PROBLEM: &str = "siteProblem.deleteSiteProblem";

pub const CREATE_WORK_PROGRESS: &str = "workProgress.createWorkProgress";
pub const UPDATE_WORK_PROGRESS: &str = "workProgress.updateWorkProgress";
pub const DELETE_WORK_PROGRESS: &str = "workProgress.deleteWorkProgress";

fn check_diary(id: &SiteDiaryId) -> InputResult<()> {
    required_id(id.as_str(), "siteDiaryId", "A siteDiaryId is required")
}

// ---------- plant ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlantInput {
    pub site_diary_id: SiteDiaryId,
    pub plant_type: String,
    pub plant_amount: i64,
}

impl Validate for CreatePlantInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.plant_type, "plantType", "A plant type is required")?;
        bounded_count(self.plant_amount, "plantAmount", "Quantity must be positive")?;
        check_diary(&self.site_diary_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlantInput {
    pub plant_id: PlantId,
    pub plant_type: String,
    pub plant_amount: i64,
}

impl Validate for UpdatePlantInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.plant_type, "plantType", "A plant type is required")?;
        bounded_count(self.plant_amount, "plantAmount", "Quantity must be positive")?;
        required_id(self.plant_id.as_str(), "plantId", "A plantId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantIdInput {
    pub plant_id: PlantId,
}

impl Validate for PlantIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.plant_id.as_str(), "plantId", "A plantId is required")?;
        Ok(self)
    }
}

// ---------- laborer ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLaborerInput {
    pub site_diary_id: SiteDiaryId,
    pub laborer_type: String,
    pub laborer_amount: i64,
}

impl Validate for CreateLaborerInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.laborer_type, "laborerType", "A laborer type is required")?;
        bounded_count(self.laborer_amount, "laborerAmount", "Amount must be positive")?;
        check_diary(&self.site_diary_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLaborerInput {
    pub laborer_id: LaborerId,
    pub laborer_type: String,
    pub laborer_amount: i64,
}

impl Validate for UpdateLaborerInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.laborer_type, "laborerType", "A laborer type is required")?;
        bounded_count(self.laborer_amount, "laborerAmount", "Amount must be positive")?;
        required_id(self.laborer_id.as_str(), "laborerId", "A laborerId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborerIdInput {
    pub laborer_id: LaborerId,
}

impl Validate for LaborerIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.laborer_id.as_str(), "laborerId", "A laborerId is required")?;
        Ok(self)
    }
}

// ---------- material ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialInput {
    pub site_diary_id: SiteDiaryId,
    pub material_type: String,
    pub material_units: MaterialUnit,
    pub material_amount: f64,
}

impl Validate for CreateMaterialInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.material_type, "materialType", "A material type is required")?;
        bounded_amount(self.material_amount, "materialAmount", "Quantity must be positive")?;
        check_diary(&self.site_diary_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialInput {
    pub material_id: MaterialId,
    pub material_type: String,
    pub material_units: MaterialUnit,
    pub material_amount: f64,
}

impl Validate for UpdateMaterialInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.material_type, "materialType", "A material type is required")?;
        bounded_amount(self.material_amount, "materialAmount", "Quantity must be positive")?;
        required_id(self.material_id.as_str(), "materialId", "A materialId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialIdInput {
    pub material_id: MaterialId,
}

impl Validate for MaterialIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.material_id.as_str(), "materialId", "A materialId is required")?;
        Ok(self)
    }
}

// ---------- site problem ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteProblemInput {
    pub site_diary_id: SiteDiaryId,
    pub site_problem_comments: String,
}

impl Validate for CreateSiteProblemInput {
    fn validate(mut self) -> InputResult<Self> {
        required(
            &mut self.site_problem_comments,
            "siteProblemComments",
            "A comment is required",
        )?;
        check_diary(&self.site_diary_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteProblemInput {
    pub site_problem_id: SiteProblemId,
    pub site_problem_comments: String,
}

impl Validate for UpdateSiteProblemInput {
    fn validate(mut self) -> InputResult<Self> {
        required(
            &mut self.site_problem_comments,
            "siteProblemComments",
            "A comment is required",
        )?;
        required_id(
            self.site_problem_id.as_str(),
            "siteProblemId",
            "A siteProblemId is required",
        )?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProblemIdInput {
    pub site_problem_id: SiteProblemId,
}

impl Validate for SiteProblemIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(
            self.site_problem_id.as_str(),
            "siteProblemId",
            "A siteProblemId is required",
        )?;
        Ok(self)
    }
}

// ---------- work progress ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkProgressInput {
    pub site_diary_id: SiteDiaryId,
    pub work_progress_comments: String,
}

impl Validate for CreateWorkProgressInput {
    fn validate(mut self) -> InputResult<Self> {
        required(
            &mut self.work_progress_comments,
            "workProgressComments",
            "A comment is required",
        )?;
        check_diary(&self.site_diary_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkProgressInput {
    pub work_progress_id: WorkProgressId,
    pub work_progress_comments: String,
}

impl Validate for UpdateWorkProgressInput {
    fn validate(mut self) -> InputResult<Self> {
        required(
            &mut self.work_progress_comments,
            "workProgressComments",
            "A comment is required",
        )?;
        required_id(
            self.work_progress_id.as_str(),
            "workProgressId",
            "A workProgressId is required",
        )?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkProgressIdInput {
    pub work_progress_id: WorkProgressId,
}

impl Validate for WorkProgressIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(
            self.work_progress_id.as_str(),
            "workProgressId",
            "A workProgressId is required",
        )?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plant_amount_must_be_positive() {
        let err = CreatePlantInput {
            site_diary_id: SiteDiaryId::new("d1"),
            plant_type: "Excavator".to_string(),
            plant_amount: 0,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "Quantity must be positive");
    }

    #[test]
    fn test_laborer_amount_upper_bound() {
        let err = CreateLaborerInput {
            site_diary_id: SiteDiaryId::new("d1"),
            laborer_type: "Carpenter".to_string(),
            laborer_amount: 2_147_483_648,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "Number must be below 2147483647");
    }

    #[test]
    fn test_laborer_uses_amount_wording() {
        let err = UpdateLaborerInput {
            laborer_id: LaborerId::new("l1"),
            laborer_type: "Steel fixer".to_string(),
            laborer_amount: -2,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "Amount must be positive");
    }

    #[test]
    fn test_material_from_wire() {
        let input: CreateMaterialInput = serde_json::from_value(json!({
            "siteDiaryId": "d1",
            "materialType": " Cement ",
            "materialUnits": "BAGS",
            "materialAmount": 40.5
        }))
        .unwrap();
        let input = input.validate().unwrap();
        assert_eq!(input.material_type, "Cement");
        assert_eq!(input.material_units, MaterialUnit::Bags);
    }

    #[test]
    fn test_comment_is_required() {
        let err = CreateWorkProgressInput {
            site_diary_id: SiteDiaryId::new("d1"),
            work_progress_comments: "\n".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "A comment is required");
    }
}
