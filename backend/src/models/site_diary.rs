use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{MaterialUnit, WeatherCondition};
use super::project::UserSummary;
use crate::api::{
    LaborerId, MaterialId, PlantId, ProjectId, SiteDiaryId, SiteProblemId, UserId, WeatherId,
    WorkProgressId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDiary {
    pub id: SiteDiaryId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub project_id: ProjectId,
    pub created_by_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the site diary list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDiaryListItem {
    pub id: SiteDiaryId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub created_by: UserSummary,
}

/// Plant (equipment) on site for the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: PlantId,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub amount: i32,
    pub site_diary_id: SiteDiaryId,
    pub created_by_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Laborer {
    pub id: LaborerId,
    #[serde(rename = "type")]
    pub laborer_type: String,
    pub amount: i32,
    pub site_diary_id: SiteDiaryId,
    pub created_by_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    #[serde(rename = "type")]
    pub material_type: String,
    pub units: MaterialUnit,
    pub amount: f64,
    pub site_diary_id: SiteDiaryId,
    pub created_by_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProblem {
    pub id: SiteProblemId,
    pub comments: String,
    pub site_diary_id: SiteDiaryId,
    pub created_by_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkProgress {
    pub id: WorkProgressId,
    pub comments: String,
    pub site_diary_id: SiteDiaryId,
    pub created_by_id: UserId,
}

/// Weather for the three parts of the working day. One row per diary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub id: WeatherId,
    pub site_diary_id: SiteDiaryId,
    pub morning: Option<WeatherCondition>,
    pub afternoon: Option<WeatherCondition>,
    pub evening: Option<WeatherCondition>,
}

/// A diary together with everything logged against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDiaryDetail {
    pub id: SiteDiaryId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub project_id: ProjectId,
    pub created_by: UserSummary,
    pub plants: Vec<Plant>,
    pub laborers: Vec<Laborer>,
    pub materials: Vec<Material>,
    pub site_problems: Vec<SiteProblem>,
    pub work_progresses: Vec<WorkProgress>,
    pub weather: Option<Weather>,
}
