//! Site diaries and their per-day entries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::api::{
    LaborerId, MaterialId, PlantId, ProjectId, SiteDiaryId, SiteProblemId, UserId,
    WorkProgressId,
};
use crate::models::{
    Laborer, Material, MaterialUnit, Plant, SiteDiary, SiteDiaryDetail, SiteDiaryListItem,
    SiteProblem, Weather, WeatherCondition, WorkProgress,
};

/// Weather for the three parts of a working day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherReport {
    pub morning: Option<WeatherCondition>,
    pub afternoon: Option<WeatherCondition>,
    pub evening: Option<WeatherCondition>,
}

#[async_trait]
pub trait SiteDiaryRepository: Send + Sync {
    // ==================== Diaries ====================

    async fn create_site_diary(
        &self,
        project_id: &ProjectId,
        name: &str,
        date: DateTime<Utc>,
        created_by: &UserId,
    ) -> RepositoryResult<SiteDiary>;

    /// Diaries of a project, most recent date first.
    async fn list_site_diaries(
        &self,
        project_id: &ProjectId,
    ) -> RepositoryResult<Vec<SiteDiaryListItem>>;

    /// A diary with every entry attached.
    async fn get_site_diary(&self, site_diary_id: &SiteDiaryId)
        -> RepositoryResult<SiteDiaryDetail>;

    async fn update_site_diary(
        &self,
        site_diary_id: &SiteDiaryId,
        name: &str,
        date: DateTime<Utc>,
    ) -> RepositoryResult<SiteDiary>;

    /// Delete a diary with its entries and weather.
    async fn delete_site_diary(&self, site_diary_id: &SiteDiaryId) -> RepositoryResult<SiteDiary>;

    // ==================== Plants ====================

    async fn create_plant(
        &self,
        site_diary_id: &SiteDiaryId,
        plant_type: &str,
        amount: i32,
        created_by: &UserId,
    ) -> RepositoryResult<Plant>;

    async fn update_plant(
        &self,
        plant_id: &PlantId,
        plant_type: &str,
        amount: i32,
    ) -> RepositoryResult<Plant>;

    async fn delete_plant(&self, plant_id: &PlantId) -> RepositoryResult<Plant>;

    // ==================== Laborers ====================

    async fn create_laborer(
        &self,
        site_diary_id: &SiteDiaryId,
        laborer_type: &str,
        amount: i32,
        created_by: &UserId,
    ) -> RepositoryResult<Laborer>;

    async fn update_laborer(
        &self,
        laborer_id: &LaborerId,
        laborer_type: &str,
        amount: i32,
    ) -> RepositoryResult<Laborer>;

    async fn delete_laborer(&self, laborer_id: &LaborerId) -> RepositoryResult<Laborer>;

    // ==================== Materials ====================

    async fn create_material(
        &self,
        site_diary_id: &SiteDiaryId,
        material_type: &str,
        units: MaterialUnit,
        amount: f64,
        created_by: &UserId,
    ) -> RepositoryResult<Material>;

    async fn update_material(
        &self,
        material_id: &MaterialId,
        material_type: &str,
        units: MaterialUnit,
        amount: f64,
    ) -> RepositoryResult<Material>;

    async fn delete_material(&self, material_id: &MaterialId) -> RepositoryResult<Material>;

    // ==================== Site problems ====================

    async fn create_site_problem(
        &self,
        site_diary_id: &SiteDiaryId,
        comments: &str,
        created_by: &UserId,
    ) -> RepositoryResult<SiteProblem>;

    async fn update_site_problem(
        &self,
        site_problem_id: &SiteProblemId,
        comments: &str,
    ) -> RepositoryResult<SiteProblem>;

    async fn delete_site_problem(
        &self,
        site_problem_id: &SiteProblemId,
    ) -> RepositoryResult<SiteProblem>;

    // ==================== Work progress ====================

    async fn create_work_progress(
        &self,
        site_diary_id: &SiteDiaryId,
        comments: &str,
        created_by: &UserId,
    ) -> RepositoryResult<WorkProgress>;

    async fn update_work_progress(
        &self,
        work_progress_id: &WorkProgressId,
        comments: &str,
    ) -> RepositoryResult<WorkProgress>;

    async fn delete_work_progress(
        &self,
        work_progress_id: &WorkProgressId,
    ) -> RepositoryResult<WorkProgress>;

    // ==================== Weather ====================

    /// Insert or replace the weather row of a diary.
    async fn upsert_weather(
        &self,
        site_diary_id: &SiteDiaryId,
        report: WeatherReport,
    ) -> RepositoryResult<Weather>;
}
