//! Procedures of the `siteDiary` and `weather` routers and of the per-diary
//! entry routers (`plant`, `laborer`, `material`, `siteProblem`,
//! `workProgress`).

use crate::api::{
    Laborer, Material, Plant, SiteDiary, SiteDiaryDetail, SiteDiaryListItem, SiteProblem, Weather,
    WorkProgress,
};
use crate::db::WeatherReport;
use crate::routes::project::ProjectIdInput;
use crate::routes::site_diary::{
    CreateSiteDiaryInput, SiteDiaryIdInput, UpdateSiteDiaryInput, UpdateSiteDiaryWeatherInput,
};
use crate::routes::site_diary_entry::*;
use crate::routes::validation::MAX_AMOUNT_MESSAGE;
use crate::routes::InputError;
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::permissions::require_member;
use super::trycatch::{try_catch, ServiceResult};

fn head_count(value: i64, field: &'static str) -> ServiceResult<i32> {
    Ok(i32::try_from(value).map_err(|_| InputError::new(field, MAX_AMOUNT_MESSAGE))?)
}

// ==================== siteDiary ====================

pub async fn create_site_diary(ctx: &Context, input: CreateSiteDiaryInput) -> ProcedureResult<SiteDiary> {
    let user = ctx.user()?;
    try_catch(&["Failed to create site diary"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx
            .repo()
            .create_site_diary(
                &input.project_id,
                &input.site_diary_name,
                input.site_diary_date,
                &user.id,
            )
            .await?)
    })
    .await
}

pub async fn get_site_diaries(
    ctx: &Context,
    input: ProjectIdInput,
) -> ProcedureResult<Vec<SiteDiaryListItem>> {
    let user = ctx.user()?;
    try_catch(&["Failed to get site diaries"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().list_site_diaries(&input.project_id).await?)
    })
    .await
}

pub async fn get_site_diary(ctx: &Context, input: SiteDiaryIdInput) -> ProcedureResult<SiteDiaryDetail> {
    let user = ctx.user()?;
    try_catch(&["Failed to get site diary"], async {
        let diary = ctx.repo().get_site_diary(&input.site_diary_id).await?;
        require_member(ctx.repo(), &user.id, &diary.project_id).await?;
        Ok(diary)
    })
    .await
}

pub async fn update_site_diary(ctx: &Context, input: UpdateSiteDiaryInput) -> ProcedureResult<SiteDiary> {
    ctx.user()?;
    try_catch(&["Failed to update site diary"], async {
        Ok(ctx
            .repo()
            .update_site_diary(&input.site_diary_id, &input.site_diary_name, input.site_diary_date)
            .await?)
    })
    .await
}

pub async fn delete_site_diary(ctx: &Context, input: SiteDiaryIdInput) -> ProcedureResult<SiteDiary> {
    ctx.user()?;
    try_catch(&["Failed to delete site diary"], async {
        Ok(ctx.repo().delete_site_diary(&input.site_diary_id).await?)
    })
    .await
}

// ==================== weather ====================

pub async fn update_site_diary_weather(
    ctx: &Context,
    input: UpdateSiteDiaryWeatherInput,
) -> ProcedureResult<Weather> {
    ctx.user()?;
    try_catch(&["Failed to update weather"], async {
        let report = WeatherReport {
            morning: input.morning,
            afternoon: input.afternoon,
            evening: input.evening,
        };
        Ok(ctx.repo().upsert_weather(&input.site_diary_id, report).await?)
    })
    .await
}

// ==================== plant ====================

pub async fn create_plant(ctx: &Context, input: CreatePlantInput) -> ProcedureResult<Plant> {
    let user = ctx.user()?;
    try_catch(&["Failed to create plant"], async {
        let amount = head_count(input.plant_amount, "plantAmount")?;
        Ok(ctx
            .repo()
            .create_plant(&input.site_diary_id, &input.plant_type, amount, &user.id)
            .await?)
    })
    .await
}

pub async fn update_plant(ctx: &Context, input: UpdatePlantInput) -> ProcedureResult<Plant> {
    ctx.user()?;
    try_catch(&["Failed to update plant"], async {
        let amount = head_count(input.plant_amount, "plantAmount")?;
        Ok(ctx
            .repo()
            .update_plant(&input.plant_id, &input.plant_type, amount)
            .await?)
    })
    .await
}

pub async fn delete_plant(ctx: &Context, input: PlantIdInput) -> ProcedureResult<Plant> {
    ctx.user()?;
    try_catch(&["Failed to delete plant"], async {
        Ok(ctx.repo().delete_plant(&input.plant_id).await?)
    })
    .await
}

// ==================== laborer ====================

pub async fn create_laborer(ctx: &Context, input: CreateLaborerInput) -> ProcedureResult<Laborer> {
    let user = ctx.user()?;
    try_catch(&["Failed to create laborer"], async {
        let amount = head_count(input.laborer_amount, "laborerAmount")?;
        Ok(ctx
            .repo()
            .create_laborer(&input.site_diary_id, &input.laborer_type, amount, &user.id)
            .await?)
    })
    .await
}

pub async fn update_laborer(ctx: &Context, input: UpdateLaborerInput) -> ProcedureResult<Laborer> {
    ctx.user()?;
    try_catch(&["Failed to update laborer"], async {
        let amount = head_count(input.laborer_amount, "laborerAmount")?;
        Ok(ctx
            .repo()
            .update_laborer(&input.laborer_id, &input.laborer_type, amount)
            .await?)
    })
    .await
}

pub async fn delete_laborer(ctx: &Context, input: LaborerIdInput) -> ProcedureResult<Laborer> {
    ctx.user()?;
    try_catch(&["Failed to delete laborer"], async {
        Ok(ctx.repo().delete_laborer(&input.laborer_id).await?)
    })
    .await
}

// ==================== material ====================

pub async fn create_material(ctx: &Context, input: CreateMaterialInput) -> ProcedureResult<Material> {
    let user = ctx.user()?;
    try_catch(&["Failed to create material"], async {
        Ok(ctx
            .repo()
            .create_material(
                &input.site_diary_id,
                &input.material_type,
                input.material_units,
                input.material_amount,
                &user.id,
            )
            .await?)
    })
    .await
}

pub async fn update_material(ctx: &Context, input: UpdateMaterialInput) -> ProcedureResult<Material> {
    ctx.user()?;
    try_catch(&["Failed to update material"], async {
        Ok(ctx
            .repo()
            .update_material(
                &input.material_id,
                &input.material_type,
                input.material_units,
                input.material_amount,
            )
            .await?)
    })
    .await
}

pub async fn delete_material(ctx: &Context, input: MaterialIdInput) -> ProcedureResult<Material> {
    ctx.user()?;
    try_catch(&["Failed to delete material"], async {
        Ok(ctx.repo().delete_material(&input.material_id).await?)
    })
    .await
}

// ==================== siteProblem ====================

pub async fn create_site_problem(
    ctx: &Context,
    input: CreateSiteProblemInput,
) -> ProcedureResult<SiteProblem> {
    let user = ctx.user()?;
    try_catch(&["Failed to create site problem"], async {
        Ok(ctx
            .repo()
            .create_site_problem(&input.site_diary_id, &input.site_problem_comments, &user.id)
            .await?)
    })
    .await
}

pub async fn update_site_problem(
    ctx: &Context,
    input: UpdateSiteProblemInput,
) -> ProcedureResult<SiteProblem> {
    ctx.user()?;
    try_catch(&["Failed to update site problem"], async {
        Ok(ctx
            .repo()
            .update_site_problem(&input.site_problem_id, &input.site_problem_comments)
            .await?)
    })
    .await
}

pub async fn delete_site_problem(
    ctx: &Context,
    input: SiteProblemIdInput,
) -> ProcedureResult<SiteProblem> {
    ctx.user()?;
    try_catch(&["Failed to delete site problem"], async {
        Ok(ctx.repo().delete_site_problem(&input.site_problem_id).await?)
    })
    .await
}

// ==================== workProgress ====================

pub async fn create_work_progress(
    ctx: &Context,
    input: CreateWorkProgressInput,
) -> ProcedureResult<WorkProgress> {
    let user = ctx.user()?;
    try_catch(&["Failed to create work progress"], async {
        Ok(ctx
            .repo()
            .create_work_progress(&input.site_diary_id, &input.work_progress_comments, &user.id)
            .await?)
    })
    .await
}

pub async fn update_work_progress(
    ctx: &Context,
    input: UpdateWorkProgressInput,
) -> ProcedureResult<WorkProgress> {
    ctx.user()?;
    try_catch(&["Failed to update work progress"], async {
        Ok(ctx
            .repo()
            .update_work_progress(&input.work_progress_id, &input.work_progress_comments)
            .await?)
    })
    .await
}

pub async fn delete_work_progress(
    ctx: &Context,
    input: WorkProgressIdInput,
) -> ProcedureResult<WorkProgress> {
    ctx.user()?;
    try_catch(&["Failed to delete work progress"], async {
        Ok(ctx.repo().delete_work_progress(&input.work_progress_id).await?)
    })
    .await
}
