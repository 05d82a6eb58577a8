//! Site diary hooks: the diary list, one diary's detail, its weather and
//! entries. Entry mutations edit the cached detail of their diary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::api::ApiClient;
use super::cache::QueryKey;
use super::error::ClientResult;
use super::optimistic::OptimisticMutation;
use crate::api::{
    Laborer, LaborerId, Material, MaterialId, Plant, PlantId, ProjectId, SiteDiary,
    SiteDiaryDetail, SiteDiaryId, SiteDiaryListItem, SiteProblem, SiteProblemId, Weather,
    WeatherId, WorkProgress, WorkProgressId,
};
use crate::routes::site_diary::{
    CreateSiteDiaryInput, SiteDiaryIdInput, UpdateSiteDiaryInput, UpdateSiteDiaryWeatherInput,
    CREATE_SITE_DIARY, DELETE_SITE_DIARY, GET_SITE_DIARIES, GET_SITE_DIARY, UPDATE_SITE_DIARY,
    UPDATE_SITE_DIARY_WEATHER,
};
use crate::routes::site_diary_entry::*;

const SCOPE: &str = "siteDiary";

fn diaries_key(project_id: &ProjectId) -> QueryKey {
    QueryKey::new(GET_SITE_DIARIES, json!({ "projectId": project_id }))
}

fn diary_key(site_diary_id: &SiteDiaryId) -> QueryKey {
    QueryKey::new(GET_SITE_DIARY, json!({ "siteDiaryId": site_diary_id }))
}

fn head_count(amount: i64) -> i32 {
    i32::try_from(amount).unwrap_or(i32::MAX)
}

impl ApiClient {
    pub async fn site_diaries(&self, project_id: &ProjectId) -> ClientResult<Vec<SiteDiaryListItem>> {
        self.cache
            .query(GET_SITE_DIARIES, &json!({ "projectId": project_id }))
            .await
    }

    pub async fn site_diary(&self, site_diary_id: &SiteDiaryId) -> ClientResult<SiteDiaryDetail> {
        self.cache
            .query(
                GET_SITE_DIARY,
                &SiteDiaryIdInput {
                    site_diary_id: site_diary_id.clone(),
                },
            )
            .await
    }

    pub async fn create_site_diary(&self, input: CreateSiteDiaryInput) -> ClientResult<SiteDiary> {
        let placeholder = SiteDiaryListItem {
            id: SiteDiaryId::generate(),
            name: input.site_diary_name.clone(),
            date: input.site_diary_date,
            created_by: self.me_summary(),
        };
        OptimisticMutation::new(CREATE_SITE_DIARY, &input)?
            .scope(SCOPE)
            .cancel(GET_SITE_DIARIES)
            .edit(diaries_key(&input.project_id), move |diaries: Option<Vec<SiteDiaryListItem>>| {
                let mut diaries = diaries.unwrap_or_default();
                diaries.insert(0, placeholder);
                Some(diaries)
            })
            .invalidate(GET_SITE_DIARIES, Some(json!({ "projectId": input.project_id })))
            .run(&self.cache)
            .await
    }

    /// `project_id` names the list the diary is shown in.
    pub async fn update_site_diary(
        &self,
        project_id: &ProjectId,
        input: UpdateSiteDiaryInput,
    ) -> ClientResult<SiteDiary> {
        let (list_input, detail_input) = (input.clone(), input.clone());
        OptimisticMutation::new(UPDATE_SITE_DIARY, &input)?
            .scope(SCOPE)
            .cancel(GET_SITE_DIARIES)
            .cancel(GET_SITE_DIARY)
            .edit(diaries_key(project_id), move |diaries: Option<Vec<SiteDiaryListItem>>| {
                diaries.map(|mut diaries| {
                    if let Some(d) = diaries.iter_mut().find(|d| d.id == list_input.site_diary_id) {
                        d.name = list_input.site_diary_name.clone();
                        d.date = list_input.site_diary_date;
                    }
                    diaries
                })
            })
            .edit(diary_key(&input.site_diary_id), move |detail: Option<SiteDiaryDetail>| {
                detail.map(|mut d| {
                    d.name = detail_input.site_diary_name.clone();
                    d.date = detail_input.site_diary_date;
                    d
                })
            })
            .invalidate(GET_SITE_DIARIES, Some(json!({ "projectId": project_id })))
            .invalidate(GET_SITE_DIARY, Some(json!({ "siteDiaryId": input.site_diary_id })))
            .run(&self.cache)
            .await
    }

    pub async fn delete_site_diary(
        &self,
        project_id: &ProjectId,
        site_diary_id: &SiteDiaryId,
    ) -> ClientResult<SiteDiary> {
        let id = site_diary_id.clone();
        OptimisticMutation::new(
            DELETE_SITE_DIARY,
            &SiteDiaryIdInput {
                site_diary_id: site_diary_id.clone(),
            },
        )?
        .scope(SCOPE)
        .cancel(GET_SITE_DIARIES)
        .edit(diaries_key(project_id), move |diaries: Option<Vec<SiteDiaryListItem>>| {
            diaries.map(|d| d.into_iter().filter(|d| d.id != id).collect())
        })
        .invalidate(GET_SITE_DIARIES, Some(json!({ "projectId": project_id })))
        .run(&self.cache)
        .await
    }

    /// Mutation whose speculative edit changes the cached detail of one diary.
    async fn diary_entry_mutation<I, O, F>(
        &self,
        procedure: &str,
        input: &I,
        site_diary_id: &SiteDiaryId,
        edit: F,
    ) -> ClientResult<O>
    where
        I: Serialize,
        O: DeserializeOwned,
        F: FnOnce(&mut SiteDiaryDetail) + Send + 'static,
    {
        OptimisticMutation::new(procedure, input)?
            .scope(SCOPE)
            .cancel(GET_SITE_DIARY)
            .edit(diary_key(site_diary_id), move |detail: Option<SiteDiaryDetail>| {
                detail.map(|mut d| {
                    edit(&mut d);
                    d
                })
            })
            .invalidate(GET_SITE_DIARY, Some(json!({ "siteDiaryId": site_diary_id })))
            .run(&self.cache)
            .await
    }

    pub async fn update_site_diary_weather(&self, input: UpdateSiteDiaryWeatherInput) -> ClientResult<Weather> {
        let report = input.clone();
        self.diary_entry_mutation(UPDATE_SITE_DIARY_WEATHER, &input, &input.site_diary_id, move |d| {
            let id = d
                .weather
                .as_ref()
                .map(|w| w.id.clone())
                .unwrap_or_else(WeatherId::generate);
            d.weather = Some(Weather {
                id,
                site_diary_id: report.site_diary_id,
                morning: report.morning,
                afternoon: report.afternoon,
                evening: report.evening,
            });
        })
        .await
    }

    // ---------- plant ----------

    pub async fn create_plant(&self, input: CreatePlantInput) -> ClientResult<Plant> {
        let plant = Plant {
            id: PlantId::generate(),
            plant_type: input.plant_type.clone(),
            amount: head_count(input.plant_amount),
            site_diary_id: input.site_diary_id.clone(),
            created_by_id: self.my_id(),
        };
        self.diary_entry_mutation(CREATE_PLANT, &input, &input.site_diary_id, move |d| {
            d.plants.push(plant)
        })
        .await
    }

    pub async fn update_plant(&self, site_diary_id: &SiteDiaryId, input: UpdatePlantInput) -> ClientResult<Plant> {
        let update = input.clone();
        self.diary_entry_mutation(UPDATE_PLANT, &input, site_diary_id, move |d| {
            if let Some(p) = d.plants.iter_mut().find(|p| p.id == update.plant_id) {
                p.plant_type = update.plant_type;
                p.amount = head_count(update.plant_amount);
            }
        })
        .await
    }

    pub async fn delete_plant(&self, site_diary_id: &SiteDiaryId, plant_id: &PlantId) -> ClientResult<Plant> {
        let id = plant_id.clone();
        let input = PlantIdInput {
            plant_id: plant_id.clone(),
        };
        self.diary_entry_mutation(DELETE_PLANT, &input, site_diary_id, move |d| {
            d.plants.retain(|p| p.id != id)
        })
        .await
    }

    // ---------- laborer ----------

    pub async fn create_laborer(&self, input: CreateLaborerInput) -> ClientResult<Laborer> {
        let laborer = Laborer {
            id: LaborerId::generate(),
            laborer_type: input.laborer_type.clone(),
            amount: head_count(input.laborer_amount),
            site_diary_id: input.site_diary_id.clone(),
            created_by_id: self.my_id(),
        };
        self.diary_entry_mutation(CREATE_LABORER, &input, &input.site_diary_id, move |d| {
            d.laborers.push(laborer)
        })
        .await
    }

    pub async fn update_laborer(
        &self,
        site_diary_id: &SiteDiaryId,
        input: UpdateLaborerInput,
    ) -> ClientResult<Laborer> {
        let update = input.clone();
        self.diary_entry_mutation(UPDATE_LABORER, &input, site_diary_id, move |d| {
            if let Some(l) = d.laborers.iter_mut().find(|l| l.id == update.laborer_id) {
                l.laborer_type = update.laborer_type;
                l.amount = head_count(update.laborer_amount);
            }
        })
        .await
    }

    pub async fn delete_laborer(
        &self,
        site_diary_id: &SiteDiaryId,
        laborer_id: &LaborerId,
    ) -> ClientResult<Laborer> {
        let id = laborer_id.clone();
        let input = LaborerIdInput {
            laborer_id: laborer_id.clone(),
        };
        self.diary_entry_mutation(DELETE_LABORER, &input, site_diary_id, move |d| {
            d.laborers.retain(|l| l.id != id)
        })
        .await
    }

    // ---------- material ----------

    pub async fn create_material(&self, input: CreateMaterialInput) -> ClientResult<Material> {
        let material = Material {
            id: MaterialId::generate(),
            material_type: input.material_type.clone(),
            units: input.material_units,
            amount: input.material_amount,
            site_diary_id: input.site_diary_id.clone(),
            created_by_id: self.my_id(),
        };
        self.diary_entry_mutation(CREATE_MATERIAL, &input, &input.site_diary_id, move |d| {
            d.materials.push(material)
        })
        .await
    }

    pub async fn update_material(
        &self,
        site_diary_id: &SiteDiaryId,
        input: UpdateMaterialInput,
    ) -> ClientResult<Material> {
        let update = input.clone();
        self.diary_entry_mutation(UPDATE_MATERIAL, &input, site_diary_id, move |d| {
            if let Some(m) = d.materials.iter_mut().find(|m| m.id == update.material_id) {
                m.material_type = update.material_type;
                m.units = update.material_units;
                m.amount = update.material_amount;
            }
        })
        .await
    }

    pub async fn delete_material(
        &self,
        site_diary_id: &SiteDiaryId,
        material_id: &MaterialId,
    ) -> ClientResult<Material> {
        let id = material_id.clone();
        let input = MaterialIdInput {
            material_id: material_id.clone(),
        };
        self.diary_entry_mutation(DELETE_MATERIAL, &input, site_diary_id, move |d| {
            d.materials.retain(|m| m.id != id)
        })
        .await
    }

    // ---------- site problem ----------

    pub async fn create_site_problem(&self, input: CreateSiteProblemInput) -> ClientResult<SiteProblem> {
        let problem = SiteProblem {
            id: SiteProblemId::generate(),
            comments: input.site_problem_comments.clone(),
            site_diary_id: input.site_diary_id.clone(),
            created_by_id: self.my_id(),
        };
        self.diary_entry_mutation(CREATE_SITE_PROBLEM, &input, &input.site_diary_id, move |d| {
            d.site_problems.push(problem)
        })
        .await
    }

    pub async fn update_site_problem(
        &self,
        site_diary_id: &SiteDiaryId,
        input: UpdateSiteProblemInput,
    ) -> ClientResult<SiteProblem> {
        let update = input.clone();
        self.diary_entry_mutation(UPDATE_SITE_PROBLEM, &input, site_diary_id, move |d| {
            if let Some(p) = d.site_problems.iter_mut().find(|p| p.id == update.site_problem_id) {
                p.comments = update.site_problem_comments;
            }
        })
        .await
    }

    pub async fn delete_site_problem(
        &self,
        site_diary_id: &SiteDiaryId,
        site_problem_id: &SiteProblemId,
    ) -> ClientResult<SiteProblem> {
        let id = site_problem_id.clone();
        let input = SiteProblemIdInput {
            site_problem_id: site_problem_id.clone(),
        };
        self.diary_entry_mutation(DELETE_SITE_PROBLEM, &input, site_diary_id, move |d| {
            d.site_problems.retain(|p| p.id != id)
        })
        .await
    }

    // ---------- work progress ----------

    pub async fn create_work_progress(&self, input: CreateWorkProgressInput) -> ClientResult<WorkProgress> {
        let progress = WorkProgress {
            id: WorkProgressId::generate(),
            comments: input.work_progress_comments.clone(),
            site_diary_id: input.site_diary_id.clone(),
            created_by_id: self.my_id(),
        };
        self.diary_entry_mutation(CREATE_WORK_PROGRESS, &input, &input.site_diary_id, move |d| {
            d.work_progresses.push(progress)
        })
        .await
    }

    pub async fn update_work_progress(
        &self,
        site_diary_id: &SiteDiaryId,
        input: UpdateWorkProgressInput,
    ) -> ClientResult<WorkProgress> {
        let update = input.clone();
        self.diary_entry_mutation(UPDATE_WORK_PROGRESS, &input, site_diary_id, move |d| {
            if let Some(w) = d.work_progresses.iter_mut().find(|w| w.id == update.work_progress_id) {
                w.comments = update.work_progress_comments;
            }
        })
        .await
    }

    pub async fn delete_work_progress(
        &self,
        site_diary_id: &SiteDiaryId,
        work_progress_id: &WorkProgressId,
    ) -> ClientResult<WorkProgress> {
        let id = work_progress_id.clone();
        let input = WorkProgressIdInput {
            work_progress_id: work_progress_id.clone(),
        };
        self.diary_entry_mutation(DELETE_WORK_PROGRESS, &input, site_diary_id, move |d| {
            d.work_progresses.retain(|w| w.id != id)
        })
        .await
    }
}
