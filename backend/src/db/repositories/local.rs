//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data lives in memory
//! behind a single lock, so every trait method is atomic: multi-row writes
//! such as invoice create/update validate first and only then mutate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::*;
use crate::db::repository::invoice::{budget_outside_project, invoice_outside_project};
use crate::db::repository::site_diary::WeatherReport;
use crate::db::repository::*;
use crate::models::cost_code_for;
use crate::routes::budget::GetBudgetsInput;
use crate::routes::supplier_invoice::{
    GetSupplierInvoicesInput, SupplierInvoiceFields, SupplierInvoiceItemInput,
};
use crate::routes::task::GetTasksInput;

/// In-memory local repository.
///
/// # Example
/// ```ignore
/// use buildtrack::db::{LocalRepository, ProjectRepository};
///
/// let repo = LocalRepository::new();
/// let project = repo.create_project("Tower B", &owner_id).await?;
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    users: HashMap<UserId, User>,
    projects: Vec<Project>,
    memberships: Vec<Membership>,
    site_diaries: Vec<SiteDiary>,
    plants: Vec<Plant>,
    laborers: Vec<Laborer>,
    materials: Vec<Material>,
    site_problems: Vec<SiteProblem>,
    work_progresses: Vec<WorkProgress>,
    weather: Vec<Weather>,
    tasks: Vec<Task>,
    budgets: Vec<Budget>,
    invoices: Vec<SupplierInvoice>,
    invoice_items: Vec<SupplierInvoiceItem>,

    // Cost code sequence per project, never reused.
    budget_sequences: HashMap<ProjectId, usize>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            projects: Vec::new(),
            memberships: Vec::new(),
            site_diaries: Vec::new(),
            plants: Vec::new(),
            laborers: Vec::new(),
            materials: Vec::new(),
            site_problems: Vec::new(),
            work_progresses: Vec::new(),
            weather: Vec::new(),
            tasks: Vec::new(),
            budgets: Vec::new(),
            invoices: Vec::new(),
            invoice_items: Vec::new(),
            budget_sequences: HashMap::new(),
            is_healthy: true,
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn take_first<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> Option<T> {
    rows.iter().position(pred).map(|idx| rows.remove(idx))
}

impl LocalData {
    fn user_summary(&self, user_id: &UserId) -> UserSummary {
        self.users
            .get(user_id)
            .map(UserSummary::from)
            .unwrap_or(UserSummary {
                name: None,
                image: None,
            })
    }

    fn task_person(&self, user_id: &UserId) -> TaskPerson {
        let user = self.users.get(user_id);
        TaskPerson {
            id: user_id.clone(),
            name: user.and_then(|u| u.name.clone()),
            email: user.and_then(|u| u.email.clone()),
            image: user.and_then(|u| u.image.clone()),
        }
    }

    fn user_email(&self, user_id: &UserId) -> String {
        self.users
            .get(user_id)
            .and_then(|u| u.email.clone())
            .unwrap_or_default()
    }

    fn require_project(&self, project_id: &ProjectId) -> RepositoryResult<&Project> {
        self.projects
            .iter()
            .find(|p| &p.id == project_id)
            .ok_or_else(|| RepositoryError::entity_not_found("project", project_id))
    }

    fn require_diary(&self, site_diary_id: &SiteDiaryId) -> RepositoryResult<&SiteDiary> {
        self.site_diaries
            .iter()
            .find(|d| &d.id == site_diary_id)
            .ok_or_else(|| RepositoryError::entity_not_found("site_diary", site_diary_id))
    }

    fn budget_mut(&mut self, budget_id: &BudgetId) -> RepositoryResult<&mut Budget> {
        self.budgets
            .iter_mut()
            .find(|b| &b.id == budget_id)
            .ok_or_else(|| RepositoryError::entity_not_found("budget", budget_id))
    }

    fn project_budget_mut(
        &mut self,
        budget_id: &BudgetId,
        project_id: &ProjectId,
    ) -> RepositoryResult<&mut Budget> {
        let budget = self.budget_mut(budget_id)?;
        if &budget.project_id != project_id {
            return Err(budget_outside_project(
                budget_id.as_str(),
                project_id.as_str(),
            ));
        }
        Ok(budget)
    }

    fn task_item(&self, task: &Task) -> TaskListItem {
        TaskListItem {
            id: task.id.clone(),
            description: task.description.clone(),
            status: task.status,
            created_by: self.task_person(&task.created_by_id),
            assigned_to: task.assigned_to_id.as_ref().map(|id| self.task_person(id)),
        }
    }

    fn budget_label(&self, budget_id: &BudgetId) -> BudgetLabel {
        self.budgets
            .iter()
            .find(|b| &b.id == budget_id)
            .map(|b| BudgetLabel {
                description: b.description.clone(),
                cost_code: b.cost_code.clone(),
            })
            .unwrap_or(BudgetLabel {
                description: String::new(),
                cost_code: String::new(),
            })
    }

    fn items_of(&self, invoice_id: &SupplierInvoiceId) -> Vec<SupplierInvoiceItem> {
        self.invoice_items
            .iter()
            .filter(|i| &i.supplier_invoice_id == invoice_id)
            .cloned()
            .collect()
    }

    fn remove_diary_cascade(&mut self, site_diary_id: &SiteDiaryId) -> Option<SiteDiary> {
        let diary = take_first(&mut self.site_diaries, |d| &d.id == site_diary_id)?;
        self.plants.retain(|e| &e.site_diary_id != site_diary_id);
        self.laborers.retain(|e| &e.site_diary_id != site_diary_id);
        self.materials.retain(|e| &e.site_diary_id != site_diary_id);
        self.site_problems.retain(|e| &e.site_diary_id != site_diary_id);
        self.work_progresses.retain(|e| &e.site_diary_id != site_diary_id);
        self.weather.retain(|e| &e.site_diary_id != site_diary_id);
        Some(diary)
    }

    fn remove_invoices_where(&mut self, pred: impl Fn(&SupplierInvoice) -> bool) {
        let removed: Vec<SupplierInvoiceId> = self
            .invoices
            .iter()
            .filter(|i| pred(i))
            .map(|i| i.id.clone())
            .collect();
        self.invoices.retain(|i| !removed.contains(&i.id));
        self.invoice_items
            .retain(|item| !removed.contains(&item.supplier_invoice_id));
    }

    fn new_item(
        invoice_id: &SupplierInvoiceId,
        item: &SupplierInvoiceItemInput,
        created_by: &UserId,
        now: DateTime<Utc>,
    ) -> SupplierInvoiceItem {
        SupplierInvoiceItem {
            id: SupplierInvoiceItemId::generate(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            total_price: item.total_price,
            supplier_invoice_id: invoice_id.clone(),
            created_by_id: created_by.clone(),
            created_at: now,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store (for health and error path tests).
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    fn check_health(data: &LocalData) -> RepositoryResult<()> {
        if data.is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection("local repository marked unhealthy"))
        }
    }
}

// ==================== Projects ====================

#[async_trait]
impl ProjectRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn upsert_user(&self, user: &User) -> RepositoryResult<User> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let stored = data
            .users
            .entry(user.id.clone())
            .and_modify(|existing| {
                if user.name.is_some() {
                    existing.name = user.name.clone();
                }
                if user.email.is_some() {
                    existing.email = user.email.clone();
                }
                if user.image.is_some() {
                    existing.image = user.image.clone();
                }
            })
            .or_insert_with(|| user.clone());
        Ok(stored.clone())
    }

    async fn get_user(&self, user_id: &UserId) -> RepositoryResult<User> {
        let data = self.data.read();
        Self::check_health(&data)?;
        data.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::entity_not_found("user", user_id))
    }

    async fn search_users_by_email(&self, fragment: &str) -> RepositoryResult<Vec<User>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        if fragment.is_empty() {
            return Ok(Vec::new());
        }
        let mut users: Vec<User> = data
            .users
            .values()
            .filter(|u| u.email.as_deref().is_some_and(|e| contains_ci(e, fragment)))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn create_project(&self, name: &str, created_by: &UserId) -> RepositoryResult<Project> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let now = Utc::now();
        let project = Project {
            id: ProjectId::generate(),
            name: name.to_string(),
            created_by_id: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        data.projects.push(project.clone());
        data.memberships.push(Membership {
            user_id: created_by.clone(),
            project_id: project.id.clone(),
            professional_role: ProfessionalRole::ProjectManager,
            created_at: now,
        });
        Ok(project)
    }

    async fn list_projects_for_user(
        &self,
        user_id: &UserId,
    ) -> RepositoryResult<Vec<ProjectListItem>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut projects: Vec<ProjectListItem> = data
            .projects
            .iter()
            .filter(|p| {
                data.memberships
                    .iter()
                    .any(|m| &m.user_id == user_id && m.project_id == p.id)
            })
            .map(|p| ProjectListItem {
                id: p.id.clone(),
                name: p.name.clone(),
                created_by: data.user_summary(&p.created_by_id),
                created_at: p.created_at,
            })
            .collect();
        projects.sort_by_key(|p| p.created_at);
        Ok(projects)
    }

    async fn get_project(&self, project_id: &ProjectId) -> RepositoryResult<Project> {
        let data = self.data.read();
        Self::check_health(&data)?;
        data.require_project(project_id).cloned()
    }

    async fn update_project_name(
        &self,
        project_id: &ProjectId,
        name: &str,
    ) -> RepositoryResult<Project> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let project = data
            .projects
            .iter_mut()
            .find(|p| &p.id == project_id)
            .ok_or_else(|| RepositoryError::entity_not_found("project", project_id))?;
        project.name = name.to_string();
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: &ProjectId) -> RepositoryResult<Project> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let project = take_first(&mut data.projects, |p| &p.id == project_id)
            .ok_or_else(|| RepositoryError::entity_not_found("project", project_id))?;

        let diary_ids: Vec<SiteDiaryId> = data
            .site_diaries
            .iter()
            .filter(|d| &d.project_id == project_id)
            .map(|d| d.id.clone())
            .collect();
        for diary_id in &diary_ids {
            data.remove_diary_cascade(diary_id);
        }
        data.remove_invoices_where(|i| &i.project_id == project_id);
        data.tasks.retain(|t| &t.project_id != project_id);
        data.budgets.retain(|b| &b.project_id != project_id);
        data.memberships.retain(|m| &m.project_id != project_id);
        data.budget_sequences.remove(project_id);
        Ok(project)
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> RepositoryResult<Option<Membership>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .memberships
            .iter()
            .find(|m| &m.user_id == user_id && &m.project_id == project_id)
            .cloned())
    }

    async fn add_member(
        &self,
        project_id: &ProjectId,
        user: &User,
        role: ProfessionalRole,
    ) -> RepositoryResult<Membership> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_project(project_id)?;
        if data
            .memberships
            .iter()
            .any(|m| m.user_id == user.id && &m.project_id == project_id)
        {
            return Err(RepositoryError::validation_with_context(
                "User is already a member of this project",
                ErrorContext::new("add_member")
                    .with_entity("project")
                    .with_entity_id(project_id),
            ));
        }
        data.users
            .entry(user.id.clone())
            .or_insert_with(|| user.clone());
        let membership = Membership {
            user_id: user.id.clone(),
            project_id: project_id.clone(),
            professional_role: role,
            created_at: Utc::now(),
        };
        data.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn remove_member(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> RepositoryResult<Membership> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        take_first(&mut data.memberships, |m| {
            &m.user_id == user_id && &m.project_id == project_id
        })
        .ok_or_else(|| RepositoryError::entity_not_found("membership", user_id))
    }

    async fn update_member_role(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProfessionalRole,
    ) -> RepositoryResult<Membership> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let membership = data
            .memberships
            .iter_mut()
            .find(|m| &m.user_id == user_id && &m.project_id == project_id)
            .ok_or_else(|| RepositoryError::entity_not_found("membership", user_id))?;
        membership.professional_role = role;
        Ok(membership.clone())
    }

    async fn list_members(&self, project_id: &ProjectId) -> RepositoryResult<Vec<ProjectMember>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut memberships: Vec<&Membership> = data
            .memberships
            .iter()
            .filter(|m| &m.project_id == project_id)
            .collect();
        memberships.sort_by_key(|m| m.created_at);
        Ok(memberships
            .into_iter()
            .map(|m| {
                let user = data.users.get(&m.user_id);
                ProjectMember {
                    id: m.user_id.clone(),
                    name: user.and_then(|u| u.name.clone()),
                    email: user.and_then(|u| u.email.clone()),
                    image: user.and_then(|u| u.image.clone()),
                    professional_role: m.professional_role,
                }
            })
            .collect())
    }
}

// ==================== Site diaries ====================

/// Find-and-update for the diary entry tables, which all key on `id`.
macro_rules! update_entry {
    ($data:expr, $table:ident, $id:expr, $entity:literal, |$row:ident| $body:block) => {{
        let $row = $data
            .$table
            .iter_mut()
            .find(|row| &row.id == $id)
            .ok_or_else(|| RepositoryError::entity_not_found($entity, $id))?;
        $body
        Ok($row.clone())
    }};
}

macro_rules! delete_entry {
    ($data:expr, $table:ident, $id:expr, $entity:literal) => {{
        take_first(&mut $data.$table, |row| &row.id == $id)
            .ok_or_else(|| RepositoryError::entity_not_found($entity, $id))
    }};
}

#[async_trait]
impl SiteDiaryRepository for LocalRepository {
    async fn create_site_diary(
        &self,
        project_id: &ProjectId,
        name: &str,
        date: DateTime<Utc>,
        created_by: &UserId,
    ) -> RepositoryResult<SiteDiary> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_project(project_id)?;
        let now = Utc::now();
        let diary = SiteDiary {
            id: SiteDiaryId::generate(),
            name: name.to_string(),
            date,
            project_id: project_id.clone(),
            created_by_id: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        data.site_diaries.push(diary.clone());
        Ok(diary)
    }

    async fn list_site_diaries(
        &self,
        project_id: &ProjectId,
    ) -> RepositoryResult<Vec<SiteDiaryListItem>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut diaries: Vec<SiteDiaryListItem> = data
            .site_diaries
            .iter()
            .filter(|d| &d.project_id == project_id)
            .map(|d| SiteDiaryListItem {
                id: d.id.clone(),
                name: d.name.clone(),
                date: d.date,
                created_by: data.user_summary(&d.created_by_id),
            })
            .collect();
        diaries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(diaries)
    }

    async fn get_site_diary(
        &self,
        site_diary_id: &SiteDiaryId,
    ) -> RepositoryResult<SiteDiaryDetail> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let diary = data.require_diary(site_diary_id)?;
        let of_diary = |id: &SiteDiaryId| id == site_diary_id;
        Ok(SiteDiaryDetail {
            id: diary.id.clone(),
            name: diary.name.clone(),
            date: diary.date,
            project_id: diary.project_id.clone(),
            created_by: data.user_summary(&diary.created_by_id),
            plants: data
                .plants
                .iter()
                .filter(|e| of_diary(&e.site_diary_id))
                .cloned()
                .collect(),
            laborers: data
                .laborers
                .iter()
                .filter(|e| of_diary(&e.site_diary_id))
                .cloned()
                .collect(),
            materials: data
                .materials
                .iter()
                .filter(|e| of_diary(&e.site_diary_id))
                .cloned()
                .collect(),
            site_problems: data
                .site_problems
                .iter()
                .filter(|e| of_diary(&e.site_diary_id))
                .cloned()
                .collect(),
            work_progresses: data
                .work_progresses
                .iter()
                .filter(|e| of_diary(&e.site_diary_id))
                .cloned()
                .collect(),
            weather: data
                .weather
                .iter()
                .find(|w| of_diary(&w.site_diary_id))
                .cloned(),
        })
    }

    async fn update_site_diary(
        &self,
        site_diary_id: &SiteDiaryId,
        name: &str,
        date: DateTime<Utc>,
    ) -> RepositoryResult<SiteDiary> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, site_diaries, site_diary_id, "site_diary", |diary| {
            diary.name = name.to_string();
            diary.date = date;
            diary.updated_at = Utc::now();
        })
    }

    async fn delete_site_diary(&self, site_diary_id: &SiteDiaryId) -> RepositoryResult<SiteDiary> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.remove_diary_cascade(site_diary_id)
            .ok_or_else(|| RepositoryError::entity_not_found("site_diary", site_diary_id))
    }

    async fn create_plant(
        &self,
        site_diary_id: &SiteDiaryId,
        plant_type: &str,
        amount: i32,
        created_by: &UserId,
    ) -> RepositoryResult<Plant> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_diary(site_diary_id)?;
        let plant = Plant {
            id: PlantId::generate(),
            plant_type: plant_type.to_string(),
            amount,
            site_diary_id: site_diary_id.clone(),
            created_by_id: created_by.clone(),
        };
        data.plants.push(plant.clone());
        Ok(plant)
    }

    async fn update_plant(
        &self,
        plant_id: &PlantId,
        plant_type: &str,
        amount: i32,
    ) -> RepositoryResult<Plant> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, plants, plant_id, "plant", |plant| {
            plant.plant_type = plant_type.to_string();
            plant.amount = amount;
        })
    }

    async fn delete_plant(&self, plant_id: &PlantId) -> RepositoryResult<Plant> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        delete_entry!(data, plants, plant_id, "plant")
    }

    async fn create_laborer(
        &self,
        site_diary_id: &SiteDiaryId,
        laborer_type: &str,
        amount: i32,
        created_by: &UserId,
    ) -> RepositoryResult<Laborer> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_diary(site_diary_id)?;
        let laborer = Laborer {
            id: LaborerId::generate(),
            laborer_type: laborer_type.to_string(),
            amount,
            site_diary_id: site_diary_id.clone(),
            created_by_id: created_by.clone(),
        };
        data.laborers.push(laborer.clone());
        Ok(laborer)
    }

    async fn update_laborer(
        &self,
        laborer_id: &LaborerId,
        laborer_type: &str,
        amount: i32,
    ) -> RepositoryResult<Laborer> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, laborers, laborer_id, "laborer", |laborer| {
            laborer.laborer_type = laborer_type.to_string();
            laborer.amount = amount;
        })
    }

    async fn delete_laborer(&self, laborer_id: &LaborerId) -> RepositoryResult<Laborer> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        delete_entry!(data, laborers, laborer_id, "laborer")
    }

    async fn create_material(
        &self,
        site_diary_id: &SiteDiaryId,
        material_type: &str,
        units: MaterialUnit,
        amount: f64,
        created_by: &UserId,
    ) -> RepositoryResult<Material> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_diary(site_diary_id)?;
        let material = Material {
            id: MaterialId::generate(),
            material_type: material_type.to_string(),
            units,
            amount,
            site_diary_id: site_diary_id.clone(),
            created_by_id: created_by.clone(),
        };
        data.materials.push(material.clone());
        Ok(material)
    }

    async fn update_material(
        &self,
        material_id: &MaterialId,
        material_type: &str,
        units: MaterialUnit,
        amount: f64,
    ) -> RepositoryResult<Material> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, materials, material_id, "material", |material| {
            material.material_type = material_type.to_string();
            material.units = units;
            material.amount = amount;
        })
    }

    async fn delete_material(&self, material_id: &MaterialId) -> RepositoryResult<Material> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        delete_entry!(data, materials, material_id, "material")
    }

    async fn create_site_problem(
        &self,
        site_diary_id: &SiteDiaryId,
        comments: &str,
        created_by: &UserId,
    ) -> RepositoryResult<SiteProblem> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_diary(site_diary_id)?;
        let problem = SiteProblem {
            id: SiteProblemId::generate(),
            comments: comments.to_string(),
            site_diary_id: site_diary_id.clone(),
            created_by_id: created_by.clone(),
        };
        data.site_problems.push(problem.clone());
        Ok(problem)
    }

    async fn update_site_problem(
        &self,
        site_problem_id: &SiteProblemId,
        comments: &str,
    ) -> RepositoryResult<SiteProblem> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, site_problems, site_problem_id, "site_problem", |problem| {
            problem.comments = comments.to_string();
        })
    }

    async fn delete_site_problem(
        &self,
        site_problem_id: &SiteProblemId,
    ) -> RepositoryResult<SiteProblem> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        delete_entry!(data, site_problems, site_problem_id, "site_problem")
    }

    async fn create_work_progress(
        &self,
        site_diary_id: &SiteDiaryId,
        comments: &str,
        created_by: &UserId,
    ) -> RepositoryResult<WorkProgress> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_diary(site_diary_id)?;
        let progress = WorkProgress {
            id: WorkProgressId::generate(),
            comments: comments.to_string(),
            site_diary_id: site_diary_id.clone(),
            created_by_id: created_by.clone(),
        };
        data.work_progresses.push(progress.clone());
        Ok(progress)
    }

    async fn update_work_progress(
        &self,
        work_progress_id: &WorkProgressId,
        comments: &str,
    ) -> RepositoryResult<WorkProgress> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, work_progresses, work_progress_id, "work_progress", |progress| {
            progress.comments = comments.to_string();
        })
    }

    async fn delete_work_progress(
        &self,
        work_progress_id: &WorkProgressId,
    ) -> RepositoryResult<WorkProgress> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        delete_entry!(data, work_progresses, work_progress_id, "work_progress")
    }

    async fn upsert_weather(
        &self,
        site_diary_id: &SiteDiaryId,
        report: WeatherReport,
    ) -> RepositoryResult<Weather> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_diary(site_diary_id)?;
        if let Some(existing) = data
            .weather
            .iter_mut()
            .find(|w| &w.site_diary_id == site_diary_id)
        {
            existing.morning = report.morning;
            existing.afternoon = report.afternoon;
            existing.evening = report.evening;
            return Ok(existing.clone());
        }
        let weather = Weather {
            id: WeatherId::generate(),
            site_diary_id: site_diary_id.clone(),
            morning: report.morning,
            afternoon: report.afternoon,
            evening: report.evening,
        };
        data.weather.push(weather.clone());
        Ok(weather)
    }
}

// ==================== Tasks ====================

#[async_trait]
impl TaskRepository for LocalRepository {
    async fn create_task(
        &self,
        project_id: &ProjectId,
        description: &str,
        status: TaskStatus,
        assigned_to: Option<&UserId>,
        created_by: &UserId,
    ) -> RepositoryResult<Task> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_project(project_id)?;
        let task = Task {
            id: TaskId::generate(),
            description: description.to_string(),
            status,
            project_id: project_id.clone(),
            created_by_id: created_by.clone(),
            assigned_to_id: assigned_to.cloned(),
            created_at: Utc::now(),
        };
        data.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, query: &GetTasksInput) -> RepositoryResult<TaskPage> {
        let data = self.data.read();
        Self::check_health(&data)?;

        // Rows are appended in creation order, so reversing gives newest first.
        let matching: Vec<&Task> = data
            .tasks
            .iter()
            .rev()
            .filter(|t| t.project_id == query.project_id)
            .filter(|t| query.statuses.is_empty() || query.statuses.contains(&t.status))
            .filter(|t| {
                query.searches.iter().all(|search| match search.category {
                    TaskSearchCategory::Description => contains_ci(&t.description, &search.value),
                    TaskSearchCategory::AssignedTo => t
                        .assigned_to_id
                        .as_ref()
                        .is_some_and(|id| contains_ci(&data.user_email(id), &search.value)),
                    TaskSearchCategory::AssignedBy => {
                        contains_ci(&data.user_email(&t.created_by_id), &search.value)
                    }
                })
            })
            .collect();

        let start = match &query.cursor {
            Some(cursor) => match matching.iter().position(|t| &t.id == cursor) {
                Some(idx) => idx + 1,
                None => matching.len(),
            },
            None => 0,
        };
        let limit = query.limit.max(1) as usize;
        let page: Vec<&Task> = matching.iter().skip(start).take(limit).copied().collect();
        let next_cursor = if page.len() == limit && start + limit < matching.len() {
            page.last().map(|t| t.id.clone())
        } else {
            None
        };
        Ok(TaskPage {
            tasks: page.into_iter().map(|t| data.task_item(t)).collect(),
            next_cursor,
        })
    }

    async fn get_task(&self, task_id: &TaskId) -> RepositoryResult<TaskListItem> {
        let data = self.data.read();
        Self::check_health(&data)?;
        data.tasks
            .iter()
            .find(|t| &t.id == task_id)
            .map(|t| data.task_item(t))
            .ok_or_else(|| RepositoryError::entity_not_found("task", task_id))
    }

    async fn update_task(
        &self,
        task_id: &TaskId,
        description: &str,
        status: TaskStatus,
        assigned_to: Option<&UserId>,
    ) -> RepositoryResult<Task> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        update_entry!(data, tasks, task_id, "task", |task| {
            task.description = description.to_string();
            task.status = status;
            task.assigned_to_id = assigned_to.cloned();
        })
    }

    async fn delete_task(&self, task_id: &TaskId) -> RepositoryResult<Task> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        delete_entry!(data, tasks, task_id, "task")
    }
}

// ==================== Budgets ====================

#[async_trait]
impl BudgetRepository for LocalRepository {
    async fn create_budget(
        &self,
        project_id: &ProjectId,
        description: &str,
        expected_budget: f64,
        costs_incurred: f64,
        created_by: &UserId,
    ) -> RepositoryResult<Budget> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_project(project_id)?;
        let sequence = data.budget_sequences.entry(project_id.clone()).or_insert(0);
        *sequence += 1;
        let cost_code = cost_code_for(*sequence);
        let budget = Budget {
            id: BudgetId::generate(),
            cost_code,
            description: description.to_string(),
            expected_budget,
            costs_incurred,
            project_id: project_id.clone(),
            created_by_id: created_by.clone(),
            created_at: Utc::now(),
        };
        data.budgets.push(budget.clone());
        Ok(budget)
    }

    async fn list_budgets(&self, query: &GetBudgetsInput) -> RepositoryResult<BudgetPage> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let search = query.search_key.as_str();
        let matching: Vec<&Budget> = data
            .budgets
            .iter()
            .rev()
            .filter(|b| b.project_id == query.project_id)
            .filter(|b| {
                search.is_empty()
                    || contains_ci(&b.description, search)
                    || contains_ci(&b.cost_code, search)
            })
            .collect();
        let page_size = query.effective_page_size();
        Ok(BudgetPage {
            count: matching.len(),
            budgets: matching
                .into_iter()
                .skip(query.page_index.saturating_mul(page_size))
                .take(page_size)
                .map(BudgetRow::from)
                .collect(),
        })
    }

    async fn get_budget(&self, budget_id: &BudgetId) -> RepositoryResult<Budget> {
        let data = self.data.read();
        Self::check_health(&data)?;
        data.budgets
            .iter()
            .find(|b| &b.id == budget_id)
            .cloned()
            .ok_or_else(|| RepositoryError::entity_not_found("budget", budget_id))
    }

    async fn update_budget(
        &self,
        budget_id: &BudgetId,
        description: &str,
        expected_budget: f64,
        costs_incurred: f64,
    ) -> RepositoryResult<Budget> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let budget = data.budget_mut(budget_id)?;
        budget.description = description.to_string();
        budget.expected_budget = expected_budget;
        budget.costs_incurred = costs_incurred;
        Ok(budget.clone())
    }

    async fn delete_budget(&self, budget_id: &BudgetId) -> RepositoryResult<Budget> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let budget = take_first(&mut data.budgets, |b| &b.id == budget_id)
            .ok_or_else(|| RepositoryError::entity_not_found("budget", budget_id))?;
        data.remove_invoices_where(|i| &i.budget_id == budget_id);
        Ok(budget)
    }

    async fn budget_totals(&self, project_id: &ProjectId) -> RepositoryResult<BudgetTotals> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .budgets
            .iter()
            .filter(|b| &b.project_id == project_id)
            .fold(BudgetTotals::default(), |acc, b| BudgetTotals {
                expected_budget_sum: acc.expected_budget_sum + b.expected_budget,
                costs_incurred_sum: acc.costs_incurred_sum + b.costs_incurred,
            }))
    }
}

// ==================== Supplier invoices ====================

#[async_trait]
impl SupplierInvoiceRepository for LocalRepository {
    async fn create_supplier_invoice(
        &self,
        fields: &SupplierInvoiceFields,
        items: &[SupplierInvoiceItemInput],
        created_by: &UserId,
    ) -> RepositoryResult<SupplierInvoice> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.require_project(&fields.project_id)?;
        // Checked before any write so a missing budget leaves nothing behind.
        data.project_budget_mut(&fields.budget_id, &fields.project_id)?
            .costs_incurred += fields.grand_total;

        let now = Utc::now();
        let invoice = SupplierInvoice {
            id: SupplierInvoiceId::generate(),
            invoice_no: fields.invoice_no.clone(),
            invoice_date: fields.invoice_date,
            supplier_name: fields.supplier_name.clone(),
            subtotal: fields.subtotal,
            taxes: fields.taxes,
            discount: fields.discount,
            grand_total: fields.grand_total,
            file_id: fields.file_id.clone(),
            paid: fields.paid,
            approved: fields.approved,
            project_id: fields.project_id.clone(),
            budget_id: fields.budget_id.clone(),
            created_by_id: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        for item in items {
            let row = LocalData::new_item(&invoice.id, item, created_by, now);
            data.invoice_items.push(row);
        }
        data.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn list_supplier_invoices(
        &self,
        filter: &GetSupplierInvoicesInput,
    ) -> RepositoryResult<Vec<SupplierInvoiceWithBudget>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .invoices
            .iter()
            .rev()
            .filter(|i| i.project_id == filter.project_id)
            .filter(|i| filter.budget_id.as_ref().map_or(true, |b| &i.budget_id == b))
            .filter(|i| filter.approved.map_or(true, |a| i.approved == a))
            .filter(|i| filter.start_date.map_or(true, |d| i.invoice_date >= d))
            .filter(|i| filter.end_date.map_or(true, |d| i.invoice_date <= d))
            .map(|i| SupplierInvoiceWithBudget {
                invoice: i.clone(),
                budget: data.budget_label(&i.budget_id),
            })
            .collect())
    }

    async fn get_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
    ) -> RepositoryResult<SupplierInvoiceDetail> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let invoice = data
            .invoices
            .iter()
            .find(|i| &i.id == invoice_id)
            .ok_or_else(|| RepositoryError::entity_not_found("supplier_invoice", invoice_id))?;
        let mut items = data.items_of(invoice_id);
        items.reverse();
        Ok(SupplierInvoiceDetail {
            invoice: invoice.clone(),
            supplier_invoice_items: items,
        })
    }

    async fn update_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
        fields: &SupplierInvoiceFields,
        items: &[SupplierInvoiceItemInput],
        updated_by: &UserId,
    ) -> RepositoryResult<SupplierInvoice> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let current = data
            .invoices
            .iter()
            .find(|i| &i.id == invoice_id)
            .cloned()
            .ok_or_else(|| RepositoryError::entity_not_found("supplier_invoice", invoice_id))?;

        if current.project_id != fields.project_id {
            return Err(invoice_outside_project(
                invoice_id.as_str(),
                fields.project_id.as_str(),
            ));
        }
        // Validate the target budget before moving any money.
        data.project_budget_mut(&fields.budget_id, &fields.project_id)?;
        if current.budget_id == fields.budget_id {
            data.budget_mut(&fields.budget_id)?.costs_incurred +=
                fields.grand_total - current.grand_total;
        } else {
            if let Ok(old) = data.budget_mut(&current.budget_id) {
                old.costs_incurred -= current.grand_total;
            }
            data.budget_mut(&fields.budget_id)?.costs_incurred += fields.grand_total;
        }

        let now = Utc::now();
        let kept: Vec<&SupplierInvoiceItemId> =
            items.iter().filter_map(|item| item.id.as_ref()).collect();
        data.invoice_items
            .retain(|row| &row.supplier_invoice_id != invoice_id || kept.contains(&&row.id));
        for item in items {
            let existing = match &item.id {
                Some(id) => data
                    .invoice_items
                    .iter_mut()
                    .find(|row| &row.id == id && &row.supplier_invoice_id == invoice_id),
                None => None,
            };
            match existing {
                Some(row) => {
                    row.description = item.description.clone();
                    row.quantity = item.quantity;
                    row.unit = item.unit.clone();
                    row.unit_price = item.unit_price;
                    row.total_price = item.total_price;
                }
                None => {
                    let row = LocalData::new_item(invoice_id, item, updated_by, now);
                    data.invoice_items.push(row);
                }
            }
        }

        let invoice = data
            .invoices
            .iter_mut()
            .find(|i| &i.id == invoice_id)
            .ok_or_else(|| RepositoryError::entity_not_found("supplier_invoice", invoice_id))?;
        invoice.invoice_no = fields.invoice_no.clone();
        invoice.invoice_date = fields.invoice_date;
        invoice.supplier_name = fields.supplier_name.clone();
        invoice.subtotal = fields.subtotal;
        invoice.taxes = fields.taxes;
        invoice.discount = fields.discount;
        invoice.grand_total = fields.grand_total;
        invoice.file_id = fields.file_id.clone();
        invoice.paid = fields.paid;
        invoice.approved = fields.approved;
        invoice.budget_id = fields.budget_id.clone();
        invoice.updated_at = now;
        Ok(invoice.clone())
    }

    async fn delete_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
    ) -> RepositoryResult<SupplierInvoice> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let invoice = take_first(&mut data.invoices, |i| &i.id == invoice_id)
            .ok_or_else(|| RepositoryError::entity_not_found("supplier_invoice", invoice_id))?;
        data.invoice_items
            .retain(|row| &row.supplier_invoice_id != invoice_id);
        if let Ok(budget) = data.budget_mut(&invoice.budget_id) {
            budget.costs_incurred -= invoice.grand_total;
        }
        Ok(invoice)
    }

    async fn list_supplier_invoices_for_export(
        &self,
        project_id: &ProjectId,
    ) -> RepositoryResult<Vec<SupplierInvoiceExport>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .invoices
            .iter()
            .filter(|i| &i.project_id == project_id)
            .map(|i| SupplierInvoiceExport {
                invoice: i.clone(),
                budget: data.budget_label(&i.budget_id),
                supplier_invoice_items: data.items_of(&i.id),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::task::TaskSearch;

    fn user(id: &str, email: &str) -> User {
        User {
            id: UserId::new(id),
            name: Some(id.to_uppercase()),
            email: Some(email.to_string()),
            image: None,
        }
    }

    async fn seeded() -> (LocalRepository, Project, User) {
        let repo = LocalRepository::new();
        let owner = repo.upsert_user(&user("u1", "owner@acme.com")).await.unwrap();
        let project = repo.create_project("Tower B", &owner.id).await.unwrap();
        (repo, project, owner)
    }

    fn fields(project: &Project, budget: &Budget, grand_total: f64) -> SupplierInvoiceFields {
        SupplierInvoiceFields {
            invoice_no: "INV-1".to_string(),
            invoice_date: Utc::now(),
            supplier_name: "Supplier".to_string(),
            subtotal: grand_total,
            taxes: 0.0,
            discount: 1.0,
            grand_total,
            file_id: None,
            project_id: project.id.clone(),
            budget_id: budget.id.clone(),
            paid: false,
            approved: false,
        }
    }

    fn item(id: Option<&SupplierInvoiceItemId>, description: &str) -> SupplierInvoiceItemInput {
        SupplierInvoiceItemInput {
            id: id.cloned(),
            description: description.to_string(),
            quantity: 1.0,
            unit: "NR".to_string(),
            unit_price: 10.0,
            total_price: 10.0,
        }
    }

    #[tokio::test]
    async fn test_creator_becomes_project_manager() {
        let (repo, project, owner) = seeded().await;
        let membership = repo
            .get_membership(&owner.id, &project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.professional_role, ProfessionalRole::ProjectManager);
        let listed = repo.list_projects_for_user(&owner.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_by.name.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn test_cost_codes_are_sequential_per_project() {
        let (repo, project, owner) = seeded().await;
        let a = repo
            .create_budget(&project.id, "Piling", 100.0, 1.0, &owner.id)
            .await
            .unwrap();
        let b = repo
            .create_budget(&project.id, "Formwork", 100.0, 1.0, &owner.id)
            .await
            .unwrap();
        assert_eq!(a.cost_code, "CC-0001");
        assert_eq!(b.cost_code, "CC-0002");
        repo.delete_budget(&b.id).await.unwrap();
        let c = repo
            .create_budget(&project.id, "Rebar", 100.0, 1.0, &owner.id)
            .await
            .unwrap();
        assert_eq!(c.cost_code, "CC-0003");
    }

    #[tokio::test]
    async fn test_invoice_lifecycle_moves_budget() {
        let (repo, project, owner) = seeded().await;
        let budget = repo
            .create_budget(&project.id, "Timber", 1000.0, 50.0, &owner.id)
            .await
            .unwrap();

        let invoice = repo
            .create_supplier_invoice(
                &fields(&project, &budget, 200.0),
                &[item(None, "Plywood"), item(None, "Nails")],
                &owner.id,
            )
            .await
            .unwrap();
        assert_eq!(repo.get_budget(&budget.id).await.unwrap().costs_incurred, 250.0);

        let detail = repo.get_supplier_invoice(&invoice.id).await.unwrap();
        assert_eq!(detail.supplier_invoice_items.len(), 2);
        let keep = detail
            .supplier_invoice_items
            .iter()
            .find(|i| i.description == "Plywood")
            .unwrap()
            .id
            .clone();

        repo.update_supplier_invoice(
            &invoice.id,
            &fields(&project, &budget, 260.0),
            &[item(Some(&keep), "Plywood 18mm"), item(None, "Screws")],
            &owner.id,
        )
        .await
        .unwrap();
        assert_eq!(repo.get_budget(&budget.id).await.unwrap().costs_incurred, 310.0);
        let detail = repo.get_supplier_invoice(&invoice.id).await.unwrap();
        let mut names: Vec<&str> = detail
            .supplier_invoice_items
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Plywood 18mm", "Screws"]);

        repo.delete_supplier_invoice(&invoice.id).await.unwrap();
        assert_eq!(repo.get_budget(&budget.id).await.unwrap().costs_incurred, 50.0);
    }

    #[tokio::test]
    async fn test_invoice_with_unknown_budget_writes_nothing() {
        let (repo, project, owner) = seeded().await;
        let ghost = Budget {
            id: BudgetId::new("missing"),
            cost_code: String::new(),
            description: String::new(),
            expected_budget: 1.0,
            costs_incurred: 1.0,
            project_id: project.id.clone(),
            created_by_id: owner.id.clone(),
            created_at: Utc::now(),
        };
        let err = repo
            .create_supplier_invoice(&fields(&project, &ghost, 10.0), &[item(None, "x")], &owner.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let listed = repo
            .list_supplier_invoices(&GetSupplierInvoicesInput {
                project_id: project.id.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_task_pages_follow_cursor() {
        let (repo, project, owner) = seeded().await;
        let mut ids = Vec::new();
        for n in 0..5 {
            let task = repo
                .create_task(
                    &project.id,
                    &format!("task {}", n),
                    TaskStatus::NotStarted,
                    None,
                    &owner.id,
                )
                .await
                .unwrap();
            ids.push(task.id);
        }
        let mut query = GetTasksInput {
            project_id: project.id.clone(),
            statuses: vec![],
            searches: vec![],
            limit: 2,
            cursor: None,
        };
        let first = repo.list_tasks(&query).await.unwrap();
        assert_eq!(first.tasks[0].id, ids[4]);
        assert_eq!(first.next_cursor, Some(ids[3].clone()));

        query.cursor = first.next_cursor;
        let second = repo.list_tasks(&query).await.unwrap();
        assert_eq!(second.tasks[0].id, ids[2]);

        query.cursor = second.next_cursor;
        let third = repo.list_tasks(&query).await.unwrap();
        assert_eq!(third.tasks.len(), 1);
        assert!(third.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_task_search_by_assignee_email() {
        let (repo, project, owner) = seeded().await;
        let worker = repo.upsert_user(&user("u2", "worker@site.io")).await.unwrap();
        repo.create_task(&project.id, "Dig", TaskStatus::InProgress, Some(&worker.id), &owner.id)
            .await
            .unwrap();
        repo.create_task(&project.id, "Fill", TaskStatus::InProgress, None, &owner.id)
            .await
            .unwrap();
        let page = repo
            .list_tasks(&GetTasksInput {
                project_id: project.id.clone(),
                statuses: vec![TaskStatus::InProgress],
                searches: vec![TaskSearch {
                    category: TaskSearchCategory::AssignedTo,
                    value: "SITE.io".to_string(),
                }],
                limit: 10,
                cursor: None,
            })
            .await
            .unwrap();
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].description, "Dig");
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let (repo, project, owner) = seeded().await;
        let diary = repo
            .create_site_diary(&project.id, "Day 1", Utc::now(), &owner.id)
            .await
            .unwrap();
        repo.create_plant(&diary.id, "Crane", 1, &owner.id).await.unwrap();
        repo.delete_project(&project.id).await.unwrap();
        assert!(repo.get_site_diary(&diary.id).await.unwrap_err().is_not_found());
        assert!(repo
            .get_membership(&owner.id, &project.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_weather_upsert_keeps_one_row() {
        let (repo, project, owner) = seeded().await;
        let diary = repo
            .create_site_diary(&project.id, "Day 1", Utc::now(), &owner.id)
            .await
            .unwrap();
        let first = repo
            .upsert_weather(
                &diary.id,
                WeatherReport {
                    morning: Some(WeatherCondition::Sunny),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = repo
            .upsert_weather(
                &diary.id,
                WeatherReport {
                    morning: Some(WeatherCondition::Sunny),
                    evening: Some(WeatherCondition::Rainy),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        let detail = repo.get_site_diary(&diary.id).await.unwrap();
        assert_eq!(
            detail.weather.unwrap().evening,
            Some(WeatherCondition::Rainy)
        );
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails_reads() {
        let (repo, project, _) = seeded().await;
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.get_project(&project.id).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
