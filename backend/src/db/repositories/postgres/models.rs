//! Row types mapped onto the Diesel schema.
//!
//! Every table is written with application-generated ids and timestamps, so
//! one struct serves for reads and inserts. Enum columns are stored as text
//! and parsed back through `FromStr`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use super::schema::{
    budgets, laborers, materials, plants, projects, site_diaries, site_problems,
    supplier_invoice_items, supplier_invoices, tasks, users, users_on_projects, weather,
    work_progresses,
};
use crate::api::*;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

fn parse_enum<T: FromStr<Err = String>>(column: &str, value: &str) -> RepositoryResult<T> {
    T::from_str(value).map_err(|e| {
        RepositoryError::internal_with_context(e, ErrorContext::new("decode_row").with_details(column))
    })
}

fn parse_optional<T: FromStr<Err = String>>(
    column: &str,
    value: Option<&str>,
) -> RepositoryResult<Option<T>> {
    value.map(|v| parse_enum(column, v)).transpose()
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            name: row.name,
            email: row.email,
            image: row.image,
        }
    }
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        UserRow {
            id: user.id.0.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub created_by_id: String,
    pub budget_sequence: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: ProjectId(row.id),
            name: row.name,
            created_by_id: UserId(row.created_by_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users_on_projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MembershipRow {
    pub user_id: String,
    pub project_id: String,
    pub professional_role: String,
    pub created_at: DateTime<Utc>,
}

impl MembershipRow {
    pub fn into_model(self) -> RepositoryResult<Membership> {
        Ok(Membership {
            professional_role: parse_enum("professional_role", &self.professional_role)?,
            user_id: UserId(self.user_id),
            project_id: ProjectId(self.project_id),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = site_diaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SiteDiaryRow {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub project_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SiteDiaryRow> for SiteDiary {
    fn from(row: SiteDiaryRow) -> Self {
        SiteDiary {
            id: SiteDiaryId(row.id),
            name: row.name,
            date: row.date,
            project_id: ProjectId(row.project_id),
            created_by_id: UserId(row.created_by_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = plants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlantRow {
    pub id: String,
    pub plant_type: String,
    pub amount: i32,
    pub site_diary_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<PlantRow> for Plant {
    fn from(row: PlantRow) -> Self {
        Plant {
            id: PlantId(row.id),
            plant_type: row.plant_type,
            amount: row.amount,
            site_diary_id: SiteDiaryId(row.site_diary_id),
            created_by_id: UserId(row.created_by_id),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = laborers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LaborerRow {
    pub id: String,
    pub laborer_type: String,
    pub amount: i32,
    pub site_diary_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<LaborerRow> for Laborer {
    fn from(row: LaborerRow) -> Self {
        Laborer {
            id: LaborerId(row.id),
            laborer_type: row.laborer_type,
            amount: row.amount,
            site_diary_id: SiteDiaryId(row.site_diary_id),
            created_by_id: UserId(row.created_by_id),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = materials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MaterialRow {
    pub id: String,
    pub material_type: String,
    pub units: String,
    pub amount: f64,
    pub site_diary_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl MaterialRow {
    pub fn into_model(self) -> RepositoryResult<Material> {
        Ok(Material {
            units: parse_enum("units", &self.units)?,
            id: MaterialId(self.id),
            material_type: self.material_type,
            amount: self.amount,
            site_diary_id: SiteDiaryId(self.site_diary_id),
            created_by_id: UserId(self.created_by_id),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = site_problems)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SiteProblemRow {
    pub id: String,
    pub comments: String,
    pub site_diary_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<SiteProblemRow> for SiteProblem {
    fn from(row: SiteProblemRow) -> Self {
        SiteProblem {
            id: SiteProblemId(row.id),
            comments: row.comments,
            site_diary_id: SiteDiaryId(row.site_diary_id),
            created_by_id: UserId(row.created_by_id),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = work_progresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkProgressRow {
    pub id: String,
    pub comments: String,
    pub site_diary_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<WorkProgressRow> for WorkProgress {
    fn from(row: WorkProgressRow) -> Self {
        WorkProgress {
            id: WorkProgressId(row.id),
            comments: row.comments,
            site_diary_id: SiteDiaryId(row.site_diary_id),
            created_by_id: UserId(row.created_by_id),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = weather)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WeatherRow {
    pub id: String,
    pub site_diary_id: String,
    pub morning: Option<String>,
    pub afternoon: Option<String>,
    pub evening: Option<String>,
}

impl WeatherRow {
    pub fn into_model(self) -> RepositoryResult<Weather> {
        Ok(Weather {
            morning: parse_optional("morning", self.morning.as_deref())?,
            afternoon: parse_optional("afternoon", self.afternoon.as_deref())?,
            evening: parse_optional("evening", self.evening.as_deref())?,
            id: WeatherId(self.id),
            site_diary_id: SiteDiaryId(self.site_diary_id),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: String,
    pub description: String,
    pub status: String,
    pub project_id: String,
    pub created_by_id: String,
    pub assigned_to_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskRow {
    pub fn into_model(self) -> RepositoryResult<Task> {
        Ok(Task {
            status: parse_enum("status", &self.status)?,
            id: TaskId(self.id),
            description: self.description,
            project_id: ProjectId(self.project_id),
            created_by_id: UserId(self.created_by_id),
            assigned_to_id: self.assigned_to_id.map(UserId),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = budgets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BudgetRowDb {
    pub id: String,
    pub cost_code: String,
    pub description: String,
    pub expected_budget: f64,
    pub costs_incurred: f64,
    pub project_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<BudgetRowDb> for Budget {
    fn from(row: BudgetRowDb) -> Self {
        Budget {
            id: BudgetId(row.id),
            cost_code: row.cost_code,
            description: row.description,
            expected_budget: row.expected_budget,
            costs_incurred: row.costs_incurred,
            project_id: ProjectId(row.project_id),
            created_by_id: UserId(row.created_by_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = supplier_invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupplierInvoiceRow {
    pub id: String,
    pub invoice_no: String,
    pub invoice_date: DateTime<Utc>,
    pub supplier_name: String,
    pub subtotal: f64,
    pub taxes: f64,
    pub discount: f64,
    pub grand_total: f64,
    pub file_id: Option<String>,
    pub paid: bool,
    pub approved: bool,
    pub project_id: String,
    pub budget_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupplierInvoiceRow> for SupplierInvoice {
    fn from(row: SupplierInvoiceRow) -> Self {
        SupplierInvoice {
            id: SupplierInvoiceId(row.id),
            invoice_no: row.invoice_no,
            invoice_date: row.invoice_date,
            supplier_name: row.supplier_name,
            subtotal: row.subtotal,
            taxes: row.taxes,
            discount: row.discount,
            grand_total: row.grand_total,
            file_id: row.file_id,
            paid: row.paid,
            approved: row.approved,
            project_id: ProjectId(row.project_id),
            budget_id: BudgetId(row.budget_id),
            created_by_id: UserId(row.created_by_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = supplier_invoice_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupplierInvoiceItemRow {
    pub id: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub total_price: f64,
    pub supplier_invoice_id: String,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<SupplierInvoiceItemRow> for SupplierInvoiceItem {
    fn from(row: SupplierInvoiceItemRow) -> Self {
        SupplierInvoiceItem {
            id: SupplierInvoiceItemId(row.id),
            description: row.description,
            quantity: row.quantity,
            unit: row.unit,
            unit_price: row.unit_price,
            total_price: row.total_price,
            supplier_invoice_id: SupplierInvoiceId(row.supplier_invoice_id),
            created_by_id: UserId(row.created_by_id),
            created_at: row.created_at,
        }
    }
}
