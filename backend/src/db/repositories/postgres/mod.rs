//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against the schema in
//! `migrations/`. Child rows (diary entries, invoice items, memberships) are
//! removed by `ON DELETE CASCADE`, so deletes here only touch the parent row.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{exists, sum};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task;

use crate::api::*;
use crate::db::repository::invoice::{budget_outside_project, invoice_outside_project};
use crate::db::repository::site_diary::WeatherReport;
use crate::db::repository::{
    BudgetRepository, ErrorContext, ProjectRepository, RepositoryError, RepositoryResult,
    SiteDiaryRepository, SupplierInvoiceRepository, TaskRepository,
};
use crate::models::cost_code_for;
use crate::routes::budget::GetBudgetsInput;
use crate::routes::supplier_invoice::{
    GetSupplierInvoicesInput, SupplierInvoiceFields, SupplierInvoiceItemInput,
};
use crate::routes::task::GetTasksInput;

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Automatic retry for transient failures
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    ///
    /// Returns current pool state and query statistics for monitoring.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    ///
    /// Performs a simple query to verify connectivity.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information.
    ///
    /// Returns a tuple of (is_healthy, latency_ms, error_message).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

// ==================== Query helpers ====================

/// `%fragment%` for ILIKE, with the LIKE wildcards in `fragment` escaped.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn missing(entity: &str, id: impl ToString) -> impl FnOnce() -> RepositoryError {
    let entity = entity.to_string();
    let id = id.to_string();
    move || RepositoryError::entity_not_found(&entity, id)
}

fn ensure_project(conn: &mut PgConnection, project_id: &str) -> RepositoryResult<()> {
    let found: bool = diesel::select(exists(projects::table.find(project_id))).get_result(conn)?;
    if found {
        Ok(())
    } else {
        Err(RepositoryError::entity_not_found("project", project_id))
    }
}

fn ensure_diary(conn: &mut PgConnection, site_diary_id: &str) -> RepositoryResult<()> {
    let found: bool =
        diesel::select(exists(site_diaries::table.find(site_diary_id))).get_result(conn)?;
    if found {
        Ok(())
    } else {
        Err(RepositoryError::entity_not_found("site_diary", site_diary_id))
    }
}

fn load_users(conn: &mut PgConnection, ids: Vec<String>) -> RepositoryResult<HashMap<String, UserRow>> {
    let rows: Vec<UserRow> = users::table
        .filter(users::id.eq_any(ids))
        .select(UserRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(|u| (u.id.clone(), u)).collect())
}

fn summary_of(users: &HashMap<String, UserRow>, id: &str) -> UserSummary {
    users
        .get(id)
        .map(|u| UserSummary {
            name: u.name.clone(),
            image: u.image.clone(),
        })
        .unwrap_or(UserSummary {
            name: None,
            image: None,
        })
}

fn person_of(users: &HashMap<String, UserRow>, id: &str) -> TaskPerson {
    let user = users.get(id);
    TaskPerson {
        id: UserId::new(id),
        name: user.and_then(|u| u.name.clone()),
        email: user.and_then(|u| u.email.clone()),
        image: user.and_then(|u| u.image.clone()),
    }
}

fn task_items(conn: &mut PgConnection, rows: Vec<TaskRow>) -> RepositoryResult<Vec<TaskListItem>> {
    let ids: Vec<String> = rows
        .iter()
        .flat_map(|t| std::iter::once(t.created_by_id.clone()).chain(t.assigned_to_id.clone()))
        .collect();
    let users = load_users(conn, ids)?;
    rows.into_iter()
        .map(|row| {
            let created_by = person_of(&users, &row.created_by_id);
            let assigned_to = row.assigned_to_id.as_deref().map(|id| person_of(&users, id));
            let task = row.into_model()?;
            Ok(TaskListItem {
                id: task.id,
                description: task.description,
                status: task.status,
                created_by,
                assigned_to,
            })
        })
        .collect()
}

fn budget_labels(
    conn: &mut PgConnection,
    ids: Vec<String>,
) -> RepositoryResult<HashMap<String, BudgetLabel>> {
    let rows: Vec<(String, String, String)> = budgets::table
        .filter(budgets::id.eq_any(ids))
        .select((budgets::id, budgets::description, budgets::cost_code))
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|(id, description, cost_code)| (id, BudgetLabel { description, cost_code }))
        .collect())
}

fn label_of(labels: &HashMap<String, BudgetLabel>, id: &str) -> BudgetLabel {
    labels.get(id).cloned().unwrap_or(BudgetLabel {
        description: String::new(),
        cost_code: String::new(),
    })
}

/// Move a budget's `costs_incurred` by `delta`. Returns false when the budget
/// does not exist.
/// Move a budget's costs by `delta`; false when no budget of `project_id`
/// has that id.
fn shift_costs(
    conn: &mut PgConnection,
    project_id: &str,
    budget_id: &str,
    delta: f64,
) -> RepositoryResult<bool> {
    let updated = diesel::update(
        budgets::table
            .filter(budgets::id.eq(budget_id))
            .filter(budgets::project_id.eq(project_id)),
    )
    .set(budgets::costs_incurred.eq(budgets::costs_incurred + delta))
    .execute(conn)?;
    Ok(updated > 0)
}

/// Error for a budget [`shift_costs`] could not find in the project.
fn unlinked_budget(
    conn: &mut PgConnection,
    project_id: &str,
    budget_id: &str,
) -> RepositoryResult<RepositoryError> {
    let found: bool =
        diesel::select(exists(budgets::table.find(budget_id))).get_result(conn)?;
    Ok(if found {
        budget_outside_project(budget_id, project_id)
    } else {
        RepositoryError::entity_not_found("budget", budget_id)
    })
}

fn item_row(
    invoice_id: &str,
    item: &SupplierInvoiceItemInput,
    created_by: &str,
    now: DateTime<Utc>,
) -> SupplierInvoiceItemRow {
    SupplierInvoiceItemRow {
        id: SupplierInvoiceItemId::generate().0,
        description: item.description.clone(),
        quantity: item.quantity,
        unit: item.unit.clone(),
        unit_price: item.unit_price,
        total_price: item.total_price,
        supplier_invoice_id: invoice_id.to_string(),
        created_by_id: created_by.to_string(),
        created_at: now,
    }
}

fn budget_filter<'a>(project_id: &'a str, search: &'a str) -> budgets::BoxedQuery<'a, Pg> {
    let mut query = budgets::table
        .filter(budgets::project_id.eq(project_id))
        .into_boxed();
    if !search.is_empty() {
        let pattern = like_pattern(search);
        query = query.filter(
            budgets::description
                .ilike(pattern.clone())
                .or(budgets::cost_code.ilike(pattern)),
        );
    }
    query
}

// ==================== Projects ====================

#[async_trait]
impl ProjectRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn upsert_user(&self, user: &User) -> RepositoryResult<User> {
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let existing: Option<UserRow> = users::table
                    .find(user.id.as_str())
                    .select(UserRow::as_select())
                    .first(tx)
                    .optional()?;
                let row = match existing {
                    Some(current) => diesel::update(users::table.find(user.id.as_str()))
                        .set((
                            users::name.eq(user.name.clone().or(current.name)),
                            users::email.eq(user.email.clone().or(current.email)),
                            users::image.eq(user.image.clone().or(current.image)),
                        ))
                        .returning(UserRow::as_returning())
                        .get_result(tx)?,
                    None => diesel::insert_into(users::table)
                        .values(UserRow::from(&user))
                        .returning(UserRow::as_returning())
                        .get_result(tx)?,
                };
                Ok(row.into())
            })
        })
        .await
    }

    async fn get_user(&self, user_id: &UserId) -> RepositoryResult<User> {
        let user_id = user_id.clone();
        self.with_conn(move |conn| {
            users::table
                .find(user_id.as_str())
                .select(UserRow::as_select())
                .first(conn)
                .optional()?
                .map(User::from)
                .ok_or_else(missing("user", &user_id))
        })
        .await
    }

    async fn search_users_by_email(&self, fragment: &str) -> RepositoryResult<Vec<User>> {
        if fragment.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = like_pattern(fragment);
        self.with_conn(move |conn| {
            let rows: Vec<UserRow> = users::table
                .filter(users::email.ilike(pattern.clone()))
                .order(users::email.asc())
                .select(UserRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(User::from).collect())
        })
        .await
    }

    async fn create_project(&self, name: &str, created_by: &UserId) -> RepositoryResult<Project> {
        let name = name.to_string();
        let created_by = created_by.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let now = Utc::now();
                let project: ProjectRow = diesel::insert_into(projects::table)
                    .values(ProjectRow {
                        id: ProjectId::generate().0,
                        name: name.clone(),
                        created_by_id: created_by.0.clone(),
                        budget_sequence: 0,
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(ProjectRow::as_returning())
                    .get_result(tx)?;
                diesel::insert_into(users_on_projects::table)
                    .values(MembershipRow {
                        user_id: created_by.0.clone(),
                        project_id: project.id.clone(),
                        professional_role: ProfessionalRole::ProjectManager.as_str().to_string(),
                        created_at: now,
                    })
                    .execute(tx)?;
                Ok(project.into())
            })
        })
        .await
    }

    async fn list_projects_for_user(
        &self,
        user_id: &UserId,
    ) -> RepositoryResult<Vec<ProjectListItem>> {
        let user_id = user_id.clone();
        self.with_conn(move |conn| {
            let rows: Vec<ProjectRow> = users_on_projects::table
                .inner_join(projects::table)
                .filter(users_on_projects::user_id.eq(user_id.as_str()))
                .order(projects::created_at.asc())
                .select(ProjectRow::as_select())
                .load(conn)?;
            let creators = load_users(conn, rows.iter().map(|p| p.created_by_id.clone()).collect())?;
            Ok(rows
                .into_iter()
                .map(|p| ProjectListItem {
                    created_by: summary_of(&creators, &p.created_by_id),
                    id: ProjectId(p.id),
                    name: p.name,
                    created_at: p.created_at,
                })
                .collect())
        })
        .await
    }

    async fn get_project(&self, project_id: &ProjectId) -> RepositoryResult<Project> {
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            projects::table
                .find(project_id.as_str())
                .select(ProjectRow::as_select())
                .first(conn)
                .optional()?
                .map(Project::from)
                .ok_or_else(missing("project", &project_id))
        })
        .await
    }

    async fn update_project_name(
        &self,
        project_id: &ProjectId,
        name: &str,
    ) -> RepositoryResult<Project> {
        let project_id = project_id.clone();
        let name = name.to_string();
        self.with_conn(move |conn| {
            diesel::update(projects::table.find(project_id.as_str()))
                .set((projects::name.eq(&name), projects::updated_at.eq(Utc::now())))
                .returning(ProjectRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(Project::from)
                .ok_or_else(missing("project", &project_id))
        })
        .await
    }

    async fn delete_project(&self, project_id: &ProjectId) -> RepositoryResult<Project> {
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(projects::table.find(project_id.as_str()))
                .returning(ProjectRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(Project::from)
                .ok_or_else(missing("project", &project_id))
        })
        .await
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> RepositoryResult<Option<Membership>> {
        let user_id = user_id.clone();
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            users_on_projects::table
                .find((user_id.as_str(), project_id.as_str()))
                .select(MembershipRow::as_select())
                .first(conn)
                .optional()?
                .map(MembershipRow::into_model)
                .transpose()
        })
        .await
    }

    async fn add_member(
        &self,
        project_id: &ProjectId,
        user: &User,
        role: ProfessionalRole,
    ) -> RepositoryResult<Membership> {
        let project_id = project_id.clone();
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                ensure_project(tx, project_id.as_str())?;
                let already: bool = diesel::select(exists(
                    users_on_projects::table.find((user.id.as_str(), project_id.as_str())),
                ))
                .get_result(tx)?;
                if already {
                    return Err(RepositoryError::validation_with_context(
                        "User is already a member of this project",
                        ErrorContext::new("add_member")
                            .with_entity("project")
                            .with_entity_id(&project_id),
                    ));
                }
                diesel::insert_into(users::table)
                    .values(UserRow::from(&user))
                    .on_conflict(users::id)
                    .do_nothing()
                    .execute(tx)?;
                let row: MembershipRow = diesel::insert_into(users_on_projects::table)
                    .values(MembershipRow {
                        user_id: user.id.0.clone(),
                        project_id: project_id.0.clone(),
                        professional_role: role.as_str().to_string(),
                        created_at: Utc::now(),
                    })
                    .returning(MembershipRow::as_returning())
                    .get_result(tx)?;
                row.into_model()
            })
        })
        .await
    }

    async fn remove_member(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> RepositoryResult<Membership> {
        let project_id = project_id.clone();
        let user_id = user_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(users_on_projects::table.find((user_id.as_str(), project_id.as_str())))
                .returning(MembershipRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(missing("membership", &user_id))?
                .into_model()
        })
        .await
    }

    async fn update_member_role(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProfessionalRole,
    ) -> RepositoryResult<Membership> {
        let project_id = project_id.clone();
        let user_id = user_id.clone();
        self.with_conn(move |conn| {
            diesel::update(users_on_projects::table.find((user_id.as_str(), project_id.as_str())))
                .set(users_on_projects::professional_role.eq(role.as_str()))
                .returning(MembershipRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(missing("membership", &user_id))?
                .into_model()
        })
        .await
    }

    async fn list_members(&self, project_id: &ProjectId) -> RepositoryResult<Vec<ProjectMember>> {
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            let rows: Vec<(MembershipRow, UserRow)> = users_on_projects::table
                .inner_join(users::table)
                .filter(users_on_projects::project_id.eq(project_id.as_str()))
                .order(users_on_projects::created_at.asc())
                .select((MembershipRow::as_select(), UserRow::as_select()))
                .load(conn)?;
            rows.into_iter()
                .map(|(membership, user)| {
                    let membership = membership.into_model()?;
                    Ok(ProjectMember {
                        id: membership.user_id,
                        name: user.name,
                        email: user.email,
                        image: user.image,
                        professional_role: membership.professional_role,
                    })
                })
                .collect()
        })
        .await
    }
}

// ==================== Site diaries ====================

#[async_trait]
impl SiteDiaryRepository for PostgresRepository {
    async fn create_site_diary(
        &self,
        project_id: &ProjectId,
        name: &str,
        date: DateTime<Utc>,
        created_by: &UserId,
    ) -> RepositoryResult<SiteDiary> {
        let now = Utc::now();
        let row = SiteDiaryRow {
            id: SiteDiaryId::generate().0,
            name: name.to_string(),
            date,
            project_id: project_id.0.clone(),
            created_by_id: created_by.0.clone(),
            created_at: now,
            updated_at: now,
        };
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                ensure_project(tx, &row.project_id)?;
                let inserted: SiteDiaryRow = diesel::insert_into(site_diaries::table)
                    .values(&row)
                    .returning(SiteDiaryRow::as_returning())
                    .get_result(tx)?;
                Ok(inserted.into())
            })
        })
        .await
    }

    async fn list_site_diaries(
        &self,
        project_id: &ProjectId,
    ) -> RepositoryResult<Vec<SiteDiaryListItem>> {
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            let rows: Vec<SiteDiaryRow> = site_diaries::table
                .filter(site_diaries::project_id.eq(project_id.as_str()))
                .order(site_diaries::date.desc())
                .select(SiteDiaryRow::as_select())
                .load(conn)?;
            let creators = load_users(conn, rows.iter().map(|d| d.created_by_id.clone()).collect())?;
            Ok(rows
                .into_iter()
                .map(|d| SiteDiaryListItem {
                    created_by: summary_of(&creators, &d.created_by_id),
                    id: SiteDiaryId(d.id),
                    name: d.name,
                    date: d.date,
                })
                .collect())
        })
        .await
    }

    async fn get_site_diary(
        &self,
        site_diary_id: &SiteDiaryId,
    ) -> RepositoryResult<SiteDiaryDetail> {
        let site_diary_id = site_diary_id.clone();
        self.with_conn(move |conn| {
            let id = site_diary_id.as_str();
            let diary: SiteDiaryRow = site_diaries::table
                .find(id)
                .select(SiteDiaryRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(missing("site_diary", id))?;
            let creators = load_users(conn, vec![diary.created_by_id.clone()])?;

            let plants: Vec<PlantRow> = plants::table
                .filter(plants::site_diary_id.eq(id))
                .order(plants::created_at.asc())
                .select(PlantRow::as_select())
                .load(conn)?;
            let laborers: Vec<LaborerRow> = laborers::table
                .filter(laborers::site_diary_id.eq(id))
                .order(laborers::created_at.asc())
                .select(LaborerRow::as_select())
                .load(conn)?;
            let materials: Vec<MaterialRow> = materials::table
                .filter(materials::site_diary_id.eq(id))
                .order(materials::created_at.asc())
                .select(MaterialRow::as_select())
                .load(conn)?;
            let problems: Vec<SiteProblemRow> = site_problems::table
                .filter(site_problems::site_diary_id.eq(id))
                .order(site_problems::created_at.asc())
                .select(SiteProblemRow::as_select())
                .load(conn)?;
            let progresses: Vec<WorkProgressRow> = work_progresses::table
                .filter(work_progresses::site_diary_id.eq(id))
                .order(work_progresses::created_at.asc())
                .select(WorkProgressRow::as_select())
                .load(conn)?;
            let weather_row: Option<WeatherRow> = weather::table
                .filter(weather::site_diary_id.eq(id))
                .select(WeatherRow::as_select())
                .first(conn)
                .optional()?;

            Ok(SiteDiaryDetail {
                created_by: summary_of(&creators, &diary.created_by_id),
                id: SiteDiaryId(diary.id),
                name: diary.name,
                date: diary.date,
                project_id: ProjectId(diary.project_id),
                plants: plants.into_iter().map(Plant::from).collect(),
                laborers: laborers.into_iter().map(Laborer::from).collect(),
                materials: materials
                    .into_iter()
                    .map(MaterialRow::into_model)
                    .collect::<RepositoryResult<_>>()?,
                site_problems: problems.into_iter().map(SiteProblem::from).collect(),
                work_progresses: progresses.into_iter().map(WorkProgress::from).collect(),
                weather: weather_row.map(WeatherRow::into_model).transpose()?,
            })
        })
        .await
    }

    async fn update_site_diary(
        &self,
        site_diary_id: &SiteDiaryId,
        name: &str,
        date: DateTime<Utc>,
    ) -> RepositoryResult<SiteDiary> {
        let site_diary_id = site_diary_id.clone();
        let name = name.to_string();
        self.with_conn(move |conn| {
            diesel::update(site_diaries::table.find(site_diary_id.as_str()))
                .set((
                    site_diaries::name.eq(&name),
                    site_diaries::date.eq(date),
                    site_diaries::updated_at.eq(Utc::now()),
                ))
                .returning(SiteDiaryRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(SiteDiary::from)
                .ok_or_else(missing("site_diary", &site_diary_id))
        })
        .await
    }

    async fn delete_site_diary(&self, site_diary_id: &SiteDiaryId) -> RepositoryResult<SiteDiary> {
        let site_diary_id = site_diary_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(site_diaries::table.find(site_diary_id.as_str()))
                .returning(SiteDiaryRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(SiteDiary::from)
                .ok_or_else(missing("site_diary", &site_diary_id))
        })
        .await
    }

    async fn create_plant(
        &self,
        site_diary_id: &SiteDiaryId,
        plant_type: &str,
        amount: i32,
        created_by: &UserId,
    ) -> RepositoryResult<Plant> {
        let row = PlantRow {
            id: PlantId::generate().0,
            plant_type: plant_type.to_string(),
            amount,
            site_diary_id: site_diary_id.0.clone(),
            created_by_id: created_by.0.clone(),
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            ensure_diary(conn, &row.site_diary_id)?;
            let inserted: PlantRow = diesel::insert_into(plants::table)
                .values(&row)
                .returning(PlantRow::as_returning())
                .get_result(conn)?;
            Ok(inserted.into())
        })
        .await
    }

    async fn update_plant(
        &self,
        plant_id: &PlantId,
        plant_type: &str,
        amount: i32,
    ) -> RepositoryResult<Plant> {
        let plant_id = plant_id.clone();
        let plant_type = plant_type.to_string();
        self.with_conn(move |conn| {
            diesel::update(plants::table.find(plant_id.as_str()))
                .set((plants::plant_type.eq(&plant_type), plants::amount.eq(amount)))
                .returning(PlantRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(Plant::from)
                .ok_or_else(missing("plant", &plant_id))
        })
        .await
    }

    async fn delete_plant(&self, plant_id: &PlantId) -> RepositoryResult<Plant> {
        let plant_id = plant_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(plants::table.find(plant_id.as_str()))
                .returning(PlantRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(Plant::from)
                .ok_or_else(missing("plant", &plant_id))
        })
        .await
    }

    async fn create_laborer(
        &self,
        site_diary_id: &SiteDiaryId,
        laborer_type: &str,
        amount: i32,
        created_by: &UserId,
    ) -> RepositoryResult<Laborer> {
        let row = LaborerRow {
            id: LaborerId::generate().0,
            laborer_type: laborer_type.to_string(),
            amount,
            site_diary_id: site_diary_id.0.clone(),
            created_by_id: created_by.0.clone(),
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            ensure_diary(conn, &row.site_diary_id)?;
            let inserted: LaborerRow = diesel::insert_into(laborers::table)
                .values(&row)
                .returning(LaborerRow::as_returning())
                .get_result(conn)?;
            Ok(inserted.into())
        })
        .await
    }

    async fn update_laborer(
        &self,
        laborer_id: &LaborerId,
        laborer_type: &str,
        amount: i32,
    ) -> RepositoryResult<Laborer> {
        let laborer_id = laborer_id.clone();
        let laborer_type = laborer_type.to_string();
        self.with_conn(move |conn| {
            diesel::update(laborers::table.find(laborer_id.as_str()))
                .set((
                    laborers::laborer_type.eq(&laborer_type),
                    laborers::amount.eq(amount),
                ))
                .returning(LaborerRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(Laborer::from)
                .ok_or_else(missing("laborer", &laborer_id))
        })
        .await
    }

    async fn delete_laborer(&self, laborer_id: &LaborerId) -> RepositoryResult<Laborer> {
        let laborer_id = laborer_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(laborers::table.find(laborer_id.as_str()))
                .returning(LaborerRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(Laborer::from)
                .ok_or_else(missing("laborer", &laborer_id))
        })
        .await
    }

    async fn create_material(
        &self,
        site_diary_id: &SiteDiaryId,
        material_type: &str,
        units: MaterialUnit,
        amount: f64,
        created_by: &UserId,
    ) -> RepositoryResult<Material> {
        let row = MaterialRow {
            id: MaterialId::generate().0,
            material_type: material_type.to_string(),
            units: units.as_str().to_string(),
            amount,
            site_diary_id: site_diary_id.0.clone(),
            created_by_id: created_by.0.clone(),
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            ensure_diary(conn, &row.site_diary_id)?;
            let inserted: MaterialRow = diesel::insert_into(materials::table)
                .values(&row)
                .returning(MaterialRow::as_returning())
                .get_result(conn)?;
            inserted.into_model()
        })
        .await
    }

    async fn update_material(
        &self,
        material_id: &MaterialId,
        material_type: &str,
        units: MaterialUnit,
        amount: f64,
    ) -> RepositoryResult<Material> {
        let material_id = material_id.clone();
        let material_type = material_type.to_string();
        self.with_conn(move |conn| {
            diesel::update(materials::table.find(material_id.as_str()))
                .set((
                    materials::material_type.eq(&material_type),
                    materials::units.eq(units.as_str()),
                    materials::amount.eq(amount),
                ))
                .returning(MaterialRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(missing("material", &material_id))?
                .into_model()
        })
        .await
    }

    async fn delete_material(&self, material_id: &MaterialId) -> RepositoryResult<Material> {
        let material_id = material_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(materials::table.find(material_id.as_str()))
                .returning(MaterialRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(missing("material", &material_id))?
                .into_model()
        })
        .await
    }

    async fn create_site_problem(
        &self,
        site_diary_id: &SiteDiaryId,
        comments: &str,
        created_by: &UserId,
    ) -> RepositoryResult<SiteProblem> {
        let row = SiteProblemRow {
            id: SiteProblemId::generate().0,
            comments: comments.to_string(),
            site_diary_id: site_diary_id.0.clone(),
            created_by_id: created_by.0.clone(),
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            ensure_diary(conn, &row.site_diary_id)?;
            let inserted: SiteProblemRow = diesel::insert_into(site_problems::table)
                .values(&row)
                .returning(SiteProblemRow::as_returning())
                .get_result(conn)?;
            Ok(inserted.into())
        })
        .await
    }

    async fn update_site_problem(
        &self,
        site_problem_id: &SiteProblemId,
        comments: &str,
    ) -> RepositoryResult<SiteProblem> {
        let site_problem_id = site_problem_id.clone();
        let comments = comments.to_string();
        self.with_conn(move |conn| {
            diesel::update(site_problems::table.find(site_problem_id.as_str()))
                .set(site_problems::comments.eq(&comments))
                .returning(SiteProblemRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(SiteProblem::from)
                .ok_or_else(missing("site_problem", &site_problem_id))
        })
        .await
    }

    async fn delete_site_problem(
        &self,
        site_problem_id: &SiteProblemId,
    ) -> RepositoryResult<SiteProblem> {
        let site_problem_id = site_problem_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(site_problems::table.find(site_problem_id.as_str()))
                .returning(SiteProblemRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(SiteProblem::from)
                .ok_or_else(missing("site_problem", &site_problem_id))
        })
        .await
    }

    async fn create_work_progress(
        &self,
        site_diary_id: &SiteDiaryId,
        comments: &str,
        created_by: &UserId,
    ) -> RepositoryResult<WorkProgress> {
        let row = WorkProgressRow {
            id: WorkProgressId::generate().0,
            comments: comments.to_string(),
            site_diary_id: site_diary_id.0.clone(),
            created_by_id: created_by.0.clone(),
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            ensure_diary(conn, &row.site_diary_id)?;
            let inserted: WorkProgressRow = diesel::insert_into(work_progresses::table)
                .values(&row)
                .returning(WorkProgressRow::as_returning())
                .get_result(conn)?;
            Ok(inserted.into())
        })
        .await
    }

    async fn update_work_progress(
        &self,
        work_progress_id: &WorkProgressId,
        comments: &str,
    ) -> RepositoryResult<WorkProgress> {
        let work_progress_id = work_progress_id.clone();
        let comments = comments.to_string();
        self.with_conn(move |conn| {
            diesel::update(work_progresses::table.find(work_progress_id.as_str()))
                .set(work_progresses::comments.eq(&comments))
                .returning(WorkProgressRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(WorkProgress::from)
                .ok_or_else(missing("work_progress", &work_progress_id))
        })
        .await
    }

    async fn delete_work_progress(
        &self,
        work_progress_id: &WorkProgressId,
    ) -> RepositoryResult<WorkProgress> {
        let work_progress_id = work_progress_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(work_progresses::table.find(work_progress_id.as_str()))
                .returning(WorkProgressRow::as_returning())
                .get_result(conn)
                .optional()?
                .map(WorkProgress::from)
                .ok_or_else(missing("work_progress", &work_progress_id))
        })
        .await
    }

    async fn upsert_weather(
        &self,
        site_diary_id: &SiteDiaryId,
        report: WeatherReport,
    ) -> RepositoryResult<Weather> {
        let row = WeatherRow {
            id: WeatherId::generate().0,
            site_diary_id: site_diary_id.0.clone(),
            morning: report.morning.map(|w| w.as_str().to_string()),
            afternoon: report.afternoon.map(|w| w.as_str().to_string()),
            evening: report.evening.map(|w| w.as_str().to_string()),
        };
        self.with_conn(move |conn| {
            ensure_diary(conn, &row.site_diary_id)?;
            let stored: WeatherRow = diesel::insert_into(weather::table)
                .values(&row)
                .on_conflict(weather::site_diary_id)
                .do_update()
                .set((
                    weather::morning.eq(excluded(weather::morning)),
                    weather::afternoon.eq(excluded(weather::afternoon)),
                    weather::evening.eq(excluded(weather::evening)),
                ))
                .returning(WeatherRow::as_returning())
                .get_result(conn)?;
            stored.into_model()
        })
        .await
    }
}

// ==================== Tasks ====================

#[async_trait]
impl TaskRepository for PostgresRepository {
    async fn create_task(
        &self,
        project_id: &ProjectId,
        description: &str,
        status: TaskStatus,
        assigned_to: Option<&UserId>,
        created_by: &UserId,
    ) -> RepositoryResult<Task> {
        let row = TaskRow {
            id: TaskId::generate().0,
            description: description.to_string(),
            status: status.as_str().to_string(),
            project_id: project_id.0.clone(),
            created_by_id: created_by.0.clone(),
            assigned_to_id: assigned_to.map(|id| id.0.clone()),
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            ensure_project(conn, &row.project_id)?;
            let inserted: TaskRow = diesel::insert_into(tasks::table)
                .values(&row)
                .returning(TaskRow::as_returning())
                .get_result(conn)?;
            inserted.into_model()
        })
        .await
    }

    async fn list_tasks(&self, query: &GetTasksInput) -> RepositoryResult<TaskPage> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let mut rows = tasks::table
                .filter(tasks::project_id.eq(query.project_id.as_str()))
                .select(TaskRow::as_select())
                .into_boxed();

            if !query.statuses.is_empty() {
                let statuses: Vec<&str> = query.statuses.iter().map(|s| s.as_str()).collect();
                rows = rows.filter(tasks::status.eq_any(statuses));
            }
            for search in &query.searches {
                let pattern = like_pattern(&search.value);
                rows = match search.category {
                    TaskSearchCategory::Description => {
                        rows.filter(tasks::description.ilike(pattern))
                    }
                    TaskSearchCategory::AssignedTo => rows.filter(
                        tasks::assigned_to_id.eq_any(
                            users::table
                                .filter(users::email.ilike(pattern))
                                .select(users::id.nullable()),
                        ),
                    ),
                    TaskSearchCategory::AssignedBy => rows.filter(
                        tasks::created_by_id.eq_any(
                            users::table
                                .filter(users::email.ilike(pattern))
                                .select(users::id),
                        ),
                    ),
                };
            }

            // Keyset on (created_at, id) so equal timestamps still page stably.
            if let Some(cursor) = &query.cursor {
                let anchor: Option<(DateTime<Utc>, String)> = tasks::table
                    .find(cursor.as_str())
                    .select((tasks::created_at, tasks::id))
                    .first(conn)
                    .optional()?;
                let Some((anchor_at, anchor_id)) = anchor else {
                    return Ok(TaskPage {
                        tasks: Vec::new(),
                        next_cursor: None,
                    });
                };
                rows = rows.filter(
                    tasks::created_at
                        .lt(anchor_at)
                        .or(tasks::created_at.eq(anchor_at).and(tasks::id.lt(anchor_id))),
                );
            }

            let limit = query.limit.max(1);
            let mut page: Vec<TaskRow> = rows
                .order((tasks::created_at.desc(), tasks::id.desc()))
                .limit(limit + 1)
                .load(conn)?;
            let has_more = page.len() as i64 > limit;
            page.truncate(limit as usize);
            let next_cursor = if has_more {
                page.last().map(|t| TaskId::new(t.id.clone()))
            } else {
                None
            };
            Ok(TaskPage {
                tasks: task_items(conn, page)?,
                next_cursor,
            })
        })
        .await
    }

    async fn get_task(&self, task_id: &TaskId) -> RepositoryResult<TaskListItem> {
        let task_id = task_id.clone();
        self.with_conn(move |conn| {
            let row: TaskRow = tasks::table
                .find(task_id.as_str())
                .select(TaskRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(missing("task", &task_id))?;
            task_items(conn, vec![row])?
                .pop()
                .ok_or_else(missing("task", &task_id))
        })
        .await
    }

    async fn update_task(
        &self,
        task_id: &TaskId,
        description: &str,
        status: TaskStatus,
        assigned_to: Option<&UserId>,
    ) -> RepositoryResult<Task> {
        let task_id = task_id.clone();
        let description = description.to_string();
        let assigned_to = assigned_to.map(|id| id.0.clone());
        self.with_conn(move |conn| {
            diesel::update(tasks::table.find(task_id.as_str()))
                .set((
                    tasks::description.eq(&description),
                    tasks::status.eq(status.as_str()),
                    tasks::assigned_to_id.eq(&assigned_to),
                ))
                .returning(TaskRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(missing("task", &task_id))?
                .into_model()
        })
        .await
    }

    async fn delete_task(&self, task_id: &TaskId) -> RepositoryResult<Task> {
        let task_id = task_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(tasks::table.find(task_id.as_str()))
                .returning(TaskRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(missing("task", &task_id))?
                .into_model()
        })
        .await
    }
}

// ==================== Budgets ====================

#[async_trait]
impl BudgetRepository for PostgresRepository {
    async fn create_budget(
        &self,
        project_id: &ProjectId,
        description: &str,
        expected_budget: f64,
        costs_incurred: f64,
        created_by: &UserId,
    ) -> RepositoryResult<Budget> {
        let project_id = project_id.clone();
        let description = description.to_string();
        let created_by = created_by.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                // The row lock taken here serializes concurrent creates per project.
                let sequence: i32 = diesel::update(projects::table.find(project_id.as_str()))
                    .set(projects::budget_sequence.eq(projects::budget_sequence + 1))
                    .returning(projects::budget_sequence)
                    .get_result(tx)
                    .optional()?
                    .ok_or_else(missing("project", &project_id))?;
                let row: BudgetRowDb = diesel::insert_into(budgets::table)
                    .values(BudgetRowDb {
                        id: BudgetId::generate().0,
                        cost_code: cost_code_for(sequence.max(0) as usize),
                        description: description.clone(),
                        expected_budget,
                        costs_incurred,
                        project_id: project_id.0.clone(),
                        created_by_id: created_by.0.clone(),
                        created_at: Utc::now(),
                    })
                    .returning(BudgetRowDb::as_returning())
                    .get_result(tx)?;
                Ok(row.into())
            })
        })
        .await
    }

    async fn list_budgets(&self, query: &GetBudgetsInput) -> RepositoryResult<BudgetPage> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let project_id = query.project_id.as_str();
            let count: i64 = budget_filter(project_id, &query.search_key)
                .count()
                .get_result(conn)?;
            let page_size = query.effective_page_size();
            let rows: Vec<BudgetRowDb> = budget_filter(project_id, &query.search_key)
                .order((budgets::created_at.desc(), budgets::id.desc()))
                .offset(query.page_index.saturating_mul(page_size) as i64)
                .limit(page_size as i64)
                .select(BudgetRowDb::as_select())
                .load(conn)?;
            Ok(BudgetPage {
                count: count.max(0) as usize,
                budgets: rows
                    .into_iter()
                    .map(|row| BudgetRow::from(&Budget::from(row)))
                    .collect(),
            })
        })
        .await
    }

    async fn get_budget(&self, budget_id: &BudgetId) -> RepositoryResult<Budget> {
        let budget_id = budget_id.clone();
        self.with_conn(move |conn| {
            budgets::table
                .find(budget_id.as_str())
                .select(BudgetRowDb::as_select())
                .first(conn)
                .optional()?
                .map(Budget::from)
                .ok_or_else(missing("budget", &budget_id))
        })
        .await
    }

    async fn update_budget(
        &self,
        budget_id: &BudgetId,
        description: &str,
        expected_budget: f64,
        costs_incurred: f64,
    ) -> RepositoryResult<Budget> {
        let budget_id = budget_id.clone();
        let description = description.to_string();
        self.with_conn(move |conn| {
            diesel::update(budgets::table.find(budget_id.as_str()))
                .set((
                    budgets::description.eq(&description),
                    budgets::expected_budget.eq(expected_budget),
                    budgets::costs_incurred.eq(costs_incurred),
                ))
                .returning(BudgetRowDb::as_returning())
                .get_result(conn)
                .optional()?
                .map(Budget::from)
                .ok_or_else(missing("budget", &budget_id))
        })
        .await
    }

    async fn delete_budget(&self, budget_id: &BudgetId) -> RepositoryResult<Budget> {
        let budget_id = budget_id.clone();
        self.with_conn(move |conn| {
            diesel::delete(budgets::table.find(budget_id.as_str()))
                .returning(BudgetRowDb::as_returning())
                .get_result(conn)
                .optional()?
                .map(Budget::from)
                .ok_or_else(missing("budget", &budget_id))
        })
        .await
    }

    async fn budget_totals(&self, project_id: &ProjectId) -> RepositoryResult<BudgetTotals> {
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            let (expected, incurred): (Option<f64>, Option<f64>) = budgets::table
                .filter(budgets::project_id.eq(project_id.as_str()))
                .select((sum(budgets::expected_budget), sum(budgets::costs_incurred)))
                .first(conn)?;
            Ok(BudgetTotals {
                expected_budget_sum: expected.unwrap_or(0.0),
                costs_incurred_sum: incurred.unwrap_or(0.0),
            })
        })
        .await
    }
}

// ==================== Supplier invoices ====================

#[async_trait]
impl SupplierInvoiceRepository for PostgresRepository {
    async fn create_supplier_invoice(
        &self,
        fields: &SupplierInvoiceFields,
        items: &[SupplierInvoiceItemInput],
        created_by: &UserId,
    ) -> RepositoryResult<SupplierInvoice> {
        let fields = fields.clone();
        let items = items.to_vec();
        let created_by = created_by.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                ensure_project(tx, fields.project_id.as_str())?;
                let project = fields.project_id.as_str();
                let target = fields.budget_id.as_str();
                if !shift_costs(tx, project, target, fields.grand_total)? {
                    return Err(unlinked_budget(tx, project, target)?);
                }
                let now = Utc::now();
                let invoice: SupplierInvoiceRow = diesel::insert_into(supplier_invoices::table)
                    .values(SupplierInvoiceRow {
                        id: SupplierInvoiceId::generate().0,
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
                        project_id: fields.project_id.0.clone(),
                        budget_id: fields.budget_id.0.clone(),
                        created_by_id: created_by.0.clone(),
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(SupplierInvoiceRow::as_returning())
                    .get_result(tx)?;
                let item_rows: Vec<SupplierInvoiceItemRow> = items
                    .iter()
                    .map(|item| item_row(&invoice.id, item, created_by.as_str(), now))
                    .collect();
                if !item_rows.is_empty() {
                    diesel::insert_into(supplier_invoice_items::table)
                        .values(&item_rows)
                        .execute(tx)?;
                }
                Ok(invoice.into())
            })
        })
        .await
    }

    async fn list_supplier_invoices(
        &self,
        filter: &GetSupplierInvoicesInput,
    ) -> RepositoryResult<Vec<SupplierInvoiceWithBudget>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = supplier_invoices::table
                .filter(supplier_invoices::project_id.eq(filter.project_id.as_str()))
                .select(SupplierInvoiceRow::as_select())
                .into_boxed();
            if let Some(budget_id) = &filter.budget_id {
                query = query.filter(supplier_invoices::budget_id.eq(budget_id.as_str()));
            }
            if let Some(approved) = filter.approved {
                query = query.filter(supplier_invoices::approved.eq(approved));
            }
            if let Some(start) = filter.start_date {
                query = query.filter(supplier_invoices::invoice_date.ge(start));
            }
            if let Some(end) = filter.end_date {
                query = query.filter(supplier_invoices::invoice_date.le(end));
            }
            let rows: Vec<SupplierInvoiceRow> = query
                .order((supplier_invoices::created_at.desc(), supplier_invoices::id.desc()))
                .load(conn)?;
            let labels = budget_labels(conn, rows.iter().map(|i| i.budget_id.clone()).collect())?;
            Ok(rows
                .into_iter()
                .map(|row| SupplierInvoiceWithBudget {
                    budget: label_of(&labels, &row.budget_id),
                    invoice: row.into(),
                })
                .collect())
        })
        .await
    }

    async fn get_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
    ) -> RepositoryResult<SupplierInvoiceDetail> {
        let invoice_id = invoice_id.clone();
        self.with_conn(move |conn| {
            let invoice: SupplierInvoiceRow = supplier_invoices::table
                .find(invoice_id.as_str())
                .select(SupplierInvoiceRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(missing("supplier_invoice", &invoice_id))?;
            let items: Vec<SupplierInvoiceItemRow> = supplier_invoice_items::table
                .filter(supplier_invoice_items::supplier_invoice_id.eq(invoice_id.as_str()))
                .order(supplier_invoice_items::created_at.desc())
                .select(SupplierInvoiceItemRow::as_select())
                .load(conn)?;
            Ok(SupplierInvoiceDetail {
                invoice: invoice.into(),
                supplier_invoice_items: items.into_iter().map(SupplierInvoiceItem::from).collect(),
            })
        })
        .await
    }

    async fn update_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
        fields: &SupplierInvoiceFields,
        items: &[SupplierInvoiceItemInput],
        updated_by: &UserId,
    ) -> RepositoryResult<SupplierInvoice> {
        let invoice_id = invoice_id.clone();
        let fields = fields.clone();
        let items = items.to_vec();
        let updated_by = updated_by.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let id = invoice_id.as_str();
                let current: SupplierInvoiceRow = supplier_invoices::table
                    .find(id)
                    .select(SupplierInvoiceRow::as_select())
                    .for_update()
                    .first(tx)
                    .optional()?
                    .ok_or_else(missing("supplier_invoice", id))?;

                let project = fields.project_id.as_str();
                if current.project_id != project {
                    return Err(invoice_outside_project(id, project));
                }

                let target = fields.budget_id.as_str();
                let delta = if current.budget_id == target {
                    fields.grand_total - current.grand_total
                } else {
                    fields.grand_total
                };
                if !shift_costs(tx, project, target, delta)? {
                    return Err(unlinked_budget(tx, project, target)?);
                }
                if current.budget_id != target {
                    shift_costs(tx, project, &current.budget_id, -current.grand_total)?;
                }

                let now = Utc::now();
                let kept: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.id.as_ref().map(|i| i.0.clone()))
                    .collect();
                diesel::delete(
                    supplier_invoice_items::table
                        .filter(supplier_invoice_items::supplier_invoice_id.eq(id))
                        .filter(supplier_invoice_items::id.ne_all(&kept)),
                )
                .execute(tx)?;
                for item in &items {
                    let updated = match &item.id {
                        Some(item_id) => diesel::update(
                            supplier_invoice_items::table
                                .filter(supplier_invoice_items::id.eq(item_id.as_str()))
                                .filter(supplier_invoice_items::supplier_invoice_id.eq(id)),
                        )
                        .set((
                            supplier_invoice_items::description.eq(&item.description),
                            supplier_invoice_items::quantity.eq(item.quantity),
                            supplier_invoice_items::unit.eq(&item.unit),
                            supplier_invoice_items::unit_price.eq(item.unit_price),
                            supplier_invoice_items::total_price.eq(item.total_price),
                        ))
                        .execute(tx)?,
                        None => 0,
                    };
                    if updated == 0 {
                        diesel::insert_into(supplier_invoice_items::table)
                            .values(item_row(id, item, updated_by.as_str(), now))
                            .execute(tx)?;
                    }
                }

                let invoice: SupplierInvoiceRow = diesel::update(supplier_invoices::table.find(id))
                    .set((
                        supplier_invoices::invoice_no.eq(&fields.invoice_no),
                        supplier_invoices::invoice_date.eq(fields.invoice_date),
                        supplier_invoices::supplier_name.eq(&fields.supplier_name),
                        supplier_invoices::subtotal.eq(fields.subtotal),
                        supplier_invoices::taxes.eq(fields.taxes),
                        supplier_invoices::discount.eq(fields.discount),
                        supplier_invoices::grand_total.eq(fields.grand_total),
                        supplier_invoices::file_id.eq(&fields.file_id),
                        supplier_invoices::paid.eq(fields.paid),
                        supplier_invoices::approved.eq(fields.approved),
                        supplier_invoices::budget_id.eq(target),
                        supplier_invoices::updated_at.eq(now),
                    ))
                    .returning(SupplierInvoiceRow::as_returning())
                    .get_result(tx)?;
                Ok(invoice.into())
            })
        })
        .await
    }

    async fn delete_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
    ) -> RepositoryResult<SupplierInvoice> {
        let invoice_id = invoice_id.clone();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let invoice: SupplierInvoiceRow =
                    diesel::delete(supplier_invoices::table.find(invoice_id.as_str()))
                        .returning(SupplierInvoiceRow::as_returning())
                        .get_result(tx)
                        .optional()?
                        .ok_or_else(missing("supplier_invoice", &invoice_id))?;
                shift_costs(tx, &invoice.project_id, &invoice.budget_id, -invoice.grand_total)?;
                Ok(invoice.into())
            })
        })
        .await
    }

    async fn list_supplier_invoices_for_export(
        &self,
        project_id: &ProjectId,
    ) -> RepositoryResult<Vec<SupplierInvoiceExport>> {
        let project_id = project_id.clone();
        self.with_conn(move |conn| {
            let rows: Vec<SupplierInvoiceRow> = supplier_invoices::table
                .filter(supplier_invoices::project_id.eq(project_id.as_str()))
                .order((supplier_invoices::created_at.asc(), supplier_invoices::id.asc()))
                .select(SupplierInvoiceRow::as_select())
                .load(conn)?;
            let ids: Vec<String> = rows.iter().map(|i| i.id.clone()).collect();
            let labels = budget_labels(conn, rows.iter().map(|i| i.budget_id.clone()).collect())?;
            let item_rows: Vec<SupplierInvoiceItemRow> = supplier_invoice_items::table
                .filter(supplier_invoice_items::supplier_invoice_id.eq_any(ids))
                .order(supplier_invoice_items::created_at.asc())
                .select(SupplierInvoiceItemRow::as_select())
                .load(conn)?;
            let mut items: HashMap<String, Vec<SupplierInvoiceItem>> = HashMap::new();
            for row in item_rows {
                items
                    .entry(row.supplier_invoice_id.clone())
                    .or_default()
                    .push(row.into());
            }
            Ok(rows
                .into_iter()
                .map(|row| SupplierInvoiceExport {
                    budget: label_of(&labels, &row.budget_id),
                    supplier_invoice_items: items.remove(&row.id).unwrap_or_default(),
                    invoice: row.into(),
                })
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_config_with_url_keeps_defaults() {
        let config = PostgresConfig::with_url("postgres://localhost/buildtrack");
        assert_eq!(config.database_url, "postgres://localhost/buildtrack");
        assert_eq!(config.max_pool_size, 10);
        assert_eq!(config.max_retries, 3);
    }
}
