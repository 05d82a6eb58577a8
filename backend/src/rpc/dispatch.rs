//! Procedure path to procedure function.
//!
//! Inputs arrive as raw JSON. Each call is deserialized into the
//! procedure's input type, validated, run, and its output serialized back.

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Instant;

use super::context::Context;
use super::envelope::Envelope;
use super::error::{ProcedureError, ProcedureResult};
use crate::routes::{
    budget as budget_routes, extraction as gpt_routes, me as me_routes,
    project as project_routes, site_diary as diary_routes, site_diary_entry as entry_routes,
    storage as s3_routes, supplier_invoice as invoice_routes, task as task_routes, Validate,
};
use crate::services::{
    budgets, files, gpt, projects, site_diaries, supplier_invoices, tasks,
};

async fn call<'a, I, O, F, Fut>(ctx: &'a Context, input: Value, procedure: F) -> ProcedureResult<Value>
where
    I: DeserializeOwned + Validate,
    O: Serialize,
    F: FnOnce(&'a Context, I) -> Fut,
    Fut: Future<Output = ProcedureResult<O>> + 'a,
{
    let input: I = serde_json::from_value(input)?;
    let input = input.validate()?;
    let output = procedure(ctx, input).await?;
    Ok(serde_json::to_value(output).map_err(|e| ProcedureError::internal(e.to_string()))?)
}

async fn call_without_input<'a, O, F, Fut>(ctx: &'a Context, procedure: F) -> ProcedureResult<Value>
where
    O: Serialize,
    F: FnOnce(&'a Context) -> Fut,
    Fut: Future<Output = ProcedureResult<O>> + 'a,
{
    let output = procedure(ctx).await?;
    serde_json::to_value(output).map_err(|e| ProcedureError::internal(e.to_string()))
}

/// Run the procedure at `path`. Unknown paths are `NOT_IMPLEMENTED`.
pub async fn dispatch(ctx: &Context, path: &str, input: Value) -> ProcedureResult<Value> {
    match path {
        // project
        project_routes::CREATE_PROJECT => call(ctx, input, projects::create_project).await,
        project_routes::GET_PROJECTS => call_without_input(ctx, projects::get_projects).await,
        project_routes::GET_PROJECT => call(ctx, input, projects::get_project).await,
        project_routes::UPDATE_PROJECT => call(ctx, input, projects::update_project).await,
        project_routes::DELETE_PROJECT => call(ctx, input, projects::delete_project).await,
        project_routes::ADD_TO_PROJECT => call(ctx, input, projects::add_to_project).await,
        project_routes::REMOVE_FROM_PROJECT => {
            call(ctx, input, projects::remove_from_project).await
        }
        project_routes::GET_PROJECT_CREATOR => {
            call(ctx, input, projects::get_project_creator).await
        }
        project_routes::GET_USERS_FOR_PROJECT => {
            call(ctx, input, projects::get_users_for_project).await
        }

        // me / user
        me_routes::HAS_PERMISSION_TO_PROJECT => {
            call(ctx, input, projects::has_permission_to_project).await
        }
        me_routes::IS_CREATOR_OF_PROJECT => call(ctx, input, projects::is_creator_of_project).await,
        me_routes::GET_MY_PROFESSIONAL_ROLE => {
            call(ctx, input, projects::get_my_professional_role).await
        }
        me_routes::UPDATE_MY_PROFESSIONAL_ROLE => {
            call(ctx, input, projects::update_my_professional_role).await
        }
        me_routes::DELETE_MY_ACCOUNT => call(ctx, input, projects::delete_my_account).await,
        me_routes::GET_USERS => call(ctx, input, projects::get_users).await,

        // siteDiary / weather
        diary_routes::CREATE_SITE_DIARY => call(ctx, input, site_diaries::create_site_diary).await,
        diary_routes::GET_SITE_DIARIES => call(ctx, input, site_diaries::get_site_diaries).await,
        diary_routes::GET_SITE_DIARY => call(ctx, input, site_diaries::get_site_diary).await,
        diary_routes::UPDATE_SITE_DIARY => call(ctx, input, site_diaries::update_site_diary).await,
        diary_routes::DELETE_SITE_DIARY => call(ctx, input, site_diaries::delete_site_diary).await,
        diary_routes::UPDATE_SITE_DIARY_WEATHER => {
            call(ctx, input, site_diaries::update_site_diary_weather).await
        }

        // diary entries
        entry_routes::CREATE_PLANT => call(ctx, input, site_diaries::create_plant).await,
        entry_routes::UPDATE_PLANT => call(ctx, input, site_diaries::update_plant).await,
        entry_routes::DELETE_PLANT => call(ctx, input, site_diaries::delete_plant).await,
        entry_routes::CREATE_LABORER => call(ctx, input, site_diaries::create_laborer).await,
        entry_routes::UPDATE_LABORER => call(ctx, input, site_diaries::update_laborer).await,
        entry_routes::DELETE_LABORER => call(ctx, input, site_diaries::delete_laborer).await,
        entry_routes::CREATE_MATERIAL => call(ctx, input, site_diaries::create_material).await,
        entry_routes::UPDATE_MATERIAL => call(ctx, input, site_diaries::update_material).await,
        entry_routes::DELETE_MATERIAL => call(ctx, input, site_diaries::delete_material).await,
        entry_routes::CREATE_SITE_PROBLEM => {
            call(ctx, input, site_diaries::create_site_problem).await
        }
        entry_routes::UPDATE_SITE_PROBLEM => {
            call(ctx, input, site_diaries::update_site_problem).await
        }
        entry_routes::DELETE_SITE_PROBLEM => {
            call(ctx, input, site_diaries::delete_site_problem).await
        }
        entry_routes::CREATE_WORK_PROGRESS => {
            call(ctx, input, site_diaries::create_work_progress).await
        }
        entry_routes::UPDATE_WORK_PROGRESS => {
            call(ctx, input, site_diaries::update_work_progress).await
        }
        entry_routes::DELETE_WORK_PROGRESS => {
            call(ctx, input, site_diaries::delete_work_progress).await
        }

        // task
        task_routes::CREATE_TASK => call(ctx, input, tasks::create_task).await,
        task_routes::GET_TASKS => call(ctx, input, tasks::get_tasks).await,
        task_routes::GET_TASK => call(ctx, input, tasks::get_task).await,
        task_routes::UPDATE_TASK => call(ctx, input, tasks::update_task).await,
        task_routes::DELETE_TASK => call(ctx, input, tasks::delete_task).await,

        // budget
        budget_routes::CREATE_BUDGET => call(ctx, input, budgets::create_budget).await,
        budget_routes::GET_BUDGETS => call(ctx, input, budgets::get_budgets).await,
        budget_routes::GET_BUDGET => call(ctx, input, budgets::get_budget).await,
        budget_routes::UPDATE_BUDGET => call(ctx, input, budgets::update_budget).await,
        budget_routes::DELETE_BUDGET => call(ctx, input, budgets::delete_budget).await,
        budget_routes::GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM => {
            call(ctx, input, budgets::get_expected_budget_sum_and_costs_incurred_sum).await
        }

        // supplierInvoice
        invoice_routes::CREATE_SUPPLIER_INVOICE => {
            call(ctx, input, supplier_invoices::create_supplier_invoice).await
        }
        invoice_routes::GET_SUPPLIER_INVOICES => {
            call(ctx, input, supplier_invoices::get_supplier_invoices).await
        }
        invoice_routes::GET_SUPPLIER_INVOICE => {
            call(ctx, input, supplier_invoices::get_supplier_invoice).await
        }
        invoice_routes::UPDATE_SUPPLIER_INVOICE => {
            call(ctx, input, supplier_invoices::update_supplier_invoice).await
        }
        invoice_routes::DELETE_SUPPLIER_INVOICE => {
            call(ctx, input, supplier_invoices::delete_supplier_invoice).await
        }
        invoice_routes::GET_SUPPLIER_INVOICES_FOR_CSV_DOWNLOAD => {
            call(ctx, input, supplier_invoices::get_supplier_invoices_for_csv_download).await
        }
        invoice_routes::EXPORT_SUPPLIER_INVOICES_CSV => {
            call(ctx, input, supplier_invoices::export_supplier_invoices_csv).await
        }

        // s3
        s3_routes::FETCH_S3_BUCKET_CONTENTS => call(ctx, input, files::fetch_s3_bucket_contents).await,
        s3_routes::DELETE_S3_OBJECT => call(ctx, input, files::delete_s3_object).await,
        s3_routes::GET_PRE_SIGNED_URL_FOR_DOWNLOAD => {
            call(ctx, input, files::get_pre_signed_url_for_download).await
        }
        s3_routes::GET_PRE_SIGNED_URL_FOR_UPLOAD => {
            call(ctx, input, files::get_pre_signed_url_for_upload).await
        }
        s3_routes::CREATE_FOLDER => call(ctx, input, files::create_folder).await,

        // gpt
        gpt_routes::EXTRACT_INVOICE_INFO => call(ctx, input, gpt::extract_invoice_info).await,
        gpt_routes::EXTRACT_INVOICE_INFO_FROM_FILE => {
            call(ctx, input, gpt::extract_invoice_info_from_file).await
        }

        unknown => Err(ProcedureError::not_implemented(unknown)),
    }
}

/// Run one call and wrap the outcome.
pub async fn call_procedure(ctx: &Context, path: &str, input: Value) -> Envelope {
    let started = Instant::now();
    let result = dispatch(ctx, path, input).await;
    match &result {
        Ok(_) => tracing::debug!(path, elapsed_ms = started.elapsed().as_millis() as u64, "procedure ok"),
        Err(err) => tracing::warn!(
            path,
            code = %err.code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "procedure failed"
        ),
    }
    Envelope::from_result(path, result)
}

/// Run every call of a batch concurrently. Envelopes keep the call order.
pub async fn call_batch(ctx: &Context, calls: Vec<(String, Value)>) -> Vec<Envelope> {
    join_all(
        calls
            .iter()
            .map(|(path, input)| call_procedure(ctx, path, input.clone())),
    )
    .await
}

/// Store the profile the auth provider sent with the request.
pub async fn refresh_session_user(ctx: &Context) {
    if let Some(session) = ctx.session() {
        if let Err(err) = ctx.repo().upsert_user(&session.user).await {
            tracing::warn!(user = %session.user.id, error = %err, "failed to refresh session user");
        }
    }
}
