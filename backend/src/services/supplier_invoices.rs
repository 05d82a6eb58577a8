//! Procedures of the `supplierInvoice` router.

use crate::api::{
    CsvExport, SavedSupplierInvoice, SupplierInvoice, SupplierInvoiceDetail, SupplierInvoiceExport,
    SupplierInvoiceWithBudget,
};
use crate::routes::project::ProjectIdInput;
use crate::routes::supplier_invoice::{
    CreateSupplierInvoiceInput, GetSupplierInvoicesInput, SupplierInvoiceIdInput,
    UpdateSupplierInvoiceInput,
};
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::csv_export::{export_file_name, render_invoices};
use super::permissions::require_member;
use super::trycatch::try_catch;

pub async fn create_supplier_invoice(
    ctx: &Context,
    input: CreateSupplierInvoiceInput,
) -> ProcedureResult<SavedSupplierInvoice> {
    let user = ctx.user()?;
    try_catch(&["Failed to create supplier invoice"], async {
        require_member(ctx.repo(), &user.id, &input.fields.project_id).await?;
        let supplier_invoice = ctx
            .repo()
            .create_supplier_invoice(&input.fields, &input.supplier_invoice_items, &user.id)
            .await?;
        tracing::info!(
            invoice = %supplier_invoice.id,
            budget = %supplier_invoice.budget_id,
            grand_total = supplier_invoice.grand_total,
            "supplier invoice created"
        );
        Ok(SavedSupplierInvoice { supplier_invoice })
    })
    .await
}

pub async fn get_supplier_invoices(
    ctx: &Context,
    input: GetSupplierInvoicesInput,
) -> ProcedureResult<Vec<SupplierInvoiceWithBudget>> {
    let user = ctx.user()?;
    try_catch(&["Failed to get supplier invoices"], async {
        input.check_date_range()?;
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx.repo().list_supplier_invoices(&input).await?)
    })
    .await
}

pub async fn get_supplier_invoice(
    ctx: &Context,
    input: SupplierInvoiceIdInput,
) -> ProcedureResult<SupplierInvoiceDetail> {
    ctx.user()?;
    try_catch(&["Failed to get supplier invoice"], async {
        Ok(ctx
            .repo()
            .get_supplier_invoice(&input.supplier_invoice_id)
            .await?)
    })
    .await
}

pub async fn update_supplier_invoice(
    ctx: &Context,
    input: UpdateSupplierInvoiceInput,
) -> ProcedureResult<SavedSupplierInvoice> {
    let user = ctx.user()?;
    try_catch(&["Failed to update supplier invoice"], async {
        require_member(ctx.repo(), &user.id, &input.fields.project_id).await?;
        let supplier_invoice = ctx
            .repo()
            .update_supplier_invoice(
                &input.id,
                &input.fields,
                &input.supplier_invoice_items,
                &user.id,
            )
            .await?;
        Ok(SavedSupplierInvoice { supplier_invoice })
    })
    .await
}

pub async fn delete_supplier_invoice(
    ctx: &Context,
    input: SupplierInvoiceIdInput,
) -> ProcedureResult<SupplierInvoice> {
    ctx.user()?;
    try_catch(&["Failed to delete supplier invoice"], async {
        Ok(ctx
            .repo()
            .delete_supplier_invoice(&input.supplier_invoice_id)
            .await?)
    })
    .await
}

pub async fn get_supplier_invoices_for_csv_download(
    ctx: &Context,
    input: ProjectIdInput,
) -> ProcedureResult<Vec<SupplierInvoiceExport>> {
    let user = ctx.user()?;
    try_catch(&["Failed to get supplier invoices data for CSV download"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        Ok(ctx
            .repo()
            .list_supplier_invoices_for_export(&input.project_id)
            .await?)
    })
    .await
}

/// Same rows as the CSV download, rendered on the server.
pub async fn export_supplier_invoices_csv(
    ctx: &Context,
    input: ProjectIdInput,
) -> ProcedureResult<CsvExport> {
    let user = ctx.user()?;
    try_catch(&["Failed to get supplier invoices data for CSV download"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let project = ctx.repo().get_project(&input.project_id).await?;
        let invoices = ctx
            .repo()
            .list_supplier_invoices_for_export(&input.project_id)
            .await?;
        Ok(CsvExport {
            file_name: export_file_name(&project.name),
            content: render_invoices(&invoices)?,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BudgetId, ProjectId};
    use crate::routes::supplier_invoice::{SupplierInvoiceFields, SupplierInvoiceItemInput};
    use crate::rpc::error::ErrorCode;
    use crate::services::test_support::{context, context_as, other_user};
    use chrono::{TimeZone, Utc};

    async fn setup(ctx: &Context) -> (ProjectId, BudgetId) {
        let user_id = ctx.user_id().unwrap();
        let project = ctx.repo().create_project("Invoices", user_id).await.unwrap();
        let budget = ctx
            .repo()
            .create_budget(&project.id, "Timber", 1000.0, 100.0, user_id)
            .await
            .unwrap();
        (project.id, budget.id)
    }

    fn fields(project_id: &ProjectId, budget_id: &BudgetId, grand_total: f64) -> SupplierInvoiceFields {
        SupplierInvoiceFields {
            invoice_no: "INV-1".to_string(),
            invoice_date: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            supplier_name: "Timber Co".to_string(),
            subtotal: grand_total,
            taxes: 0.0,
            discount: 1.0,
            grand_total,
            file_id: None,
            project_id: project_id.clone(),
            budget_id: budget_id.clone(),
            paid: false,
            approved: false,
        }
    }

    fn item(description: &str) -> SupplierInvoiceItemInput {
        SupplierInvoiceItemInput {
            id: None,
            description: description.to_string(),
            quantity: 1.0,
            unit: "NR".to_string(),
            unit_price: 10.0,
            total_price: 10.0,
        }
    }

    #[tokio::test]
    async fn test_invoice_moves_budget_costs() {
        let ctx = context().await;
        let (project_id, budget_id) = setup(&ctx).await;

        let saved = create_supplier_invoice(
            &ctx,
            CreateSupplierInvoiceInput {
                fields: fields(&project_id, &budget_id, 250.0),
                supplier_invoice_items: vec![item("Studs"), item("Joists")],
            },
        )
        .await
        .unwrap();
        let invoice_id = saved.supplier_invoice.id.clone();
        assert_eq!(ctx.repo().get_budget(&budget_id).await.unwrap().costs_incurred, 350.0);

        let detail = get_supplier_invoice(
            &ctx,
            SupplierInvoiceIdInput {
                supplier_invoice_id: invoice_id.clone(),
            },
        )
        .await
        .unwrap();
        let mut kept = detail
            .supplier_invoice_items
            .iter()
            .find(|i| i.description == "Studs")
            .map(|i| SupplierInvoiceItemInput {
                id: Some(i.id.clone()),
                ..item("Studs 2x4")
            })
            .unwrap();
        kept.quantity = 4.0;

        update_supplier_invoice(
            &ctx,
            UpdateSupplierInvoiceInput {
                id: invoice_id.clone(),
                fields: fields(&project_id, &budget_id, 200.0),
                supplier_invoice_items: vec![kept, item("Nails")],
            },
        )
        .await
        .unwrap();
        assert_eq!(ctx.repo().get_budget(&budget_id).await.unwrap().costs_incurred, 300.0);

        let detail = get_supplier_invoice(
            &ctx,
            SupplierInvoiceIdInput {
                supplier_invoice_id: invoice_id.clone(),
            },
        )
        .await
        .unwrap();
        let mut names: Vec<&str> = detail
            .supplier_invoice_items
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Nails", "Studs 2x4"]);

        let csv = export_supplier_invoices_csv(
            &ctx,
            ProjectIdInput {
                project_id: project_id.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(csv.file_name, "invoices-supplier-invoices.csv");
        assert_eq!(csv.content.lines().count(), 3);

        delete_supplier_invoice(
            &ctx,
            SupplierInvoiceIdInput {
                supplier_invoice_id: invoice_id,
            },
        )
        .await
        .unwrap();
        assert_eq!(ctx.repo().get_budget(&budget_id).await.unwrap().costs_incurred, 100.0);
    }

    #[tokio::test]
    async fn test_inverted_date_range_is_rejected() {
        let ctx = context().await;
        let (project_id, _) = setup(&ctx).await;
        let err = get_supplier_invoices(
            &ctx,
            GetSupplierInvoicesInput {
                project_id,
                start_date: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
                end_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.message, "Failed to get supplier invoices");
    }

    #[tokio::test]
    async fn test_invoices_stay_inside_their_project() {
        let owner = context().await;
        let (project_id, budget_id) = setup(&owner).await;
        let saved = create_supplier_invoice(
            &owner,
            CreateSupplierInvoiceInput {
                fields: fields(&project_id, &budget_id, 50.0),
                supplier_invoice_items: vec![item("Studs")],
            },
        )
        .await
        .unwrap();

        let outsider = context_as(&owner, other_user("outsider")).await;
        let (own_project, own_budget) = setup(&outsider).await;

        let err = create_supplier_invoice(
            &outsider,
            CreateSupplierInvoiceInput {
                fields: fields(&own_project, &budget_id, 9999.0),
                supplier_invoice_items: vec![],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.message, "Failed to create supplier invoice");

        let err = update_supplier_invoice(
            &outsider,
            UpdateSupplierInvoiceInput {
                id: saved.supplier_invoice.id.clone(),
                fields: fields(&own_project, &own_budget, 10.0),
                supplier_invoice_items: vec![],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);

        assert_eq!(owner.repo().get_budget(&budget_id).await.unwrap().costs_incurred, 150.0);
        assert_eq!(outsider.repo().get_budget(&own_budget).await.unwrap().costs_incurred, 100.0);
        let detail = get_supplier_invoice(
            &owner,
            SupplierInvoiceIdInput {
                supplier_invoice_id: saved.supplier_invoice.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.invoice.project_id, project_id);
        assert_eq!(detail.invoice.grand_total, 50.0);
        assert_eq!(detail.supplier_invoice_items.len(), 1);
    }
}
