//! Supplier invoice hooks.

use chrono::Utc;
use serde_json::json;

use super::api::ApiClient;
use super::cache::QueryKey;
use super::error::ClientResult;
use super::optimistic::OptimisticMutation;
use crate::api::{
    BudgetLabel, CsvExport, ProjectId, SavedSupplierInvoice, SupplierInvoice,
    SupplierInvoiceDetail, SupplierInvoiceExport, SupplierInvoiceId, SupplierInvoiceWithBudget,
};
use crate::routes::budget::{GET_BUDGETS, GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM};
use crate::routes::supplier_invoice::{
    CreateSupplierInvoiceInput, GetSupplierInvoicesInput, SupplierInvoiceFields,
    SupplierInvoiceIdInput, UpdateSupplierInvoiceInput, CREATE_SUPPLIER_INVOICE,
    DELETE_SUPPLIER_INVOICE, EXPORT_SUPPLIER_INVOICES_CSV, GET_SUPPLIER_INVOICE,
    GET_SUPPLIER_INVOICES, GET_SUPPLIER_INVOICES_FOR_CSV_DOWNLOAD, UPDATE_SUPPLIER_INVOICE,
};

const SCOPE: &str = "supplierInvoice";

/// The unfiltered invoice list of a project.
fn invoices_key(project_id: &ProjectId) -> QueryKey {
    QueryKey::new(GET_SUPPLIER_INVOICES, json!({ "projectId": project_id }))
}

fn invoice_key(id: &SupplierInvoiceId) -> QueryKey {
    QueryKey::new(GET_SUPPLIER_INVOICE, json!({ "supplierInvoiceId": id }))
}

fn apply_fields(invoice: &mut SupplierInvoice, fields: &SupplierInvoiceFields) {
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
}

impl ApiClient {
    pub async fn supplier_invoices(
        &self,
        filter: &GetSupplierInvoicesInput,
    ) -> ClientResult<Vec<SupplierInvoiceWithBudget>> {
        self.cache.query(GET_SUPPLIER_INVOICES, filter).await
    }

    pub async fn supplier_invoice(&self, id: &SupplierInvoiceId) -> ClientResult<SupplierInvoiceDetail> {
        self.cache
            .query(
                GET_SUPPLIER_INVOICE,
                &SupplierInvoiceIdInput {
                    supplier_invoice_id: id.clone(),
                },
            )
            .await
    }

    pub async fn supplier_invoices_for_csv(
        &self,
        filter: &GetSupplierInvoicesInput,
    ) -> ClientResult<Vec<SupplierInvoiceExport>> {
        self.cache.query(GET_SUPPLIER_INVOICES_FOR_CSV_DOWNLOAD, filter).await
    }

    /// Rendered CSV; not cached.
    pub async fn export_supplier_invoices_csv(
        &self,
        filter: &GetSupplierInvoicesInput,
    ) -> ClientResult<CsvExport> {
        self.cache.mutate(EXPORT_SUPPLIER_INVOICES_CSV, filter).await
    }

    /// `budget` labels the placeholder row while the call is in flight.
    pub async fn create_supplier_invoice(
        &self,
        input: CreateSupplierInvoiceInput,
        budget: Option<BudgetLabel>,
    ) -> ClientResult<SavedSupplierInvoice> {
        let project_id = input.fields.project_id.clone();
        let now = Utc::now();
        let mut invoice = SupplierInvoice {
            id: SupplierInvoiceId::generate(),
            invoice_no: String::new(),
            invoice_date: now,
            supplier_name: String::new(),
            subtotal: 0.0,
            taxes: 0.0,
            discount: 0.0,
            grand_total: 0.0,
            file_id: None,
            paid: false,
            approved: false,
            project_id: project_id.clone(),
            budget_id: input.fields.budget_id.clone(),
            created_by_id: self.my_id(),
            created_at: now,
            updated_at: now,
        };
        apply_fields(&mut invoice, &input.fields);
        let placeholder = SupplierInvoiceWithBudget {
            invoice,
            budget: budget.unwrap_or(BudgetLabel {
                description: String::new(),
                cost_code: String::new(),
            }),
        };

        OptimisticMutation::new(CREATE_SUPPLIER_INVOICE, &input)?
            .scope(SCOPE)
            .cancel(GET_SUPPLIER_INVOICES)
            .edit(invoices_key(&project_id), move |rows: Option<Vec<SupplierInvoiceWithBudget>>| {
                let mut rows = rows.unwrap_or_default();
                rows.insert(0, placeholder);
                Some(rows)
            })
            .notify_success("Invoice created!")
            .invalidate(GET_SUPPLIER_INVOICES, Some(json!({ "projectId": project_id })))
            .invalidate(GET_BUDGETS, Some(json!({ "projectId": project_id })))
            .invalidate(
                GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM,
                Some(json!({ "projectId": project_id })),
            )
            .run(&self.cache)
            .await
    }

    pub async fn update_supplier_invoice(
        &self,
        input: UpdateSupplierInvoiceInput,
    ) -> ClientResult<SavedSupplierInvoice> {
        let project_id = input.fields.project_id.clone();
        let (list_update, detail_update) = (input.clone(), input.clone());
        OptimisticMutation::new(UPDATE_SUPPLIER_INVOICE, &input)?
            .scope(SCOPE)
            .cancel(GET_SUPPLIER_INVOICES)
            .cancel(GET_SUPPLIER_INVOICE)
            .edit(invoices_key(&project_id), move |rows: Option<Vec<SupplierInvoiceWithBudget>>| {
                rows.map(|mut rows| {
                    if let Some(row) = rows.iter_mut().find(|r| r.invoice.id == list_update.id) {
                        apply_fields(&mut row.invoice, &list_update.fields);
                    }
                    rows
                })
            })
            .edit(invoice_key(&input.id), move |detail: Option<SupplierInvoiceDetail>| {
                detail.map(|mut detail| {
                    apply_fields(&mut detail.invoice, &detail_update.fields);
                    detail
                })
            })
            .notify_success("Invoice updated!")
            .invalidate(GET_SUPPLIER_INVOICES, Some(json!({ "projectId": project_id })))
            .invalidate(GET_SUPPLIER_INVOICE, Some(json!({ "supplierInvoiceId": input.id })))
            .invalidate(GET_BUDGETS, Some(json!({ "projectId": project_id })))
            .invalidate(
                GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM,
                Some(json!({ "projectId": project_id })),
            )
            .run(&self.cache)
            .await
    }

    pub async fn delete_supplier_invoice(
        &self,
        project_id: &ProjectId,
        id: &SupplierInvoiceId,
    ) -> ClientResult<SupplierInvoice> {
        let removed = id.clone();
        OptimisticMutation::new(
            DELETE_SUPPLIER_INVOICE,
            &SupplierInvoiceIdInput {
                supplier_invoice_id: id.clone(),
            },
        )?
        .scope(SCOPE)
        .cancel(GET_SUPPLIER_INVOICES)
        .edit(invoices_key(project_id), move |rows: Option<Vec<SupplierInvoiceWithBudget>>| {
            rows.map(|rows| rows.into_iter().filter(|r| r.invoice.id != removed).collect())
        })
        .notify_success("Invoice deleted")
        .invalidate(GET_SUPPLIER_INVOICES, Some(json!({ "projectId": project_id })))
        .invalidate(GET_BUDGETS, Some(json!({ "projectId": project_id })))
        .invalidate(
            GET_EXPECTED_BUDGET_SUM_AND_COSTS_INCURRED_SUM,
            Some(json!({ "projectId": project_id })),
        )
        .run(&self.cache)
        .await
    }
}
