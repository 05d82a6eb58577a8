//! Supplier invoices and their line items.
//!
//! Every write that changes an invoice's grand total also moves the linked
//! budget's `costs_incurred` by the same amount, inside one transaction.

use async_trait::async_trait;

use super::error::{ErrorContext, RepositoryError, RepositoryResult};
use crate::api::{ProjectId, SupplierInvoiceId, UserId};
use crate::models::{
    SupplierInvoice, SupplierInvoiceDetail, SupplierInvoiceExport, SupplierInvoiceWithBudget,
};
use crate::routes::supplier_invoice::{
    GetSupplierInvoicesInput, SupplierInvoiceFields, SupplierInvoiceItemInput,
};

#[async_trait]
pub trait SupplierInvoiceRepository: Send + Sync {
    /// Insert the invoice with its items and add its grand total to the budget.
    async fn create_supplier_invoice(
        &self,
        fields: &SupplierInvoiceFields,
        items: &[SupplierInvoiceItemInput],
        created_by: &UserId,
    ) -> RepositoryResult<SupplierInvoice>;

    /// Invoices of a project, newest first, each with its budget label.
    async fn list_supplier_invoices(
        &self,
        filter: &GetSupplierInvoicesInput,
    ) -> RepositoryResult<Vec<SupplierInvoiceWithBudget>>;

    /// An invoice with its items, newest item first.
    async fn get_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
    ) -> RepositoryResult<SupplierInvoiceDetail>;

    /// Replace the invoice header and reconcile its items: items missing from
    /// `items` are deleted, items with a known id are updated, the rest are
    /// inserted. The budget moves by the change in grand total.
    async fn update_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
        fields: &SupplierInvoiceFields,
        items: &[SupplierInvoiceItemInput],
        updated_by: &UserId,
    ) -> RepositoryResult<SupplierInvoice>;

    /// Delete the invoice and its items and take its grand total back off
    /// the budget.
    async fn delete_supplier_invoice(
        &self,
        invoice_id: &SupplierInvoiceId,
    ) -> RepositoryResult<SupplierInvoice>;

    /// Every invoice of a project with items and budget, for CSV export.
    async fn list_supplier_invoices_for_export(
        &self,
        project_id: &ProjectId,
    ) -> RepositoryResult<Vec<SupplierInvoiceExport>>;
}

/// An invoice may only draw on a budget of its own project.
pub fn budget_outside_project(budget_id: &str, project_id: &str) -> RepositoryError {
    RepositoryError::validation_with_context(
        format!("Budget {} does not belong to project {}", budget_id, project_id),
        ErrorContext::new("link_budget")
            .with_entity("budget")
            .with_entity_id(budget_id),
    )
}

/// An update named a project other than the one the invoice was filed under.
pub fn invoice_outside_project(invoice_id: &str, project_id: &str) -> RepositoryError {
    RepositoryError::validation_with_context(
        format!(
            "Supplier invoice {} does not belong to project {}",
            invoice_id, project_id
        ),
        ErrorContext::new("update_supplier_invoice")
            .with_entity("supplier_invoice")
            .with_entity_id(invoice_id),
    )
}
