use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{BudgetId, ProjectId, SupplierInvoiceId, SupplierInvoiceItemId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoice {
    pub id: SupplierInvoiceId,
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
    pub project_id: ProjectId,
    pub budget_id: BudgetId,
    pub created_by_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceItem {
    pub id: SupplierInvoiceItemId,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub total_price: f64,
    pub supplier_invoice_id: SupplierInvoiceId,
    pub created_by_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Budget reference shown in the invoice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLabel {
    pub description: String,
    pub cost_code: String,
}

/// Invoice list row with its budget label attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceWithBudget {
    #[serde(flatten)]
    pub invoice: SupplierInvoice,
    pub budget: BudgetLabel,
}

/// A single invoice with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceDetail {
    #[serde(flatten)]
    pub invoice: SupplierInvoice,
    pub supplier_invoice_items: Vec<SupplierInvoiceItem>,
}

/// Invoice together with its items and budget, flattened into CSV rows by
/// the export procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceExport {
    #[serde(flatten)]
    pub invoice: SupplierInvoice,
    pub budget: BudgetLabel,
    pub supplier_invoice_items: Vec<SupplierInvoiceItem>,
}
