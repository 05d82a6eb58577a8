//! Inputs of the `supplierInvoice` router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{finite, positive, required, required_id, InputError, InputResult, Validate};
use crate::api::{BudgetId, ProjectId, SupplierInvoice, SupplierInvoiceId, SupplierInvoiceItemId};

pub const CREATE_SUPPLIER_INVOICE: &str = "supplierInvoice.createSupplierInvoice";
pub const GET_SUPPLIER_INVOICES: &str = "supplierInvoice.getSupplierInvoices";
pub const GET_SUPPLIER_INVOICE: &str = "supplierInvoice.getSupplierInvoice";
pub const UPDATE_SUPPLIER_INVOICE: &str = "supplierInvoice.updateSupplierInvoice";
pub const DELETE_SUPPLIER_INVOICE: &str = "supplierInvoice.deleteSupplierInvoice";
pub const GET_SUPPLIER_INVOICES_FOR_CSV_DOWNLOAD: &str =
    "supplierInvoice.getSupplierInvoicesForCSVDownload";
pub const EXPORT_SUPPLIER_INVOICES_CSV: &str = "supplierInvoice.exportSupplierInvoicesCsv";

/// A line item as entered on the invoice form. `id` is present for items
/// that already exist and absent for new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceItemInput {
    #[serde(default)]
    pub id: Option<SupplierInvoiceItemId>,
    pub description: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    pub unit_price: f64,
    pub total_price: f64,
}

impl Validate for SupplierInvoiceItemInput {
    fn validate(mut self) -> InputResult<Self> {
        if let Some(id) = &self.id {
            required_id(id.as_str(), "id", "An id is required")?;
        }
        required(&mut self.description, "description", "A description is required")?;
        positive(self.quantity, "quantity", "Quantity must be positive")?;
        positive(self.unit_price, "unitPrice", "Unit price must be positive")?;
        positive(self.total_price, "totalPrice", "Total price must be positive")?;
        Ok(self)
    }
}

/// Header fields shared by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceFields {
    pub invoice_no: String,
    pub invoice_date: DateTime<Utc>,
    pub supplier_name: String,
    pub subtotal: f64,
    pub taxes: f64,
    pub discount: f64,
    pub grand_total: f64,
    #[serde(default)]
    pub file_id: Option<String>,
    pub project_id: ProjectId,
    pub budget_id: BudgetId,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub approved: bool,
}

impl Validate for SupplierInvoiceFields {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.invoice_no, "invoiceNo", "An invoice number is required")?;
        required(
            &mut self.supplier_name,
            "supplierName",
            "A supplier name is required",
        )?;
        positive(self.subtotal, "subtotal", "Subtotal must be positive")?;
        finite(self.taxes, "taxes", "Taxes must be a number")?;
        positive(self.discount, "discount", "Discount must be positive")?;
        positive(self.grand_total, "grandTotal", "Total must be positive")?;
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        required_id(self.budget_id.as_str(), "budgetId", "A budgetId is required")?;
        self.file_id = self.file_id.filter(|id| !id.trim().is_empty());
        Ok(self)
    }
}

fn validate_items(
    items: Vec<SupplierInvoiceItemInput>,
) -> InputResult<Vec<SupplierInvoiceItemInput>> {
    items.into_iter().map(Validate::validate).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierInvoiceInput {
    #[serde(flatten)]
    pub fields: SupplierInvoiceFields,
    #[serde(default)]
    pub supplier_invoice_items: Vec<SupplierInvoiceItemInput>,
}

impl Validate for CreateSupplierInvoiceInput {
    fn validate(mut self) -> InputResult<Self> {
        self.fields = self.fields.validate()?;
        self.supplier_invoice_items = validate_items(self.supplier_invoice_items)?;
        // New invoices never carry item ids.
        for item in &mut self.supplier_invoice_items {
            item.id = None;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierInvoiceInput {
    pub id: SupplierInvoiceId,
    #[serde(flatten)]
    pub fields: SupplierInvoiceFields,
    #[serde(default)]
    pub supplier_invoice_items: Vec<SupplierInvoiceItemInput>,
}

impl Validate for UpdateSupplierInvoiceInput {
    fn validate(mut self) -> InputResult<Self> {
        required_id(self.id.as_str(), "id", "An id is required")?;
        self.fields = self.fields.validate()?;
        self.supplier_invoice_items = validate_items(self.supplier_invoice_items)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSupplierInvoicesInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub budget_id: Option<BudgetId>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Validate for GetSupplierInvoicesInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        Ok(self)
    }
}

impl GetSupplierInvoicesInput {
    /// Date range check run inside the procedure so its failure carries the
    /// procedure's own error message.
    pub fn check_date_range(&self) -> InputResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(InputError::new(
                    "startDate",
                    "Start date must not be after end date",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInvoiceIdInput {
    pub supplier_invoice_id: SupplierInvoiceId,
}

impl Validate for SupplierInvoiceIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(
            self.supplier_invoice_id.as_str(),
            "supplierInvoiceId",
            "A supplierInvoiceId is required",
        )?;
        Ok(self)
    }
}

/// Wrapper returned by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSupplierInvoice {
    pub supplier_invoice: SupplierInvoice,
}

/// Rendered CSV document returned by the export procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_invoice() -> serde_json::Value {
        json!({
            "invoiceNo": "INV-0042",
            "invoiceDate": "2024-02-01T00:00:00Z",
            "supplierName": "Plywood Sdn Bhd",
            "subtotal": 278.0,
            "taxes": 13.9,
            "discount": 1.0,
            "grandTotal": 290.9,
            "projectId": "p1",
            "budgetId": "b1",
            "paid": false,
            "approved": true,
            "supplierInvoiceItems": [
                { "description": "Plywood 12mm", "quantity": 10, "unit": "NR",
                  "unitPrice": 27.8, "totalPrice": 278.0 }
            ]
        })
    }

    #[test]
    fn test_create_invoice_from_wire() {
        let input: CreateSupplierInvoiceInput = serde_json::from_value(wire_invoice()).unwrap();
        let input = input.validate().unwrap();
        assert_eq!(input.fields.invoice_no, "INV-0042");
        assert_eq!(input.supplier_invoice_items.len(), 1);
        assert!(input.fields.file_id.is_none());
    }

    #[test]
    fn test_item_price_must_be_positive() {
        let mut value = wire_invoice();
        value["supplierInvoiceItems"][0]["unitPrice"] = json!(0);
        let input: CreateSupplierInvoiceInput = serde_json::from_value(value).unwrap();
        assert_eq!(
            input.validate().unwrap_err().message,
            "Unit price must be positive"
        );
    }

    #[test]
    fn test_discount_must_be_positive() {
        let mut value = wire_invoice();
        value["discount"] = json!(0);
        let input: CreateSupplierInvoiceInput = serde_json::from_value(value).unwrap();
        assert_eq!(input.validate().unwrap_err().message, "Discount must be positive");
    }

    #[test]
    fn test_inverted_date_range() {
        let input: GetSupplierInvoicesInput = serde_json::from_value(json!({
            "projectId": "p1",
            "startDate": "2024-03-01T00:00:00Z",
            "endDate": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(input.check_date_range().is_err());
    }
}
