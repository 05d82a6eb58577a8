//! CSV rendering of a project's supplier invoices.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::api::{SupplierInvoiceExport, SupplierInvoiceItem};

/// One CSV line: the invoice header repeated for each of its items.
#[derive(Debug, Serialize)]
struct InvoiceLine<'a> {
    #[serde(rename = "Invoice No")]
    invoice_no: &'a str,
    #[serde(rename = "Invoice Date")]
    invoice_date: String,
    #[serde(rename = "Supplier Name")]
    supplier_name: &'a str,
    #[serde(rename = "Cost Code")]
    cost_code: &'a str,
    #[serde(rename = "Budget Description")]
    budget_description: &'a str,
    #[serde(rename = "Item Description")]
    item_description: &'a str,
    #[serde(rename = "Quantity")]
    quantity: Option<f64>,
    #[serde(rename = "Unit")]
    unit: &'a str,
    #[serde(rename = "Unit Price")]
    unit_price: Option<f64>,
    #[serde(rename = "Total Price")]
    total_price: Option<f64>,
    #[serde(rename = "Subtotal")]
    subtotal: f64,
    #[serde(rename = "Taxes")]
    taxes: f64,
    #[serde(rename = "Discount")]
    discount: f64,
    #[serde(rename = "Grand Total")]
    grand_total: f64,
    #[serde(rename = "Paid")]
    paid: bool,
    #[serde(rename = "Approved")]
    approved: bool,
}

fn line<'a>(
    export: &'a SupplierInvoiceExport,
    item: Option<&'a SupplierInvoiceItem>,
) -> InvoiceLine<'a> {
    let invoice = &export.invoice;
    InvoiceLine {
        invoice_no: &invoice.invoice_no,
        invoice_date: invoice.invoice_date.to_rfc3339_opts(SecondsFormat::Secs, true),
        supplier_name: &invoice.supplier_name,
        cost_code: &export.budget.cost_code,
        budget_description: &export.budget.description,
        item_description: item.map(|i| i.description.as_str()).unwrap_or(""),
        quantity: item.map(|i| i.quantity),
        unit: item.map(|i| i.unit.as_str()).unwrap_or(""),
        unit_price: item.map(|i| i.unit_price),
        total_price: item.map(|i| i.total_price),
        subtotal: invoice.subtotal,
        taxes: invoice.taxes,
        discount: invoice.discount,
        grand_total: invoice.grand_total,
        paid: invoice.paid,
        approved: invoice.approved,
    }
}

/// Render invoices as CSV with a header row. An invoice without items still
/// gets one line with the item columns left empty.
pub fn render_invoices(invoices: &[SupplierInvoiceExport]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut lines = 0usize;

    for export in invoices {
        if export.supplier_invoice_items.is_empty() {
            writer.serialize(line(export, None))?;
            lines += 1;
        }
        for item in &export.supplier_invoice_items {
            writer.serialize(line(export, Some(item)))?;
            lines += 1;
        }
    }

    if lines == 0 {
        // serialize() writes the header with the first record only.
        writer.write_record([
            "Invoice No",
            "Invoice Date",
            "Supplier Name",
            "Cost Code",
            "Budget Description",
            "Item Description",
            "Quantity",
            "Unit",
            "Unit Price",
            "Total Price",
            "Subtotal",
            "Taxes",
            "Discount",
            "Grand Total",
            "Paid",
            "Approved",
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Download name of a project's invoice export.
pub fn export_file_name(project_name: &str) -> String {
    let slug: String = project_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "supplier-invoices.csv".to_string()
    } else {
        format!("{}-supplier-invoices.csv", slug)
    }
}
