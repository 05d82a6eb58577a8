//! Inputs and output schema of the `gpt` router.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::{required, required_id, InputResult, Validate};
use crate::api::ProjectId;

pub const EXTRACT_INVOICE_INFO: &str = "gpt.extractInvoiceInfo";
pub const EXTRACT_INVOICE_INFO_FROM_FILE: &str = "gpt.extractInvoiceInfoFromFile";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractInvoiceInfoInput {
    pub input_text: String,
}

impl Validate for ExtractInvoiceInfoInput {
    fn validate(mut self) -> InputResult<Self> {
        required(&mut self.input_text, "inputText", "Input text is required")?;
        Ok(self)
    }
}

/// A PDF already uploaded to the project's file store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractInvoiceFromFileInput {
    pub project_id: ProjectId,
    pub file_id: String,
}

impl Validate for ExtractInvoiceFromFileInput {
    fn validate(self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        required_id(&self.file_id, "fileId", "A fileId is required")?;
        Ok(self)
    }
}

/// Invoice fields read out of free text by the language model. The field
/// descriptions are part of the prompt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInvoice {
    /// The invoice number. Defaults to ''.
    #[serde(default)]
    pub invoice_no: String,
    /// The invoice date. Should be returned in the form of dd/mm/yyyy. Defaults to today's date.
    #[serde(default)]
    pub invoice_date: String,
    /// The supplier name. The supplier name should not be mistaken as the vendor name. Defaults to ''.
    #[serde(default)]
    pub supplier_name: String,
    /// The sum of the totalPrice of all items. Defaults to 0.
    #[serde(default)]
    pub subtotal: f64,
    /// The taxes incurred. DO NOT multiply the tax with any percentages. Defaults to 0.
    #[serde(default)]
    pub taxes: f64,
    /// The discount given, if any. Defaults to 0.
    #[serde(default)]
    pub discount: f64,
    /// The subtotal plus taxes less discount. Defaults to 0.
    #[serde(default)]
    pub grand_total: f64,
    /// Items of the invoice. Defaults to an empty array [].
    #[serde(default)]
    pub supplier_invoice_items: Vec<ExtractedInvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInvoiceItem {
    /// Item description. DO NOT include unit or quantity in the description. Defaults to ''.
    #[serde(default)]
    pub description: String,
    /// Item quantity. Should be a whole number. Treat synonymous terms like 'Quantity/ (x)' as quantity too. (x) can be any value. Defaults to 0.
    #[serde(default)]
    pub quantity: f64,
    /// Item unit. It takes values such as 'M', 'M2', 'M3', 'g', 'kg', 'tons', 'feet', 'NR', or '1'. Defaults to NR.
    #[serde(default)]
    pub unit: String,
    /// The unit price of an item. It represents a currency or monetary value. Defaults to 0.
    #[serde(default)]
    pub unit_price: f64,
    /// The total price equals unitPrice multiplied by quantity. Defaults to 0.
    #[serde(default)]
    pub total_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_text_required() {
        let err = ExtractInvoiceInfoInput {
            input_text: "   ".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "Input text is required");
    }

    #[test]
    fn test_schema_carries_field_descriptions() {
        let schema = serde_json::to_value(schemars::schema_for!(ExtractedInvoice)).unwrap();
        let description = schema["properties"]["invoiceNo"]["description"]
            .as_str()
            .unwrap();
        assert_eq!(description, "The invoice number. Defaults to ''.");
    }
}
