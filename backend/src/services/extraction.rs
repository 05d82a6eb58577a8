//! Invoice extraction: PDF text in, structured [`ExtractedInvoice`] out.
//!
//! The language model is asked for JSON matching the schema generated from
//! [`ExtractedInvoice`]. A completion that does not parse or does not
//! validate gets exactly one repair round trip before the call fails.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::api::{ExtractedInvoice, SupplierInvoiceItemId};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROMPT_TEMPLATE: &str = "Ensure that all fields in the JSON headings are filled, and any missing input is represented as 0.\nTreat synonymous terms like total, final cost, total payable, etc., as grand_total.\n Ensure to thoroughly check the extracted information before finalising the output.\n Take your time and avoid confusion between \"quantity\" and \"unit_price\". Determine which one is closest to having a monetary value or being a currency.\n Lastly, MAKE SURE all inputs ARE DETECTED, DO NOT MISS any.\n Please RUN the prompt TWICE before providing the output.\n {format_instructions}\nUser input: \n{user_input}";

const REPAIR_TEMPLATE: &str = "Instructions:\n--------------\n{format_instructions}\n--------------\nCompletion:\n--------------\n{completion}\n--------------\n\nAbove, the Completion did not satisfy the constraints given in the Instructions.\nError:\n--------------\n{error}\n--------------\n\nPlease try again. Please only respond with an answer that satisfies the constraints laid out in the Instructions:";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invoice extraction is not configured")]
    NotConfigured,

    #[error("no text could be read from the document")]
    EmptyText,

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("language model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("language model returned no completion")]
    EmptyCompletion,

    #[error("invalid output schema: {0}")]
    Schema(String),

    #[error("could not parse model output: {0}")]
    Parse(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// A text-in, text-out completion endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> ExtractionResult<String>;
}

/// Connection settings for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
        }
    }
}

pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiChatModel {
    /// `None` when no API key is configured.
    pub fn from_settings(settings: &LlmSettings) -> Option<Self> {
        let api_key = settings.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> ExtractionResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "temperature": self.temperature,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExtractionError::EmptyCompletion)
    }
}

pub struct InvoiceExtractor {
    model: Arc<dyn LanguageModel>,
    format_instructions: String,
    validator: jsonschema::Validator,
}

impl InvoiceExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> ExtractionResult<Self> {
        let schema = serde_json::to_value(schemars::schema_for!(ExtractedInvoice))
            .map_err(|e| ExtractionError::Schema(e.to_string()))?;
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| ExtractionError::Schema(e.to_string()))?;
        Ok(Self {
            model,
            format_instructions: format_instructions(&schema),
            validator,
        })
    }

    pub fn format_instructions(&self) -> &str {
        &self.format_instructions
    }

    pub fn prompt(&self, user_input: &str) -> String {
        PROMPT_TEMPLATE
            .replace("{format_instructions}", &self.format_instructions)
            .replace("{user_input}", user_input)
    }

    pub async fn extract(&self, text: &str) -> ExtractionResult<ExtractedInvoice> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        let completion = self.model.complete(&self.prompt(text)).await?;
        match self.parse(&completion) {
            Ok(invoice) => Ok(invoice),
            Err(first) => {
                tracing::warn!(error = %first, "model output rejected, asking for a fix");
                let repair = REPAIR_TEMPLATE
                    .replace("{format_instructions}", &self.format_instructions)
                    .replace("{completion}", &completion)
                    .replace("{error}", &first);
                let fixed = self.model.complete(&repair).await?;
                self.parse(&fixed).map_err(ExtractionError::Parse)
            }
        }
    }

    /// Locate, validate and deserialize the JSON object in `completion`.
    pub fn parse(&self, completion: &str) -> Result<ExtractedInvoice, String> {
        let json = json_block(completion).ok_or("no JSON object in output")?;
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let errors: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("; "));
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }
}

fn format_instructions(schema: &serde_json::Value) -> String {
    let schema = serde_json::to_string(schema).unwrap_or_default();
    format!(
        "You must format your output as a JSON value that adheres to a given \"JSON Schema\" instance.\n\n\
         \"JSON Schema\" is a declarative language that allows you to annotate and validate JSON documents.\n\n\
         Your output will be parsed and type-checked according to the provided schema instance, so make sure all fields in your output match the schema exactly and there are no trailing commas!\n\n\
         Here is the JSON Schema instance your output must adhere to. Include the enclosing markdown codeblock:\n\
         ```json\n{}\n```\n",
        schema
    )
}

/// The first fenced `json` block, else the outermost `{...}` span.
fn json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Text of a PDF document, pages separated by newlines.
pub fn pdf_to_text(bytes: &[u8]) -> ExtractionResult<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyText);
    }
    Ok(text)
}

/// An extracted invoice turned into an editable, unsaved invoice form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub id: String,
    pub invoice_no: String,
    pub invoice_date: DateTime<Utc>,
    pub supplier_name: String,
    pub subtotal: f64,
    pub taxes: f64,
    pub discount: f64,
    pub grand_total: f64,
    pub file_id: String,
    pub budget_id: String,
    pub paid: bool,
    pub approved: bool,
    pub supplier_invoice_items: Vec<InvoiceDraftItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraftItem {
    pub id: SupplierInvoiceItemId,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub total_price: f64,
}

impl InvoiceDraft {
    /// `invoice_date` is read as `dd/mm/yyyy`; anything else becomes `today`.
    pub fn from_extracted(extracted: ExtractedInvoice, today: NaiveDate) -> Self {
        let date = NaiveDate::parse_from_str(extracted.invoice_date.trim(), "%d/%m/%Y")
            .unwrap_or(today);
        Self {
            id: String::new(),
            invoice_no: extracted.invoice_no,
            invoice_date: date.and_time(chrono::NaiveTime::MIN).and_utc(),
            supplier_name: extracted.supplier_name,
            subtotal: extracted.subtotal,
            taxes: extracted.taxes,
            discount: extracted.discount,
            grand_total: extracted.grand_total,
            file_id: String::new(),
            budget_id: String::new(),
            paid: false,
            approved: false,
            supplier_invoice_items: extracted
                .supplier_invoice_items
                .into_iter()
                .map(|item| InvoiceDraftItem {
                    id: SupplierInvoiceItemId::generate(),
                    description: item.description,
                    quantity: item.quantity,
                    unit: item.unit,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned completions and records the prompts it was sent.
    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        pub replies: Mutex<VecDeque<String>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> ExtractionResult<String> {
            self.prompts.lock().push(prompt.to_string());
            self.replies
                .lock()
                .pop_front()
                .ok_or(ExtractionError::EmptyCompletion)
        }
    }

    const GOOD: &str = r#"Here you go:
```json
{"invoiceNo":"780820","invoiceDate":"30/11/2022","supplierName":"Plywood Sdn Bhd",
 "subtotal":278,"taxes":13.9,"discount":0,"grandTotal":291.9,
 "supplierInvoiceItems":[{"description":"Plywood Type 1","quantity":10,"unit":"M2","unitPrice":5,"totalPrice":50}]}
```"#;

    #[tokio::test]
    async fn test_extract_fenced_output() {
        let model = Arc::new(ScriptedModel::new(&[GOOD]));
        let extractor = InvoiceExtractor::new(model.clone()).unwrap();
        let invoice = extractor.extract("INVOICE 780820 ...").await.unwrap();
        assert_eq!(invoice.invoice_no, "780820");
        assert_eq!(invoice.supplier_invoice_items.len(), 1);

        let prompts = model.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User input: \nINVOICE 780820"));
        assert!(prompts[0].contains("invoiceNo"));
    }

    #[tokio::test]
    async fn test_repair_round_trip() {
        let model = Arc::new(ScriptedModel::new(&[
            r#"{"invoiceNo": "A1" "subtotal": 3}"#,
            r#"{"invoiceNo": "A1", "subtotal": 3}"#,
        ]));
        let extractor = InvoiceExtractor::new(model.clone()).unwrap();
        let invoice = extractor.extract("text").await.unwrap();
        assert_eq!(invoice.invoice_no, "A1");
        assert_eq!(invoice.subtotal, 3.0);

        let prompts = model.prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("did not satisfy the constraints"));
    }

    #[tokio::test]
    async fn test_schema_violation_fails_after_one_repair() {
        let model = Arc::new(ScriptedModel::new(&[
            r#"{"subtotal": "lots"}"#,
            r#"{"subtotal": "still lots"}"#,
        ]));
        let extractor = InvoiceExtractor::new(model.clone()).unwrap();
        let err = extractor.extract("text").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Parse(_)));
        assert_eq!(model.prompts.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let extractor = InvoiceExtractor::new(Arc::new(ScriptedModel::default())).unwrap();
        assert!(matches!(
            extractor.extract("  \n").await.unwrap_err(),
            ExtractionError::EmptyText
        ));
    }

    #[test]
    fn test_json_block_falls_back_to_braces() {
        assert_eq!(json_block("noise {\"a\":1} tail"), Some("{\"a\":1}"));
        assert_eq!(json_block("nothing here"), None);
    }

    #[test]
    fn test_draft_from_extracted() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut extracted = ExtractedInvoice {
            invoice_no: "INV-9".to_string(),
            invoice_date: "30/11/2022".to_string(),
            supplier_invoice_items: vec![Default::default(), Default::default()],
            ..Default::default()
        };
        let draft = InvoiceDraft::from_extracted(extracted.clone(), today);
        assert_eq!(draft.invoice_date.date_naive(), NaiveDate::from_ymd_opt(2022, 11, 30).unwrap());
        assert_ne!(draft.supplier_invoice_items[0].id, draft.supplier_invoice_items[1].id);
        assert!(!draft.paid && !draft.approved);
        assert!(draft.budget_id.is_empty());

        extracted.invoice_date = "11/30/2022".to_string();
        let draft = InvoiceDraft::from_extracted(extracted, today);
        assert_eq!(draft.invoice_date.date_naive(), today);
    }

    #[test]
    fn test_no_api_key_means_no_model() {
        assert!(OpenAiChatModel::from_settings(&LlmSettings::default()).is_none());
        let settings = LlmSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        let model = OpenAiChatModel::from_settings(&settings).unwrap();
        assert_eq!(model.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(model.model, DEFAULT_MODEL);
    }
}
