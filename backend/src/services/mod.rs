//! Procedure bodies and the backends they orchestrate.
//!
//! One module per router group holds the procedure functions. Each takes the
//! per-call [`Context`](crate::rpc::context::Context) and a validated input,
//! runs through [`trycatch::try_catch`] and returns the wire payload.
//! Storage, extraction and CSV rendering are the non-database backends.

pub mod budgets;
pub mod csv_export;
pub mod extraction;
pub mod files;
pub mod gpt;
pub mod permissions;
pub mod projects;
pub mod site_diaries;
pub mod storage;
pub mod supplier_invoices;
pub mod tasks;
pub mod trycatch;

#[cfg(test)]
pub(crate) mod test_support;

pub use extraction::{InvoiceDraft, InvoiceExtractor, LanguageModel, LlmSettings, OpenAiChatModel};
pub use storage::{FileStorage, S3Settings, StorageError, UrlSigner};
pub use trycatch::{try_catch, ServiceError, ServiceResult};
