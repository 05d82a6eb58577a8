//! Procedures of the `gpt` router.

use crate::api::ExtractedInvoice;
use crate::routes::extraction::{ExtractInvoiceFromFileInput, ExtractInvoiceInfoInput};
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::extraction::pdf_to_text;
use super::permissions::require_member;
use super::trycatch::try_catch;

pub async fn extract_invoice_info(
    ctx: &Context,
    input: ExtractInvoiceInfoInput,
) -> ProcedureResult<ExtractedInvoice> {
    ctx.user()?;
    try_catch(&["Failed to extract information"], async {
        let extractor = ctx.extractor()?;
        Ok(extractor.extract(&input.input_text).await?)
    })
    .await
}

/// Extract from a PDF already stored under the project.
pub async fn extract_invoice_info_from_file(
    ctx: &Context,
    input: ExtractInvoiceFromFileInput,
) -> ProcedureResult<ExtractedInvoice> {
    let user = ctx.user()?;
    try_catch(&["Failed to extract information"], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let extractor = ctx.extractor()?;
        let bytes = ctx.storage().read(&input.project_id, &input.file_id).await?;
        let text = pdf_to_text(&bytes)?;
        tracing::debug!(key = %input.file_id, chars = text.len(), "invoice text extracted");
        Ok(extractor.extract(&text).await?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProjectId;
    use crate::rpc::context::Services;
    use crate::rpc::error::ErrorCode;
    use crate::services::extraction::tests::ScriptedModel;
    use crate::services::extraction::InvoiceExtractor;
    use crate::services::test_support::context;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_extract_from_text() {
        let base = context().await;
        let model = Arc::new(ScriptedModel::new(&[
            r#"{"invoiceNo":"Q-11","supplierName":"Bricks Bhd","grandTotal":80}"#,
        ]));
        let services: Services = base
            .services()
            .clone()
            .with_extractor(Arc::new(InvoiceExtractor::new(model).unwrap()));
        let ctx = Context::new(services, base.session().cloned());

        let invoice = extract_invoice_info(
            &ctx,
            ExtractInvoiceInfoInput {
                input_text: "Bricks Bhd quotation Q-11 total 80".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(invoice.invoice_no, "Q-11");
        assert_eq!(invoice.grand_total, 80.0);
    }

    #[tokio::test]
    async fn test_unconfigured_extractor() {
        let ctx = context().await;
        let err = extract_invoice_info(
            &ctx,
            ExtractInvoiceInfoInput {
                input_text: "anything".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalServerError);
        assert_eq!(err.message, "Failed to extract information");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let base = context().await;
        let project = base
            .repo()
            .create_project("Scans", base.user_id().unwrap())
            .await
            .unwrap();
        let services = base
            .services()
            .clone()
            .with_extractor(Arc::new(
                InvoiceExtractor::new(Arc::new(ScriptedModel::default())).unwrap(),
            ));
        let ctx = Context::new(services, base.session().cloned());
        let err = extract_invoice_info_from_file(
            &ctx,
            ExtractInvoiceFromFileInput {
                project_id: project.id.clone(),
                file_id: format!("{}/missing.pdf", project.id),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = extract_invoice_info_from_file(
            &ctx,
            ExtractInvoiceFromFileInput {
                project_id: ProjectId::new("elsewhere"),
                file_id: "elsewhere/a.pdf".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }
}
