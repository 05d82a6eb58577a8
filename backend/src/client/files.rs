//! File browser and invoice extraction hooks.

use chrono::Utc;
use serde_json::json;

use super::api::ApiClient;
use super::cache::QueryKey;
use super::error::ClientResult;
use super::optimistic::OptimisticMutation;
use crate::api::{CreatedFolder, ExtractedInvoice, FileEntry, PresignedDownload, PresignedUpload, ProjectId};
use crate::routes::extraction::{
    ExtractInvoiceFromFileInput, ExtractInvoiceInfoInput, EXTRACT_INVOICE_INFO,
    EXTRACT_INVOICE_INFO_FROM_FILE,
};
use crate::routes::storage::{
    CreateFolderInput, DeleteObjectInput, FetchBucketContentsInput, PresignInput, CREATE_FOLDER,
    DELETE_S3_OBJECT, FETCH_S3_BUCKET_CONTENTS, GET_PRE_SIGNED_URL_FOR_DOWNLOAD,
    GET_PRE_SIGNED_URL_FOR_UPLOAD,
};
use crate::services::storage::folder_key;
use crate::services::InvoiceDraft;

const SCOPE: &str = "s3";

fn contents_key(project_id: &ProjectId, prefix: &str) -> QueryKey {
    QueryKey::new(
        FETCH_S3_BUCKET_CONTENTS,
        json!({ "projectId": project_id, "prefix": prefix }),
    )
}

impl ApiClient {
    pub async fn bucket_contents(&self, project_id: &ProjectId, prefix: &str) -> ClientResult<Vec<FileEntry>> {
        self.cache
            .query(
                FETCH_S3_BUCKET_CONTENTS,
                &FetchBucketContentsInput {
                    project_id: project_id.clone(),
                    prefix: prefix.to_string(),
                },
            )
            .await
    }

    /// Deletes a file, or a folder with everything under it.
    pub async fn delete_object(&self, input: DeleteObjectInput) -> ClientResult<()> {
        let (file_id, reconcile_id) = (input.file_id.clone(), input.file_id.clone());
        let key = contents_key(&input.project_id, &input.prefix);
        // A folder takes every listing below it along; refresh the whole project.
        let settled = if input.file_id.ends_with('/') {
            json!({ "projectId": input.project_id })
        } else {
            json!({ "projectId": input.project_id, "prefix": input.prefix })
        };
        OptimisticMutation::new(DELETE_S3_OBJECT, &input)?
            .scope(SCOPE)
            .cancel(FETCH_S3_BUCKET_CONTENTS)
            .edit(key.clone(), move |files: Option<Vec<FileEntry>>| {
                files.map(|f| f.into_iter().filter(|f| f.id != file_id).collect())
            })
            .reconcile(key, move |files: Option<Vec<FileEntry>>, _: ()| {
                files.map(|f| f.into_iter().filter(|f| f.id != reconcile_id).collect())
            })
            .invalidate(FETCH_S3_BUCKET_CONTENTS, Some(settled))
            .run(&self.cache)
            .await
    }

    pub async fn create_folder(&self, input: CreateFolderInput) -> ClientResult<CreatedFolder> {
        let placeholder = FileEntry {
            id: folder_key(&input.project_id, &input.prefix, &input.folder_name),
            name: input.folder_name.replace('/', "_"),
            mod_date: None,
            size: None,
            is_dir: true,
        };
        OptimisticMutation::new(CREATE_FOLDER, &input)?
            .scope(SCOPE)
            .cancel(FETCH_S3_BUCKET_CONTENTS)
            .edit(
                contents_key(&input.project_id, &input.prefix),
                move |files: Option<Vec<FileEntry>>| {
                    let mut files = files.unwrap_or_default();
                    if !files.iter().any(|f| f.is_dir && f.name == placeholder.name) {
                        files.push(placeholder);
                    }
                    Some(files)
                },
            )
            .invalidate(
                FETCH_S3_BUCKET_CONTENTS,
                Some(json!({ "projectId": input.project_id, "prefix": input.prefix })),
            )
            .run(&self.cache)
            .await
    }

    pub async fn presigned_download_url(&self, project_id: &ProjectId, file_id: &str) -> ClientResult<String> {
        let presigned: PresignedDownload = self
            .cache
            .mutate(
                GET_PRE_SIGNED_URL_FOR_DOWNLOAD,
                &PresignInput {
                    project_id: project_id.clone(),
                    file_id: file_id.to_string(),
                },
            )
            .await?;
        Ok(presigned.pre_signed_url_for_download)
    }

    pub async fn presigned_upload_url(&self, project_id: &ProjectId, file_id: &str) -> ClientResult<String> {
        let presigned: PresignedUpload = self
            .cache
            .mutate(
                GET_PRE_SIGNED_URL_FOR_UPLOAD,
                &PresignInput {
                    project_id: project_id.clone(),
                    file_id: file_id.to_string(),
                },
            )
            .await?;
        Ok(presigned.pre_signed_url_for_upload)
    }

    /// Invoice form prefilled from pasted text.
    pub async fn extract_invoice_info(&self, input_text: &str) -> ClientResult<InvoiceDraft> {
        let extracted: ExtractedInvoice = self
            .cache
            .mutate(
                EXTRACT_INVOICE_INFO,
                &ExtractInvoiceInfoInput {
                    input_text: input_text.to_string(),
                },
            )
            .await?;
        Ok(InvoiceDraft::from_extracted(extracted, Utc::now().date_naive()))
    }

    /// Invoice form prefilled from an uploaded PDF; the draft keeps the file id.
    pub async fn extract_invoice_info_from_file(
        &self,
        project_id: &ProjectId,
        file_id: &str,
    ) -> ClientResult<InvoiceDraft> {
        let extracted: ExtractedInvoice = self
            .cache
            .mutate(
                EXTRACT_INVOICE_INFO_FROM_FILE,
                &ExtractInvoiceFromFileInput {
                    project_id: project_id.clone(),
                    file_id: file_id.to_string(),
                },
            )
            .await?;
        let mut draft = InvoiceDraft::from_extracted(extracted, Utc::now().date_naive());
        draft.file_id = file_id.to_string();
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::Services;
    use crate::services::extraction::tests::ScriptedModel;
    use crate::services::test_support::{other_user, services};
    use crate::services::InvoiceExtractor;
    use std::sync::Arc;

    async fn client_with(services: Services) -> (ApiClient, ProjectId) {
        let client = ApiClient::local(services, Some(other_user("owner")));
        let project_id = client.create_project("Depot").await.unwrap().project.id;
        (client, project_id)
    }

    #[tokio::test]
    async fn test_folders_and_deletes() {
        let services = services();
        let storage = services.storage.clone();
        let (client, project_id) = client_with(services).await;

        client
            .create_folder(CreateFolderInput {
                project_id: project_id.clone(),
                prefix: "/".to_string(),
                folder_name: "drawings".to_string(),
            })
            .await
            .unwrap();
        let key = format!("{}/drawings/plan.pdf", project_id);
        storage.write(&project_id, &key, b"%PDF".to_vec()).await.unwrap();

        let root = client.bucket_contents(&project_id, "/").await.unwrap();
        assert_eq!(root.len(), 1);
        assert!(root[0].is_dir);
        assert_eq!(root[0].name, "drawings");

        let inside = client.bucket_contents(&project_id, "drawings/").await.unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].id, key);

        client
            .delete_object(DeleteObjectInput {
                project_id: project_id.clone(),
                prefix: "/".to_string(),
                file_id: root[0].id.clone(),
            })
            .await
            .unwrap();
        assert!(client.bucket_contents(&project_id, "/").await.unwrap().is_empty());
        assert!(client.bucket_contents(&project_id, "drawings/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_returns_draft() {
        let reply = r#"{"invoiceNo":"A-17","invoiceDate":"02/01/2024","supplierName":"Steelworks",
            "subtotal":90,"taxes":10,"discount":1,"grandTotal":99,"supplierInvoiceItems":[]}"#;
        let extractor = InvoiceExtractor::new(Arc::new(ScriptedModel::new(&[reply]))).unwrap();
        let (client, _) = client_with(services().with_extractor(Arc::new(extractor))).await;

        let draft = client.extract_invoice_info("INVOICE A-17 Steelworks").await.unwrap();
        assert_eq!(draft.invoice_no, "A-17");
        assert_eq!(draft.grand_total, 99.0);
        assert_eq!(
            draft.invoice_date.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!(draft.file_id.is_empty());
    }

    #[tokio::test]
    async fn test_presign_without_signer_reports_error() {
        let (client, project_id) = client_with(services()).await;
        let err = client
            .presigned_upload_url(&project_id, "invoice.pdf")
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Failed to get presigned url for upload"));
        assert!(client.notifier().notifications()[0].message.starts_with("Error: "));
    }
}
