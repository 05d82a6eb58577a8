//! Procedures of the `s3` router: the project file browser.

use crate::api::{CreatedFolder, FileEntry, PresignedDownload, PresignedUpload};
use crate::routes::storage::{
    CreateFolderInput, DeleteObjectInput, FetchBucketContentsInput, PresignInput,
};
use crate::rpc::context::Context;
use crate::rpc::error::ProcedureResult;

use super::permissions::require_member;
use super::trycatch::{try_catch, NO_PERMISSION_MESSAGE};

pub async fn fetch_s3_bucket_contents(
    ctx: &Context,
    input: FetchBucketContentsInput,
) -> ProcedureResult<Vec<FileEntry>> {
    let user = ctx.user()?;
    try_catch(
        &["Failed to fetch S3 bucket contents", NO_PERMISSION_MESSAGE],
        async {
            require_member(ctx.repo(), &user.id, &input.project_id).await?;
            Ok(ctx.storage().list(&input.project_id, &input.prefix).await?)
        },
    )
    .await
}

/// Delete a file, or a folder with everything below it.
pub async fn delete_s3_object(ctx: &Context, input: DeleteObjectInput) -> ProcedureResult<()> {
    let user = ctx.user()?;
    try_catch(&["Failed to delete S3 object", NO_PERMISSION_MESSAGE], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let deleted = ctx
            .storage()
            .delete_tree(&input.project_id, &input.file_id)
            .await?;
        tracing::info!(key = %input.file_id, deleted, "storage objects deleted");
        Ok(())
    })
    .await
}

pub async fn get_pre_signed_url_for_download(
    ctx: &Context,
    input: PresignInput,
) -> ProcedureResult<PresignedDownload> {
    let user = ctx.user()?;
    try_catch(
        &["Failed to get presigned url for download", NO_PERMISSION_MESSAGE],
        async {
            require_member(ctx.repo(), &user.id, &input.project_id).await?;
            let url = ctx
                .storage()
                .presign_download(&input.project_id, &input.file_id)
                .await?;
            Ok(PresignedDownload {
                pre_signed_url_for_download: url,
            })
        },
    )
    .await
}

pub async fn get_pre_signed_url_for_upload(
    ctx: &Context,
    input: PresignInput,
) -> ProcedureResult<PresignedUpload> {
    let user = ctx.user()?;
    try_catch(
        &["Failed to get presigned url for upload", NO_PERMISSION_MESSAGE],
        async {
            require_member(ctx.repo(), &user.id, &input.project_id).await?;
            let url = ctx
                .storage()
                .presign_upload(&input.project_id, &input.file_id)
                .await?;
            Ok(PresignedUpload {
                pre_signed_url_for_upload: url,
            })
        },
    )
    .await
}

pub async fn create_folder(ctx: &Context, input: CreateFolderInput) -> ProcedureResult<CreatedFolder> {
    let user = ctx.user()?;
    try_catch(&["Failed to create folder", NO_PERMISSION_MESSAGE], async {
        require_member(ctx.repo(), &user.id, &input.project_id).await?;
        let key = ctx
            .storage()
            .create_folder(&input.project_id, &input.prefix, &input.folder_name)
            .await?;
        Ok(CreatedFolder { key })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProjectId;
    use crate::rpc::error::ErrorCode;
    use crate::services::test_support::{context, context_as, other_user};

    async fn project(ctx: &Context) -> ProjectId {
        ctx.repo()
            .create_project("Files", ctx.user_id().unwrap())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_folder_browse_and_delete() {
        let ctx = context().await;
        let project_id = project(&ctx).await;

        let folder = create_folder(
            &ctx,
            CreateFolderInput {
                project_id: project_id.clone(),
                prefix: "/".to_string(),
                folder_name: "site/photos".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(folder.key, format!("{}/site_photos/", project_id));

        ctx.storage()
            .write(&project_id, &format!("{}site.jpg", folder.key), vec![1, 2])
            .await
            .unwrap();

        let root = fetch_s3_bucket_contents(
            &ctx,
            FetchBucketContentsInput {
                project_id: project_id.clone(),
                prefix: "/".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(root.len(), 1);
        assert!(root[0].is_dir);
        assert_eq!(root[0].name, "site_photos");

        delete_s3_object(
            &ctx,
            DeleteObjectInput {
                project_id: project_id.clone(),
                prefix: "/".to_string(),
                file_id: folder.key.clone(),
            },
        )
        .await
        .unwrap();
        let root = fetch_s3_bucket_contents(
            &ctx,
            FetchBucketContentsInput {
                project_id,
                prefix: "/".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(root.is_empty());
    }

    #[tokio::test]
    async fn test_outsider_gets_permission_message() {
        let ctx = context().await;
        let project_id = project(&ctx).await;
        let outsider = context_as(&ctx, other_user("outsider")).await;
        let err = fetch_s3_bucket_contents(
            &outsider,
            FetchBucketContentsInput {
                project_id,
                prefix: "/".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(
            err.message,
            "Failed to fetch S3 bucket contents. You do not have permission to this project"
        );
    }

    #[tokio::test]
    async fn test_presign_without_signer_fails() {
        let ctx = context().await;
        let project_id = project(&ctx).await;
        let err = get_pre_signed_url_for_upload(
            &ctx,
            PresignInput {
                project_id,
                file_id: "plan.pdf".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalServerError);
    }
}
