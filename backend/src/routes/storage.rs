//! Inputs and outputs of the `s3` router (project file browser).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{required, required_id, InputResult, Validate};
use crate::api::ProjectId;

pub const FETCH_S3_BUCKET_CONTENTS: &str = "s3.fetchS3BucketContents";
pub const DELETE_S3_OBJECT: &str = "s3.deleteS3Object";
pub const GET_PRE_SIGNED_URL_FOR_DOWNLOAD: &str = "s3.getPreSignedURLForDownload";
pub const GET_PRE_SIGNED_URL_FOR_UPLOAD: &str = "s3.getPreSignedURLForUpload";
pub const CREATE_FOLDER: &str = "s3.createFolder";

fn check_project(id: &ProjectId) -> InputResult<()> {
    required_id(id.as_str(), "projectId", "A projectId is required")
}

/// `prefix` is the folder path inside the project, `/` for the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchBucketContentsInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub prefix: String,
}

impl Validate for FetchBucketContentsInput {
    fn validate(self) -> InputResult<Self> {
        check_project(&self.project_id)?;
        Ok(self)
    }
}

/// `file_id` is the full object key as returned in [`FileEntry::id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub prefix: String,
    pub file_id: String,
}

impl Validate for DeleteObjectInput {
    fn validate(self) -> InputResult<Self> {
        check_project(&self.project_id)?;
        required_id(&self.file_id, "fileId", "A fileId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignInput {
    pub project_id: ProjectId,
    pub file_id: String,
}

impl Validate for PresignInput {
    fn validate(self) -> InputResult<Self> {
        check_project(&self.project_id)?;
        required_id(&self.file_id, "fileId", "A fileId is required")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub prefix: String,
    pub folder_name: String,
}

impl Validate for CreateFolderInput {
    fn validate(mut self) -> InputResult<Self> {
        check_project(&self.project_id)?;
        required(&mut self.folder_name, "folderName", "A folder name is required")?;
        Ok(self)
    }
}

/// One row of the file browser. Folders have `is_dir` set and no size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedDownload {
    #[serde(rename = "preSignedURLForDownload")]
    pub pre_signed_url_for_download: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    #[serde(rename = "preSignedURLForUpload")]
    pub pre_signed_url_for_upload: String,
}

/// Key of the folder marker written by `createFolder`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFolder {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presigned_field_names() {
        let value = serde_json::to_value(PresignedDownload {
            pre_signed_url_for_download: "https://bucket/k".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({ "preSignedURLForDownload": "https://bucket/k" }));
    }

    #[test]
    fn test_folder_entry_omits_size() {
        let value = serde_json::to_value(FileEntry {
            id: "p1/drawings/".to_string(),
            name: "drawings".to_string(),
            mod_date: None,
            size: None,
            is_dir: true,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "id": "p1/drawings/", "name": "drawings", "isDir": true })
        );
    }
}
