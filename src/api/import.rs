use super::{ApiClient, Blob};
use crate::error::ApiError;
use crate::import::{StatusSource, UploadFile};
use crate::model::{ImportJobSummary, ImportMode};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

impl ApiClient {
    /// POST /api/donationimport/dryrun?year= or POST /api/donationimport?year=
    pub async fn upload_import(
        &self,
        mode: ImportMode,
        year: i32,
        file: &UploadFile,
    ) -> Result<ImportJobSummary, ApiError> {
        let path = match mode {
            ImportMode::DryRun => "/api/donationimport/dryrun",
            ImportMode::Commit => "/api/donationimport",
        };
        let part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
        let form = Form::new().part("file", part);
        let rb = self.post(path).query(&[("year", year)]).multipart(form);
        Self::send_json_or_default(rb).await
    }

    /// GET /api/donationimport/status/{jobId}
    pub async fn import_status(&self, job_id: &str) -> Result<ImportJobSummary, ApiError> {
        let url = format!("/api/donationimport/status/{}", urlencoding::encode(job_id));
        Self::send_json(self.get(&url)).await
    }

    /// GET /api/donationimport/receipts/{jobId} (ZIP blob)
    pub async fn import_receipts(&self, job_id: &str) -> Result<Blob, ApiError> {
        let url = format!("/api/donationimport/receipts/{}", urlencoding::encode(job_id));
        Self::send_blob(self.get(&url)).await
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<ImportJobSummary, ApiError> {
        self.import_status(job_id).await
    }
}
