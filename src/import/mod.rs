//! Annual donation import: upload, then poll the server-owned job.
//!
//! The submitter checks its inputs and uploads the file; the poller follows
//! the job until email delivery settles; the session owns both and tears the
//! poller down when it is dropped or a new import starts.

mod poller;
mod session;
mod submitter;

pub use poller::{PollState, PollerHandle};
pub use session::ImportSession;
pub use submitter::{submit, ImportError, ImportRequest, UploadFile, IMPORT_FAILED_MESSAGE};

use crate::error::ApiError;
use crate::model::{ImportJobSummary, ImportMode};
use async_trait::async_trait;

/// Why polling ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every receipt email reached a final state.
    Completed,
    /// A status request failed; polling does not retry.
    Failed(String),
    /// The owner cancelled the poller.
    Cancelled,
}

/// Anything that can report the status of an import job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<ImportJobSummary, ApiError>;
}

/// Status source that can also accept uploads.
#[async_trait]
pub trait ImportBackend: StatusSource {
    async fn upload(
        &self,
        mode: ImportMode,
        year: i32,
        file: &UploadFile,
    ) -> Result<ImportJobSummary, ApiError>;
}

#[async_trait]
impl ImportBackend for crate::api::ApiClient {
    async fn upload(
        &self,
        mode: ImportMode,
        year: i32,
        file: &UploadFile,
    ) -> Result<ImportJobSummary, ApiError> {
        self.upload_import(mode, year, file).await
    }
}
