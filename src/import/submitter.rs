use super::ImportBackend;
use crate::error::{ApiError, FormErrors};
use crate::model::{ImportJobSummary, ImportMode};
use anyhow::Context;
use bytes::Bytes;
use std::path::Path;

pub const IMPORT_FAILED_MESSAGE: &str = "Error running import. Please check the server logs.";

/// File selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.bytes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub mode: ImportMode,
    pub year: Option<i32>,
    pub file: Option<UploadFile>,
}

impl ImportRequest {
    /// Year and file must both be present before anything is sent.
    pub fn check(&self) -> Result<(i32, &UploadFile), FormErrors> {
        let year = match self.year {
            Some(y) if y > 0 => y,
            _ => return Err(FormErrors::single("year", "Please select a year.")),
        };
        match self.file.as_ref() {
            Some(f) if !f.is_empty() => Ok((year, f)),
            _ => Err(FormErrors::single("file", "Please choose a file.")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    Invalid(FormErrors),
    #[error("Error running import. Please check the server logs.")]
    Failed(#[source] ApiError),
}

/// Upload the file to the dry-run or commit endpoint.
pub async fn submit<B: ImportBackend + ?Sized>(
    backend: &B,
    request: &ImportRequest,
) -> Result<ImportJobSummary, ImportError> {
    let (year, file) = request.check().map_err(ImportError::Invalid)?;
    tracing::info!(mode = request.mode.as_str(), year, file = %file.name, bytes = file.bytes.len(), "submitting import");
    backend
        .upload(request.mode, year, file)
        .await
        .map_err(ImportError::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(year: Option<i32>, file: Option<UploadFile>) -> ImportRequest {
        ImportRequest {
            mode: ImportMode::DryRun,
            year,
            file,
        }
    }

    #[test]
    fn missing_year_reported_first() {
        let err = request(None, None).check().unwrap_err();
        assert_eq!(err.get("year"), Some("Please select a year."));
    }

    #[test]
    fn missing_file_reported() {
        let err = request(Some(2024), None).check().unwrap_err();
        assert_eq!(err.get("file"), Some("Please choose a file."));
    }

    #[test]
    fn empty_file_counts_as_missing() {
        let err = request(Some(2024), Some(UploadFile::new("d.csv", Vec::<u8>::new())))
            .check()
            .unwrap_err();
        assert!(err.get("file").is_some());
    }

    #[test]
    fn from_path_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("donations-2024.csv");
        std::fs::write(&path, "FullName,Amount\nA,1\n").unwrap();
        let f = UploadFile::from_path(&path).unwrap();
        assert_eq!(f.name, "donations-2024.csv");
        assert!(!f.is_empty());
    }
}
