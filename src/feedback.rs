//! User-facing banners for command outcomes.

use crate::auth::AccessError;
use crate::error::{ApiError, FormErrors};
use crate::import::{ImportError, StopReason};
use std::fmt;

pub const NETWORK_ERROR_MESSAGE: &str = "Could not reach the server. Check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Info,
    Error,
}

impl BannerKind {
    fn label(self) -> &'static str {
        match self {
            BannerKind::Success => "ok",
            BannerKind::Info => "info",
            BannerKind::Error => "error",
        }
    }
}

/// One message for the user, with per-field details for validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
    pub fields: Vec<(String, String)>,
}

impl Banner {
    fn new(kind: BannerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            fields: Vec::new(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(BannerKind::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(BannerKind::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(BannerKind::Error, text)
    }

    pub fn from_form(errors: &FormErrors) -> Self {
        let mut b = Self::error("Please fix the highlighted fields.");
        b.fields = errors
            .iter()
            .map(|(f, m)| (f.to_string(), m.to_string()))
            .collect();
        b
    }

    /// Banner for a failed API call. `fallback` is shown when the server gave
    /// nothing more specific.
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Http(_) => Self::error(NETWORK_ERROR_MESSAGE),
            ApiError::Validation(fields) | ApiError::Form(fields) => Self::from_form(fields),
            ApiError::Unauthorized { status: 401, .. } => {
                Self::info("Your session has expired. Please sign in again.")
            }
            ApiError::Unauthorized { .. } => {
                Self::error(err.server_message().unwrap_or("You do not have access to this action."))
            }
            ApiError::Api { .. } => Self::error(err.server_message().unwrap_or(fallback)),
            ApiError::Deserialize(_) => Self::error(fallback),
        }
    }

    /// Import failures never echo server detail; local checks list fields.
    pub fn from_import(err: &ImportError) -> Self {
        match err {
            ImportError::Invalid(fields) => Self::from_form(fields),
            ImportError::Failed(_) => Self::error(err.to_string()),
        }
    }

    pub fn from_access(err: &AccessError) -> Self {
        match err {
            AccessError::NotSignedIn => Self::info(err.to_string()),
            AccessError::Forbidden { .. } => Self::error(err.to_string()),
        }
    }

    /// How a followed import ended; a failed status poll is an error.
    pub fn from_stop(reason: &StopReason) -> Self {
        match reason {
            StopReason::Completed => Self::success("Email delivery finished."),
            StopReason::Cancelled => {
                Self::info("Stopped following the import; the job keeps running on the server.")
            }
            StopReason::Failed(e) => Self::error(format!("Status polling stopped: {e}")),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }

    /// Lines ready for the output writer: the banner, then one per field.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.to_string()];
        out.extend(self.fields.iter().map(|(f, m)| format!("  {f}: {m}")));
        out
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.text)
    }
}
