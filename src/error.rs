use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Per-field messages, keyed by the field name the server or the local checks use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errs = Self::new();
        errs.insert(field, message);
        errs
    }

    /// Keeps the first message recorded for a field.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, msg) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {msg}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// Errors returned by the REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not authorized (status {status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("server rejected the request: {0}")]
    Validation(FormErrors),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Form(#[from] FormErrors),
}

impl ApiError {
    /// Classify a non-success response body.
    ///
    /// ASP.NET style `{"errors": {"Field": ["msg", ...]}}` bodies become
    /// [`ApiError::Validation`]; 401/403 become [`ApiError::Unauthorized`];
    /// anything else keeps the server's `message` (or a short plain-text body).
    pub fn from_response(status: u16, body: &str) -> Self {
        let json: Option<serde_json::Value> = serde_json::from_str(body).ok();

        if let Some(errors) = json
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(|v| v.as_object())
        {
            let mut fields = FormErrors::new();
            for (field, msgs) in errors {
                let first = match msgs {
                    serde_json::Value::Array(list) => {
                        list.first().and_then(|m| m.as_str()).map(str::to_string)
                    }
                    serde_json::Value::String(s) => Some(s.clone()),
                    _ => None,
                };
                if let Some(msg) = first {
                    fields.insert(&lower_camel(field), msg);
                }
            }
            if !fields.is_empty() {
                return ApiError::Validation(fields);
            }
        }

        let message = json
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| match json.as_ref() {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| plain_body_message(body));

        match status {
            401 | 403 => ApiError::Unauthorized { status, message },
            _ => ApiError::Api { status, message },
        }
    }

    /// Server-supplied text worth showing to the user, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Api { message, .. } | ApiError::Unauthorized { message, .. }
                if !message.is_empty() =>
            {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// Longest raw body echoed into an error message.
const MAX_BODY_MESSAGE: usize = 200;

/// Markup pages are dropped so callers fall back to their own message.
fn plain_body_message(body: &str) -> String {
    let body = body.trim();
    if body.starts_with('<') {
        return String::new();
    }
    match body.char_indices().nth(MAX_BODY_MESSAGE) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Server field keys arrive as `FirstName`; local keys are `firstName`.
fn lower_camel(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
