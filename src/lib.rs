//! Administrative console for the temple donation-management REST API.
//!
//! The library holds everything except argument parsing: the API client,
//! the auth context, form checks, the import submitter and poller, and the
//! CSV/text exporters. The `temple-admin` binary wires them to a CLI.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod feedback;
pub mod forms;
pub mod import;
pub mod listing;
pub mod logging;
pub mod model;
pub mod text_summary;
