//! Owner of one import screen's state: the held summary and its poller.

use super::{submit, ImportBackend, ImportError, ImportRequest, PollState, PollerHandle};
use crate::model::{ImportEvent, ImportJobSummary};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub struct ImportSession<B: ImportBackend + ?Sized + 'static> {
    backend: Arc<B>,
    interval: Duration,
    events: Option<UnboundedSender<ImportEvent>>,
    year: Option<i32>,
    submitted: Option<ImportJobSummary>,
    poller: Option<PollerHandle>,
    error: Option<String>,
}

impl<B: ImportBackend + ?Sized + 'static> ImportSession<B> {
    pub fn new(backend: Arc<B>, interval: Duration) -> Self {
        Self {
            backend,
            interval,
            events: None,
            year: None,
            submitted: None,
            poller: None,
            error: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<ImportEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Submit an upload. Any earlier poller is cancelled and the held summary
    /// cleared before the request goes out.
    pub async fn run(&mut self, request: &ImportRequest) -> Result<ImportJobSummary, ImportError> {
        self.reset();

        let summary = match submit(self.backend.as_ref(), request).await {
            Ok(s) => s,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };
        self.year = request.year;

        let job_id = summary.job_id.clone().filter(|id| !id.trim().is_empty());
        if let Some(tx) = &self.events {
            let _ = tx.send(ImportEvent::Submitted {
                mode: request.mode,
                job_id: job_id.clone(),
            });
        }
        if let Some(id) = job_id {
            self.poller = Some(PollerHandle::start(
                self.backend.clone(),
                &id,
                self.interval,
                self.events.clone(),
            ));
        }
        self.submitted = Some(summary.clone());
        Ok(summary)
    }

    /// The newest summary: the last poll response, else the upload response.
    pub fn summary(&self) -> Option<ImportJobSummary> {
        self.poller
            .as_ref()
            .and_then(PollerHandle::latest)
            .or_else(|| self.submitted.clone())
    }

    pub fn job_id(&self) -> Option<String> {
        self.summary().and_then(|s| s.job_id)
    }

    /// Year of the last accepted upload, falling back to what the server echoed.
    pub fn year(&self) -> Option<i32> {
        self.year.or_else(|| self.summary().and_then(|s| s.year))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn poll_state(&self) -> PollState {
        self.poller
            .as_ref()
            .map(PollerHandle::state)
            .unwrap_or(PollState::Idle)
    }

    /// Wait for the current poller, if any, to stop.
    pub async fn wait(&mut self) -> PollState {
        match self.poller.as_mut() {
            Some(p) => p.wait().await,
            None => PollState::Idle,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(p) = self.poller.as_mut() {
            p.cancel();
        }
    }

    fn reset(&mut self) {
        if let Some(mut p) = self.poller.take() {
            p.cancel();
        }
        self.submitted = None;
        self.year = None;
        self.error = None;
    }
}

impl<B: ImportBackend + ?Sized + 'static> Drop for ImportSession<B> {
    fn drop(&mut self) {
        self.cancel();
    }
}
