use super::{StatusSource, StopReason};
use crate::model::{ImportEvent, ImportJobSummary};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped(StopReason),
}

/// State shared between the poll task and its handle.
///
/// Summary writes and cancellation both happen under this one lock, so once
/// `cancel` has returned no further summary can land.
#[derive(Debug)]
struct Shared {
    state: PollState,
    summary: Option<ImportJobSummary>,
    requests: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owner-side handle of a status poller.
#[derive(Debug)]
pub struct PollerHandle {
    job_id: String,
    shared: Arc<Mutex<Shared>>,
    cancel_tx: watch::Sender<bool>,
    events: Option<mpsc::UnboundedSender<ImportEvent>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Start polling `job_id` every `interval`; the first request goes out one
    /// full interval from now. An empty job id leaves the poller idle.
    pub fn start<S>(
        source: Arc<S>,
        job_id: &str,
        interval: Duration,
        events: Option<mpsc::UnboundedSender<ImportEvent>>,
    ) -> Self
    where
        S: StatusSource + ?Sized + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let idle = job_id.trim().is_empty();
        let shared = Arc::new(Mutex::new(Shared {
            state: if idle { PollState::Idle } else { PollState::Polling },
            summary: None,
            requests: 0,
        }));

        let task = if idle {
            None
        } else {
            tracing::info!(job_id, interval_ms = interval.as_millis() as u64, "polling import status");
            Some(tokio::spawn(poll_loop(PollLoop {
                source,
                job_id: job_id.to_string(),
                interval,
                shared: shared.clone(),
                cancel_rx,
                events: events.clone(),
            })))
        };

        Self {
            job_id: job_id.to_string(),
            shared,
            cancel_tx,
            events,
            task,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> PollState {
        lock(&self.shared).state.clone()
    }

    /// Most recent summary applied by the poller.
    pub fn latest(&self) -> Option<ImportJobSummary> {
        lock(&self.shared).summary.clone()
    }

    /// Status requests issued so far.
    pub fn requests(&self) -> u64 {
        lock(&self.shared).requests
    }

    /// Stop polling. Safe to call repeatedly and with a request in flight.
    pub fn cancel(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if matches!(shared.state, PollState::Polling) {
                shared.state = PollState::Stopped(StopReason::Cancelled);
                tracing::info!(job_id = %self.job_id, "import polling cancelled");
                if let Some(tx) = &self.events {
                    let _ = tx.send(ImportEvent::Stopped {
                        reason: StopReason::Cancelled,
                    });
                }
            }
        }
        let _ = self.cancel_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait until the poller stops on its own (or was cancelled) and return the state.
    pub async fn wait(&mut self) -> PollState {
        if let Some(task) = self.task.take() {
            // A cancelled task reports a JoinError; the state already says why.
            let _ = task.await;
        }
        self.state()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PollLoop<S: ?Sized> {
    source: Arc<S>,
    job_id: String,
    interval: Duration,
    shared: Arc<Mutex<Shared>>,
    cancel_rx: watch::Receiver<bool>,
    events: Option<mpsc::UnboundedSender<ImportEvent>>,
}

async fn poll_loop<S>(params: PollLoop<S>)
where
    S: StatusSource + ?Sized,
{
    let PollLoop {
        source,
        job_id,
        interval,
        shared,
        mut cancel_rx,
        events,
    } = params;

    // Requests are awaited inside the loop; a tick that comes due while one is
    // outstanding is skipped rather than queued.
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel_rx.changed() => return,
            _ = ticker.tick() => {}
        }

        {
            let mut s = lock(&shared);
            if !matches!(s.state, PollState::Polling) {
                return;
            }
            s.requests += 1;
        }

        let result = tokio::select! {
            biased;
            _ = cancel_rx.changed() => return,
            r = source.fetch_status(&job_id) => r,
        };

        let mut s = lock(&shared);
        if !matches!(s.state, PollState::Polling) {
            return;
        }
        match result {
            Ok(summary) => {
                let complete = summary.is_email_delivery_complete();
                tracing::debug!(
                    job_id = %job_id,
                    emails = summary.email_statuses.len(),
                    complete,
                    "import status"
                );
                if let Some(tx) = &events {
                    let _ = tx.send(ImportEvent::SummaryUpdated {
                        summary: Box::new(summary.clone()),
                    });
                }
                s.summary = Some(summary);
                if complete {
                    s.state = PollState::Stopped(StopReason::Completed);
                    tracing::info!(job_id = %job_id, "import email delivery complete");
                    if let Some(tx) = &events {
                        let _ = tx.send(ImportEvent::Stopped {
                            reason: StopReason::Completed,
                        });
                    }
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "import status request failed; polling stopped");
                let reason = StopReason::Failed(e.to_string());
                s.state = PollState::Stopped(reason.clone());
                if let Some(tx) = &events {
                    let _ = tx.send(ImportEvent::Stopped { reason });
                }
                return;
            }
        }
    }
}
