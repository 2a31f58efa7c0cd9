use super::Ctx;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use temple_admin::auth::Capability;
use temple_admin::export;
use temple_admin::feedback::Banner;
use temple_admin::import::{ImportRequest, ImportSession, PollState, PollerHandle, StopReason, UploadFile};
use temple_admin::model::{ImportEvent, ImportJobSummary, ImportMode};
use temple_admin::text_summary::build_import_summary;
use tokio::sync::mpsc;

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCommand {
    /// Validate a file without saving anything
    DryRun(UploadArgs),
    /// Import a file and send receipt emails
    Commit(UploadArgs),
    /// Show (or follow) the status of an import job
    Status(StatusArgs),
    /// Download the receipt ZIP for a job
    Receipts {
        job_id: String,
        /// Year used in the file name
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct UploadArgs {
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Return after the upload instead of following email delivery
    #[arg(long)]
    pub detach: bool,
    /// Write failed rows and email statuses as CSV when done
    #[arg(long)]
    pub csv: bool,
    /// Download the receipt ZIP once delivery has finished
    #[arg(long)]
    pub receipts: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StatusArgs {
    pub job_id: String,
    /// Keep polling until email delivery settles
    #[arg(long)]
    pub watch: bool,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub csv: bool,
}

pub async fn run(ctx: &Ctx, cmd: ImportCommand) -> Result<()> {
    ctx.require(Capability::ImportDonations)?;
    match cmd {
        ImportCommand::DryRun(a) => upload(ctx, ImportMode::DryRun, a).await,
        ImportCommand::Commit(a) => upload(ctx, ImportMode::Commit, a).await,
        ImportCommand::Status(a) => status(ctx, a).await,
        ImportCommand::Receipts { job_id, year } => download_receipts(ctx, &job_id, year).await,
    }
}

async fn upload(ctx: &Ctx, mode: ImportMode, a: UploadArgs) -> Result<()> {
    let file = a.file.as_deref().map(UploadFile::from_path).transpose()?;
    let request = ImportRequest {
        mode,
        year: a.year,
        file,
    };

    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<ImportEvent>();
    let mut session = ImportSession::new(Arc::new(ctx.client.clone()), ctx.cfg.poll_interval)
        .with_events(evt_tx);
    let first = session
        .run(&request)
        .await
        .map_err(|e| ctx.out.import_failed(&e))?;

    let label = match mode {
        ImportMode::DryRun => "Dry run",
        ImportMode::Commit => "Import",
    };
    ctx.out.success(format!("{label} submitted."));

    let stopped = if a.detach || session.poll_state() == PollState::Idle {
        None
    } else {
        Some(follow(ctx, evt_rx, || session.cancel()).await)
    };

    let summary = session.summary().unwrap_or(first);
    show_summary(ctx, &summary)?;
    if a.detach {
        if let Some(job) = summary.job_id.as_deref() {
            ctx.out.info(format!("Follow with: temple-admin import status {job} --watch"));
        }
    }

    let year = session.year();
    if a.csv {
        save_csvs(ctx, &summary, year)?;
    }
    if a.receipts && stopped == Some(StopReason::Completed) {
        if let Some(job) = summary.job_id.as_deref() {
            download_receipts(ctx, job, year).await?;
        }
    }
    match &stopped {
        Some(reason) => ctx.out.finish(Banner::from_stop(reason)),
        None => Ok(()),
    }
}

async fn status(ctx: &Ctx, a: StatusArgs) -> Result<()> {
    if !a.watch {
        let summary = ctx
            .client
            .import_status(&a.job_id)
            .await
            .map_err(|e| ctx.out.api_failed(&e, "Failed to load import status."))?;
        show_summary(ctx, &summary)?;
        if a.csv {
            save_csvs(ctx, &summary, a.year.or(summary.year))?;
        }
        return Ok(());
    }

    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<ImportEvent>();
    let mut poller = PollerHandle::start(
        Arc::new(ctx.client.clone()),
        &a.job_id,
        ctx.cfg.poll_interval,
        Some(evt_tx),
    );
    if poller.state() == PollState::Idle {
        return Err(ctx.out.failed("A job ID is required."));
    }
    let reason = follow(ctx, evt_rx, || poller.cancel()).await;
    if let Some(summary) = poller.latest() {
        show_summary(ctx, &summary)?;
        if a.csv {
            save_csvs(ctx, &summary, a.year.or(summary.year))?;
        }
    }
    ctx.out.finish(Banner::from_stop(&reason))
}

/// Print progress until the poller stops; Ctrl-C cancels it.
async fn follow(
    ctx: &Ctx,
    mut events: mpsc::UnboundedReceiver<ImportEvent>,
    mut cancel: impl FnMut(),
) -> StopReason {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Some(ImportEvent::Submitted { job_id, .. }) => {
                    if let Some(job) = job_id {
                        ctx.out.note(format!("Job {job}: waiting for email delivery (Ctrl-C to stop)"));
                    }
                }
                Some(ImportEvent::SummaryUpdated { summary }) => {
                    ctx.out.note(progress_line(&summary));
                }
                Some(ImportEvent::Stopped { reason }) => return reason,
                None => return StopReason::Cancelled,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                cancel();
            }
        }
    }
}

fn progress_line(s: &ImportJobSummary) -> String {
    let total = s.email_statuses.len();
    let settled = s
        .email_statuses
        .iter()
        .filter(|e| !e.status.is_in_progress())
        .count();
    format!(
        "Emails settled {settled}/{total} (sent {}, failed {})",
        s.emails_sent, s.emails_failed
    )
}

fn show_summary(ctx: &Ctx, summary: &ImportJobSummary) -> Result<()> {
    if ctx.out.json_mode() {
        return ctx.out.print_json(summary);
    }
    ctx.out.lines(build_import_summary(summary).lines);
    Ok(())
}

fn save_csvs(ctx: &Ctx, summary: &ImportJobSummary, year: Option<i32>) -> Result<()> {
    let Some(year) = year else {
        ctx.out.info("Pass --year to name the CSV files.");
        return Ok(());
    };
    let files = [
        (export::failed_rows_csv(summary)?, export::failed_rows_file_name(year), "failed rows"),
        (export::email_status_csv(summary)?, export::email_status_file_name(year), "email statuses"),
    ];
    for (csv, name, what) in files {
        match csv {
            Some(csv) => {
                let path = export::save_bytes(&ctx.cfg.output_dir, &name, csv.as_bytes())?;
                ctx.out.note(format!("Saved: {}", path.display()));
            }
            None => ctx.out.info(format!("No {what} to export.")),
        }
    }
    Ok(())
}

async fn download_receipts(ctx: &Ctx, job_id: &str, year: Option<i32>) -> Result<()> {
    let blob = ctx
        .client
        .import_receipts(job_id)
        .await
        .map_err(|e| ctx.out.api_failed(&e, "Failed to download receipts."))?;
    let name = export::receipts_zip_file_name(year, job_id);
    let path = export::save_bytes(&ctx.cfg.output_dir, &name, &blob.bytes)?;
    ctx.out.success(format!("Saved: {}", path.display()));
    Ok(())
}
