mod account;
mod donations;
mod donors;
mod import;
mod users;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use temple_admin::api::ApiClient;
use temple_admin::auth::{AccessError, AuthContext, Capability, Session, SessionStore};
use temple_admin::config::{default_user_agent, AppConfig, DEFAULT_BASE_URL};
use temple_admin::error::{ApiError, FormErrors};
use temple_admin::feedback::Banner;
use temple_admin::import::ImportError;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// A failure that has already been shown to the user as a banner.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(pub String);

#[derive(Debug, Parser, Clone)]
#[command(
    name = "temple-admin",
    version,
    about = "Administrative console for the temple donation-management service"
)]
pub struct Cli {
    /// Base URL of the donation-management API
    #[arg(long, global = true, env = "TEMPLE_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Session file holding the signed-in user's token
    #[arg(long, global = true, env = "TEMPLE_ADMIN_SESSION")]
    pub session_file: Option<PathBuf>,

    /// Directory downloads and CSV exports are written to (default: current dir)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Interval between import status requests
    #[arg(long, global = true, default_value = "1s")]
    pub poll_interval: humantime::Duration,

    /// Per-request timeout
    #[arg(long, global = true, default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Sign in with email and password
    Login(account::LoginArgs),
    /// Sign in with a Google id token
    LoginGoogle {
        #[arg(long)]
        id_token: String,
    },
    /// Request a new account (an admin must approve it)
    Register(account::RegisterArgs),
    /// Finish a sign-in that requires a two-factor code
    #[command(name = "verify-2fa")]
    VerifyTwoFactor {
        #[arg(long)]
        temp_token: String,
        #[arg(long)]
        code: String,
    },
    /// Set a new password with a reset token
    ResetPassword(account::ResetArgs),
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage the signed-in user's two-factor authentication
    #[command(name = "2fa", subcommand)]
    TwoFactor(account::TwoFactorCommand),
    /// Invite a super admin
    #[command(name = "super-admin", subcommand)]
    SuperAdmin(account::SuperAdminCommand),
    /// Register, find and remove donors
    #[command(subcommand)]
    Donor(donors::DonorCommand),
    /// Record, list and export donations
    #[command(subcommand)]
    Donation(donations::DonationCommand),
    /// Annual donation import
    #[command(subcommand)]
    Import(import::ImportCommand),
    /// User administration
    #[command(subcommand)]
    Users(users::UserCommand),
    /// Print the effective configuration
    Config,
}

/// Build an `AppConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<AppConfig> {
    let session_file = match args.session_file.clone() {
        Some(p) => p,
        None => SessionStore::default_path()?,
    };
    let output_dir = match args.output_dir.clone() {
        Some(p) => p,
        None => std::env::current_dir().context("get current directory")?,
    };
    Ok(AppConfig {
        base_url: args.base_url.clone(),
        session_file,
        output_dir,
        poll_interval: Duration::from(args.poll_interval),
        timeout: Duration::from(args.timeout),
        user_agent: default_user_agent(),
    })
}

/// Everything a command needs: config, session, client and output.
pub(crate) struct Ctx {
    pub cfg: AppConfig,
    pub store: SessionStore,
    pub client: ApiClient,
    pub out: Output,
}

impl Ctx {
    pub fn auth(&self) -> &AuthContext {
        self.client.auth()
    }

    /// Capability gate run before any request a command makes.
    pub fn require(&self, cap: Capability) -> Result<Session> {
        self.auth()
            .require(cap)
            .map_err(|e| self.out.access_denied(&e))
    }
}

pub(crate) struct Output {
    tx: mpsc::UnboundedSender<OutputLine>,
    json: bool,
}

impl Output {
    pub fn json_mode(&self) -> bool {
        self.json
    }

    pub fn line(&self, msg: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Stdout(msg.into()));
    }

    pub fn note(&self, msg: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Stderr(msg.into()));
    }

    pub fn lines(&self, lines: Vec<String>) {
        for l in lines {
            self.line(l);
        }
    }

    /// Errors and JSON-mode banners go to stderr so stdout stays parseable.
    pub fn banner(&self, banner: &Banner) {
        for l in banner.lines() {
            if banner.is_error() || self.json {
                self.note(l);
            } else {
                self.line(l);
            }
        }
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.banner(&Banner::success(msg));
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.banner(&Banner::info(msg));
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        self.line(serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn reported(&self, banner: Banner) -> anyhow::Error {
        self.banner(&banner);
        Reported(banner.text).into()
    }

    pub fn api_failed(&self, err: &ApiError, fallback: &str) -> anyhow::Error {
        self.reported(Banner::from_api(err, fallback))
    }

    pub fn form_failed(&self, errs: &FormErrors) -> anyhow::Error {
        self.reported(Banner::from_form(errs))
    }

    pub fn import_failed(&self, err: &ImportError) -> anyhow::Error {
        self.reported(Banner::from_import(err))
    }

    pub fn access_denied(&self, err: &AccessError) -> anyhow::Error {
        self.reported(Banner::from_access(err))
    }

    pub fn failed(&self, msg: impl Into<String>) -> anyhow::Error {
        self.reported(Banner::error(msg))
    }

    /// Print the banner; error banners become a `Reported` failure.
    pub fn finish(&self, banner: Banner) -> Result<()> {
        if banner.is_error() {
            return Err(self.reported(banner));
        }
        self.banner(&banner);
        Ok(())
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;
    tracing::debug!(base_url = %cfg.base_url, session = %cfg.session_file.display(), "configuration");

    let store = SessionStore::new(cfg.session_file.clone());
    let auth = AuthContext::restore(&store)?;
    let client = ApiClient::new(&cfg, auth).context("build HTTP client")?;

    let (out_tx, out_handle) = spawn_output_writer();
    let ctx = Ctx {
        cfg,
        store,
        client,
        out: Output {
            tx: out_tx,
            json: args.json,
        },
    };

    let result = dispatch(&ctx, args.command).await;

    drop(ctx);
    let _ = out_handle.await;
    result
}

async fn dispatch(ctx: &Ctx, command: Command) -> Result<()> {
    match command {
        Command::Login(a) => account::login(ctx, a).await,
        Command::LoginGoogle { id_token } => account::login_google(ctx, &id_token).await,
        Command::Register(a) => account::register(ctx, a).await,
        Command::VerifyTwoFactor { temp_token, code } => {
            account::verify_two_factor(ctx, &temp_token, &code).await
        }
        Command::ResetPassword(a) => account::reset_password(ctx, a).await,
        Command::Logout => account::logout(ctx),
        Command::Whoami => account::whoami(ctx),
        Command::TwoFactor(c) => account::two_factor(ctx, c).await,
        Command::SuperAdmin(c) => account::super_admin(ctx, c).await,
        Command::Donor(c) => donors::run(ctx, c).await,
        Command::Donation(c) => donations::run(ctx, c).await,
        Command::Import(c) => import::run(ctx, c).await,
        Command::Users(c) => users::run(ctx, c).await,
        Command::Config => ctx.out.print_json(&ctx.cfg),
    }
}
