use super::Ctx;
use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use temple_admin::auth::{Capability, LoginOutcome};
use temple_admin::forms::check_password_reset;
use temple_admin::model::{AuthPayload, TwoFactorSetup};

#[derive(Debug, Args, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "TEMPLE_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args, Clone)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    /// Defaults to the email address
    #[arg(long)]
    pub display_name: Option<String>,
    #[arg(long, env = "TEMPLE_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args, Clone)]
pub struct ResetArgs {
    /// Token from the reset link
    #[arg(long, default_value = "")]
    pub token: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub confirm: String,
    /// Current two-factor code, if 2FA is enabled
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum TwoFactorCommand {
    /// Show whether 2FA is on
    Status,
    /// Start 2FA setup; prints the secret and backup codes
    Enable {
        #[arg(long, env = "TEMPLE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Confirm setup with a code from the authenticator
    Verify {
        #[arg(long)]
        code: String,
    },
    Disable {
        #[arg(long, env = "TEMPLE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        code: String,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum SuperAdminCommand {
    Invite {
        #[arg(long)]
        email: String,
        #[arg(long)]
        display_name: String,
    },
}

/// Apply a login response: persist on success, otherwise explain what's next.
fn finish_login(ctx: &Ctx, payload: AuthPayload) -> Result<()> {
    match LoginOutcome::from_payload(payload) {
        LoginOutcome::SignedIn(session) => {
            let line = format!("Signed in as {} ({}).", session.name, session.role);
            let shown = json!({ "email": session.email, "name": session.name, "role": session.role });
            ctx.auth().sign_in(session, &ctx.store)?;
            if ctx.out.json_mode() {
                ctx.out.print_json(&shown)?;
            }
            ctx.out.success(line);
        }
        LoginOutcome::TwoFactorRequired { temp_token } => {
            if ctx.out.json_mode() {
                ctx.out.print_json(&json!({ "requiresTwoFactor": true, "tempToken": temp_token }))?;
            }
            ctx.out.info(format!(
                "Two-factor code required. Run: temple-admin verify-2fa --temp-token {temp_token} --code <code>"
            ));
        }
        LoginOutcome::PendingApproval { display_name } => {
            ctx.out.info(format!(
                "Hi {display_name}, your account is pending admin approval."
            ));
        }
    }
    Ok(())
}

pub async fn login(ctx: &Ctx, a: LoginArgs) -> Result<()> {
    match ctx.client.login(a.email.trim(), &a.password).await {
        Ok(payload) => finish_login(ctx, payload),
        Err(e) => Err(ctx.out.api_failed(&e, "Login failed.")),
    }
}

pub async fn login_google(ctx: &Ctx, id_token: &str) -> Result<()> {
    match ctx.client.exchange("google", id_token).await {
        Ok(payload) => finish_login(ctx, payload),
        Err(e) => Err(ctx.out.api_failed(&e, "Google sign-in failed.")),
    }
}

pub async fn verify_two_factor(ctx: &Ctx, temp_token: &str, code: &str) -> Result<()> {
    match ctx.client.verify_two_factor(temp_token, code.trim()).await {
        Ok(payload) => finish_login(ctx, payload),
        Err(e) => Err(ctx.out.api_failed(&e, "Invalid two-factor code.")),
    }
}

pub async fn register(ctx: &Ctx, a: RegisterArgs) -> Result<()> {
    let resp = ctx
        .client
        .register(a.email.trim(), a.display_name.as_deref(), &a.password)
        .await
        .map_err(|e| ctx.out.api_failed(&e, "Registration failed."))?;
    ctx.out.success(
        resp.message
            .unwrap_or_else(|| "Registration received. An admin must approve your account.".into()),
    );
    Ok(())
}

pub async fn reset_password(ctx: &Ctx, a: ResetArgs) -> Result<()> {
    check_password_reset(&a.token, &a.password, &a.confirm).map_err(|e| ctx.out.form_failed(&e))?;
    let resp = ctx
        .client
        .reset_password(a.token.trim(), &a.password, a.code.as_deref())
        .await
        .map_err(|e| ctx.out.api_failed(&e, "Password reset failed."))?;
    if ctx.out.json_mode() {
        ctx.out.print_json(&resp)?;
    }
    ctx.out.success(resp.message.clone().unwrap_or_else(|| "Password updated.".into()));
    print_setup(
        ctx,
        &TwoFactorSetup {
            secret: resp.secret,
            qr_code_uri: resp.qr_code_uri,
            backup_codes: resp.backup_codes,
        },
    );
    Ok(())
}

pub fn logout(ctx: &Ctx) -> Result<()> {
    ctx.auth().sign_out(&ctx.store)?;
    ctx.out.success("Signed out.");
    Ok(())
}

pub fn whoami(ctx: &Ctx) -> Result<()> {
    let Some(session) = ctx.auth().session() else {
        ctx.out.info("Not signed in.");
        return Ok(());
    };
    if ctx.out.json_mode() {
        return ctx.out.print_json(&json!({
            "email": session.email,
            "name": session.name,
            "role": session.role,
        }));
    }
    ctx.out.line(format!("{} <{}>", session.name, session.email));
    match session.role() {
        Some(role) => ctx.out.line(format!("Role: {role}")),
        None => ctx.out.line(format!("Role: {} (unrecognized)", session.role)),
    }
    Ok(())
}

fn print_setup(ctx: &Ctx, setup: &TwoFactorSetup) {
    if let Some(secret) = setup.secret.as_deref() {
        ctx.out.line(format!("Secret: {secret}"));
    }
    if let Some(uri) = setup.qr_code_uri.as_deref() {
        ctx.out.line(format!("Authenticator URI: {uri}"));
    }
    if !setup.backup_codes.is_empty() {
        ctx.out.line("Backup codes (store these somewhere safe):");
        for code in &setup.backup_codes {
            ctx.out.line(format!("  {code}"));
        }
    }
}

pub async fn two_factor(ctx: &Ctx, cmd: TwoFactorCommand) -> Result<()> {
    if ctx.auth().session().is_none() {
        return Err(ctx.out.access_denied(&temple_admin::auth::AccessError::NotSignedIn));
    }
    match cmd {
        TwoFactorCommand::Status => {
            let status = ctx
                .client
                .own_two_factor_status()
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to load 2FA status."))?;
            if ctx.out.json_mode() {
                return ctx.out.print_json(&status);
            }
            let state = if status.enabled { "enabled" } else { "disabled" };
            ctx.out.line(format!(
                "Two-factor authentication is {state} ({} backup codes left).",
                status.backup_codes_count
            ));
        }
        TwoFactorCommand::Enable { password } => {
            let setup = ctx
                .client
                .enable_own_two_factor(&password)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to start 2FA setup."))?;
            if ctx.out.json_mode() {
                return ctx.out.print_json(&setup);
            }
            print_setup(ctx, &setup);
            ctx.out.info("Confirm with: temple-admin 2fa verify --code <code>");
        }
        TwoFactorCommand::Verify { code } => {
            ctx.client
                .verify_two_factor_setup(code.trim())
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Invalid two-factor code."))?;
            ctx.out.success("Two-factor authentication enabled.");
        }
        TwoFactorCommand::Disable { password, code } => {
            ctx.client
                .disable_own_two_factor(&password, code.trim())
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to disable 2FA."))?;
            ctx.out.success("Two-factor authentication disabled.");
        }
    }
    Ok(())
}

pub async fn super_admin(ctx: &Ctx, cmd: SuperAdminCommand) -> Result<()> {
    ctx.require(Capability::InviteSuperAdmins)?;
    match cmd {
        SuperAdminCommand::Invite { email, display_name } => {
            ctx.client
                .invite_super_admin(email.trim(), display_name.trim())
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to invite super admin."))?;
            ctx.out.success(format!("Invitation sent to {}.", email.trim()));
        }
    }
    Ok(())
}
