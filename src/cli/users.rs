use super::Ctx;
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use temple_admin::api::TwoFactorAction;
use temple_admin::auth::{Capability, Role};
use temple_admin::model::{AdminUser, NewUser, UserUpdate};

#[derive(Debug, Subcommand, Clone)]
pub enum UserCommand {
    List,
    /// Create a user with a role
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        display_name: String,
        #[arg(long, default_value = "Viewer")]
        role: Role,
    },
    /// Change a user's role or active flag
    Update {
        id: i64,
        #[arg(long)]
        role: Role,
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        active: bool,
    },
    Deactivate { id: i64 },
    /// Manage another user's two-factor authentication
    #[command(name = "2fa")]
    TwoFactor { id: i64, action: TwoFactorArg },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TwoFactorArg {
    Status,
    Enable,
    Disable,
    Reset,
}

fn user_line(u: &AdminUser) -> String {
    format!(
        "{:>5}  {:<32}  {:<24}  {:<10}  {}",
        u.id,
        u.email,
        u.display_name.as_deref().unwrap_or("-"),
        u.role.as_deref().unwrap_or("-"),
        if u.is_active { "active" } else { "inactive" }
    )
}

pub async fn run(ctx: &Ctx, cmd: UserCommand) -> Result<()> {
    ctx.require(Capability::ManageUsers)?;
    match cmd {
        UserCommand::List => {
            let users = ctx
                .client
                .list_users()
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to load users."))?;
            if ctx.out.json_mode() {
                return ctx.out.print_json(&users);
            }
            ctx.out.lines(users.iter().map(user_line).collect());
        }
        UserCommand::Create {
            email,
            display_name,
            role,
        } => {
            let user = NewUser {
                email: email.trim().to_string(),
                display_name: display_name.trim().to_string(),
                role: role.as_str().to_string(),
            };
            let resp = ctx
                .client
                .create_user(&user)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to create user."))?;
            ctx.out.success(
                resp.message
                    .unwrap_or_else(|| format!("User {} created as {role}.", user.email)),
            );
        }
        UserCommand::Update { id, role, active } => {
            let update = UserUpdate {
                role: role.as_str().to_string(),
                is_active: active,
            };
            ctx.client
                .update_user(id, &update)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to update user."))?;
            ctx.out.success(format!("User {id} updated."));
        }
        UserCommand::Deactivate { id } => {
            ctx.client
                .deactivate_user(id)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to deactivate user."))?;
            ctx.out.success(format!("User {id} deactivated."));
        }
        UserCommand::TwoFactor { id, action } => {
            let action = match action {
                TwoFactorArg::Status => {
                    let status = ctx
                        .client
                        .user_two_factor_status(id)
                        .await
                        .map_err(|e| ctx.out.api_failed(&e, "Failed to load 2FA status."))?;
                    if ctx.out.json_mode() {
                        return ctx.out.print_json(&status);
                    }
                    let state = if status.enabled { "enabled" } else { "disabled" };
                    ctx.out.line(format!("User {id}: two-factor {state}"));
                    return Ok(());
                }
                TwoFactorArg::Enable => TwoFactorAction::Enable,
                TwoFactorArg::Disable => TwoFactorAction::Disable,
                TwoFactorArg::Reset => TwoFactorAction::Reset,
            };
            let setup = ctx
                .client
                .user_two_factor(id, action)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Two-factor update failed."))?;
            if ctx.out.json_mode() {
                ctx.out.print_json(&setup)?;
            } else if !setup.backup_codes.is_empty() {
                ctx.out.line("New backup codes:");
                for code in &setup.backup_codes {
                    ctx.out.line(format!("  {code}"));
                }
            }
            ctx.out.success(format!("Two-factor settings updated for user {id}."));
        }
    }
    Ok(())
}
