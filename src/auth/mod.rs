//! Authentication context, roles and capability checks.
//!
//! The bearer token lives in an [`AuthContext`] that is handed to the API
//! client explicitly. Persisting the session is a separate, explicit step
//! performed by [`AuthContext::sign_in`] and [`AuthContext::sign_out`].

mod store;

pub use store::{SessionStore, SESSION_KEYS};

use crate::model::AuthPayload;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Collector,
    Viewer,
}

impl Role {
    /// Case-insensitive parse of the role string the server hands out.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "collector" => Some(Role::Collector),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Collector => "Collector",
            Role::Viewer => "Viewer",
        }
    }

    pub fn allows(self, cap: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::Collector => matches!(
                cap,
                ViewDonations | ExportDonations | ManageDonors | RecordDonations | ImportDonations
            ),
            Role::Viewer => matches!(cap, ViewDonations | ExportDonations),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("unknown role '{s}' (expected Admin, Collector or Viewer)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewDonations,
    ExportDonations,
    ManageDonors,
    RecordDonations,
    ImportDonations,
    ManageUsers,
    InviteSuperAdmins,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("not signed in; run `temple-admin login` first")]
    NotSignedIn,
    #[error("role '{role}' is not permitted to {action}")]
    Forbidden { role: String, action: &'static str },
}

impl Capability {
    fn action(self) -> &'static str {
        match self {
            Capability::ViewDonations => "view donations",
            Capability::ExportDonations => "export donations",
            Capability::ManageDonors => "manage donors",
            Capability::RecordDonations => "record donations",
            Capability::ImportDonations => "import donations",
            Capability::ManageUsers => "manage users",
            Capability::InviteSuperAdmins => "invite super admins",
        }
    }
}

/// A signed-in user, mirroring the four persisted session keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl Session {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn can(&self, cap: Capability) -> bool {
        self.role().map(|r| r.allows(cap)).unwrap_or(false)
    }
}

/// Result of a login, federated exchange or 2FA verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    SignedIn(Session),
    TwoFactorRequired { temp_token: String },
    PendingApproval { display_name: String },
}

impl LoginOutcome {
    pub fn from_payload(payload: AuthPayload) -> Self {
        if payload.requires_two_factor {
            if let Some(temp_token) = payload.temp_token.filter(|t| !t.is_empty()) {
                return LoginOutcome::TwoFactorRequired { temp_token };
            }
        }
        let display_name = payload
            .display_name
            .clone()
            .or_else(|| payload.email.clone())
            .unwrap_or_default();
        match payload.app_token {
            Some(token) if payload.is_active && !token.is_empty() => {
                LoginOutcome::SignedIn(Session {
                    token,
                    email: payload.email.unwrap_or_default(),
                    name: display_name,
                    role: payload.role.unwrap_or_default(),
                })
            }
            _ => LoginOutcome::PendingApproval { display_name },
        }
    }
}

/// Shared slot holding the current session. Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let ctx = Self::new();
        ctx.set(session);
        ctx
    }

    /// Restore whatever the store holds; an incomplete store means signed out.
    pub fn restore(store: &SessionStore) -> Result<Self> {
        let ctx = Self::new();
        if let Some(session) = store.load()? {
            tracing::debug!(email = %session.email, role = %session.role, "restored session");
            ctx.set(session);
        }
        Ok(ctx)
    }

    pub fn set(&self, session: Session) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(session);
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    pub fn session(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn require(&self, cap: Capability) -> Result<Session, AccessError> {
        let session = self.session().ok_or(AccessError::NotSignedIn)?;
        if session.can(cap) {
            Ok(session)
        } else {
            Err(AccessError::Forbidden {
                role: session.role.clone(),
                action: cap.action(),
            })
        }
    }

    /// Persist the session, then make it the active one.
    pub fn sign_in(&self, session: Session, store: &SessionStore) -> Result<()> {
        store.save(&session)?;
        tracing::info!(email = %session.email, role = %session.role, "signed in");
        self.set(session);
        Ok(())
    }

    /// Drop the active session and every persisted key.
    pub fn sign_out(&self, store: &SessionStore) -> Result<()> {
        self.clear();
        store.clear()?;
        tracing::info!("signed out");
        Ok(())
    }
}
