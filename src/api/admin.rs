use super::ApiClient;
use crate::error::ApiError;
use crate::model::{AdminUser, MessageResponse, NewUser, TwoFactorSetup, TwoFactorStatus, UserUpdate};

/// Per-user 2FA actions under /api/admin/users/{id}/2fa/.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorAction {
    Enable,
    Disable,
    Reset,
}

impl TwoFactorAction {
    fn segment(self) -> &'static str {
        match self {
            TwoFactorAction::Enable => "enable",
            TwoFactorAction::Disable => "disable",
            TwoFactorAction::Reset => "reset",
        }
    }
}

impl ApiClient {
    /// GET /api/admin/users
    pub async fn list_users(&self) -> Result<Vec<AdminUser>, ApiError> {
        Self::send_json_or_default(self.get("/api/admin/users")).await
    }

    /// POST /api/admin/users
    pub async fn create_user(&self, user: &NewUser) -> Result<MessageResponse, ApiError> {
        Self::send_json_or_default(self.post("/api/admin/users").json(user)).await
    }

    /// PUT /api/admin/users/{id}
    pub async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<(), ApiError> {
        Self::send_empty(self.put(&format!("/api/admin/users/{user_id}")).json(update)).await
    }

    /// DELETE /api/admin/users/{id}
    pub async fn deactivate_user(&self, user_id: i64) -> Result<(), ApiError> {
        Self::send_empty(self.delete(&format!("/api/admin/users/{user_id}"))).await
    }

    /// POST /api/admin/users/{id}/2fa/{enable,disable,reset}
    ///
    /// Enabling or resetting may hand back fresh setup material.
    pub async fn user_two_factor(
        &self,
        user_id: i64,
        action: TwoFactorAction,
    ) -> Result<TwoFactorSetup, ApiError> {
        let path = format!("/api/admin/users/{user_id}/2fa/{}", action.segment());
        Self::send_json_or_default(self.post(&path)).await
    }

    /// GET /api/admin/users/{id}/2fa/status
    pub async fn user_two_factor_status(&self, user_id: i64) -> Result<TwoFactorStatus, ApiError> {
        Self::send_json(self.get(&format!("/api/admin/users/{user_id}/2fa/status"))).await
    }
}
