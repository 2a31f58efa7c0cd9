use super::ApiClient;
use crate::error::ApiError;
use crate::model::{AuthPayload, MessageResponse, ResetPasswordResponse, TwoFactorSetup, TwoFactorStatus};
use serde_json::json;

impl ApiClient {
    /// POST /api/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let body = json!({ "email": email, "password": password });
        Self::send_json(self.post("/api/auth/login").json(&body)).await
    }

    /// POST /api/auth/register. The display name falls back to the email.
    pub async fn register(
        &self,
        email: &str,
        display_name: Option<&str>,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let display_name = display_name.filter(|n| !n.trim().is_empty()).unwrap_or(email);
        let body = json!({ "email": email, "displayName": display_name, "password": password });
        Self::send_json_or_default(self.post("/api/auth/register").json(&body)).await
    }

    /// POST /api/auth/exchange (federated sign-in with a provider id token)
    pub async fn exchange(&self, provider: &str, id_token: &str) -> Result<AuthPayload, ApiError> {
        let body = json!({ "provider": provider, "idToken": id_token });
        Self::send_json(self.post("/api/auth/exchange").json(&body)).await
    }

    /// POST /api/auth/verify-2fa
    pub async fn verify_two_factor(&self, temp_token: &str, code: &str) -> Result<AuthPayload, ApiError> {
        let body = json!({ "tempToken": temp_token, "code": code });
        Self::send_json(self.post("/api/auth/verify-2fa").json(&body)).await
    }

    /// POST /api/auth/reset-password
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        code: Option<&str>,
    ) -> Result<ResetPasswordResponse, ApiError> {
        let mut body = json!({ "token": token, "newPassword": new_password });
        if let Some(code) = code.filter(|c| !c.is_empty()) {
            body["code"] = json!(code);
        }
        Self::send_json_or_default(self.post("/api/auth/reset-password").json(&body)).await
    }

    /// GET /api/auth/2fa/status
    pub async fn own_two_factor_status(&self) -> Result<TwoFactorStatus, ApiError> {
        Self::send_json(self.get("/api/auth/2fa/status")).await
    }

    /// POST /api/auth/2fa/enable
    pub async fn enable_own_two_factor(&self, password: &str) -> Result<TwoFactorSetup, ApiError> {
        let body = json!({ "password": password });
        Self::send_json(self.post("/api/auth/2fa/enable").json(&body)).await
    }

    /// POST /api/auth/2fa/verify-setup
    pub async fn verify_two_factor_setup(&self, code: &str) -> Result<(), ApiError> {
        let body = json!({ "code": code });
        Self::send_empty(self.post("/api/auth/2fa/verify-setup").json(&body)).await
    }

    /// POST /api/auth/2fa/disable
    pub async fn disable_own_two_factor(&self, password: &str, code: &str) -> Result<(), ApiError> {
        let body = json!({ "password": password, "code": code });
        Self::send_empty(self.post("/api/auth/2fa/disable").json(&body)).await
    }

    /// POST /api/auth/super-admins
    pub async fn invite_super_admin(&self, email: &str, display_name: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email, "displayName": display_name });
        Self::send_empty(self.post("/api/auth/super-admins").json(&body)).await
    }
}
