// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client (identity-toolkit REST API).
//!
//! Covers both the public surface (credential sign-in, password-reset
//! email) and the admin directory surface (delete, disable/enable,
//! re-create). Admin calls carry a bearer token injected by the
//! deployment; against the Auth emulator the token is `owner`.
//!
//! For local development with emulator, set FIREBASE_AUTH_EMULATOR_HOST.

use crate::config::Config;
use crate::error::AppError;
use crate::session::Identity;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;

const PROD_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Admin directory operations, as a seam for tests.
pub trait IdentityDirectory: Clone + Send + Sync + 'static {
    /// Permanently delete an identity.
    fn delete_user(&self, uid: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Enable or disable an identity.
    fn set_disabled(
        &self,
        uid: &str,
        disabled: bool,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Re-create an identity with a temporary credential.
    fn create_user(
        &self,
        uid: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Client for the hosted identity provider.
#[derive(Clone)]
pub struct IdentityService {
    client: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
    project_id: String,
    admin_token: String,
}

/// Successful sign-in payload (fields we consume).
#[derive(Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Error envelope the identity toolkit wraps failures in.
#[derive(Deserialize)]
struct IdentityErrorEnvelope {
    error: IdentityErrorBody,
}

#[derive(Deserialize)]
struct IdentityErrorBody {
    #[serde(default)]
    message: String,
}

impl IdentityService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Identity(format!("Failed building HTTP client: {e}")))?;

        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Auth emulator for identity operations");
                format!("http://{host}/identitytoolkit.googleapis.com/v1")
            }
            Err(_) => PROD_BASE_URL.to_string(),
        };

        Ok(Self {
            client: Some(client),
            base_url,
            api_key: config.identity_api_key.clone(),
            project_id: config.gcp_project_id.clone(),
            admin_token: config.identity_admin_token.clone(),
        })
    }

    /// Create a mock identity client for testing (offline mode).
    ///
    /// All operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            base_url: PROD_BASE_URL.to_string(),
            api_key: "mock".to_string(),
            project_id: "mock".to_string(),
            admin_token: "mock".to_string(),
        }
    }

    fn get_client(&self) -> Result<&reqwest::Client, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Identity("Identity provider not connected (offline mode)".to_string())
        })
    }

    /// Sign in with email and password.
    ///
    /// Bad credentials map to `Unauthenticated` so the login form can show
    /// its inline message; everything else is a provider error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            self.base_url, self.api_key
        );

        let response = self
            .get_client()?
            .post(&url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-in request failed: {e}")))?;

        if response.status().is_success() {
            let body: SignInResponse = response
                .json()
                .await
                .map_err(|e| AppError::Identity(format!("Malformed sign-in response: {e}")))?;

            return Ok(Identity {
                uid: body.local_id,
                email: body.email.unwrap_or_else(|| email.to_string()),
            });
        }

        let message = Self::error_message(response).await;
        match message.as_str() {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
            | "USER_DISABLED" => {
                tracing::info!(email = %email, reason = %message, "Sign-in rejected");
                Err(AppError::Unauthenticated)
            }
            other => Err(AppError::Identity(format!("Sign-in failed: {other}"))),
        }
    }

    /// Send a password-reset email.
    ///
    /// An unknown address is treated as success so the endpoint never leaks
    /// whether an account exists.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        let url = format!("{}/accounts:sendOobCode?key={}", self.base_url, self.api_key);

        let response = self
            .get_client()?
            .post(&url)
            .json(&json!({
                "requestType": "PASSWORD_RESET",
                "email": email,
            }))
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Password-reset request failed: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let message = Self::error_message(response).await;
        if message == "EMAIL_NOT_FOUND" {
            return Ok(());
        }
        Err(AppError::Identity(format!("Password reset failed: {message}")))
    }

    /// Admin endpoint helper.
    async fn admin_post(&self, path: &str, body: serde_json::Value) -> Result<(), AppError> {
        let url = format!("{}/projects/{}/{}", self.base_url, self.project_id, path);

        let response = self
            .get_client()?
            .post(&url)
            .bearer_auth(&self.admin_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Directory request failed: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let message = Self::error_message(response).await;
        if message == "USER_NOT_FOUND" {
            return Err(AppError::NotFound("Identity not found".to_string()));
        }
        Err(AppError::Identity(format!("Directory operation failed: {message}")))
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<IdentityErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!("HTTP {status}"),
        }
    }
}

impl IdentityDirectory for IdentityService {
    async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        self.admin_post("accounts:delete", json!({ "localId": uid }))
            .await
    }

    async fn set_disabled(&self, uid: &str, disabled: bool) -> Result<(), AppError> {
        self.admin_post(
            "accounts:update",
            json!({ "localId": uid, "disableUser": disabled }),
        )
        .await
    }

    async fn create_user(&self, uid: &str, email: &str, password: &str) -> Result<(), AppError> {
        self.admin_post(
            "accounts",
            json!({ "localId": uid, "email": email, "password": password }),
        )
        .await
    }
}
