// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: credential login, logout, password reset.
//!
//! Login runs the full session bootstrap: first identity state from the
//! provider, then role/profile resolution (creating the default record on
//! first sight), then the page-guard decision for the login page. The
//! session token is set as an HttpOnly cookie.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::AccountStatus;
use crate::session::{GuardState, PageGuard, PageKind, RoleProfileResolver, SessionState, SessionStore};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/password-reset", post(password_reset))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Login response: the resolved session plus the guard decision for the
/// login page (a signed-in member is sent on to the members area).
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub session: SessionState,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub guard: GuardState,
}

/// Sign in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let identity = state
        .identity
        .sign_in(&payload.email, &payload.password)
        .await?;

    // Bootstrap: identity is known, now resolve role/profile (creating the
    // default record for first-time users) before anything else runs.
    let store = SessionStore::new();
    let resolver = RoleProfileResolver::new(state.db.clone());
    let snapshot = store
        .bootstrap(Ok(Some(identity.clone())), |identity| async move {
            resolver.resolve(&identity.uid, &identity.email).await
        })
        .await;

    if !snapshot.is_authorized() {
        // Valid identity but no usable role/profile record: the bootstrap
        // already forced the sign-out; report it as unauthenticated.
        return Err(AppError::Unauthenticated);
    }

    // A pending-deletion account is denied at login even though its
    // record still exists for admin inspection.
    let pending = snapshot
        .profile
        .as_ref()
        .map(|p| p.status == AccountStatus::PendingDeletion)
        .unwrap_or(false);
    if pending {
        tracing::info!(uid = %identity.uid, "Login denied: account pending deletion");
        return Err(AppError::FailedPrecondition(
            "Kontoen venter på sletting.".to_string(),
        ));
    }

    let jwt = create_jwt(&identity.uid, &identity.email, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let mut cookie = Cookie::new(SESSION_COOKIE, jwt);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(time::Duration::days(7));

    let guard = PageGuard::evaluate(PageKind::Login, &snapshot);

    tracing::info!(uid = %identity.uid, "Login successful");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            session: snapshot,
            guard,
        }),
    ))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Sign out: clear the session cookie. The identity-change consequences
/// (guard redirect, feed teardown) happen when the client's streams and
/// session endpoint observe the missing session.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");

    (jar.remove(removal), Json(LogoutResponse { success: true }))
}

#[derive(Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PasswordResetResponse {
    pub message: String,
}

/// Request a password-reset email. The response never reveals whether the
/// address has an account.
async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<PasswordResetResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    state.identity.send_password_reset(&payload.email).await?;

    Ok(Json(PasswordResetResponse {
        message: "Hvis adressen er registrert, er det sendt en e-post for å tilbakestille passordet."
            .to_string(),
    }))
}
