// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes for user management.
//!
//! Every handler re-reads the requester's role record and checks the
//! admin capability server-side before acting; the client-side UI state
//! is never trusted.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::AccountStatus;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{uid}/delete-now", post(delete_now))
        .route("/api/admin/users/{uid}/restore", post(restore_pending))
        .route("/api/admin/archive", get(list_archive))
        .route("/api/admin/archive/{uid}/restore", post(restore_from_archive))
        .route("/api/admin/archive/{uid}", delete(wipe_archived))
}

/// Require the admin capability, re-read from the document store.
async fn require_admin(state: &AppState, user: &AuthUser) -> Result<()> {
    let profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !profile.normalized_role().can_manage_users() {
        return Err(AppError::PermissionDenied(
            "Kun administratorer kan administrere brukere.".to_string(),
        ));
    }

    Ok(())
}

// ─── Listings ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminUserEntry {
    pub uid: String,
    pub role: String,
    pub display_name: String,
    pub email: Option<String>,
    pub member_since: String,
    pub org_role: Option<String>,
    pub status: String,
    pub deletion_requested_at: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUserEntry>,
}

/// List all user records, pending-deletion accounts included (that is
/// how an admin inspects them).
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AdminUsersResponse>> {
    require_admin(&state, &user).await?;

    let users = state
        .db
        .list_profiles()
        .await?
        .into_iter()
        .map(|doc| {
            let uid = doc.id_str().to_string();
            let profile = doc.data;
            AdminUserEntry {
                uid,
                role: profile.normalized_role().as_str().to_string(),
                display_name: profile.display_name,
                email: profile.email,
                member_since: profile.member_since,
                org_role: profile.org_role,
                status: match profile.status {
                    AccountStatus::Active => "active".to_string(),
                    AccountStatus::PendingDeletion => "pending_deletion".to_string(),
                },
                deletion_requested_at: profile.deletion_requested_at,
            }
        })
        .collect();

    Ok(Json(AdminUsersResponse { users }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ArchiveEntry {
    pub uid: String,
    pub full_name: String,
    pub email: String,
    pub start_date: Option<String>,
    pub end_date: String,
    pub reason: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ArchiveResponse {
    pub entries: Vec<ArchiveEntry>,
}

/// List the archive.
async fn list_archive(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ArchiveResponse>> {
    require_admin(&state, &user).await?;

    let entries = state
        .db
        .list_archive()
        .await?
        .into_iter()
        .map(|doc| {
            let record = doc.data;
            ArchiveEntry {
                uid: record.uid,
                full_name: record.full_name,
                email: record.email,
                start_date: record.start_date,
                end_date: record.end_date,
                reason: match record.reason {
                    crate::models::ArchiveReason::Voluntary => "voluntary".to_string(),
                    crate::models::ArchiveReason::BannedImmediate => {
                        "banned/immediate".to_string()
                    }
                },
            }
        })
        .collect();

    Ok(Json(ArchiveResponse { entries }))
}

// ─── Account Procedures ──────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminActionResponse {
    pub success: bool,
    pub message: String,
}

/// Archive and permanently delete a user right now.
async fn delete_now(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    require_admin(&state, &user).await?;

    tracing::info!(admin = %user.uid, target = %uid, "Immediate permanent deletion");
    let message = state.accounts.permanent_delete_now(&uid).await?;

    Ok(Json(AdminActionResponse {
        success: true,
        message,
    }))
}

/// Cancel a pending deletion.
async fn restore_pending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    require_admin(&state, &user).await?;

    tracing::info!(admin = %user.uid, target = %uid, "Restoring pending-deletion user");
    let message = state.accounts.restore_pending(&uid).await?;

    Ok(Json(AdminActionResponse {
        success: true,
        message,
    }))
}

/// Bring an archived user back with a temporary credential.
async fn restore_from_archive(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    require_admin(&state, &user).await?;

    tracing::info!(admin = %user.uid, target = %uid, "Restoring user from archive");
    let message = state.accounts.restore_from_archive(&uid).await?;

    Ok(Json(AdminActionResponse {
        success: true,
        message,
    }))
}

/// Permanently remove an archive record.
async fn wipe_archived(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    require_admin(&state, &user).await?;

    tracing::info!(admin = %user.uid, target = %uid, "Wiping archive record");
    let message = state.accounts.wipe_archived(&uid).await?;

    Ok(Json(AdminActionResponse {
        success: true,
        message,
    }))
}
