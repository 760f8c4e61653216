// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task handler routes for scheduled jobs.
//!
//! These endpoints are called by Cloud Scheduler, not directly by users.

use crate::config::SCHEDULER_HEADER;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Task handler routes (called by Cloud Scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/tasks/cleanup-pending-deletions",
        post(cleanup_pending_deletions),
    )
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub purged: usize,
    pub failed: usize,
}

/// Purge accounts flagged `pending_deletion` past the grace period.
/// Runs daily; best-effort per record.
async fn cleanup_pending_deletions(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<CleanupResponse>, StatusCode> {
    // Security Check: Ensure the request comes from Cloud Scheduler.
    // Cloud Run strips this header from external requests, so its presence
    // guarantees internal origin.
    if headers.get(SCHEDULER_HEADER).is_none() {
        tracing::warn!("Security Alert: Blocked unauthorized access to cleanup task");
        return Err(StatusCode::FORBIDDEN);
    }

    tracing::info!("Running scheduled cleanup of pending deletions");

    let outcome = state
        .accounts
        .cleanup_pending_deletions()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Cleanup run failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(
        purged = outcome.purged.len(),
        failed = outcome.failed.len(),
        "Cleanup run finished"
    );

    Ok(Json(CleanupResponse {
        purged: outcome.purged.len(),
        failed: outcome.failed.len(),
    }))
}
