// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for the members area: session snapshot, profile, content
//! writes (posts, comments, reactions, events, RSVPs).

use crate::error::{AppError, Result};
use crate::middleware::auth::{token_from_parts, verify_jwt, AuthUser};
use crate::models::{
    AccountStatus, Comment, Event, EventRsvp, Post, Reaction, Role, RsvpStatus, UserProfile,
};
use crate::session::{
    GuardState, Identity, PageGuard, PageKind, RoleProfileResolver, SessionState, SessionStore,
};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Routes that work without a session (the session snapshot itself).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/session", get(get_session))
}

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/me/delete-request", post(request_deletion))
        .route("/api/posts", post(create_post))
        .route("/api/posts/{id}", delete(delete_post))
        .route("/api/posts/{id}/comments", post(add_comment))
        .route("/api/posts/{id}/reaction", put(toggle_reaction))
        .route("/api/events", post(create_event))
        .route("/api/events/{id}", delete(delete_event))
        .route("/api/events/{id}/rsvp", put(toggle_rsvp))
}

// ─── Session Snapshot ────────────────────────────────────────

#[derive(Deserialize)]
struct SessionQuery {
    /// What kind of page is asking; defaults to the members area.
    page: Option<PageKind>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub session: SessionState,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub guard: GuardState,
}

/// Bootstrap a session for the requesting page and return the snapshot
/// plus the page-guard decision. Anonymous requests resolve to an
/// unauthenticated session and (for restricted pages) a login redirect.
async fn get_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Json<SessionResponse> {
    let auth = token_from_parts(&jar, &headers)
        .and_then(|token| verify_jwt(&token, &state.config.jwt_signing_key));

    let store = SessionStore::new();
    let resolver = RoleProfileResolver::new(state.db.clone());

    let first_identity = Ok(auth.map(|user| Identity {
        uid: user.uid,
        email: user.email,
    }));
    let snapshot = store
        .bootstrap(first_identity, |identity| async move {
            resolver.resolve(&identity.uid, &identity.email).await
        })
        .await;

    let page = query.page.unwrap_or(PageKind::Restricted);
    let mut guard = PageGuard::new(page);
    let guard_state = guard.on_session(&snapshot);

    Json(SessionResponse {
        session: snapshot,
        guard: guard_state,
    })
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub uid: String,
    pub role: String,
    pub display_name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub member_since: String,
    pub org_role: Option<String>,
    pub status: String,
    pub deletion_requested_at: Option<String>,
}

fn profile_response(uid: &str, profile: &UserProfile) -> ProfileResponse {
    ProfileResponse {
        uid: uid.to_string(),
        role: profile.normalized_role().as_str().to_string(),
        display_name: profile.display_name.clone(),
        email: profile.email.clone(),
        photo_url: profile.photo_url.clone(),
        member_since: profile.member_since.clone(),
        org_role: profile.org_role.clone(),
        status: match profile.status {
            AccountStatus::Active => "active".to_string(),
            AccountStatus::PendingDeletion => "pending_deletion".to_string(),
        },
        deletion_requested_at: profile.deletion_requested_at.clone(),
    }
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    Ok(Json(profile_response(&user.uid, &profile)))
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120, message = "Visningsnavn kan ikke være tomt."))]
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Save profile fields. Only the provided fields change; the saved values
/// are stored verbatim and come back unchanged through the live profile
/// subscription.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    if let Some(photo_url) = &payload.photo_url {
        validate_image_url(photo_url)?;
    }

    // Fetch-modify-write to preserve the other fields
    let mut profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if let Some(display_name) = payload.display_name {
        profile.display_name = display_name;
    }
    if let Some(photo_url) = payload.photo_url {
        profile.photo_url = Some(photo_url);
    }

    state.db.upsert_profile(&user.uid, &profile).await?;

    Ok(Json(profile_response(&user.uid, &profile)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteRequestResponse {
    pub success: bool,
    pub message: String,
}

/// Flag the caller's account for deletion (30-day grace period).
async fn request_deletion(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteRequestResponse>> {
    tracing::info!(uid = %user.uid, "User-initiated deletion request");

    state.accounts.request_deletion(&user.uid).await?;

    Ok(Json(DeleteRequestResponse {
        success: true,
        message: "Kontoen er merket for sletting og fjernes permanent etter 30 dager.".to_string(),
    }))
}

/// Validate an image reference: an https URL, or a JPG/PNG data URL under
/// the upload size limit.
fn validate_image_url(url: &str) -> Result<()> {
    if url.starts_with("https://") {
        return Ok(());
    }

    let payload = url
        .strip_prefix("data:image/jpeg;base64,")
        .or_else(|| url.strip_prefix("data:image/png;base64,"))
        .ok_or_else(|| AppError::InvalidArgument("Ugyldig filtype (kun JPG/PNG).".to_string()))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| AppError::InvalidArgument("Ugyldig bildedata.".to_string()))?;

    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidArgument(
            "Filen er for stor (maks 5MB).".to_string(),
        ));
    }

    Ok(())
}

// ─── Capability Check ────────────────────────────────────────

/// Load the caller's role/profile record for a write. No record means the
/// session is unauthorized (the bootstrap would have created one); a
/// pending-deletion account cannot act as an ordinary member.
async fn require_member(
    state: &AppState,
    user: &AuthUser,
) -> Result<(Role, UserProfile)> {
    let profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if profile.status == AccountStatus::PendingDeletion {
        return Err(AppError::PermissionDenied(
            "Kontoen venter på sletting.".to_string(),
        ));
    }

    let role = profile.normalized_role();
    Ok((role, profile))
}

fn author_name(profile: &UserProfile, user: &AuthUser) -> String {
    if profile.display_name.is_empty() {
        user.email.clone()
    } else {
        profile.display_name.clone()
    }
}

// ─── Posts ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20_000))]
    pub content: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatedResponse {
    pub id: String,
}

/// Publish a post to the members feed.
async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<CreatedResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let (role, profile) = require_member(&state, &user).await?;
    if !role.can_publish_posts() {
        return Err(AppError::PermissionDenied(
            "Du har ikke tilgang til å publisere.".to_string(),
        ));
    }

    let post = Post {
        title: payload.title,
        content: payload.content,
        author_id: user.uid.clone(),
        author_name: author_name(&profile, &user),
        created_at: now_rfc3339(),
    };

    let id = state.db.create_post(&post).await?;
    tracing::info!(uid = %user.uid, post_id = %id, "Post published");

    Ok(Json(CreatedResponse { id }))
}

/// Delete a post (admin only).
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let (role, _) = require_member(&state, &user).await?;
    if !role.can_delete_content() {
        return Err(AppError::PermissionDenied(
            "Kun administratorer kan slette innlegg.".to_string(),
        ));
    }

    state.db.delete_post(&post_id).await?;
    tracing::info!(uid = %user.uid, post_id = %post_id, "Post deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── Comments ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 2_000))]
    pub body: String,
}

/// Comment on a post. Any active member may comment.
async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<CreatedResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let (_, profile) = require_member(&state, &user).await?;

    let comment = Comment {
        author_id: user.uid.clone(),
        author_name: author_name(&profile, &user),
        body: payload.body,
        created_at: now_rfc3339(),
    };

    let id = state.db.add_comment(&post_id, &comment).await?;
    Ok(Json(CreatedResponse { id }))
}

// ─── Reactions ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReactionRequest {
    /// Reaction kind; defaults to "like".
    pub kind: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReactionResponse {
    /// Whether the caller's reaction exists after the toggle.
    pub reacted: bool,
}

/// Toggle the caller's reaction on a post: absent creates it, present
/// (same kind) deletes it. The reaction document is keyed by the
/// caller's uid.
async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(payload): Json<ReactionRequest>,
) -> Result<Json<ReactionResponse>> {
    let (_, profile) = require_member(&state, &user).await?;
    let kind = payload.kind.unwrap_or_else(|| "like".to_string());

    let existing = state.db.get_reaction(&post_id, &user.uid).await?;
    match existing {
        Some(reaction) if reaction.kind == kind => {
            state.db.delete_reaction(&post_id, &user.uid).await?;
            Ok(Json(ReactionResponse { reacted: false }))
        }
        _ => {
            let reaction = Reaction {
                user_id: user.uid.clone(),
                user_name: author_name(&profile, &user),
                kind,
                created_at: now_rfc3339(),
            };
            state.db.set_reaction(&post_id, &user.uid, &reaction).await?;
            Ok(Json(ReactionResponse { reacted: true }))
        }
    }
}

// ─── Events ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 20_000))]
    pub description: String,
    /// When the event takes place (RFC 3339)
    pub date: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

/// Publish an event.
async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<CreatedResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let (role, profile) = require_member(&state, &user).await?;
    if !role.can_publish_events() {
        return Err(AppError::PermissionDenied(
            "Du har ikke tilgang til å publisere.".to_string(),
        ));
    }

    if chrono::DateTime::parse_from_rfc3339(&payload.date).is_err() {
        return Err(AppError::InvalidArgument(
            "Ugyldig dato for arrangementet.".to_string(),
        ));
    }
    if let Some(image_url) = &payload.image_url {
        validate_image_url(image_url)?;
    }

    let event = Event {
        title: payload.title,
        description: payload.description,
        date: payload.date,
        location: payload
            .location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "Ikke oppgitt".to_string()),
        image_url: payload.image_url,
        author_id: user.uid.clone(),
        author_name: author_name(&profile, &user),
        created_at: now_rfc3339(),
    };

    let id = state.db.create_event(&event).await?;
    tracing::info!(uid = %user.uid, event_id = %id, "Event published");

    Ok(Json(CreatedResponse { id }))
}

/// Delete an event (admin only).
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let (role, _) = require_member(&state, &user).await?;
    if !role.can_delete_content() {
        return Err(AppError::PermissionDenied(
            "Kun administratorer kan slette arrangementer.".to_string(),
        ));
    }

    state.db.delete_event(&event_id).await?;
    tracing::info!(uid = %user.uid, event_id = %event_id, "Event deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── RSVPs ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RsvpRequest {
    pub status: RsvpStatus,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RsvpResponse {
    /// The caller's RSVP after the toggle; None when it was withdrawn.
    pub status: Option<RsvpStatus>,
}

/// Answer (or withdraw) an RSVP. Submitting the same status again deletes
/// the RSVP; a different status replaces it.
async fn toggle_rsvp(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
    Json(payload): Json<RsvpRequest>,
) -> Result<Json<RsvpResponse>> {
    let (_, profile) = require_member(&state, &user).await?;

    let existing = state.db.get_rsvp(&event_id, &user.uid).await?;
    match existing {
        Some(rsvp) if rsvp.status == payload.status => {
            state.db.delete_rsvp(&event_id, &user.uid).await?;
            Ok(Json(RsvpResponse { status: None }))
        }
        _ => {
            let rsvp = EventRsvp {
                status: payload.status,
                user_id: user.uid.clone(),
                user_name: author_name(&profile, &user),
                user_photo: profile.photo_url.clone(),
                updated_at: now_rfc3339(),
            };
            state.db.set_rsvp(&event_id, &user.uid, &rsvp).await?;
            Ok(Json(RsvpResponse {
                status: Some(payload.status),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_image_url_accepts_https() {
        assert!(validate_image_url("https://example.com/a.jpg").is_ok());
    }

    #[test]
    fn test_validate_image_url_accepts_small_data_url() {
        let payload = STANDARD.encode([0u8; 64]);
        let url = format!("data:image/png;base64,{payload}");
        assert!(validate_image_url(&url).is_ok());
    }

    #[test]
    fn test_validate_image_url_rejects_other_schemes() {
        let err = validate_image_url("javascript:alert(1)").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err = validate_image_url("data:text/html;base64,AAAA").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_validate_image_url_rejects_bad_base64() {
        let err = validate_image_url("data:image/png;base64,!!not-base64!!").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
