// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live feed routes (server-sent events).
//!
//! Each connection owns a [`FeedBinder`] holding exactly one live
//! subscription per bound feed. The first frame is the paint hint (or a
//! loading marker); every subsequent frame is a full redraw from the
//! latest snapshot. Closing the stream drops the binder, which tears the
//! subscription down.

use crate::feeds::{FeedBinder, FeedKey, FeedSource, FeedView, FirestoreFeedSource, FEED_PAGE_SIZE};
use crate::middleware::auth::AuthUser;
use crate::session::{Identity, RoleProfileResolver, SessionStore};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use futures_util::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;

/// Live feeds that are part of the public site.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/live/gallery", get(live_gallery))
}

/// Live feeds for the members area (auth middleware applied in
/// routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/live/feed", get(live_feed))
        .route("/live/events", get(live_events))
        .route("/live/posts/{id}/comments", get(live_comments))
        .route("/live/posts/{id}/reactions", get(live_reactions))
        .route("/live/events/{id}/rsvps", get(live_rsvps))
        .route("/live/session", get(live_session))
}

/// Stream state: the binder rides along so the subscription lives exactly
/// as long as the connection.
struct FeedStream<S: FeedSource> {
    _binder: FeedBinder<S>,
    rx: watch::Receiver<FeedView>,
    first: bool,
}

fn view_event(view: &FeedView) -> Event {
    match serde_json::to_string(view) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize feed view");
            Event::default().data("{\"kind\":\"error\",\"message\":\"Intern feil.\"}")
        }
    }
}

fn feed_stream<S: FeedSource>(
    binder: FeedBinder<S>,
    rx: watch::Receiver<FeedView>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    futures_util::stream::unfold(
        FeedStream {
            _binder: binder,
            rx,
            first: true,
        },
        |mut s| async move {
            if s.first {
                s.first = false;
                let view = s.rx.borrow().clone();
                return Some((Ok(view_event(&view)), s));
            }
            match s.rx.changed().await {
                Ok(()) => {
                    let view = s.rx.borrow_and_update().clone();
                    Some((Ok(view_event(&view)), s))
                }
                Err(_) => None,
            }
        },
    )
}

fn bind_and_stream(
    state: &AppState,
    key: FeedKey,
    limit: u32,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let binder = FeedBinder::new(
        FirestoreFeedSource::new(state.db.clone()),
        state.paint_hints.clone(),
    );
    let rx = binder.bind_with_limit(key, limit);
    Sse::new(feed_stream(binder, rx)).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct LimitQuery {
    /// Fetch limit for the posts feed; grows page by page on "load more".
    limit: Option<u32>,
}

const MAX_FEED_LIMIT: u32 = 50;

/// Posts feed. "Load more" reconnects with a larger limit, re-running
/// the query from scratch.
async fn live_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let limit = query
        .limit
        .unwrap_or(FEED_PAGE_SIZE)
        .clamp(FEED_PAGE_SIZE, MAX_FEED_LIMIT);
    bind_and_stream(&state, FeedKey::Posts, limit)
}

/// Upcoming and past events.
async fn live_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    bind_and_stream(&state, FeedKey::Events, FEED_PAGE_SIZE)
}

/// The public curated gallery.
async fn live_gallery(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    bind_and_stream(&state, FeedKey::Gallery, FEED_PAGE_SIZE)
}

/// Comments under one post.
async fn live_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    bind_and_stream(&state, FeedKey::Comments { post_id }, FEED_PAGE_SIZE)
}

/// Reactions under one post.
async fn live_reactions(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    bind_and_stream(&state, FeedKey::Reactions { post_id }, FEED_PAGE_SIZE)
}

/// RSVPs under one event.
async fn live_rsvps(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    bind_and_stream(&state, FeedKey::Rsvps { event_id }, FEED_PAGE_SIZE)
}

/// Aborts the profile watch task when the session stream closes.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Live session snapshots for the signed-in user.
///
/// Bootstraps the session, then keeps it fresh through the live profile
/// watch: display-name and photo edits from other tabs or sessions arrive
/// here without a reload, and a deleted record signs the session out.
async fn live_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let store = SessionStore::new();
    let resolver = RoleProfileResolver::new(state.db.clone());

    let identity = Identity {
        uid: user.uid.clone(),
        email: user.email.clone(),
    };
    let bootstrap_resolver = resolver.clone();
    let snapshot = store
        .bootstrap(Ok(Some(identity)), |identity| async move {
            bootstrap_resolver
                .resolve(&identity.uid, &identity.email)
                .await
        })
        .await;

    let watch_guard = if snapshot.is_authorized() {
        let session = store.clone();
        let uid = user.uid.clone();
        Some(AbortOnDrop(tokio::spawn(async move {
            resolver.run_watch(uid, session).await;
        })))
    } else {
        None
    };

    let rx = store.subscribe();
    let stream = futures_util::stream::unfold(
        (watch_guard, rx, true),
        |(guard, mut rx, first)| async move {
            let event = if first {
                session_event(&rx.borrow().clone())
            } else {
                match rx.changed().await {
                    Ok(()) => session_event(&rx.borrow_and_update().clone()),
                    Err(_) => return None,
                }
            };
            Some((Ok(event), (guard, rx, false)))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn session_event(state: &crate::session::SessionState) -> Event {
    match serde_json::to_string(state) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize session state");
            Event::default().data("{}")
        }
    }
}
