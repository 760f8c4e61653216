// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed identities and the snapshot source behind them.

use crate::db::{ChangeEvent, FirestoreDb};
use crate::error::AppError;
use crate::feeds::view::{self, FeedView};
use std::future::Future;
use tokio::sync::broadcast;

/// Identity of a logical feed. One live subscription may exist per key
/// within a binder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedKey {
    Posts,
    Events,
    Gallery,
    Comments { post_id: String },
    Reactions { post_id: String },
    Rsvps { event_id: String },
}

impl FeedKey {
    /// The change-hub path whose writes invalidate this feed.
    pub fn change_path(&self) -> String {
        match self {
            FeedKey::Posts => "feed".to_string(),
            FeedKey::Events => "arrangements".to_string(),
            FeedKey::Gallery => "site_content/gallery/items".to_string(),
            FeedKey::Comments { post_id } => format!("feed/{post_id}/comments"),
            FeedKey::Reactions { post_id } => format!("feed/{post_id}/reactions"),
            FeedKey::Rsvps { event_id } => format!("arrangements/{event_id}/rsvp"),
        }
    }

    /// Inline message rendered in the bound region when the subscription
    /// fails. Sibling regions are unaffected.
    pub fn error_message(&self) -> &'static str {
        match self {
            FeedKey::Posts => "Kunne ikke laste feeden.",
            FeedKey::Events => "Kunne ikke laste arrangementer.",
            FeedKey::Gallery => "Kunne ikke laste galleriet.",
            FeedKey::Comments { .. } => "Kunne ikke laste kommentarer.",
            FeedKey::Reactions { .. } => "Kunne ikke laste reaksjoner.",
            FeedKey::Rsvps { .. } => "Kunne ikke laste påmeldinger.",
        }
    }
}

/// A feed key plus its fetch limit. The limit only applies to the posts
/// feed; other feeds always redraw their full collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedQuery {
    pub key: FeedKey,
    pub limit: u32,
}

/// Source of feed snapshots and the change notifications that invalidate
/// them. Implemented by the Firestore wrapper and by fakes in tests.
pub trait FeedSource: Clone + Send + Sync + 'static {
    fn fetch(&self, query: FeedQuery) -> impl Future<Output = Result<FeedView, AppError>> + Send;

    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Snapshot source backed by Firestore queries.
#[derive(Clone)]
pub struct FirestoreFeedSource {
    db: FirestoreDb,
}

impl FirestoreFeedSource {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }
}

impl FeedSource for FirestoreFeedSource {
    async fn fetch(&self, query: FeedQuery) -> Result<FeedView, AppError> {
        match &query.key {
            FeedKey::Posts => {
                let posts = self.db.get_posts(query.limit).await?;
                Ok(view::posts_view(posts))
            }
            FeedKey::Events => {
                let events = self.db.get_events().await?;
                Ok(view::events_view(events, chrono::Utc::now()))
            }
            FeedKey::Gallery => {
                let images = self.db.list_gallery().await?;
                Ok(view::gallery_view(images))
            }
            FeedKey::Comments { post_id } => {
                let comments = self.db.list_comments(post_id).await?;
                Ok(view::comments_view(post_id, comments))
            }
            FeedKey::Reactions { post_id } => {
                let reactions = self.db.list_reactions(post_id).await?;
                Ok(view::reactions_view(post_id, reactions))
            }
            FeedKey::Rsvps { event_id } => {
                let rsvps = self.db.list_rsvps(event_id).await?;
                Ok(view::rsvps_view(event_id, rsvps))
            }
        }
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.db.changes()
    }
}
