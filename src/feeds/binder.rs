// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Managed feed subscriptions.
//!
//! A [`FeedBinder`] is owned by one UI region owner (in practice: one live
//! stream connection). It guarantees at most one active subscription per
//! logical feed key: binding a key that is already bound first cancels the
//! prior subscription. Dropping the binder tears everything down, which is
//! also how an identity change releases a page's subscriptions.

use crate::feeds::source::{FeedKey, FeedQuery, FeedSource};
use crate::feeds::view::FeedView;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Base fetch limit for the posts feed; "load more" grows it by this step
/// and re-subscribes from scratch.
pub const FEED_PAGE_SIZE: u32 = 5;

/// Fallback re-query interval for writers that bypass this backend
/// (e.g. gallery curation tooling).
const FALLBACK_REFRESH: Duration = Duration::from_secs(60);

/// Shared cache of last-known snapshots, painted as a first frame before
/// the authoritative snapshot arrives. Strictly a latency hint: it is
/// always overwritten by the first live result and never consulted for
/// access-control decisions.
pub type PaintHintCache = Arc<DashMap<FeedKey, FeedView>>;

struct BoundFeed {
    task: JoinHandle<()>,
    limit: u32,
}

/// Registry of live subscriptions for one owner.
pub struct FeedBinder<S: FeedSource> {
    source: S,
    hints: PaintHintCache,
    active: DashMap<FeedKey, BoundFeed>,
    refresh: Duration,
}

impl<S: FeedSource> FeedBinder<S> {
    pub fn new(source: S, hints: PaintHintCache) -> Self {
        Self {
            source,
            hints,
            active: DashMap::new(),
            refresh: FALLBACK_REFRESH,
        }
    }

    /// Override the fallback refresh interval (tests).
    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Bind a feed at the base fetch limit.
    pub fn bind(&self, key: FeedKey) -> watch::Receiver<FeedView> {
        self.bind_with_limit(key, FEED_PAGE_SIZE)
    }

    /// Bind a feed with an explicit fetch limit, cancelling any prior
    /// subscription for the same key first.
    ///
    /// The returned receiver holds the paint hint (or a loading marker)
    /// until the first authoritative snapshot lands.
    pub fn bind_with_limit(&self, key: FeedKey, limit: u32) -> watch::Receiver<FeedView> {
        if let Some((_, old)) = self.active.remove(&key) {
            old.task.abort();
        }

        let initial = self
            .hints
            .get(&key)
            .map(|hint| hint.value().clone())
            .unwrap_or(FeedView::Loading);

        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(run_subscription(
            self.source.clone(),
            FeedQuery {
                key: key.clone(),
                limit,
            },
            tx,
            self.hints.clone(),
            self.refresh,
        ));

        self.active.insert(key, BoundFeed { task, limit });
        rx
    }

    /// Grow the fetch limit by one page and re-subscribe from scratch.
    /// This re-runs the full query; that is the intended pagination model.
    pub fn load_more(&self, key: FeedKey) -> watch::Receiver<FeedView> {
        let limit = self
            .active
            .get(&key)
            .map(|bound| bound.limit)
            .unwrap_or(0)
            + FEED_PAGE_SIZE;
        self.bind_with_limit(key, limit)
    }

    /// Release one feed's subscription.
    pub fn release(&self, key: &FeedKey) {
        if let Some((_, old)) = self.active.remove(key) {
            old.task.abort();
        }
    }

    /// Tear down every subscription this binder owns. Called when the
    /// owning session changes identity; also runs on drop.
    pub fn clear(&self) {
        self.active.retain(|_, bound| {
            bound.task.abort();
            false
        });
    }

    /// Number of live subscriptions.
    pub fn active_count(&self) -> usize {
        self.active
            .iter()
            .filter(|entry| !entry.value().task.is_finished())
            .count()
    }
}

impl<S: FeedSource> Drop for FeedBinder<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Subscription worker: fetch once, then re-fetch on every matching change
/// notification (or fallback tick) until every receiver is gone.
async fn run_subscription<S: FeedSource>(
    source: S,
    query: FeedQuery,
    tx: watch::Sender<FeedView>,
    hints: PaintHintCache,
    refresh: Duration,
) {
    let mut changes = source.changes();
    let path = query.key.change_path();

    refetch(&source, &query, &tx, &hints).await;

    let mut tick =
        tokio::time::interval_at(tokio::time::Instant::now() + refresh, refresh);

    loop {
        tokio::select! {
            event = changes.recv() => match event {
                Ok(event) if event.path == path => refetch(&source, &query, &tx, &hints).await,
                Ok(_) => {}
                // Missed notifications: the safe reaction is a re-query
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    refetch(&source, &query, &tx, &hints).await
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tick.tick() => refetch(&source, &query, &tx, &hints).await,
            _ = tx.closed() => break,
        }
    }
}

async fn refetch<S: FeedSource>(
    source: &S,
    query: &FeedQuery,
    tx: &watch::Sender<FeedView>,
    hints: &PaintHintCache,
) {
    match source.fetch(query.clone()).await {
        Ok(view) => {
            if cache_as_hint(query) {
                hints.insert(query.key.clone(), view.clone());
            }
            tx.send_replace(view);
        }
        Err(e) => {
            tracing::warn!(feed = ?query.key, error = %e, "Feed subscription fetch failed");
            tx.send_replace(FeedView::Error {
                message: query.key.error_message().to_string(),
            });
        }
    }
}

/// Only first-page snapshots are cached as paint hints; a grown posts
/// limit would poison the first frame of the next page load.
fn cache_as_hint(query: &FeedQuery) -> bool {
    match query.key {
        FeedKey::Posts => query.limit == FEED_PAGE_SIZE,
        _ => true,
    }
}
