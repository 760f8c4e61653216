// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Write-side change notifications.
//!
//! Every mutation that goes through [`super::FirestoreDb`] publishes the
//! logical path it touched. Live feed subscriptions re-run their query when
//! a matching path arrives, so updates are pushed to subscribers without
//! polling. All writers go through this backend, which makes the hub a
//! complete change source for the site's own data.

use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A logical path that was written, e.g. `users/abc123` or
/// `feed/xyz/comments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
}

/// Broadcast hub for change events.
#[derive(Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a touched path. Lagging or absent subscribers are fine;
    /// a lagged receiver treats the gap as a change signal and re-queries.
    pub fn publish(&self, path: impl Into<String>) {
        let event = ChangeEvent { path: path.into() };
        // Send only fails when there are no subscribers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = ChangeHub::new();
        let mut rx = hub.subscribe();

        hub.publish("feed");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.path, "feed");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let hub = ChangeHub::new();
        hub.publish("users/none-listening");
    }
}
