// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime view binding for content feeds.
//!
//! Each visible region of content (posts, events, gallery, per-post
//! comments/reactions, per-event RSVPs) is bound to exactly one live
//! subscription through a [`binder::FeedBinder`]. Every upstream change
//! re-runs the query and redraws the full region from the latest snapshot.

pub mod binder;
pub mod source;
pub mod view;

pub use binder::{FeedBinder, PaintHintCache, FEED_PAGE_SIZE};
pub use source::{FeedKey, FeedQuery, FeedSource, FirestoreFeedSource};
pub use view::FeedView;
