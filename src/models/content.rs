// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Content items: posts, events, gallery images and their subcollections.
//!
//! Every item carries its author/uploader and an RFC 3339 creation
//! timestamp. Comments, reactions and RSVPs live in subcollections under
//! their parent document; reactions and RSVPs are keyed by the acting
//! user's uid so toggling is a create/delete of that one document.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A post in the members feed, stored at `feed/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: String,
}

/// A comment under a post, stored at `feed/{post}/comments/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
}

/// A reaction under a post, stored at `feed/{post}/reactions/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: String,
    pub user_name: String,
    /// Reaction kind; currently only "like" is rendered
    pub kind: String,
    pub created_at: String,
}

/// An event, stored at `arrangements/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub title: String,
    pub description: String,
    /// When the event takes place (RFC 3339)
    pub date: String,
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub created_at: String,
}

/// RSVP answer for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Coming,
    NotComing,
}

/// An RSVP under an event, stored at `arrangements/{event}/rsvp/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRsvp {
    pub status: RsvpStatus,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_photo: Option<String>,
    pub updated_at: String,
}

/// A curated gallery image, stored at `site_content/gallery/items/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub image_url: String,
    /// Display position; missing values sort as 0
    #[serde(default)]
    pub order: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsvp_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&RsvpStatus::NotComing).unwrap(),
            "\"not_coming\""
        );
        let parsed: RsvpStatus = serde_json::from_str("\"coming\"").unwrap();
        assert_eq!(parsed, RsvpStatus::Coming);
    }

    #[test]
    fn test_gallery_image_missing_order() {
        let image: GalleryImage =
            serde_json::from_str(r#"{"imageUrl": "https://example.com/a.jpg"}"#).unwrap();
        assert_eq!(image.order, 0);
    }
}
