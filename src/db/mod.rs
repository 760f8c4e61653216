//! Database layer (Firestore).

pub mod changes;
pub mod firestore;

pub use changes::{ChangeEvent, ChangeHub};
pub use firestore::FirestoreDb;

use serde::{Deserialize, Serialize};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ARCHIVE: &str = "archive";
    pub const FEED: &str = "feed";
    pub const ARRANGEMENTS: &str = "arrangements";
    /// Subcollection under a feed post
    pub const COMMENTS: &str = "comments";
    /// Subcollection under a feed post, keyed by reacting uid
    pub const REACTIONS: &str = "reactions";
    /// Subcollection under an arrangement, keyed by responding uid
    pub const RSVP: &str = "rsvp";
    /// Site-wide content: curated gallery lives under
    /// `site_content/gallery/items`
    pub const SITE_CONTENT: &str = "site_content";
    pub const GALLERY_DOC: &str = "gallery";
    pub const GALLERY_ITEMS: &str = "items";
}

/// A stored document together with its Firestore document id.
///
/// The id is injected by the client on reads (`_firestore_id`) and never
/// written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc<T> {
    #[serde(rename = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Doc<T> {
    /// Document id, or empty string for snapshots that somehow lack one.
    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}
