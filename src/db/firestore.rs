// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (role/profile records)
//! - Archive (snapshots of removed users)
//! - Feed posts with comments/reactions subcollections
//! - Arrangements (events) with RSVP subcollection
//! - Curated gallery items
//!
//! Every mutation publishes the touched logical path on the [`ChangeHub`]
//! so live feed subscriptions can re-query without polling.

use crate::db::{collections, ChangeEvent, ChangeHub, Doc};
use crate::error::AppError;
use crate::models::{
    ArchiveRecord, Comment, Event, EventRsvp, GalleryImage, Post, Reaction, UserProfile,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    changes: ChangeHub,
}

/// Mint a document id for collections the site creates documents in.
/// Timestamp-prefixed ids keep natural ordering close to creation order.
fn mint_doc_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{nanos:x}-{seq:x}")
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            changes: ChangeHub::new(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            changes: ChangeHub::new(),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            changes: ChangeHub::new(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Subscribe to write-side change notifications.
    pub fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// The change hub itself, for components that publish on behalf of
    /// out-of-band writers.
    pub fn change_hub(&self) -> &ChangeHub {
        &self.changes
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user's role/profile record.
    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or fully overwrite a user's role/profile record.
    pub async fn upsert_profile(&self, uid: &str, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::USERS);
        self.changes.publish(format!("{}/{}", collections::USERS, uid));
        Ok(())
    }

    /// Delete a user's role/profile record.
    pub async fn delete_profile(&self, uid: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::USERS);
        self.changes.publish(format!("{}/{}", collections::USERS, uid));
        Ok(())
    }

    /// List all user records with their uids (admin view).
    pub async fn list_profiles(&self) -> Result<Vec<Doc<UserProfile>>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find users flagged `pending_deletion` at or before the cutoff.
    ///
    /// RFC 3339 UTC strings compare lexicographically, so the cutoff is a
    /// plain string comparison on the stored field.
    pub async fn find_pending_deletions(
        &self,
        cutoff: &str,
    ) -> Result<Vec<Doc<UserProfile>>, AppError> {
        let cutoff = cutoff.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_all([
                    q.field("status").eq("pending_deletion"),
                    q.field("deletionRequestedAt")
                        .less_than_or_equal(cutoff.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Archive Operations ──────────────────────────────────────

    /// Get an archive record by the removed user's uid.
    pub async fn get_archive(&self, uid: &str) -> Result<Option<ArchiveRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ARCHIVE)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store an archive record, keyed by the removed user's uid.
    pub async fn set_archive(&self, record: &ArchiveRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ARCHIVE)
            .document_id(&record.uid)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::ARCHIVE);
        Ok(())
    }

    /// Delete an archive record (restore or wipe).
    pub async fn delete_archive(&self, uid: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ARCHIVE)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::ARCHIVE);
        Ok(())
    }

    /// List the archive (admin view).
    pub async fn list_archive(&self) -> Result<Vec<Doc<ArchiveRecord>>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ARCHIVE)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Feed Post Operations ────────────────────────────────────

    /// Get the newest posts, newest first, capped by the fetch limit.
    pub async fn get_posts(&self, limit: u32) -> Result<Vec<Doc<Post>>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FEED)
            .order_by([(
                "createdAt",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new post. Returns the minted document id.
    pub async fn create_post(&self, post: &Post) -> Result<String, AppError> {
        let id = mint_doc_id();
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FEED)
            .document_id(&id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::FEED);
        Ok(id)
    }

    /// Delete a post. Subcollection documents are left behind, matching
    /// how the site has always removed posts.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FEED)
            .document_id(post_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::FEED);
        Ok(())
    }

    // ─── Comment Operations ──────────────────────────────────────

    /// List comments under a post, oldest first.
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Doc<Comment>>, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::FEED, post_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .parent(&parent)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a comment under a post. Returns the minted document id.
    pub async fn add_comment(&self, post_id: &str, comment: &Comment) -> Result<String, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::FEED, post_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let id = mint_doc_id();
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COMMENTS)
            .document_id(&id)
            .parent(&parent)
            .object(comment)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes
            .publish(format!("{}/{}/{}", collections::FEED, post_id, collections::COMMENTS));
        Ok(id)
    }

    // ─── Reaction Operations ─────────────────────────────────────

    /// List reactions under a post. Document ids are the reacting uids.
    pub async fn list_reactions(&self, post_id: &str) -> Result<Vec<Doc<Reaction>>, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::FEED, post_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .from(collections::REACTIONS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one user's reaction to a post, if any.
    pub async fn get_reaction(
        &self,
        post_id: &str,
        uid: &str,
    ) -> Result<Option<Reaction>, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::FEED, post_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REACTIONS)
            .parent(&parent)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a user's reaction to a post, keyed by their uid.
    pub async fn set_reaction(
        &self,
        post_id: &str,
        uid: &str,
        reaction: &Reaction,
    ) -> Result<(), AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::FEED, post_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REACTIONS)
            .document_id(uid)
            .parent(&parent)
            .object(reaction)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes
            .publish(format!("{}/{}/{}", collections::FEED, post_id, collections::REACTIONS));
        Ok(())
    }

    /// Remove a user's reaction to a post.
    pub async fn delete_reaction(&self, post_id: &str, uid: &str) -> Result<(), AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::FEED, post_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REACTIONS)
            .parent(&parent)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes
            .publish(format!("{}/{}/{}", collections::FEED, post_id, collections::REACTIONS));
        Ok(())
    }

    // ─── Event Operations ────────────────────────────────────────

    /// Get all events ordered by event date, earliest first. The view layer
    /// splits upcoming from past.
    pub async fn get_events(&self) -> Result<Vec<Doc<Event>>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ARRANGEMENTS)
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new event. Returns the minted document id.
    pub async fn create_event(&self, event: &Event) -> Result<String, AppError> {
        let id = mint_doc_id();
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ARRANGEMENTS)
            .document_id(&id)
            .object(event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::ARRANGEMENTS);
        Ok(id)
    }

    /// Delete an event.
    pub async fn delete_event(&self, event_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ARRANGEMENTS)
            .document_id(event_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes.publish(collections::ARRANGEMENTS);
        Ok(())
    }

    // ─── RSVP Operations ─────────────────────────────────────────

    /// List RSVPs under an event. Document ids are the responding uids.
    pub async fn list_rsvps(&self, event_id: &str) -> Result<Vec<Doc<EventRsvp>>, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::ARRANGEMENTS, event_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .from(collections::RSVP)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one user's RSVP for an event, if any.
    pub async fn get_rsvp(
        &self,
        event_id: &str,
        uid: &str,
    ) -> Result<Option<EventRsvp>, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::ARRANGEMENTS, event_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RSVP)
            .parent(&parent)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a user's RSVP for an event, keyed by their uid.
    pub async fn set_rsvp(
        &self,
        event_id: &str,
        uid: &str,
        rsvp: &EventRsvp,
    ) -> Result<(), AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::ARRANGEMENTS, event_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RSVP)
            .document_id(uid)
            .parent(&parent)
            .object(rsvp)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes
            .publish(format!("{}/{}/{}", collections::ARRANGEMENTS, event_id, collections::RSVP));
        Ok(())
    }

    /// Remove a user's RSVP for an event.
    pub async fn delete_rsvp(&self, event_id: &str, uid: &str) -> Result<(), AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::ARRANGEMENTS, event_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::RSVP)
            .parent(&parent)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.changes
            .publish(format!("{}/{}/{}", collections::ARRANGEMENTS, event_id, collections::RSVP));
        Ok(())
    }

    // ─── Gallery Operations ──────────────────────────────────────

    /// List curated gallery images in display order.
    pub async fn list_gallery(&self) -> Result<Vec<GalleryImage>, AppError> {
        let parent = self
            .get_client()?
            .parent_path(collections::SITE_CONTENT, collections::GALLERY_DOC)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .from(collections::GALLERY_ITEMS)
            .parent(&parent)
            .order_by([("order", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
