// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle procedures.
//!
//! The admin-invoked operations (permanent delete, restore, restore from
//! archive, wipe) and the scheduled cleanup of accounts past their
//! deletion grace period. Archiving, document deletion and identity
//! deletion are sequential operations with no compensating transaction; a
//! failure mid-sequence leaves the earlier steps in place. That matches
//! how the site has always behaved and is surfaced to the caller as an
//! error.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{AccountStatus, ArchiveReason, ArchiveRecord, Role, UserProfile};
use crate::services::identity::IdentityDirectory;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use chrono::{DateTime, Utc};

/// Days a `pending_deletion` account is kept before the scheduled cleanup
/// purges it.
pub const DELETION_GRACE_DAYS: i64 = 30;

/// Result of one scheduled cleanup run.
#[derive(Debug, Default)]
pub struct CleanupOutcome {
    pub purged: Vec<String>,
    pub failed: Vec<String>,
}

/// The cutoff timestamp for a cleanup run: anything requested at or
/// before it is due for purging.
pub fn cleanup_cutoff(now: DateTime<Utc>) -> String {
    format_utc_rfc3339(now - chrono::Duration::days(DELETION_GRACE_DAYS))
}

/// Mint a temporary credential for a restored identity. The user is
/// expected to reset it via the password-reset email immediately.
fn temporary_credential(uid: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let prefix: String = uid.chars().take(4).collect();
    format!("Midl-{prefix}-{nanos:x}{seq:x}")
}

/// Account lifecycle operations over the document store and the identity
/// directory.
#[derive(Clone)]
pub struct AccountsService<D> {
    db: FirestoreDb,
    directory: D,
}

impl<D: IdentityDirectory> AccountsService<D> {
    pub fn new(db: FirestoreDb, directory: D) -> Self {
        Self { db, directory }
    }

    /// Flag the user's own account for deletion (30-day grace period).
    pub async fn request_deletion(&self, uid: &str) -> Result<(), AppError> {
        // Fetch-modify-write to preserve other fields
        let mut profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Bruker ikke funnet.".to_string()))?;

        profile.status = AccountStatus::PendingDeletion;
        profile.deletion_requested_at = Some(now_rfc3339());
        self.db.upsert_profile(uid, &profile).await?;

        tracing::info!(uid, "Account flagged pending_deletion");
        Ok(())
    }

    /// Admin: archive and permanently remove a user right now.
    ///
    /// Sequence: archive snapshot, delete the document record, delete the
    /// identity. No compensation on partial failure.
    pub async fn permanent_delete_now(&self, uid: &str) -> Result<String, AppError> {
        let profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Bruker ikke funnet.".to_string()))?;

        self.purge(uid, &profile, ArchiveReason::BannedImmediate)
            .await?;

        Ok(format!("Bruker {uid} er slettet permanent."))
    }

    /// Admin: cancel a pending deletion and re-enable the identity.
    pub async fn restore_pending(&self, uid: &str) -> Result<String, AppError> {
        let mut profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Bruker ikke funnet.".to_string()))?;

        profile.status = AccountStatus::Active;
        profile.deletion_requested_at = None;
        self.db.upsert_profile(uid, &profile).await?;

        self.directory.set_disabled(uid, false).await?;

        tracing::info!(uid, "Pending deletion cancelled");
        Ok(format!("Bruker {uid} er gjenopprettet."))
    }

    /// Admin: bring an archived user back.
    ///
    /// Re-creates the identity with a temporary credential, rebuilds a
    /// member profile with consent flags reset, and removes the archive
    /// record. Returns the message shown to the admin.
    pub async fn restore_from_archive(&self, uid: &str) -> Result<String, AppError> {
        let record = self
            .db
            .get_archive(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Arkivoppføring ikke funnet.".to_string()))?;

        if self.db.get_profile(uid).await?.is_some() {
            return Err(AppError::FailedPrecondition(
                "Brukeren finnes allerede.".to_string(),
            ));
        }

        let credential = temporary_credential(uid);
        self.directory
            .create_user(uid, &record.email, &credential)
            .await?;

        let profile = UserProfile {
            role: Some(Role::Member.as_str().to_string()),
            display_name: record.full_name.clone(),
            email: Some(record.email.clone()),
            photo_url: None,
            member_since: record.start_date.clone().unwrap_or_else(now_rfc3339),
            org_role: None,
            status: AccountStatus::Active,
            deletion_requested_at: None,
            // Consents do not survive an archive round-trip
            consents: Default::default(),
        };
        self.db.upsert_profile(uid, &profile).await?;
        self.db.delete_archive(uid).await?;

        tracing::info!(uid, "User restored from archive");
        Ok(format!(
            "Bruker {uid} er gjenopprettet fra arkivet med midlertidig passord."
        ))
    }

    /// Admin: permanently remove an archive record.
    pub async fn wipe_archived(&self, uid: &str) -> Result<String, AppError> {
        if self.db.get_archive(uid).await?.is_none() {
            return Err(AppError::NotFound("Arkivoppføring ikke funnet.".to_string()));
        }

        self.db.delete_archive(uid).await?;

        tracing::info!(uid, "Archive record wiped");
        Ok(format!("Arkivoppføringen for {uid} er slettet permanent."))
    }

    /// Scheduled cleanup: purge every account flagged `pending_deletion`
    /// longer than the grace period. Best-effort per record, so one
    /// failure does not abort the batch.
    pub async fn cleanup_pending_deletions(&self) -> Result<CleanupOutcome, AppError> {
        let cutoff = cleanup_cutoff(Utc::now());
        let due = self.db.find_pending_deletions(&cutoff).await?;

        if due.is_empty() {
            tracing::info!("No users pending deletion for cleanup");
            return Ok(CleanupOutcome::default());
        }

        let mut outcome = CleanupOutcome::default();
        for doc in due {
            let uid = doc.id_str().to_string();
            if uid.is_empty() {
                continue;
            }

            match self.purge(&uid, &doc.data, ArchiveReason::Voluntary).await {
                Ok(()) => {
                    tracing::info!(uid = %uid, "Archived and deleted user");
                    outcome.purged.push(uid);
                }
                Err(e) => {
                    tracing::error!(uid = %uid, error = %e, "Cleanup failed for user");
                    outcome.failed.push(uid);
                }
            }
        }

        Ok(outcome)
    }

    /// Archive, then delete the document record, then delete the identity.
    async fn purge(
        &self,
        uid: &str,
        profile: &UserProfile,
        reason: ArchiveReason,
    ) -> Result<(), AppError> {
        let record = ArchiveRecord::from_profile(uid, profile, &now_rfc3339(), reason);
        self.db.set_archive(&record).await?;
        self.db.delete_profile(uid).await?;
        self.directory.delete_user(uid).await?;
        Ok(())
    }
}
