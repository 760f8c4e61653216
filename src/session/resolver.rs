// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role/profile resolution.
//!
//! Given an authenticated identity, resolve the durable role/profile
//! record: read it, create the default record on first sight, repair a
//! missing or legacy role field in place. After the first resolution,
//! updates arrive through the live profile watch rather than repeated
//! point reads.

use crate::db::{ChangeEvent, FirestoreDb};
use crate::error::AppError;
use crate::models::{Role, RoleNormalization, UserProfile};
use crate::session::store::{SessionEvent, SessionStore};
use crate::time_utils::now_rfc3339;
use std::future::Future;
use tokio::sync::broadcast;

/// Storage seam for role/profile records. Implemented by the Firestore
/// wrapper and by in-memory fakes in tests.
pub trait ProfileStore: Clone + Send + Sync + 'static {
    fn load(
        &self,
        uid: &str,
    ) -> impl Future<Output = Result<Option<UserProfile>, AppError>> + Send;

    fn store(
        &self,
        uid: &str,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Change notifications for live profile watching.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

impl ProfileStore for FirestoreDb {
    fn load(
        &self,
        uid: &str,
    ) -> impl Future<Output = Result<Option<UserProfile>, AppError>> + Send {
        self.get_profile(uid)
    }

    fn store(
        &self,
        uid: &str,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<(), AppError>> + Send {
        self.upsert_profile(uid, profile)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        FirestoreDb::changes(self)
    }
}

/// A resolved session: the normalized role plus the profile it came from.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub role: Role,
    pub profile: UserProfile,
}

/// Resolves role/profile records against a [`ProfileStore`].
#[derive(Clone)]
pub struct RoleProfileResolver<S> {
    store: S,
}

impl<S: ProfileStore> RoleProfileResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve the record for `uid`, creating or repairing as needed.
    ///
    /// Creation writes the full default document in one operation, so a
    /// raced double-create leaves a complete record either way (last
    /// writer wins).
    pub async fn resolve(&self, uid: &str, email: &str) -> Result<ResolvedSession, AppError> {
        match self.store.load(uid).await? {
            None => {
                let profile = UserProfile::default_for(email, &now_rfc3339());
                tracing::info!(uid, "No role/profile record, creating default");
                self.store.store(uid, &profile).await?;
                Ok(ResolvedSession {
                    role: Role::Member,
                    profile,
                })
            }
            Some(profile) => self.normalize_stored(uid, profile).await,
        }
    }

    /// Normalize a loaded record, repairing the stored role field when it
    /// is missing, unknown, or a legacy board title.
    async fn normalize_stored(
        &self,
        uid: &str,
        mut profile: UserProfile,
    ) -> Result<ResolvedSession, AppError> {
        let role = match profile.role.as_deref() {
            None | Some("") => {
                tracing::warn!(uid, "Record missing role field, repairing to member");
                profile.role = Some(Role::Member.as_str().to_string());
                self.store.store(uid, &profile).await?;
                Role::Member
            }
            Some(raw) => match Role::normalize(raw) {
                RoleNormalization::Role(role) => role,
                RoleNormalization::LegacyTitle { role, org_role } => {
                    tracing::info!(uid, title = %org_role, "Migrating legacy title out of role field");
                    profile.role = Some(role.as_str().to_string());
                    if profile.org_role.is_none() {
                        profile.org_role = Some(org_role);
                    }
                    self.store.store(uid, &profile).await?;
                    role
                }
                RoleNormalization::Unknown => {
                    tracing::warn!(uid, raw = %raw, "Unknown role value, repairing to member");
                    profile.role = Some(Role::Member.as_str().to_string());
                    self.store.store(uid, &profile).await?;
                    Role::Member
                }
            },
        };

        Ok(ResolvedSession { role, profile })
    }

    /// Watch `users/{uid}` and push updates into the session store.
    ///
    /// Runs until the change stream closes or the record disappears (which
    /// signs the session out). This is the "subsequent reads go through a
    /// live subscription" half of the resolver contract.
    pub async fn run_watch(&self, uid: String, session: SessionStore) {
        let mut rx = self.store.changes();
        let path = format!("users/{uid}");

        loop {
            match rx.recv().await {
                Ok(ChangeEvent { path: p }) if p == path => {}
                Ok(_) => continue,
                // A lagged receiver missed events; treat the gap as a change
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match self.store.load(&uid).await {
                Ok(Some(profile)) => {
                    // No repair writes here; the next full resolution repairs
                    let role = profile.normalized_role();
                    session.apply(SessionEvent::ProfileUpdated { role, profile });
                }
                Ok(None) => {
                    tracing::info!(uid = %uid, "Profile record removed, signing session out");
                    session.apply(SessionEvent::SignedOut);
                    break;
                }
                Err(e) => {
                    // Transient read failure: keep the last snapshot
                    tracing::warn!(uid = %uid, error = %e, "Profile watch read failed");
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ChangeHub;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// In-memory profile store counting writes.
    #[derive(Clone)]
    struct FakeStore {
        records: Arc<DashMap<String, UserProfile>>,
        writes: Arc<AtomicU32>,
        hub: ChangeHub,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                records: Arc::new(DashMap::new()),
                writes: Arc::new(AtomicU32::new(0)),
                hub: ChangeHub::new(),
            }
        }
    }

    impl ProfileStore for FakeStore {
        async fn load(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
            Ok(self.records.get(uid).map(|r| r.value().clone()))
        }

        async fn store(&self, uid: &str, profile: &UserProfile) -> Result<(), AppError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.records.insert(uid.to_string(), profile.clone());
            self.hub.publish(format!("users/{uid}"));
            Ok(())
        }

        fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
            self.hub.subscribe()
        }
    }

    #[tokio::test]
    async fn test_first_resolution_creates_default_once() {
        let store = FakeStore::new();
        let resolver = RoleProfileResolver::new(store.clone());

        let first = resolver.resolve("uid-1", "ola@example.com").await.unwrap();
        assert_eq!(first.role, Role::Member);
        assert_eq!(first.profile.display_name, "ola");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        // Resolving again must not create a second default record
        let second = resolver.resolve("uid-1", "ola@example.com").await.unwrap();
        assert_eq!(second.role, Role::Member);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_raced_default_creation_leaves_valid_record() {
        let store = FakeStore::new();
        let a = RoleProfileResolver::new(store.clone());
        let b = RoleProfileResolver::new(store.clone());

        let (ra, rb) = tokio::join!(
            a.resolve("uid-race", "per@example.com"),
            b.resolve("uid-race", "per@example.com"),
        );
        ra.unwrap();
        rb.unwrap();

        // Whatever the interleaving, the stored record has a single,
        // complete role value
        let stored = store.records.get("uid-race").unwrap().value().clone();
        assert_eq!(stored.role.as_deref(), Some("member"));
        assert!(!stored.display_name.is_empty());
    }

    #[tokio::test]
    async fn test_missing_role_repaired_in_place() {
        let store = FakeStore::new();
        let mut profile = UserProfile::default_for("nina@example.com", "2026-01-01T00:00:00Z");
        profile.role = None;
        profile.display_name = "Nina".to_string();
        store.records.insert("uid-2".to_string(), profile);

        let resolver = RoleProfileResolver::new(store.clone());
        let resolved = resolver.resolve("uid-2", "nina@example.com").await.unwrap();

        assert_eq!(resolved.role, Role::Member);
        // Repair preserved the rest of the record
        assert_eq!(resolved.profile.display_name, "Nina");
        let stored = store.records.get("uid-2").unwrap().value().clone();
        assert_eq!(stored.role.as_deref(), Some("member"));
    }

    #[tokio::test]
    async fn test_legacy_title_migrated_to_org_role() {
        let store = FakeStore::new();
        let mut profile = UserProfile::default_for("styre@example.com", "2026-01-01T00:00:00Z");
        profile.role = Some("Styremedlem".to_string());
        store.records.insert("uid-3".to_string(), profile);

        let resolver = RoleProfileResolver::new(store.clone());
        let resolved = resolver.resolve("uid-3", "styre@example.com").await.unwrap();

        assert_eq!(resolved.role, Role::Member);
        assert_eq!(resolved.profile.org_role.as_deref(), Some("Styremedlem"));
    }

    #[tokio::test]
    async fn test_admin_role_resolves_without_writes() {
        let store = FakeStore::new();
        let mut profile = UserProfile::default_for("admin@example.com", "2026-01-01T00:00:00Z");
        profile.role = Some("admin".to_string());
        store.records.insert("uid-4".to_string(), profile);

        let resolver = RoleProfileResolver::new(store.clone());
        let resolved = resolver.resolve("uid-4", "admin@example.com").await.unwrap();

        assert_eq!(resolved.role, Role::Admin);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_watch_pushes_profile_updates() {
        let store = FakeStore::new();
        let resolver = RoleProfileResolver::new(store.clone());
        let session = SessionStore::new();

        let resolved = resolver.resolve("uid-5", "liv@example.com").await.unwrap();
        session
            .bootstrap(
                Ok(Some(crate::session::Identity {
                    uid: "uid-5".to_string(),
                    email: "liv@example.com".to_string(),
                })),
                |_| async move { Ok(resolved) },
            )
            .await;

        let mut session_rx = session.subscribe();
        let watcher = {
            let resolver = resolver.clone();
            let session = session.clone();
            tokio::spawn(async move { resolver.run_watch("uid-5".to_string(), session).await })
        };
        tokio::task::yield_now().await;

        // Another session edits the display name
        let mut updated = store.records.get("uid-5").unwrap().value().clone();
        updated.display_name = "Liv Hansen".to_string();
        store.store("uid-5", &updated).await.unwrap();

        // The watch applies the update verbatim
        tokio::time::timeout(std::time::Duration::from_secs(1), session_rx.changed())
            .await
            .expect("watch update should arrive")
            .unwrap();
        let state = session.snapshot();
        assert_eq!(
            state.profile.unwrap().display_name,
            "Liv Hansen".to_string()
        );

        watcher.abort();
    }

    #[tokio::test]
    async fn test_watch_signs_out_when_record_removed() {
        let store = FakeStore::new();
        let resolver = RoleProfileResolver::new(store.clone());
        let session = SessionStore::new();

        let resolved = resolver.resolve("uid-6", "tor@example.com").await.unwrap();
        session
            .bootstrap(
                Ok(Some(crate::session::Identity {
                    uid: "uid-6".to_string(),
                    email: "tor@example.com".to_string(),
                })),
                |_| async move { Ok(resolved) },
            )
            .await;

        let watcher = {
            let resolver = resolver.clone();
            let session = session.clone();
            tokio::spawn(async move { resolver.run_watch("uid-6".to_string(), session).await })
        };
        tokio::task::yield_now().await;

        store.records.remove("uid-6");
        store.hub.publish("users/uid-6");

        // The watch loop exits after signing out
        tokio::time::timeout(std::time::Duration::from_secs(1), watcher)
            .await
            .expect("watch should stop")
            .unwrap();
        assert!(!session.snapshot().is_authorized());
    }
}
