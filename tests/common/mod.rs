// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use forening_api::config::Config;
use forening_api::db::FirestoreDb;
use forening_api::routes::create_router;
use forening_api::services::{AccountsService, IdentityService};
use forening_api::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Generate a unique uid for test isolation.
#[allow(dead_code)]
pub fn unique_uid(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos:x}")
}

/// Create a test app around the given database, with a mock identity
/// provider. Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let identity = IdentityService::new_mock();
    let accounts = AccountsService::new(db.clone(), identity.clone());
    let paint_hints = Arc::new(dashmap::DashMap::new());

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        accounts,
        paint_hints,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(test_db_offline())
}

/// Identity directory double that records calls and can be told to fail
/// for specific uids.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingDirectory {
    pub deleted: Arc<std::sync::Mutex<Vec<String>>>,
    pub created: Arc<std::sync::Mutex<Vec<(String, String)>>>,
    pub disabled: Arc<std::sync::Mutex<Vec<(String, bool)>>>,
    pub fail_delete_for: Arc<std::sync::Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete_for(self, uid: &str) -> Self {
        self.fail_delete_for.lock().unwrap().push(uid.to_string());
        self
    }
}

impl forening_api::services::IdentityDirectory for RecordingDirectory {
    async fn delete_user(&self, uid: &str) -> Result<(), forening_api::error::AppError> {
        if self.fail_delete_for.lock().unwrap().iter().any(|u| u == uid) {
            return Err(forening_api::error::AppError::Identity(
                "simulated directory outage".to_string(),
            ));
        }
        self.deleted.lock().unwrap().push(uid.to_string());
        Ok(())
    }

    async fn set_disabled(
        &self,
        uid: &str,
        disabled: bool,
    ) -> Result<(), forening_api::error::AppError> {
        self.disabled.lock().unwrap().push((uid.to_string(), disabled));
        Ok(())
    }

    async fn create_user(
        &self,
        uid: &str,
        email: &str,
        _password: &str,
    ) -> Result<(), forening_api::error::AppError> {
        self.created
            .lock()
            .unwrap()
            .push((uid.to_string(), email.to_string()));
        Ok(())
    }
}

/// Session cookie header value for a signed-in test user.
#[allow(dead_code)]
pub fn session_cookie(uid: &str, email: &str) -> String {
    let config = Config::test_default();
    let token = forening_api::middleware::auth::create_jwt(uid, email, &config.jwt_signing_key)
        .expect("JWT creation should work");
    format!(
        "{}={}",
        forening_api::middleware::auth::SESSION_COOKIE,
        token
    )
}
