// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The session store and its bootstrap signal.
//!
//! One store exists per page session. It starts empty, resolves exactly
//! once when the identity provider has reported its first state (and the
//! role/profile lookup has completed or failed closed), and is mutated
//! afterwards only through [`SessionStore::apply`].

use crate::error::AppError;
use crate::models::{Role, UserProfile};
use crate::session::resolver::ResolvedSession;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// An authenticated identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Before the bootstrap signal has resolved.
    Unknown,
    /// Bootstrap has resolved; the snapshot is the best-known state.
    Resolved,
}

/// Snapshot of the session at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub profile: Option<UserProfile>,
}

impl SessionState {
    fn empty() -> Self {
        Self {
            phase: SessionPhase::Unknown,
            identity: None,
            role: None,
            profile: None,
        }
    }

    /// Whether the session carries both an identity and a role.
    /// This is what the page guard keys off.
    pub fn is_authorized(&self) -> bool {
        self.identity.is_some() && self.role.is_some()
    }
}

/// The only ways the session state can change.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn {
        identity: Identity,
        role: Role,
        profile: UserProfile,
    },
    /// Live profile subscription delivered an update for the current user.
    ProfileUpdated { role: Role, profile: UserProfile },
    SignedOut,
}

/// Owner of the session state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
    bootstrapped: Arc<AtomicBool>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::empty());
        Self {
            tx: Arc::new(tx),
            bootstrapped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// The single mutation entry point.
    ///
    /// Events are reduced onto the current state; dependents observe the
    /// result through their watch receivers.
    pub fn apply(&self, event: SessionEvent) {
        self.tx.send_modify(|state| {
            state.phase = SessionPhase::Resolved;
            match event {
                SessionEvent::SignedIn {
                    identity,
                    role,
                    profile,
                } => {
                    state.identity = Some(identity);
                    state.role = Some(role);
                    state.profile = Some(profile);
                }
                SessionEvent::ProfileUpdated { role, profile } => {
                    // Ignored unless someone is actually signed in
                    if state.identity.is_some() {
                        state.role = Some(role);
                        state.profile = Some(profile);
                    }
                }
                SessionEvent::SignedOut => {
                    state.identity = None;
                    state.role = None;
                    state.profile = None;
                }
            }
        });
    }

    /// Resolve the bootstrap signal exactly once.
    ///
    /// `first_identity` is the identity provider's first reported state; a
    /// provider error resolves the session as unauthenticated rather than
    /// leaving the signal pending. If an identity is present, `resolve`
    /// performs the role/profile lookup; a failure there fails closed
    /// (signed out).
    ///
    /// Calling bootstrap again returns the current snapshot without
    /// resolving a second time.
    pub async fn bootstrap<F, Fut>(
        &self,
        first_identity: Result<Option<Identity>, AppError>,
        resolve: F,
    ) -> SessionState
    where
        F: FnOnce(Identity) -> Fut,
        Fut: Future<Output = Result<ResolvedSession, AppError>>,
    {
        if self
            .bootstrapped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Session already bootstrapped, returning current snapshot");
            return self.snapshot();
        }

        let identity = match first_identity {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "Identity provider error, resolving unauthenticated");
                None
            }
        };

        match identity {
            None => self.apply(SessionEvent::SignedOut),
            Some(identity) => match resolve(identity.clone()).await {
                Ok(resolved) => self.apply(SessionEvent::SignedIn {
                    identity,
                    role: resolved.role,
                    profile: resolved.profile,
                }),
                Err(e) => {
                    // Valid identity but no usable role/profile record:
                    // force sign-out and resolve as unauthenticated.
                    tracing::warn!(
                        uid = %identity.uid,
                        error = %e,
                        "Role/profile resolution failed, forcing sign-out"
                    );
                    self.apply(SessionEvent::SignedOut);
                }
            },
        }

        self.snapshot()
    }

    /// Wait until the bootstrap signal has resolved, then return the
    /// snapshot. Dependent components call this before doing anything.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.tx.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if state.phase == SessionPhase::Resolved {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                // Sender gone; return whatever we last saw
                return self.snapshot();
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
