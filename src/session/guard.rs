// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page guard: decides whether a page may run for the current session.
//!
//! Driven solely by the bootstrap signal and subsequent identity-change
//! events. A redirect decision is terminal for that evaluation; there is
//! no timeout or cancellation.

use crate::models::AccountStatus;
use crate::session::store::{SessionPhase, SessionState};
use serde::{Deserialize, Serialize};

/// What kind of page the guard is protecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Open to everyone; the guard always allows.
    Public,
    /// Members area; requires identity and role.
    Restricted,
    /// The login page; signed-in members are sent onwards.
    Login,
}

/// Where a redirect decision points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    Login,
    MembersHome,
}

/// Protection status of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "target")]
pub enum GuardState {
    /// Before the bootstrap signal has resolved.
    Unknown,
    /// Bootstrap resolved, evaluation in progress.
    Checking,
    /// The page may run.
    Allowed,
    /// The page must navigate away. Terminal for this evaluation.
    Redirecting(RedirectTarget),
}

/// Guard instance for one page.
#[derive(Debug, Clone)]
pub struct PageGuard {
    page: PageKind,
    state: GuardState,
}

impl PageGuard {
    pub fn new(page: PageKind) -> Self {
        Self {
            page,
            state: GuardState::Unknown,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Evaluate against a session snapshot. Called once the bootstrap
    /// signal resolves and again on every identity change.
    pub fn on_session(&mut self, session: &SessionState) -> GuardState {
        // A pending redirect always completes; don't re-decide under it.
        if matches!(self.state, GuardState::Redirecting(_)) {
            return self.state;
        }

        if session.phase == SessionPhase::Unknown {
            return self.state;
        }

        self.state = GuardState::Checking;
        self.state = Self::evaluate(self.page, session);
        self.state
    }

    /// Pure decision for a page kind and session snapshot.
    pub fn evaluate(page: PageKind, session: &SessionState) -> GuardState {
        let authorized = session.is_authorized() && !Self::pending_deletion(session);

        match page {
            PageKind::Public => GuardState::Allowed,
            PageKind::Restricted => {
                if authorized {
                    GuardState::Allowed
                } else {
                    GuardState::Redirecting(RedirectTarget::Login)
                }
            }
            PageKind::Login => {
                if authorized {
                    GuardState::Redirecting(RedirectTarget::MembersHome)
                } else {
                    GuardState::Allowed
                }
            }
        }
    }

    /// A `pending_deletion` record still resolves, but it does not
    /// authorize ordinary member use.
    fn pending_deletion(session: &SessionState) -> bool {
        session
            .profile
            .as_ref()
            .map(|p| p.status == AccountStatus::PendingDeletion)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserProfile};
    use crate::session::store::Identity;

    fn signed_in_state() -> SessionState {
        SessionState {
            phase: SessionPhase::Resolved,
            identity: Some(Identity {
                uid: "uid-1".to_string(),
                email: "kari@example.com".to_string(),
            }),
            role: Some(Role::Member),
            profile: Some(UserProfile::default_for(
                "kari@example.com",
                "2026-01-01T00:00:00Z",
            )),
        }
    }

    fn signed_out_state() -> SessionState {
        SessionState {
            phase: SessionPhase::Resolved,
            identity: None,
            role: None,
            profile: None,
        }
    }

    fn unresolved_state() -> SessionState {
        SessionState {
            phase: SessionPhase::Unknown,
            identity: None,
            role: None,
            profile: None,
        }
    }

    #[test]
    fn test_starts_unknown_and_stays_until_bootstrap() {
        let mut guard = PageGuard::new(PageKind::Restricted);
        assert_eq!(guard.state(), GuardState::Unknown);

        // Bootstrap has not resolved: no decision yet
        assert_eq!(guard.on_session(&unresolved_state()), GuardState::Unknown);
    }

    #[test]
    fn test_restricted_page_redirects_unauthenticated_to_login() {
        let mut guard = PageGuard::new(PageKind::Restricted);
        assert_eq!(
            guard.on_session(&signed_out_state()),
            GuardState::Redirecting(RedirectTarget::Login)
        );
    }

    #[test]
    fn test_restricted_page_allows_member() {
        let mut guard = PageGuard::new(PageKind::Restricted);
        assert_eq!(guard.on_session(&signed_in_state()), GuardState::Allowed);
    }

    #[test]
    fn test_login_page_redirects_signed_in_member() {
        let mut guard = PageGuard::new(PageKind::Login);
        assert_eq!(
            guard.on_session(&signed_in_state()),
            GuardState::Redirecting(RedirectTarget::MembersHome)
        );
    }

    #[test]
    fn test_login_page_allows_anonymous() {
        let mut guard = PageGuard::new(PageKind::Login);
        assert_eq!(guard.on_session(&signed_out_state()), GuardState::Allowed);
    }

    #[test]
    fn test_reevaluates_on_sign_out() {
        let mut guard = PageGuard::new(PageKind::Restricted);
        assert_eq!(guard.on_session(&signed_in_state()), GuardState::Allowed);

        // Sign-out arrives later: the guard re-runs and redirects
        assert_eq!(
            guard.on_session(&signed_out_state()),
            GuardState::Redirecting(RedirectTarget::Login)
        );
    }

    #[test]
    fn test_pending_redirect_always_completes() {
        let mut guard = PageGuard::new(PageKind::Restricted);
        guard.on_session(&signed_out_state());
        assert_eq!(
            guard.state(),
            GuardState::Redirecting(RedirectTarget::Login)
        );

        // A sign-in racing the redirect does not cancel it
        assert_eq!(
            guard.on_session(&signed_in_state()),
            GuardState::Redirecting(RedirectTarget::Login)
        );
    }

    #[test]
    fn test_pending_deletion_is_unauthorized_for_member_pages() {
        let mut state = signed_in_state();
        state.profile.as_mut().unwrap().status = crate::models::AccountStatus::PendingDeletion;

        let mut guard = PageGuard::new(PageKind::Restricted);
        assert_eq!(
            guard.on_session(&state),
            GuardState::Redirecting(RedirectTarget::Login)
        );
    }

    #[test]
    fn test_public_page_always_allowed() {
        let mut guard = PageGuard::new(PageKind::Public);
        assert_eq!(guard.on_session(&signed_out_state()), GuardState::Allowed);
    }
}
