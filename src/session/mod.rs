// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session core: bootstrap, role/profile resolution and page guarding.
//!
//! The session store is the single owner of the signed-in state. All
//! mutations go through [`store::SessionStore::apply`]; everything else
//! (guard evaluation, feed binding, admin toggles) reads snapshots or
//! subscribes for changes.

pub mod guard;
pub mod resolver;
pub mod store;

pub use guard::{GuardState, PageGuard, PageKind, RedirectTarget};
pub use resolver::{ProfileStore, ResolvedSession, RoleProfileResolver};
pub use store::{Identity, SessionEvent, SessionPhase, SessionState, SessionStore};
