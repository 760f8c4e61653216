// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod identity;

pub use accounts::{AccountsService, CleanupOutcome};
pub use identity::{IdentityDirectory, IdentityService};
