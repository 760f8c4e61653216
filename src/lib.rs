// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forening-API: members-area backend for the association website
//!
//! This crate provides the backend API behind the public pages (gallery,
//! events, feed) and the members area: session bootstrap, role/profile
//! resolution, live content feeds and the account lifecycle procedures.

pub mod config;
pub mod db;
pub mod error;
pub mod feeds;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use feeds::PaintHintCache;
use services::{AccountsService, IdentityService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityService,
    pub accounts: AccountsService<IdentityService>,
    /// Last-known feed snapshots, painted as a first frame on new live
    /// connections. Never authoritative.
    pub paint_hints: PaintHintCache,
}
