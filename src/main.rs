// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forening-API Server
//!
//! Backend for the association website: session bootstrap and page
//! guarding for the members area, live content feeds, and the admin
//! account procedures over Firestore and the identity provider.

use forening_api::{
    config::Config,
    db::FirestoreDb,
    services::{AccountsService, IdentityService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Forening-API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Identity provider client (sign-in + admin directory)
    let identity = IdentityService::new(&config).expect("Failed to initialize identity client");
    tracing::info!("Identity provider client initialized");

    // Account lifecycle procedures
    let accounts = AccountsService::new(db.clone(), identity.clone());

    // Shared paint-hint cache for first-frame feed snapshots
    let paint_hints = Arc::new(dashmap::DashMap::new());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        accounts,
        paint_hints,
    });

    // Build router
    let app = forening_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("forening_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
