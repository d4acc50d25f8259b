// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Availability Calendar: a shared calendar of who is free on which day
//!
//! This crate provides the backend API where signed-in users mark their
//! availability for a date and see everyone else's.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{CalendarCoordinator, GoogleOidcVerifier, IdentityService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub calendar: CalendarCoordinator,
    /// Email/password accounts; `None` when no API key is configured
    pub identity: Option<IdentityService>,
    /// Google sign-in; `None` when no OAuth client ID is configured
    pub google_verifier: Option<Arc<GoogleOidcVerifier>>,
}

impl AppState {
    /// Build state from config, enabling the sign-in methods it configures.
    pub fn from_config(config: Config, db: FirestoreDb) -> anyhow::Result<Self> {
        let identity = config
            .firebase_api_key
            .clone()
            .map(IdentityService::new)
            .transpose()?;

        let google_verifier = config
            .google_client_id
            .as_deref()
            .map(GoogleOidcVerifier::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            calendar: CalendarCoordinator::new(db),
            identity,
            google_verifier,
            config,
        })
    }
}
