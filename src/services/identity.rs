// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity Toolkit client for email/password accounts.
//!
//! Handles:
//! - Registration (`accounts:signUp`)
//! - Sign-in (`accounts:signInWithPassword`)
//! - Mapping provider error codes to [`AuthFailure`]
//!
//! Set FIREBASE_AUTH_EMULATOR_HOST to talk to the Auth emulator.

use crate::error::{AppError, AuthFailure};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PRODUCTION_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// An account the provider has authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned user ID (becomes the profile ID)
    pub user_id: String,
    pub email: Option<String>,
}

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityService {
    /// Create a client for the production endpoint, or the emulator if
    /// FIREBASE_AUTH_EMULATOR_HOST is set.
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com", host)
            }
            Err(_) => PRODUCTION_BASE_URL.to_string(),
        };
        Self::with_base_url(api_key, base_url)
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Register a new email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let identity = self.post_credentials("accounts:signUp", email, password).await?;
        tracing::info!(user_id = %identity.user_id, "Registered new account");
        Ok(identity)
    }

    /// Sign in with an existing email/password account.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let identity = self
            .post_credentials("accounts:signInWithPassword", email, password)
            .await?;
        tracing::debug!(user_id = %identity.user_id, "Password sign-in succeeded");
        Ok(identity)
    }

    async fn post_credentials(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        let url = format!("{}/v1/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&CredentialsRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Credential problems come back as 400 with a code in error.message
            if status.as_u16() == 400 {
                if let Ok(err) = serde_json::from_str::<ProviderErrorBody>(&body) {
                    let failure = AuthFailure::from_provider_code(&err.error.message);
                    tracing::info!(method, failure = ?failure, "Identity provider refused credentials");
                    return Err(failure.into());
                }
            }

            return Err(AppError::Identity(format!("HTTP {}: {}", status, body)));
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))?;

        Ok(Identity {
            user_id: account.local_id,
            email: account.email,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}
