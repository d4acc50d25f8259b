// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google ID token verification for federated sign-in.
//!
//! The browser obtains an ID token from Google Identity Services and posts
//! it to `/auth/google`; this module checks signature, issuer, audience and
//! timestamps before the subject is trusted as a user ID.

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Prefix that keeps Google subjects apart from email/password user IDs.
pub const GOOGLE_USER_PREFIX: &str = "google:";

/// Google account extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: Option<String>,
}

impl GoogleIdentity {
    /// Profile ID for this account.
    pub fn user_id(&self) -> String {
        format!("{}{}", GOOGLE_USER_PREFIX, self.subject)
    }
}

/// OIDC verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OidcError {
    /// The token is malformed, forged, expired or meant for someone else.
    #[error("ID token rejected: {0}")]
    Rejected(String),
    /// Google's key endpoint could not be reached or parsed.
    #[error("ID token keys unavailable: {0}")]
    Transient(String),
}

enum KeySource {
    Remote { http: reqwest::Client, jwks_url: String },
    Static,
}

struct KeySet {
    by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Option<Instant>,
}

impl KeySet {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }

    /// Look up `kid` in an unexpired set. An unknown kid is rejected
    /// outright; only expiry triggers a refetch.
    fn lookup(&self, kid: &str) -> Option<Result<Arc<DecodingKey>, OidcError>> {
        if self.is_expired() {
            return None;
        }
        Some(
            self.by_kid
                .get(kid)
                .cloned()
                .ok_or_else(|| OidcError::Rejected(format!("unknown JWT kid: {kid}"))),
        )
    }
}

/// Verifier for Google-issued ID tokens.
pub struct GoogleOidcVerifier {
    client_id: String,
    source: KeySource,
    keys: RwLock<KeySet>,
    refresh_lock: Mutex<()>,
}

impl GoogleOidcVerifier {
    /// Create a verifier that fetches and caches Google's signing keys.
    pub fn new(client_id: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_jwks_url(client_id, JWKS_URL)
    }

    /// Create a verifier that fetches signing keys from `jwks_url`.
    pub fn with_jwks_url(
        client_id: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building OIDC HTTP client")?;

        let client_id = client_id.into();
        tracing::info!(client_id = %client_id, "Initialized Google sign-in verifier");

        Ok(Self {
            client_id,
            source: KeySource::Remote {
                http,
                jwks_url: jwks_url.into(),
            },
            keys: RwLock::new(KeySet {
                by_kid: HashMap::new(),
                expires_at: Some(Instant::now()),
            }),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a verifier that trusts exactly one RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        client_id: impl Into<String>,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static OIDC kid must not be empty");
        }

        Ok(Self {
            client_id: client_id.into(),
            source: KeySource::Static,
            keys: RwLock::new(KeySet {
                by_kid: HashMap::from([(kid, Arc::new(decoding_key))]),
                expires_at: None,
            }),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a Google ID token and return the account it names.
    pub async fn verify_id_token(&self, token: &str) -> Result<GoogleIdentity, OidcError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(OidcError::Rejected("ID token is empty".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| OidcError::Rejected(format!("invalid JWT header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(OidcError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| OidcError::Rejected("missing JWT kid".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<IdTokenClaims>(token, key.as_ref(), &validation)
            .map_err(|e| OidcError::Rejected(format!("JWT validation failed: {e}")))?
            .claims;

        check_issued_at(claims.iat)?;

        if claims.email.is_some() && claims.email_verified == Some(false) {
            return Err(OidcError::Rejected("email is not verified".to_string()));
        }

        tracing::debug!(subject = %claims.sub, "Google ID token verified");

        Ok(GoogleIdentity {
            subject: claims.sub,
            email: claims.email,
        })
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, OidcError> {
        if let Some(found) = self.keys.read().await.lookup(kid) {
            return found;
        }

        let KeySource::Remote { http, jwks_url } = &self.source else {
            return Err(OidcError::Rejected(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        };

        // One refresh at a time; a waiter may find the set already reloaded.
        let _guard = self.refresh_lock.lock().await;
        if let Some(found) = self.keys.read().await.lookup(kid) {
            return found;
        }

        let key_set = fetch_jwks(http, jwks_url).await?;
        let key = key_set.by_kid.get(kid).cloned();
        *self.keys.write().await = key_set;

        key.ok_or_else(|| OidcError::Rejected(format!("JWT kid not found in JWKS: {kid}")))
    }
}

async fn fetch_jwks(http: &reqwest::Client, jwks_url: &str) -> Result<KeySet, OidcError> {
    tracing::debug!(url = jwks_url, "Refreshing Google signing keys");

    let response = http
        .get(jwks_url)
        .send()
        .await
        .map_err(|e| OidcError::Transient(format!("JWKS request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(OidcError::Transient(format!(
            "JWKS request returned status {}",
            response.status()
        )));
    }

    let ttl = response
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(max_age_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_KEY_TTL);

    let jwks: Jwks = response
        .json()
        .await
        .map_err(|e| OidcError::Transient(format!("invalid JWKS JSON: {e}")))?;

    let by_kid: HashMap<String, Arc<DecodingKey>> = jwks
        .keys
        .into_iter()
        .filter(Jwk::is_rs256_signing_key)
        .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => Some((jwk.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                None
            }
        })
        .collect();

    if by_kid.is_empty() {
        return Err(OidcError::Transient(
            "JWKS response did not include any usable RSA keys".to_string(),
        ));
    }

    Ok(KeySet {
        by_kid,
        expires_at: Some(Instant::now() + ttl),
    })
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

impl Jwk {
    fn is_rs256_signing_key(&self) -> bool {
        self.kty == "RSA"
            && !self.kid.trim().is_empty()
            && self.alg.as_deref().map_or(true, |alg| alg == "RS256")
            && self.use_.as_deref().map_or(true, |u| u == "sig")
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
    email_verified: Option<bool>,
}

fn check_issued_at(iat: Option<u64>) -> Result<(), OidcError> {
    let iat = iat.ok_or_else(|| OidcError::Rejected("missing iat claim".to_string()))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    if iat > now + CLOCK_SKEW_SECS {
        return Err(OidcError::Rejected("iat claim is in the future".to_string()));
    }
    Ok(())
}

/// Parse the `max-age` directive of a Cache-Control header.
fn max_age_secs(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse().ok())
}
