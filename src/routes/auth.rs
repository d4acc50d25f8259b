// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in routes: email/password, Google, and sign-out.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, removal_cookie, session_cookie};
use crate::routes::JsonBody;
use crate::services::{IdentityService, OidcError};
use crate::AppState;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_sign_in))
        .route("/auth/logout", post(logout))
}

/// Email/password request body.
#[derive(Deserialize, Validate)]
pub struct CredentialsBody {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "must be 1 to 128 characters"))]
    pub password: String,
}

/// Google sign-in request body.
#[derive(Deserialize)]
pub struct GoogleSignInBody {
    /// ID token from Google Identity Services
    pub id_token: String,
}

/// Returned after any successful sign-in. The token is also set as the
/// session cookie.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user_id: String,
    pub nickname: String,
    pub email: Option<String>,
    pub token: String,
}

fn password_provider(state: &AppState) -> Result<&IdentityService> {
    state.identity.as_ref().ok_or_else(|| {
        AppError::Unavailable("Email/password sign-in is not configured".to_string())
    })
}

fn validated(body: CredentialsBody) -> Result<CredentialsBody> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(body)
}

/// Create the profile if needed and issue a session for `user_id`.
async fn establish_session(
    state: &AppState,
    jar: CookieJar,
    user_id: String,
    email: Option<String>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let nickname = state.calendar.resolve_profile(&user_id).await?;
    let token = create_jwt(&user_id, &state.config.jwt_signing_key)?;

    tracing::info!(user_id = %user_id, "Session established");

    let jar = jar.add(session_cookie(token.clone(), &state.config));
    Ok((
        jar,
        Json(SessionResponse {
            user_id,
            nickname,
            email,
            token,
        }),
    ))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(body): JsonBody<CredentialsBody>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body = validated(body)?;
    let identity = password_provider(&state)?
        .sign_up(body.email.trim(), &body.password)
        .await?;

    establish_session(&state, jar, identity.user_id, identity.email).await
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(body): JsonBody<CredentialsBody>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body = validated(body)?;
    let identity = password_provider(&state)?
        .sign_in(body.email.trim(), &body.password)
        .await?;

    establish_session(&state, jar, identity.user_id, identity.email).await
}

async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(body): JsonBody<GoogleSignInBody>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let verifier = state
        .google_verifier
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Google sign-in is not configured".to_string()))?;

    let google = verifier
        .verify_id_token(&body.id_token)
        .await
        .map_err(|e| match e {
            OidcError::Rejected(reason) => {
                tracing::warn!(reason = %reason, "Rejected Google ID token");
                AppError::InvalidToken
            }
            OidcError::Transient(reason) => AppError::Identity(reason),
        })?;

    establish_session(&state, jar, google.user_id(), google.email).await
}

/// Sign out by clearing the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(removal_cookie(&state.config)),
        StatusCode::NO_CONTENT,
    )
}
