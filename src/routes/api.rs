// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::AvailabilityEvent;
use crate::routes::JsonBody;
use crate::services::calendar::{is_placeholder_nickname, parse_status};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/nickname", put(set_nickname))
        .route("/api/events", get(list_events).post(create_or_update_event))
        .route(
            "/api/events/{event_id}",
            put(update_event_status).delete(delete_event),
        )
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user_id: String,
    pub nickname: String,
    /// True while the user still has the placeholder nickname
    pub needs_nickname: bool,
}

/// Get the current user's profile, creating it on first use.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let nickname = state.calendar.resolve_profile(&user.user_id).await?;

    Ok(Json(MeResponse {
        needs_nickname: is_placeholder_nickname(&nickname),
        user_id: user.user_id,
        nickname,
    }))
}

#[derive(Deserialize)]
pub struct NicknameBody {
    pub nickname: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NicknameResponse {
    pub nickname: String,
    pub events_updated: usize,
}

async fn set_nickname(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<NicknameBody>,
) -> Result<Json<NicknameResponse>> {
    let change = state
        .calendar
        .set_nickname(&user.user_id, &body.nickname)
        .await?;

    Ok(Json(NicknameResponse {
        nickname: change.nickname,
        events_updated: change.events_updated,
    }))
}

// ─── Events ──────────────────────────────────────────────────

/// One calendar entry as the front-end renders it.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventResponse {
    pub id: String,
    pub owner_id: String,
    pub owner_nickname: String,
    /// ISO date, `YYYY-MM-DD`
    pub date: String,
    pub status: String,
    /// `"{nickname}: {status}"`
    pub title: String,
    pub color: String,
    pub owned_by_me: bool,
}

impl EventResponse {
    fn new(event: AvailabilityEvent, viewer_id: &str) -> Self {
        Self {
            title: event.title(),
            color: event.status.color().to_string(),
            status: event.status.to_string(),
            owned_by_me: event.owner_id == viewer_id,
            id: event.id,
            owner_id: event.owner_id,
            owner_nickname: event.owner_nickname,
            date: event.date,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventsResponse {
    pub events: Vec<EventResponse>,
}

/// Every user's events; the calendar shows all of them.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<EventsResponse>> {
    let events = state.calendar.list_events().await?;

    tracing::debug!(user_id = %user.user_id, count = events.len(), "Listed events");

    Ok(Json(EventsResponse {
        events: events
            .into_iter()
            .map(|e| EventResponse::new(e, &user.user_id))
            .collect(),
    }))
}

#[derive(Deserialize)]
pub struct DateClickBody {
    pub date: String,
    #[serde(default)]
    pub status: String,
}

/// Set the caller's status for a date.
async fn create_or_update_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<DateClickBody>,
) -> Result<Json<EventResponse>> {
    // Reject a bad status before touching the store.
    let status = parse_status(&body.status)?;
    let nickname = state.calendar.resolve_profile(&user.user_id).await?;

    let event = state
        .calendar
        .create_or_update_event(&user.user_id, &nickname, &body.date, status)
        .await?;

    Ok(Json(EventResponse::new(event, &user.user_id)))
}

#[derive(Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: String,
}

async fn update_event_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
    JsonBody(body): JsonBody<StatusBody>,
) -> Result<Json<EventResponse>> {
    let status = parse_status(&body.status)?;

    let event = state
        .calendar
        .update_event_status(&event_id, &user.user_id, status)
        .await?;

    Ok(Json(EventResponse::new(event, &user.user_id)))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> Result<StatusCode> {
    state
        .calendar
        .delete_event(&event_id, &user.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
