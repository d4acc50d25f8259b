// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and event coordination.
//!
//! Owns the rules layered over the document store:
//! 1. Profiles are created with a placeholder nickname on first login
//! 2. Each user has at most one event per date
//! 3. Only the owner may change or delete an event
//! 4. Nickname changes are copied onto the owner's existing events
//!
//! The checks are read-then-write against the store. Duplicate inserts are
//! rejected by the store itself (one document ID per owner and date); the
//! ownership checks are not atomic with the write that follows them.

use crate::db::{FirestoreDb, InsertOutcome};
use crate::error::{AppError, Result};
use crate::models::event::ParseStatusError;
use crate::models::profile::{DEFAULT_NICKNAME, MAX_NICKNAME_LEN};
use crate::models::{AvailabilityEvent, EventStatus, UserProfile};
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of a nickname change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicknameChange {
    pub nickname: String,
    /// Number of the owner's events rewritten with the new nickname
    pub events_updated: usize,
}

/// Coordinates profile and event operations for authenticated users.
#[derive(Clone)]
pub struct CalendarCoordinator {
    db: FirestoreDb,
}

impl CalendarCoordinator {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    // ─── Profiles ────────────────────────────────────────────────

    /// Get the user's nickname, creating the profile on first login.
    pub async fn resolve_profile(&self, user_id: &str) -> Result<String> {
        if let Some(profile) = self.db.get_profile(user_id).await? {
            return Ok(profile.nickname);
        }

        match self
            .db
            .insert_profile(&UserProfile::new_placeholder(user_id))
            .await?
        {
            InsertOutcome::Created(profile) => {
                tracing::info!(user_id, "Created profile on first login");
                Ok(profile.nickname)
            }
            // Another session created it between our read and insert.
            InsertOutcome::AlreadyExists => self
                .db
                .get_profile(user_id)
                .await?
                .map(|p| p.nickname)
                .ok_or_else(|| {
                    AppError::Database(format!("Profile {} vanished during creation", user_id))
                }),
        }
    }

    /// Change the user's nickname and copy it onto their existing events.
    ///
    /// The profile write and the event rewrites are separate; if the
    /// rewrite fails the profile keeps the new nickname and older events
    /// keep the old one until the next change.
    pub async fn set_nickname(&self, user_id: &str, nickname: &str) -> Result<NicknameChange> {
        let nickname = normalize_nickname(nickname)?;

        self.db
            .set_profile(&UserProfile {
                id: user_id.to_string(),
                nickname: nickname.clone(),
            })
            .await?;

        let events = self.db.events_for_owner(user_id).await?;
        let events_updated = self
            .db
            .set_event_nicknames(&events, &nickname)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    user_id,
                    error = %e,
                    "Nickname saved but copying it onto events failed"
                );
            })?;

        tracing::info!(user_id, events_updated, "Nickname changed");

        Ok(NicknameChange {
            nickname,
            events_updated,
        })
    }

    // ─── Events ──────────────────────────────────────────────────

    /// Get every user's events.
    pub async fn list_events(&self) -> Result<Vec<AvailabilityEvent>> {
        self.db.list_events().await
    }

    /// Set the user's status for a date, creating the event if needed.
    ///
    /// `nickname` is stored on the event as its display name.
    pub async fn create_or_update_event(
        &self,
        user_id: &str,
        nickname: &str,
        date: &str,
        status: EventStatus,
    ) -> Result<AvailabilityEvent> {
        let date = normalize_date(date)?;

        if let Some(mut existing) = self.db.find_event(user_id, &date).await? {
            existing.status = status;
            existing.owner_nickname = nickname.to_string();

            if let Some(updated) = self.db.update_event(&existing).await? {
                tracing::info!(
                    user_id,
                    event_id = %updated.id,
                    date = %date,
                    status = %status,
                    "Updated event"
                );
                return Ok(updated);
            }

            tracing::warn!(
                user_id,
                event_id = %existing.id,
                "Event deleted before update, creating a new one"
            );
        }

        let event = AvailabilityEvent {
            id: AvailabilityEvent::document_id(user_id, &date),
            owner_id: user_id.to_string(),
            date: date.clone(),
            status,
            owner_nickname: nickname.to_string(),
        };

        match self.db.insert_event(&event).await? {
            InsertOutcome::Created(created) => {
                tracing::info!(
                    user_id,
                    event_id = %created.id,
                    date = %date,
                    status = %status,
                    "Created event"
                );
                Ok(created)
            }
            InsertOutcome::AlreadyExists => {
                tracing::warn!(user_id, date = %date, "Concurrent insert for same date");
                Err(AppError::Conflict(
                    "You already have an event for this date".to_string(),
                ))
            }
        }
    }

    /// Change the status of an event owned by the requester.
    pub async fn update_event_status(
        &self,
        event_id: &str,
        requester_id: &str,
        status: EventStatus,
    ) -> Result<AvailabilityEvent> {
        let mut event = self.owned_event(event_id, requester_id).await?;
        event.status = status;

        let updated = self
            .db
            .update_event(&event)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        tracing::info!(
            user_id = requester_id,
            event_id,
            status = %status,
            "Updated event status"
        );
        Ok(updated)
    }

    /// Delete an event owned by the requester.
    pub async fn delete_event(&self, event_id: &str, requester_id: &str) -> Result<()> {
        self.owned_event(event_id, requester_id).await?;
        self.db.delete_event(event_id).await?;

        tracing::info!(user_id = requester_id, event_id, "Deleted event");
        Ok(())
    }

    /// Fetch an event and check that `requester_id` owns it.
    async fn owned_event(&self, event_id: &str, requester_id: &str) -> Result<AvailabilityEvent> {
        let event = self
            .db
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        if event.owner_id != requester_id {
            tracing::warn!(
                user_id = requester_id,
                event_id,
                owner_id = %event.owner_id,
                "Rejected change to another user's event"
            );
            return Err(AppError::Forbidden(
                "You are not allowed to change this event".to_string(),
            ));
        }

        Ok(event)
    }
}

/// Parse a status label, rejecting empty input.
pub fn parse_status(raw: &str) -> Result<EventStatus> {
    raw.parse().map_err(|e: ParseStatusError| {
        AppError::Validation(format!(
            "{}; expected one of {}",
            e,
            EventStatus::ALL.map(|s| s.as_str()).join(", ")
        ))
    })
}

/// Validate a calendar date and return it as YYYY-MM-DD.
pub fn normalize_date(raw: &str) -> Result<String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|_| AppError::Validation(format!("Invalid date '{}': expected YYYY-MM-DD", raw)))
}

/// Trim a nickname and reject blank or overlong input.
pub fn normalize_nickname(raw: &str) -> Result<String> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(AppError::Validation(
            "Nickname must not be empty".to_string(),
        ));
    }
    if nickname.chars().count() > MAX_NICKNAME_LEN {
        return Err(AppError::Validation(format!(
            "Nickname must be at most {} characters",
            MAX_NICKNAME_LEN
        )));
    }
    Ok(nickname.to_string())
}

/// Whether a nickname is still the first-login placeholder.
pub fn is_placeholder_nickname(nickname: &str) -> bool {
    nickname == DEFAULT_NICKNAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date(" 2024-07-01 ").unwrap(), "2024-07-01");
        assert!(matches!(
            normalize_date("2024-02-30"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(normalize_date(""), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_normalize_nickname() {
        assert_eq!(normalize_nickname("  Bob ").unwrap(), "Bob");
        assert!(matches!(normalize_nickname(""), Err(AppError::Validation(_))));
        assert!(matches!(
            normalize_nickname(" \t\n"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            normalize_nickname(&"x".repeat(MAX_NICKNAME_LEN + 1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("maybe").unwrap(), EventStatus::Maybe);
        let err = parse_status("").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("Available, Limited, Maybe")));
    }

    #[test]
    fn test_placeholder_nickname() {
        assert!(is_placeholder_nickname("Anonymous"));
        assert!(!is_placeholder_nickname("Bob"));
    }

    #[tokio::test]
    async fn test_offline_store_surfaces_database_error() {
        let coordinator = CalendarCoordinator::new(FirestoreDb::new_mock());
        assert!(matches!(
            coordinator.resolve_profile("u1").await,
            Err(AppError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_happens_before_store_access() {
        // The offline store fails every call, so a validation error proves
        // no backend call was attempted.
        let coordinator = CalendarCoordinator::new(FirestoreDb::new_mock());

        assert!(matches!(
            coordinator.set_nickname("u1", "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            coordinator
                .create_or_update_event("u1", "Bob", "not-a-date", EventStatus::Available)
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
