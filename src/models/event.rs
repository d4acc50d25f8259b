// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Availability event model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Availability status for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Available,
    Limited,
    Maybe,
}

impl EventStatus {
    pub const ALL: [EventStatus; 3] = [Self::Available, Self::Limited, Self::Maybe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Limited => "Limited",
            Self::Maybe => "Maybe",
        }
    }

    /// Calendar color used by the front-end for this status.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Available => "#1A73E8",
            Self::Limited => "#F4B400",
            Self::Maybe => "#EA4335",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is empty or unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseStatusError {
    #[error("status must not be empty")]
    Empty,
    #[error("unknown status: {0}")]
    Unknown(String),
}

impl FromStr for EventStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseStatusError::Empty);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStatusError::Unknown(s.to_string()))
    }
}

/// Stored availability record in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEvent {
    /// Document ID
    pub id: String,
    /// Profile ID of the user who created the event
    pub owner_id: String,
    /// Calendar date (YYYY-MM-DD)
    pub date: String,
    pub status: EventStatus,
    /// Owner's nickname as of the last write to this event
    pub owner_nickname: String,
}

impl AvailabilityEvent {
    /// Document ID for an owner's event on a date.
    ///
    /// One ID per (owner, date) lets a create-only insert reject duplicates.
    pub fn document_id(owner_id: &str, date: &str) -> String {
        format!("{}_{}", urlencoding::encode(owner_id), date)
    }

    /// Display title, e.g. "Bob: Available".
    pub fn title(&self) -> String {
        format!("{}: {}", self.owner_nickname, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("available".parse::<EventStatus>(), Ok(EventStatus::Available));
        assert_eq!(" Limited ".parse::<EventStatus>(), Ok(EventStatus::Limited));
        assert_eq!("MAYBE".parse::<EventStatus>(), Ok(EventStatus::Maybe));
    }

    #[test]
    fn test_status_parse_rejects_empty_and_unknown() {
        assert_eq!("   ".parse::<EventStatus>(), Err(ParseStatusError::Empty));
        assert_eq!(
            "Busy".parse::<EventStatus>(),
            Err(ParseStatusError::Unknown("Busy".to_string()))
        );
    }

    #[test]
    fn test_status_serializes_by_name() {
        let json = serde_json::to_string(&EventStatus::Limited).unwrap();
        assert_eq!(json, "\"Limited\"");
    }

    #[test]
    fn test_document_id_escapes_owner() {
        assert_eq!(
            AvailabilityEvent::document_id("abc/def", "2024-07-01"),
            "abc%2Fdef_2024-07-01"
        );
    }

    #[test]
    fn test_title() {
        let event = AvailabilityEvent {
            id: "x".to_string(),
            owner_id: "u1".to_string(),
            date: "2024-07-01".to_string(),
            status: EventStatus::Maybe,
            owner_nickname: "Bob".to_string(),
        };
        assert_eq!(event.title(), "Bob: Maybe");
    }
}
