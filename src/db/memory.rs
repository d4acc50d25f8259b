// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local document store used for local development and tests.
//!
//! Mirrors the Firestore semantics the calendar relies on: per-document
//! atomic writes, create-only inserts that fail on an existing ID, and
//! unordered collection scans.

use crate::db::InsertOutcome;
use crate::models::{AvailabilityEvent, EventStatus, UserProfile};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory `users` and `events` collections.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, UserProfile>,
    events: DashMap<String, AvailabilityEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_profile(&self, user_id: &str) -> Option<UserProfile> {
        self.users.get(user_id).map(|p| p.value().clone())
    }

    pub fn set_profile(&self, profile: &UserProfile) {
        self.users.insert(profile.id.clone(), profile.clone());
    }

    pub fn insert_profile(&self, profile: &UserProfile) -> InsertOutcome<UserProfile> {
        match self.users.entry(profile.id.clone()) {
            Entry::Occupied(_) => InsertOutcome::AlreadyExists,
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                InsertOutcome::Created(profile.clone())
            }
        }
    }

    pub fn list_events(&self) -> Vec<AvailabilityEvent> {
        self.events.iter().map(|e| e.value().clone()).collect()
    }

    pub fn get_event(&self, event_id: &str) -> Option<AvailabilityEvent> {
        self.events.get(event_id).map(|e| e.value().clone())
    }

    pub fn events_for_owner(&self, owner_id: &str) -> Vec<AvailabilityEvent> {
        self.events
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn find_event(&self, owner_id: &str, date: &str) -> Option<AvailabilityEvent> {
        self.events
            .iter()
            .find(|e| e.owner_id == owner_id && e.date == date)
            .map(|e| e.value().clone())
    }

    pub fn insert_event(&self, event: &AvailabilityEvent) -> InsertOutcome<AvailabilityEvent> {
        match self.events.entry(event.id.clone()) {
            Entry::Occupied(_) => InsertOutcome::AlreadyExists,
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
                InsertOutcome::Created(event.clone())
            }
        }
    }

    /// Update status and nickname of an existing event.
    pub fn update_event(
        &self,
        event_id: &str,
        status: EventStatus,
        owner_nickname: &str,
    ) -> Option<AvailabilityEvent> {
        self.events.get_mut(event_id).map(|mut e| {
            e.status = status;
            e.owner_nickname = owner_nickname.to_string();
            e.value().clone()
        })
    }

    /// Rewrite the nickname on the given events; missing ones are skipped.
    pub fn set_event_nicknames(&self, event_ids: &[String], owner_nickname: &str) -> usize {
        event_ids
            .iter()
            .filter_map(|id| self.events.get_mut(id))
            .map(|mut e| e.owner_nickname = owner_nickname.to_string())
            .count()
    }

    /// Returns `false` if the event did not exist.
    pub fn delete_event(&self, event_id: &str) -> bool {
        self.events.remove(event_id).is_some()
    }
}
