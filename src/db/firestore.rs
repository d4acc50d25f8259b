// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and nickname storage)
//! - Events (availability records, one per owner and date)
//!
//! The same API is served by an in-memory store for local development and
//! tests, and by an offline mock whose every call fails.

use crate::db::{collections, InsertOutcome, MemoryStore};
use crate::error::AppError;
use crate::models::{AvailabilityEvent, UserProfile};
use firestore::errors::FirestoreError;
use firestore::{paths, FirestoreWritePrecondition};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a client backed by a fresh process-local store.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    /// Error returned by every operation in offline mode.
    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a profile by user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(user_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.get_profile(user_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create or overwrite a profile.
    pub async fn set_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&profile.id)
                    .object(profile)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.set_profile(profile);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create a profile only if none exists for its ID.
    pub async fn insert_profile(
        &self,
        profile: &UserProfile,
    ) -> Result<InsertOutcome<UserProfile>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let result = client
                    .fluent()
                    .insert()
                    .into(collections::USERS)
                    .document_id(&profile.id)
                    .object(profile)
                    .execute::<UserProfile>()
                    .await;

                match result {
                    Ok(created) => Ok(InsertOutcome::Created(created)),
                    Err(FirestoreError::DataConflictError(_)) => Ok(InsertOutcome::AlreadyExists),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(store) => Ok(store.insert_profile(profile)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Event Operations ────────────────────────────────────────

    /// Get every event in the collection, in no particular order.
    pub async fn list_events(&self) -> Result<Vec<AvailabilityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collections::EVENTS)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.list_events()),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Get an event by document ID.
    pub async fn get_event(&self, event_id: &str) -> Result<Option<AvailabilityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::EVENTS)
                .obj()
                .one(event_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.get_event(event_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Find the event an owner has on a date, if any.
    pub async fn find_event(
        &self,
        owner_id: &str,
        date: &str,
    ) -> Result<Option<AvailabilityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let owner_id = owner_id.to_string();
                let date = date.to_string();
                let events: Vec<AvailabilityEvent> = client
                    .fluent()
                    .select()
                    .from(collections::EVENTS)
                    .filter(move |q| {
                        q.for_all([
                            q.field("owner_id").eq(owner_id.clone()),
                            q.field("date").eq(date.clone()),
                        ])
                    })
                    .limit(1)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(events.into_iter().next())
            }
            Backend::Memory(store) => Ok(store.find_event(owner_id, date)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Get all events owned by a user.
    pub async fn events_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<AvailabilityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let owner_id = owner_id.to_string();
                client
                    .fluent()
                    .select()
                    .from(collections::EVENTS)
                    .filter(move |q| q.for_all([q.field("owner_id").eq(owner_id.clone())]))
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            Backend::Memory(store) => Ok(store.events_for_owner(owner_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create an event only if no document with its ID exists.
    pub async fn insert_event(
        &self,
        event: &AvailabilityEvent,
    ) -> Result<InsertOutcome<AvailabilityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let result = client
                    .fluent()
                    .insert()
                    .into(collections::EVENTS)
                    .document_id(&event.id)
                    .object(event)
                    .execute::<AvailabilityEvent>()
                    .await;

                match result {
                    Ok(created) => Ok(InsertOutcome::Created(created)),
                    Err(FirestoreError::DataConflictError(_)) => Ok(InsertOutcome::AlreadyExists),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(store) => Ok(store.insert_event(event)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Write `status` and `owner_nickname` of an existing event.
    ///
    /// Returns `None` if the event no longer exists.
    pub async fn update_event(
        &self,
        event: &AvailabilityEvent,
    ) -> Result<Option<AvailabilityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let result = client
                    .fluent()
                    .update()
                    .fields(paths!(AvailabilityEvent::{status, owner_nickname}))
                    .in_col(collections::EVENTS)
                    .precondition(FirestoreWritePrecondition::Exists(true))
                    .document_id(&event.id)
                    .object(event)
                    .execute::<AvailabilityEvent>()
                    .await;

                match result {
                    Ok(updated) => Ok(Some(updated)),
                    Err(FirestoreError::DataNotFoundError(_)) => Ok(None),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(store) => {
                Ok(store.update_event(&event.id, event.status, &event.owner_nickname))
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Rewrite `owner_nickname` on each of the given events.
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    /// Events deleted since they were read are skipped. Returns the number
    /// of events rewritten.
    pub async fn set_event_nicknames(
        &self,
        events: &[AvailabilityEvent],
        owner_nickname: &str,
    ) -> Result<usize, AppError> {
        let client = match &self.backend {
            Backend::Firestore(client) => client,
            Backend::Memory(store) => {
                let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
                return Ok(store.set_event_nicknames(&ids, owner_nickname));
            }
            Backend::Offline => return Err(Self::offline()),
        };

        let results = stream::iter(events.to_vec())
            .map(|mut event| async move {
                event.owner_nickname = owner_nickname.to_string();

                let result = client
                    .fluent()
                    .update()
                    .fields(paths!(AvailabilityEvent::{owner_nickname}))
                    .in_col(collections::EVENTS)
                    .precondition(FirestoreWritePrecondition::Exists(true))
                    .document_id(&event.id)
                    .object(&event)
                    .execute::<AvailabilityEvent>()
                    .await;

                match result {
                    Ok(_) => Ok(true),
                    Err(FirestoreError::DataNotFoundError(_)) => Ok(false),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<bool, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<bool>, AppError>>()?;

        Ok(results.into_iter().filter(|updated| *updated).count())
    }

    /// Delete an event. Deleting a missing event is not an error.
    pub async fn delete_event(&self, event_id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                client
                    .fluent()
                    .delete()
                    .from(collections::EVENTS)
                    .document_id(event_id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                if !store.delete_event(event_id) {
                    tracing::debug!(event_id, "Delete of missing event ignored");
                }
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }
}
