//! Database layer (Firestore, with an in-memory stand-in).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const EVENTS: &str = "events";
}

/// Outcome of a create-only insert.
#[derive(Debug)]
pub enum InsertOutcome<T> {
    Created(T),
    /// A document with the same ID already exists.
    AlreadyExists,
}
