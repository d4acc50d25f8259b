//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

/// Nickname given to a profile on first login.
pub const DEFAULT_NICKNAME: &str = "Anonymous";

/// Longest nickname accepted, in characters.
pub const MAX_NICKNAME_LEN: usize = 40;

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Auth subject ID (also used as document ID)
    pub id: String,
    /// Display name shown next to the user's events
    pub nickname: String,
}

impl UserProfile {
    /// Profile created on first successful authentication.
    pub fn new_placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: DEFAULT_NICKNAME.to_string(),
        }
    }
}
