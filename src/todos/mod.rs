pub mod controller;
pub mod view;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// MODELS

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// The signed-in user a list belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: String,
}

// HELPER FUNCTIONS

/// Entry text is accepted only when something other than whitespace was typed.
pub fn is_valid_entry(text: &str) -> bool {
    !text.trim().is_empty()
}
