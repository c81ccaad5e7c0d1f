//! The document store backing every task list.
//!
//! Each operation is independent and non-transactional: callers that mix
//! a remote write with a local state change get no atomicity from here.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::todos::Task;

pub use postgres::PgTaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Equality filter on the owner plus a sort on creation time.
#[derive(Debug, Clone, Copy)]
pub struct TaskQuery {
    pub user_id: Uuid,
    pub order: SortOrder,
}

impl TaskQuery {
    pub fn owned_by(user_id: Uuid) -> Self {
        Self {
            user_id,
            order: SortOrder::Ascending,
        }
    }
}

/// Fields written by an insert. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn new(user_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Reference to one stored record, scoped to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRef {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskPatch {
    pub completed: Option<bool>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    async fn insert(&self, task: NewTask) -> Result<Uuid, StoreError>;

    /// Fails with `StoreError::NotFound` when the record does not exist.
    async fn update(&self, target: TaskRef, patch: TaskPatch) -> Result<(), StoreError>;

    /// Deleting a record that is already gone is not an error.
    async fn delete(&self, target: TaskRef) -> Result<(), StoreError>;
}
