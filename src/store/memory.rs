use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NewTask, SortOrder, TaskPatch, TaskQuery, TaskRef, TaskStore};
use crate::error::StoreError;
use crate::todos::Task;

/// In-process store for tests. Writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryTaskStore {
    records: Mutex<Vec<Task>>,
    fail_writes: AtomicBool,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<Task> {
        self.records.lock().await.clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let mut found: Vec<Task> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|t| t.user_id == query.user_id)
            .cloned()
            .collect();

        found.sort_by_key(|t| t.created_at);
        if query.order == SortOrder::Descending {
            found.reverse();
        }
        Ok(found)
    }

    async fn insert(&self, task: NewTask) -> Result<Uuid, StoreError> {
        self.check_writable()?;
        let id = Uuid::new_v4();
        self.records.lock().await.push(Task {
            id,
            user_id: task.user_id,
            text: task.text,
            completed: task.completed,
            created_at: task.created_at,
        });
        Ok(id)
    }

    async fn update(&self, target: TaskRef, patch: TaskPatch) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records.lock().await;
        let task = records
            .iter_mut()
            .find(|t| t.id == target.id && t.user_id == target.user_id)
            .ok_or(StoreError::NotFound(target.id))?;
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        Ok(())
    }

    async fn delete(&self, target: TaskRef) -> Result<(), StoreError> {
        self.check_writable()?;
        self.records
            .lock()
            .await
            .retain(|t| !(t.id == target.id && t.user_id == target.user_id));
        Ok(())
    }
}
