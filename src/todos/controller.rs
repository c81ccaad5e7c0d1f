//! Keeps one user's task list in memory and mirrors it against the store.
//!
//! Writes are dual-writes with no reconciliation. In `SyncMode::Optimistic`
//! the local change is applied at once and the remote write runs detached,
//! at most once: if it fails the two copies diverge until the next load.
//! `SyncMode::Confirmed` awaits the store and commits locally only on success.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{is_valid_entry, Identity, Task};
use crate::error::{StoreError, TodoError};
use crate::store::{NewTask, TaskPatch, TaskQuery, TaskRef, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    Optimistic,
    Confirmed,
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimistic" => Ok(SyncMode::Optimistic),
            "confirmed" => Ok(SyncMode::Confirmed),
            other => Err(format!("unknown sync mode: {}", other)),
        }
    }
}

/// Handle on a remote write started by `toggle_task` or `delete_task`.
///
/// Dropping it does not cancel the write.
#[derive(Debug)]
pub enum PendingWrite {
    Settled,
    InFlight(JoinHandle<Result<(), StoreError>>),
}

impl PendingWrite {
    pub async fn settled(self) -> Result<(), TodoError> {
        match self {
            PendingWrite::Settled => Ok(()),
            PendingWrite::InFlight(handle) => match handle.await {
                Ok(result) => result.map_err(TodoError::from),
                Err(_) => Err(TodoError::WriteAborted),
            },
        }
    }
}

#[derive(Default)]
struct ListState {
    activated: bool,
    identity: Option<Identity>,
    tasks: Vec<Task>,
    input: String,
}

/// Owner of the in-memory list. Clones share the same state.
///
/// The state lock is never held across a store call, so concurrent
/// handlers interleave and the last one to finish wins.
#[derive(Clone)]
pub struct ListController {
    store: Arc<dyn TaskStore>,
    mode: SyncMode,
    state: Arc<Mutex<ListState>>,
}

impl ListController {
    pub fn new(store: Arc<dyn TaskStore>, mode: SyncMode) -> Self {
        Self {
            store,
            mode,
            state: Arc::new(Mutex::new(ListState::default())),
        }
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.lock().await.identity.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }

    pub async fn input(&self) -> String {
        self.state.lock().await.input.clone()
    }

    pub async fn set_input(&self, input: impl Into<String>) {
        self.state.lock().await.input = input.into();
    }

    /// Records the current identity. The first call, and any call that
    /// changes the identity, reloads the list. Returns whether a load ran.
    pub async fn set_identity(&self, identity: Option<Identity>) -> Result<bool, TodoError> {
        {
            let mut state = self.state.lock().await;
            if state.activated && state.identity == identity {
                return Ok(false);
            }
            state.activated = true;
            state.identity = identity;
        }

        self.load_tasks().await?;
        Ok(true)
    }

    /// Replaces the whole collection with the owner's records, oldest first.
    /// Without an identity this leaves the collection as it is.
    pub async fn load_tasks(&self) -> Result<(), TodoError> {
        let Some(user_id) = self.current_user().await else {
            debug!("no identity, skipping task load");
            return Ok(());
        };

        let tasks = self.store.query(&TaskQuery::owned_by(user_id)).await?;

        let mut state = self.state.lock().await;
        if state.identity.as_ref().map(|i| i.user_id) != Some(user_id) {
            debug!(%user_id, "identity changed during load, dropping stale result");
            return Ok(());
        }
        info!(%user_id, count = tasks.len(), "task list loaded");
        state.tasks = tasks;
        Ok(())
    }

    /// Inserts a new task and appends it locally once the store assigned an id.
    ///
    /// Blank text is ignored and leaves the input buffer alone.
    pub async fn add_task(&self, text: &str) -> Result<Option<Task>, TodoError> {
        if !is_valid_entry(text) {
            debug!("ignoring blank entry");
            return Ok(None);
        }
        let user_id = self.owner().await?;

        let new_task = NewTask::new(user_id, text);
        let created_at = new_task.created_at;
        let id = self.store.insert(new_task).await?;

        let task = Task {
            id,
            user_id,
            text: text.to_string(),
            completed: false,
            created_at,
        };

        let mut state = self.state.lock().await;
        if state.identity.as_ref().map(|i| i.user_id) != Some(user_id) {
            debug!(task_id = %id, %user_id, "identity changed during insert, not appending");
            return Ok(Some(task));
        }
        // a load that finished meanwhile may already carry the record
        if !state.tasks.iter().any(|t| t.id == id) {
            state.tasks.push(task.clone());
        }
        state.input.clear();
        debug!(task_id = %id, "task added");

        Ok(Some(task))
    }

    /// Flips `completed` for the task. `Ok(None)` when the id is not in the list.
    pub async fn toggle_task(&self, id: Uuid) -> Result<Option<PendingWrite>, TodoError> {
        let target = TaskRef {
            id,
            user_id: self.owner().await?,
        };

        match self.mode {
            SyncMode::Optimistic => {
                let completed = {
                    let mut state = self.state.lock().await;
                    match state.tasks.iter_mut().find(|t| t.id == id) {
                        Some(task) => {
                            task.completed = !task.completed;
                            task.completed
                        }
                        None => return Ok(None),
                    }
                };

                let store = Arc::clone(&self.store);
                let patch = TaskPatch {
                    completed: Some(completed),
                };
                Ok(Some(spawn_write("toggle", id, async move {
                    store.update(target, patch).await
                })))
            }
            SyncMode::Confirmed => {
                let completed = {
                    let state = self.state.lock().await;
                    match state.tasks.iter().find(|t| t.id == id) {
                        Some(task) => !task.completed,
                        None => return Ok(None),
                    }
                };

                let patch = TaskPatch {
                    completed: Some(completed),
                };
                self.store.update(target, patch).await?;

                let mut state = self.state.lock().await;
                if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
                    task.completed = completed;
                }
                Ok(Some(PendingWrite::Settled))
            }
        }
    }

    /// Deletes the record remotely and drops it from the local list.
    pub async fn delete_task(&self, id: Uuid) -> Result<PendingWrite, TodoError> {
        let target = TaskRef {
            id,
            user_id: self.owner().await?,
        };

        let pending = match self.mode {
            SyncMode::Optimistic => {
                let store = Arc::clone(&self.store);
                spawn_write("delete", id, async move { store.delete(target).await })
            }
            SyncMode::Confirmed => {
                self.store.delete(target).await?;
                PendingWrite::Settled
            }
        };

        self.state.lock().await.tasks.retain(|t| t.id != id);
        Ok(pending)
    }

    async fn current_user(&self) -> Option<Uuid> {
        self.state.lock().await.identity.as_ref().map(|i| i.user_id)
    }

    async fn owner(&self) -> Result<Uuid, TodoError> {
        self.current_user().await.ok_or(TodoError::SignedOut)
    }
}

fn spawn_write<F>(op: &'static str, id: Uuid, write: F) -> PendingWrite
where
    F: Future<Output = Result<(), StoreError>> + Send + 'static,
{
    PendingWrite::InFlight(tokio::spawn(async move {
        let result = write.await;
        if let Err(e) = &result {
            warn!(task_id = %id, op, error = %e, "remote write failed, local list kept");
        }
        result
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryTaskStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn identity(name: &str) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            display_name: name.to_string(),
        }
    }

    async fn seed(store: &MemoryTaskStore, user_id: Uuid, text: &str, minutes: i64) -> Uuid {
        let mut task = NewTask::new(user_id, text);
        task.created_at = Utc::now() + Duration::minutes(minutes);
        store.insert(task).await.unwrap()
    }

    fn controller(store: &Arc<MemoryTaskStore>, mode: SyncMode) -> ListController {
        ListController::new(store.clone(), mode)
    }

    /// Store that parks the next armed query or insert until released.
    #[derive(Default)]
    struct GatedStore {
        inner: MemoryTaskStore,
        hold_query: AtomicBool,
        hold_insert: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl GatedStore {
        async fn hold(&self, armed: &AtomicBool) {
            if armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl TaskStore for GatedStore {
        async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
            self.hold(&self.hold_query).await;
            self.inner.query(query).await
        }

        async fn insert(&self, task: NewTask) -> Result<Uuid, StoreError> {
            let id = self.inner.insert(task).await?;
            self.hold(&self.hold_insert).await;
            Ok(id)
        }

        async fn update(&self, target: TaskRef, patch: TaskPatch) -> Result<(), StoreError> {
            self.inner.update(target, patch).await
        }

        async fn delete(&self, target: TaskRef) -> Result<(), StoreError> {
            self.inner.delete(target).await
        }
    }

    #[tokio::test]
    async fn test_load_without_identity_is_noop() {
        let store = Arc::new(MemoryTaskStore::new());
        seed(&store, Uuid::new_v4(), "someone else", 0).await;
        let list = controller(&store, SyncMode::Optimistic);

        list.load_tasks().await.unwrap();
        assert!(list.tasks().await.is_empty());

        assert!(list.set_identity(None).await.unwrap());
        assert!(list.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_keeps_previous_collection() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        seed(&store, alice.user_id, "water plants", 0).await;
        let list = controller(&store, SyncMode::Optimistic);

        list.set_identity(Some(alice)).await.unwrap();
        assert_eq!(list.tasks().await.len(), 1);

        assert!(list.set_identity(None).await.unwrap());
        assert_eq!(list.tasks().await.len(), 1);
        assert!(matches!(list.add_task("more").await, Err(TodoError::SignedOut)));
    }

    #[tokio::test]
    async fn test_identity_change_loads_owned_tasks_oldest_first() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let bob = identity("bob");
        seed(&store, alice.user_id, "second", 10).await;
        seed(&store, bob.user_id, "not mine", 5).await;
        seed(&store, alice.user_id, "first", 0).await;
        seed(&store, alice.user_id, "third", 20).await;
        let list = controller(&store, SyncMode::Optimistic);

        assert!(list.set_identity(Some(alice.clone())).await.unwrap());
        let texts: Vec<String> = list.tasks().await.into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);

        // same identity again does not reload
        assert!(!list.set_identity(Some(alice)).await.unwrap());

        assert!(list.set_identity(Some(bob.clone())).await.unwrap());
        let tasks = list.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "not mine");
        assert_eq!(tasks[0].user_id, bob.user_id);
    }

    #[tokio::test]
    async fn test_add_task_appends_store_assigned_record() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(alice.clone())).await.unwrap();
        list.set_input("buy milk").await;

        let task = list.add_task("buy milk").await.unwrap().unwrap();

        let tasks = list.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0], task);
        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_eq!(task.user_id, alice.user_id);
        assert_eq!(store.records().await[0].id, task.id);
        assert_eq!(list.input().await, "");
    }

    #[tokio::test]
    async fn test_blank_entry_is_ignored() {
        let store = Arc::new(MemoryTaskStore::new());
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(identity("alice"))).await.unwrap();

        for blank in ["", "   ", "\t\n"] {
            list.set_input(blank).await;
            assert!(list.add_task(blank).await.unwrap().is_none());
            assert_eq!(list.input().await, blank);
        }
        assert!(list.tasks().await.is_empty());
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_local_state() {
        let store = Arc::new(MemoryTaskStore::new());
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(identity("alice"))).await.unwrap();
        list.set_input("call mom").await;
        store.fail_writes(true);

        let result = list.add_task("call mom").await;

        assert!(matches!(result, Err(TodoError::Store(StoreError::Unavailable(_)))));
        assert!(list.tasks().await.is_empty());
        assert_eq!(list.input().await, "call mom");
    }

    #[tokio::test]
    async fn test_toggle_flips_only_target() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let first = seed(&store, alice.user_id, "first", 0).await;
        seed(&store, alice.user_id, "second", 1).await;
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(alice)).await.unwrap();

        let pending = list.toggle_task(first).await.unwrap().unwrap();
        pending.settled().await.unwrap();

        let tasks = list.tasks().await;
        assert!(tasks[0].completed);
        assert!(!tasks[1].completed);
        let stored = store.records().await;
        assert!(stored.iter().find(|t| t.id == first).unwrap().completed);

        list.toggle_task(first).await.unwrap().unwrap().settled().await.unwrap();
        assert!(!list.tasks().await[0].completed);
    }

    #[tokio::test]
    async fn test_toggle_unknown_id_does_nothing() {
        let store = Arc::new(MemoryTaskStore::new());
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(identity("alice"))).await.unwrap();

        assert!(list.toggle_task(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_remote_toggle_still_flips_locally() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let id = seed(&store, alice.user_id, "first", 0).await;
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(alice)).await.unwrap();
        store.fail_writes(true);

        let pending = list.toggle_task(id).await.unwrap().unwrap();

        assert!(list.tasks().await[0].completed);
        assert!(pending.settled().await.is_err());
        assert!(!store.records().await[0].completed);
    }

    #[tokio::test]
    async fn test_delete_removes_only_target_even_if_remote_fails() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let keep = seed(&store, alice.user_id, "keep", 0).await;
        let gone = seed(&store, alice.user_id, "gone", 1).await;
        let list = controller(&store, SyncMode::Optimistic);
        list.set_identity(Some(alice)).await.unwrap();
        store.fail_writes(true);

        let pending = list.delete_task(gone).await.unwrap();

        let tasks = list.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, keep);
        assert!(pending.settled().await.is_err());
        assert_eq!(store.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_mode_keeps_local_state_on_failure() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let id = seed(&store, alice.user_id, "first", 0).await;
        let list = controller(&store, SyncMode::Confirmed);
        list.set_identity(Some(alice)).await.unwrap();
        store.fail_writes(true);

        assert!(list.toggle_task(id).await.is_err());
        assert!(!list.tasks().await[0].completed);
        assert!(list.delete_task(id).await.is_err());
        assert_eq!(list.tasks().await.len(), 1);

        store.fail_writes(false);
        list.toggle_task(id).await.unwrap().unwrap().settled().await.unwrap();
        assert!(list.tasks().await[0].completed);
        assert!(store.records().await[0].completed);
    }

    #[tokio::test]
    async fn test_sign_in_add_toggle_delete_scenario() {
        let store = Arc::new(MemoryTaskStore::new());
        let alice = identity("alice");
        let list = controller(&store, SyncMode::Optimistic);

        list.set_identity(Some(alice)).await.unwrap();
        assert!(list.tasks().await.is_empty());

        list.set_input("buy milk").await;
        let task = list.add_task("buy milk").await.unwrap().unwrap();
        assert_eq!(list.tasks().await.len(), 1);

        list.toggle_task(task.id).await.unwrap().unwrap().settled().await.unwrap();
        assert!(list.tasks().await[0].completed);
        assert!(store.records().await[0].completed);

        list.delete_task(task.id).await.unwrap().settled().await.unwrap();
        assert!(list.tasks().await.is_empty());
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_finishing_after_identity_change_stays_out_of_list() {
        let store = Arc::new(GatedStore::default());
        let alice = identity("alice");
        let bob = identity("bob");
        let list = ListController::new(store.clone(), SyncMode::Optimistic);
        list.set_identity(Some(alice.clone())).await.unwrap();
        list.set_input("alice secret").await;

        store.hold_insert.store(true, Ordering::SeqCst);
        let adding = tokio::spawn({
            let list = list.clone();
            async move { list.add_task("alice secret").await }
        });
        store.entered.notified().await;

        list.set_identity(Some(bob.clone())).await.unwrap();
        store.release.notify_one();
        let task = adding.await.unwrap().unwrap().unwrap();

        assert_eq!(task.user_id, alice.user_id);
        assert_eq!(list.identity().await, Some(bob));
        assert!(list.tasks().await.is_empty());
        assert_eq!(list.input().await, "alice secret");
        assert_eq!(store.inner.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_finishing_after_identity_change_is_dropped() {
        let store = Arc::new(GatedStore::default());
        let alice = identity("alice");
        let bob = identity("bob");
        seed(&store.inner, alice.user_id, "alice task", 0).await;
        seed(&store.inner, bob.user_id, "bob task", 1).await;
        let list = ListController::new(store.clone(), SyncMode::Optimistic);

        store.hold_query.store(true, Ordering::SeqCst);
        let loading = tokio::spawn({
            let list = list.clone();
            async move { list.set_identity(Some(alice)).await }
        });
        store.entered.notified().await;

        list.set_identity(Some(bob.clone())).await.unwrap();
        store.release.notify_one();
        assert!(loading.await.unwrap().unwrap());

        let tasks = list.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "bob task");
        assert!(tasks.iter().all(|t| t.user_id == bob.user_id));
    }

    #[tokio::test]
    async fn test_load_during_insert_does_not_duplicate_task() {
        let store = Arc::new(GatedStore::default());
        let alice = identity("alice");
        let list = ListController::new(store.clone(), SyncMode::Optimistic);
        list.set_identity(Some(alice)).await.unwrap();

        store.hold_insert.store(true, Ordering::SeqCst);
        let adding = tokio::spawn({
            let list = list.clone();
            async move { list.add_task("buy milk").await }
        });
        store.entered.notified().await;

        list.load_tasks().await.unwrap();
        assert_eq!(list.tasks().await.len(), 1);

        store.release.notify_one();
        let task = adding.await.unwrap().unwrap().unwrap();

        let tasks = list.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task.id);
    }
}
