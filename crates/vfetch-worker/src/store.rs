//! In-memory task store.
//!
//! Entries are sharded by [`DashMap`], so updates to different tasks do not
//! contend and updates to the same task serialize on its shard lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use thiserror::Error;

use vfetch_models::{Task, TaskId, TaskStatus, TransitionError};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Task {0} already exists")]
    DuplicateId(TaskId),

    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Concurrency-safe map from task ID to task record.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new queued task.
    pub fn create(&self, id: TaskId) -> StoreResult<Task> {
        match self.tasks.entry(id) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateId(entry.key().clone())),
            Entry::Vacant(entry) => {
                let task = Task::new(entry.key().clone());
                entry.insert(task.clone());
                Ok(task)
            }
        }
    }

    /// Snapshot of a task.
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.get(id).map(|entry| entry.value().clone())
    }

    /// Apply a mutation atomically.
    ///
    /// The mutation runs on a copy; the copy replaces the stored task only if
    /// the mutation succeeds. Returns the committed task.
    pub fn update<F>(&self, id: &TaskId, mutation: F) -> StoreResult<Task>
    where
        F: FnOnce(&mut Task) -> Result<(), TransitionError>,
    {
        let mut entry = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut next = entry.value().clone();
        mutation(&mut next)?;
        *entry.value_mut() = next.clone();
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks per status.
    pub fn counts_by_status(&self) -> HashMap<TaskStatus, usize> {
        let mut counts = HashMap::new();
        for entry in self.tasks.iter() {
            *counts.entry(entry.value().status()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_create_and_get() {
        let store = TaskStore::new();
        let id = TaskId::new();

        let task = store.create(id.clone()).unwrap();
        assert_eq!(task.status(), TaskStatus::Queued);
        assert_eq!(store.get(&id), Some(task));
        assert_eq!(store.len(), 1);
        assert!(store.get(&TaskId::new()).is_none());
    }

    #[test]
    fn test_duplicate_id() {
        let store = TaskStore::new();
        let id = TaskId::from_string("dup");
        store.create(id.clone()).unwrap();
        assert_eq!(store.create(id.clone()), Err(StoreError::DuplicateId(id)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_commits_on_success() {
        let store = TaskStore::new();
        let id = TaskId::new();
        store.create(id.clone()).unwrap();

        let task = store.update(&id, Task::start_fetching).unwrap();
        assert_eq!(task.status(), TaskStatus::Fetching);
        assert_eq!(store.get(&id).unwrap().status(), TaskStatus::Fetching);
    }

    #[test]
    fn test_rejected_update_is_not_visible() {
        let store = TaskStore::new();
        let id = TaskId::new();
        store.create(id.clone()).unwrap();
        let before = store.get(&id).unwrap();

        let err = store.update(&id, |t| t.complete("x.mp4")).unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
        assert_eq!(store.get(&id).unwrap(), before);
    }

    #[test]
    fn test_update_unknown() {
        let store = TaskStore::new();
        let id = TaskId::new();
        assert_eq!(
            store.update(&id, Task::start_fetching),
            Err(StoreError::NotFound(id))
        );
    }

    #[test]
    fn test_counts_by_status() {
        let store = TaskStore::new();
        assert!(store.is_empty());
        let a = TaskId::new();
        store.create(a.clone()).unwrap();
        store.create(TaskId::new()).unwrap();
        store
            .update(&a, |t| {
                t.start_fetching()?;
                t.fail("boom")
            })
            .unwrap();

        let counts = store.counts_by_status();
        assert_eq!(counts.get(&TaskStatus::Queued), Some(&1));
        assert_eq!(counts.get(&TaskStatus::Failed), Some(&1));
        assert_eq!(counts.get(&TaskStatus::Completed), None);
    }

    #[test]
    fn test_concurrent_updates_on_distinct_tasks() {
        let store = Arc::new(TaskStore::new());
        let ids: Vec<TaskId> = (0..32).map(|_| TaskId::new()).collect();
        for id in &ids {
            store.create(id.clone()).unwrap();
        }

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.update(&id, Task::start_fetching).unwrap();
                    store.update(&id, Task::begin_processing).unwrap();
                    for p in 0..=100 {
                        store.update(&id, |t| t.set_progress(p)).unwrap();
                    }
                    store.update(&id, |t| t.complete(format!("{id}.mp4"))).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for id in &ids {
            let task = store.get(id).unwrap();
            assert_eq!(task.status(), TaskStatus::Completed);
            assert_eq!(task.filename(), Some(format!("{id}.mp4").as_str()));
            assert!(task.error().is_none());
        }
    }

    #[test]
    fn test_readers_never_see_partial_state() {
        let store = Arc::new(TaskStore::new());
        let id = TaskId::new();
        store.create(id.clone()).unwrap();

        let reader = {
            let store = Arc::clone(&store);
            let id = id.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    let task = store.get(&id).unwrap();
                    match task.status() {
                        TaskStatus::Completed => {
                            assert!(task.filename().is_some() && task.error().is_none())
                        }
                        TaskStatus::Failed => {
                            assert!(task.error().is_some() && task.filename().is_none())
                        }
                        _ => assert!(task.filename().is_none() && task.error().is_none()),
                    }
                }
            })
        };

        store.update(&id, Task::start_fetching).unwrap();
        store.update(&id, Task::begin_processing).unwrap();
        store.update(&id, |t| t.complete("out.mp4")).unwrap();
        reader.join().unwrap();
    }
}
