// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dependency-ordered task scheduler.
//!
//! Sequences asynchronous units of work, each identified by a unique name,
//! where a unit may declare at most one direct dependency. A dependent unit
//! is deferred until its dependency settles: it runs when the dependency
//! completes and is skipped with [`TaskError::DependencyFailed`] when the
//! dependency fails. Skips cascade transitively down a chain but never reach
//! siblings.
//!
//! ```text
//! submit(b, dependsOn: a)
//!   a absent/completed ──► run b now
//!   a failed           ──► settle b as DependencyFailed
//!   a pending/running  ──► park b; on a settled:
//!                            completed ─► run b
//!                            failed    ─► skip b (and b's dependents)
//! ```
//!
//! Bookkeeping is synchronous and guarded by a mutex that is never held
//! across an await; the only suspension points are the units' own futures,
//! which run on the tokio runtime.

mod handle;

pub use handle::{TaskHandle, TaskResult};

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use crate::error::TaskError;

/// Boxed future produced by a unit of work.
pub type WorkFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

type BoxedWork<T, E> = Box<dyn FnOnce() -> WorkFuture<T, E> + Send + 'static>;

type Settle<T, E> = oneshot::Sender<TaskResult<T, E>>;

/// Lifecycle status of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Never submitted, or already cleaned up.
    NotFound,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

struct Deferred<T, E> {
    work: BoxedWork<T, E>,
    settle: Settle<T, E>,
}

struct TaskEntry<T, E> {
    status: TaskStatus,
    depends_on: Option<String>,
    deferred: Option<Deferred<T, E>>,
}

struct State<T, E> {
    tasks: HashMap<String, TaskEntry<T, E>>,
    retries: HashMap<String, u32>,
}

impl<T, E> State<T, E> {
    fn status_of(&self, name: &str) -> TaskStatus {
        self.tasks
            .get(name)
            .map(|e| e.status)
            .unwrap_or(TaskStatus::NotFound)
    }

    fn awaited(&self) -> HashSet<String> {
        self.tasks
            .values()
            .filter(|e| e.status.is_active())
            .filter_map(|e| e.depends_on.clone())
            .collect()
    }

    /// Drop completed units that no active unit still waits on, along with
    /// retry counters of units no longer tracked.
    ///
    /// Failed units are kept so that late dependents are still skipped.
    fn collect_garbage(&mut self) {
        let awaited = self.awaited();
        self.tasks
            .retain(|name, e| e.status != TaskStatus::Completed || awaited.contains(name));
        let tasks = &self.tasks;
        self.retries.retain(|name, _| tasks.contains_key(name));
    }
}

/// Dependency-aware executor for named units of work.
///
/// Cloning yields another handle to the same scheduler.
pub struct TaskScheduler<T, E> {
    state: Arc<Mutex<State<T, E>>>,
}

impl<T, E> Clone for TaskScheduler<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Default for TaskScheduler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> TaskScheduler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                tasks: HashMap::new(),
                retries: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Submit a named unit of work, optionally depending on another unit.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// settles when the work finishes or is skipped.
    pub fn submit<F, Fut>(
        &self,
        name: impl Into<String>,
        work: F,
        depends_on: Option<&str>,
    ) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let name = name.into();
        let (settle, rx) = oneshot::channel();
        let handle = TaskHandle::new(name.clone(), rx);
        let work: BoxedWork<T, E> = Box::new(move || Box::pin(work()));

        {
            let mut state = self.lock();

            if state.status_of(&name).is_active() {
                warn!(task = %name, "Rejected duplicate submission");
                let _ = settle.send(Err(TaskError::Duplicate(name)));
                return handle;
            }

            let dependency = depends_on.map(|d| (d.to_string(), state.status_of(d)));
            match dependency {
                Some((dependency, TaskStatus::Failed)) => {
                    warn!(task = %name, dependency = %dependency, "Skipping task: dependency failed");
                    state.tasks.insert(
                        name.clone(),
                        TaskEntry {
                            status: TaskStatus::Failed,
                            depends_on: Some(dependency.clone()),
                            deferred: None,
                        },
                    );
                    let _ = settle.send(Err(TaskError::DependencyFailed {
                        task: name,
                        dependency,
                    }));
                    return handle;
                }
                Some((dependency, status)) if status.is_active() => {
                    debug!(task = %name, dependency = %dependency, "Deferring task until dependency settles");
                    state.tasks.insert(
                        name,
                        TaskEntry {
                            status: TaskStatus::Pending,
                            depends_on: Some(dependency),
                            deferred: Some(Deferred { work, settle }),
                        },
                    );
                    return handle;
                }
                _ => {
                    state.tasks.insert(
                        name.clone(),
                        TaskEntry {
                            status: TaskStatus::Running,
                            depends_on: depends_on.map(str::to_string),
                            deferred: None,
                        },
                    );
                }
            }
        }

        self.launch(name, work, settle);
        handle
    }

    /// Run the work on its own task and settle it from a supervising one,
    /// so a panicking unit still fails through [`Self::finish`].
    fn launch(&self, name: String, work: BoxedWork<T, E>, settle: Settle<T, E>) {
        debug!(task = %name, "Starting task");
        let scheduler = self.clone();
        let running = tokio::spawn(async move { work().await });
        tokio::spawn(async move {
            let result = match running.await {
                Ok(result) => result.map_err(TaskError::Failed),
                Err(err) => {
                    let message = panic_message(err);
                    error!(task = %name, %message, "Task panicked");
                    Err(TaskError::Panicked {
                        task: name.clone(),
                        message,
                    })
                }
            };
            scheduler.finish(&name, result, settle);
        });
    }

    /// Record a settled unit and fan out to its dependents.
    fn finish(&self, name: &str, result: TaskResult<T, E>, settle: Settle<T, E>) {
        let succeeded = result.is_ok();
        let mut launches = Vec::new();
        let mut skipped = Vec::new();

        {
            let mut state = self.lock();
            if let Some(entry) = state.tasks.get_mut(name) {
                entry.status = if succeeded {
                    TaskStatus::Completed
                } else {
                    TaskStatus::Failed
                };
            }

            let mut frontier = vec![(name.to_string(), succeeded)];
            while let Some((parent, parent_ok)) = frontier.pop() {
                let dependents: Vec<String> = state
                    .tasks
                    .iter()
                    .filter(|(_, e)| {
                        e.status == TaskStatus::Pending && e.depends_on.as_deref() == Some(parent.as_str())
                    })
                    .map(|(n, _)| n.clone())
                    .collect();

                for child in dependents {
                    let Some(entry) = state.tasks.get_mut(&child) else {
                        continue;
                    };
                    let Some(deferred) = entry.deferred.take() else {
                        continue;
                    };
                    if parent_ok {
                        entry.status = TaskStatus::Running;
                        launches.push((child, deferred));
                    } else {
                        entry.status = TaskStatus::Failed;
                        skipped.push((child.clone(), parent.clone(), deferred.settle));
                        frontier.push((child, false));
                    }
                }
            }

            state.collect_garbage();
        }

        if succeeded {
            debug!(task = %name, "Task completed");
        } else {
            debug!(task = %name, "Task failed");
        }
        let _ = settle.send(result);

        for (task, dependency, settle) in skipped {
            warn!(task = %task, dependency = %dependency, "Skipping task: dependency failed");
            let _ = settle.send(Err(TaskError::DependencyFailed { task, dependency }));
        }
        for (task, deferred) in launches {
            self.launch(task, deferred.work, deferred.settle);
        }
    }

    /// Status of the named unit; `NotFound` for unknown or cleaned-up names.
    pub fn get_status(&self, name: &str) -> TaskStatus {
        self.lock().status_of(name)
    }

    /// Names of units that declared `parent` as their dependency.
    pub fn get_children(&self, parent: &str) -> Vec<String> {
        let state = self.lock();
        let mut children: Vec<String> = state
            .tasks
            .iter()
            .filter(|(_, e)| e.depends_on.as_deref() == Some(parent))
            .map(|(n, _)| n.clone())
            .collect();
        children.sort();
        children
    }

    /// True iff no unit is pending or running.
    pub fn all_tasks_completed(&self) -> bool {
        !self.lock().tasks.values().any(|e| e.status.is_active())
    }

    /// Number of units currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Bump the retry counter for a unit, returning the new count.
    pub fn increment_retry(&self, name: &str) -> u32 {
        let mut state = self.lock();
        let count = state.retries.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get_retry_count(&self, name: &str) -> u32 {
        self.lock().retries.get(name).copied().unwrap_or(0)
    }

    /// Stop tracking a settled unit and its retry counter.
    ///
    /// Returns false, leaving the unit in place, when it is still pending or
    /// running or when an active unit depends on it. Forgetting a failed unit
    /// means later dependents of that name run instead of being skipped.
    pub fn forget(&self, name: &str) -> bool {
        let mut state = self.lock();
        if state.status_of(name).is_active() || state.awaited().contains(name) {
            return false;
        }
        state.retries.remove(name);
        state.tasks.remove(name).is_some()
    }

    /// Drop all tracked state.
    ///
    /// Work already running is not cancelled; parked units are dropped and
    /// their handles settle with [`TaskError::Terminated`].
    pub fn terminate(&self) {
        let mut state = self.lock();
        let parked = state.tasks.values().filter(|e| e.deferred.is_some()).count();
        debug!(tracked = state.tasks.len(), parked, "Terminating scheduler");
        state.tasks.clear();
        state.retries.clear();
    }
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "cancelled".to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Scheduler = TaskScheduler<u32, String>;

    #[tokio::test]
    async fn test_independent_task_runs_immediately() {
        let scheduler = Scheduler::new();
        let handle = scheduler.submit("a", || async { Ok(1) }, None);
        assert_eq!(handle.await.unwrap(), 1);
        assert!(scheduler.all_tasks_completed());
    }

    #[tokio::test]
    async fn test_dependent_waits_for_completion() {
        let scheduler = Scheduler::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let a = scheduler.submit(
            "a",
            move || async move {
                let _ = release_rx.await;
                Ok(1)
            },
            None,
        );

        let observer = scheduler.clone();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_b = Arc::clone(&seen);
        let b = scheduler.submit(
            "b",
            move || async move {
                *seen_in_b.lock().unwrap() = Some(observer.get_status("a"));
                Ok(2)
            },
            Some("a"),
        );

        assert_eq!(scheduler.get_status("a"), TaskStatus::Running);
        assert_eq!(scheduler.get_status("b"), TaskStatus::Pending);
        assert_eq!(scheduler.get_children("a"), vec!["b".to_string()]);
        assert!(!scheduler.all_tasks_completed());

        release_tx.send(()).unwrap();
        assert_eq!(b.await.unwrap(), 2);
        assert_eq!(a.await.unwrap(), 1);
        assert_eq!(*seen.lock().unwrap(), Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependent() {
        let scheduler = Scheduler::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let invoked = Arc::new(AtomicBool::new(false));

        let a = scheduler.submit(
            "a",
            move || async move {
                let _ = release_rx.await;
                Err("boom".to_string())
            },
            None,
        );
        let flag = Arc::clone(&invoked);
        let b = scheduler.submit(
            "b",
            move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(2)
            },
            Some("a"),
        );

        release_tx.send(()).unwrap();
        assert_eq!(a.await, Err(TaskError::Failed("boom".to_string())));
        let err = b.await.unwrap_err();
        assert_eq!(err.failed_dependency(), Some("a"));
        assert!(!invoked.load(Ordering::SeqCst));
        assert_eq!(scheduler.get_status("b"), TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_failure_cascades_through_chain_but_not_siblings() {
        let scheduler = Scheduler::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let a = scheduler.submit(
            "a",
            move || async move {
                let _ = release_rx.await;
                Err("boom".to_string())
            },
            None,
        );
        let b = scheduler.submit("b", || async { Ok(2) }, Some("a"));
        let c = scheduler.submit("c", || async { Ok(3) }, Some("b"));
        let sibling = scheduler.submit("s", || async { Ok(4) }, None);

        release_tx.send(()).unwrap();
        assert!(a.await.is_err());
        assert_eq!(b.await.unwrap_err().failed_dependency(), Some("a"));
        assert_eq!(c.await.unwrap_err().failed_dependency(), Some("b"));
        assert_eq!(sibling.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_dependency_already_failed_at_submit() {
        let scheduler = Scheduler::new();
        let a = scheduler.submit("a", || async { Err("nope".to_string()) }, None);
        assert!(a.await.is_err());

        let b = scheduler.submit("b", || async { Ok(2) }, Some("a"));
        assert_eq!(
            b.await,
            Err(TaskError::DependencyFailed {
                task: "b".to_string(),
                dependency: "a".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_missing_dependency_runs_immediately() {
        let scheduler = Scheduler::new();
        let b = scheduler.submit("b", || async { Ok(2) }, Some("never-submitted"));
        assert_eq!(b.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_completed_units_are_collected() {
        let scheduler = Scheduler::new();
        let a = scheduler.submit("a", || async { Ok(1) }, None);
        a.await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(scheduler.get_status("a"), TaskStatus::NotFound);
        assert_eq!(scheduler.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_status_is_not_found() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.get_status("ghost"), TaskStatus::NotFound);
        assert!(scheduler.get_children("ghost").is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_active_submission_rejected() {
        let scheduler = Scheduler::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let first = scheduler.submit(
            "a",
            move || async move {
                let _ = release_rx.await;
                Ok(1)
            },
            None,
        );
        let second = scheduler.submit("a", || async { Ok(2) }, None);

        assert_eq!(second.await, Err(TaskError::Duplicate("a".to_string())));
        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_counters_are_independent() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.get_retry_count("a"), 0);
        assert_eq!(scheduler.increment_retry("a"), 1);
        assert_eq!(scheduler.increment_retry("a"), 2);
        assert_eq!(scheduler.get_retry_count("b"), 0);
        assert_eq!(scheduler.get_status("a"), TaskStatus::NotFound);
    }

    #[tokio::test]
    async fn test_panicking_work_fails_and_skips_dependents() {
        let scheduler = Scheduler::new();
        let a = scheduler.submit("a", || async { panic!("transport exploded") }, None);
        let b = scheduler.submit("b", || async { Ok(2) }, Some("a"));

        let err = a.await.unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("transport exploded"));
        assert_eq!(
            b.await,
            Err(TaskError::DependencyFailed {
                task: "b".to_string(),
                dependency: "a".to_string(),
            })
        );
        assert_eq!(scheduler.get_status("a"), TaskStatus::Failed);
        assert_eq!(scheduler.get_status("b"), TaskStatus::Failed);
        assert!(scheduler.all_tasks_completed());
    }

    #[tokio::test]
    async fn test_retry_counter_dropped_with_completed_unit() {
        let scheduler = Scheduler::new();
        let counter = scheduler.clone();
        let a = scheduler.submit(
            "a",
            move || async move {
                assert_eq!(counter.increment_retry("a"), 1);
                Ok(1)
            },
            None,
        );

        assert_eq!(a.await.unwrap(), 1);
        assert_eq!(scheduler.get_retry_count("a"), 0);
        assert_eq!(scheduler.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_forget_only_settled_units() {
        let scheduler = Scheduler::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let a = scheduler.submit(
            "a",
            move || async move {
                let _ = release_rx.await;
                Err("boom".to_string())
            },
            None,
        );

        assert!(!scheduler.forget("a"));
        release_tx.send(()).unwrap();
        assert!(a.await.is_err());

        scheduler.increment_retry("a");
        assert!(scheduler.forget("a"));
        assert_eq!(scheduler.get_status("a"), TaskStatus::NotFound);
        assert_eq!(scheduler.get_retry_count("a"), 0);
        assert!(!scheduler.forget("a"));

        let b = scheduler.submit("b", || async { Ok(2) }, Some("a"));
        assert_eq!(b.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_terminate_drops_parked_units() {
        let scheduler = Scheduler::new();
        let (_release_tx, release_rx) = oneshot::channel::<()>();
        let _a = scheduler.submit(
            "a",
            move || async move {
                let _ = release_rx.await;
                Ok(1)
            },
            None,
        );
        let b = scheduler.submit("b", || async { Ok(2) }, Some("a"));

        scheduler.terminate();
        assert_eq!(scheduler.tracked_count(), 0);
        assert!(scheduler.all_tasks_completed());
        assert_eq!(b.await, Err(TaskError::Terminated("b".to_string())));
    }
}
