//! Lazy (re)construction of a dictionary from its source.
//!
//! ```text
//! Empty ──reload──▶ Loading ──▶ Ready ──change──▶ Stale ──reload──▶ Loading …
//!                      │ ▲
//!                      └─┘ change while loading: discard, rebuild
//! ```
//!
//! `Closed` is terminal. A loader commits only if no change notification
//! arrived since it started; otherwise its result is dropped and it starts
//! over.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::session::{Working, WriteSession};
use crate::source::SourceError;

use super::Inner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    /// No content yet, or the last load failed.
    Empty,
    Loading,
    Ready,
    /// Content is from an outdated source; rebuilt on the next reload.
    Stale,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The source could not be read. The dictionary keeps its previous
    /// content and can be reloaded again.
    Failed,
    /// The dictionary was already up to date (or closed).
    NotRequired,
    /// The dictionary was closed while loading.
    Cancelled,
}

#[derive(Default)]
pub(super) struct Task {
    outcome: Mutex<Option<LoadOutcome>>,
    done: Condvar,
}

impl Task {
    fn finish(&self, outcome: LoadOutcome) {
        let mut slot = match self.outcome.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(outcome);
        self.done.notify_all();
    }
}

/// Joinable view of a reload. Cloning shares the same task.
#[derive(Clone)]
pub struct ReloadHandle {
    task: Arc<Task>,
}

impl ReloadHandle {
    pub(super) fn completed(outcome: LoadOutcome) -> Self {
        let task = Arc::new(Task::default());
        task.finish(outcome);
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.peek().is_some()
    }

    pub fn peek(&self) -> Option<LoadOutcome> {
        match self.task.outcome.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Block until the load completes.
    pub fn wait(&self) -> LoadOutcome {
        let mut guard = match self.task.outcome.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if let Some(outcome) = *guard {
                return outcome;
            }
            guard = match self.task.done.wait(guard) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Like `wait`, giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<LoadOutcome> {
        let guard = match self.task.outcome.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = self
            .task
            .done
            .wait_timeout_while(guard, timeout, |outcome| outcome.is_none());
        match result {
            Ok((guard, _)) => *guard,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

pub(super) struct ReloadSlot {
    pub state: ReloadState,
    /// State to return to if the running load fails.
    prior: ReloadState,
    task: Option<Arc<Task>>,
    thread: Option<JoinHandle<()>>,
}

impl ReloadSlot {
    pub fn new(state: ReloadState) -> Self {
        Self {
            state,
            prior: state,
            task: None,
            thread: None,
        }
    }

    /// Mark closed and hand back the loader thread for joining.
    pub fn close(&mut self) -> Option<JoinHandle<()>> {
        self.state = ReloadState::Closed;
        self.thread.take()
    }
}

/// Start a load if the dictionary needs one; otherwise return the running
/// or an already-completed handle.
pub(super) fn reload_if_required(inner: &Arc<Inner>) -> ReloadHandle {
    let mut slot = inner.lock_reload();
    match slot.state {
        ReloadState::Ready | ReloadState::Closed => ReloadHandle::completed(LoadOutcome::NotRequired),
        ReloadState::Loading => match &slot.task {
            Some(task) => ReloadHandle {
                task: Arc::clone(task),
            },
            None => ReloadHandle::completed(LoadOutcome::NotRequired),
        },
        ReloadState::Empty | ReloadState::Stale => {
            // The previous loader finished its last critical section before
            // leaving `Loading`, so this join does not block on us.
            if let Some(previous) = slot.thread.take() {
                let _ = previous.join();
            }
            let task = Arc::new(Task::default());
            let loader_inner = Arc::clone(inner);
            let loader_task = Arc::clone(&task);
            let spawned = thread::Builder::new()
                .name(format!("vocab-load-{}", inner.name))
                .spawn(move || run_loader(loader_inner, loader_task));
            match spawned {
                Ok(handle) => {
                    slot.prior = slot.state;
                    slot.state = ReloadState::Loading;
                    slot.task = Some(Arc::clone(&task));
                    slot.thread = Some(handle);
                    ReloadHandle { task }
                }
                Err(e) => {
                    warn!(dictionary = %inner.name, "failed to spawn loader: {e}");
                    ReloadHandle::completed(LoadOutcome::Failed)
                }
            }
        }
    }
}

/// Record a source change. A `Ready` dictionary goes `Stale`; a running
/// load notices the new generation before committing.
pub(super) fn needs_to_recreate(inner: &Inner) {
    let mut slot = inner.lock_reload();
    inner.generation.fetch_add(1, Ordering::SeqCst);
    if slot.state == ReloadState::Ready {
        slot.state = ReloadState::Stale;
    }
    debug!(dictionary = %inner.name, state = ?slot.state, "source changed");
}

enum Attempt {
    Done(LoadOutcome),
    Superseded,
}

fn run_loader(inner: Arc<Inner>, task: Arc<Task>) {
    let mut attempts = 0u32;
    let outcome = loop {
        attempts += 1;
        match load_once(&inner) {
            Attempt::Done(outcome) => break outcome,
            Attempt::Superseded => {
                debug!(dictionary = %inner.name, attempts, "load superseded, rebuilding");
            }
        }
    };
    task.finish(outcome);
    info!(dictionary = %inner.name, ?outcome, attempts, "load finished");
    if outcome == LoadOutcome::Loaded {
        inner.request_flush();
    }
}

fn load_once(inner: &Inner) -> Attempt {
    let generation = inner.generation.load(Ordering::SeqCst);

    // History-backed kinds load on top of their current content, under the
    // mutation lock. Source-backed kinds build a fresh state off-lock.
    let retained = inner
        .capabilities
        .retains_content_on_reload()
        .then(|| inner.lock_working());
    let mut next = match &retained {
        Some(working) => Working::clone(working),
        None => Working::empty(inner.new_header()),
    };
    let populated = populate(inner, &mut next);

    let mut working = match retained {
        Some(guard) => guard,
        None => inner.lock_working(),
    };
    let mut slot = inner.lock_reload();

    if slot.state == ReloadState::Closed {
        return Attempt::Done(LoadOutcome::Cancelled);
    }
    if inner.generation.load(Ordering::SeqCst) != generation {
        return Attempt::Superseded;
    }
    if let Err(e) = populated {
        warn!(dictionary = %inner.name, "load failed: {e}");
        slot.state = slot.prior;
        return Attempt::Done(LoadOutcome::Failed);
    }

    *working = next;
    inner.published.publish(working.snapshot(), true);
    slot.state = ReloadState::Ready;
    Attempt::Done(LoadOutcome::Loaded)
}

fn populate(inner: &Inner, next: &mut Working) -> Result<(), SourceError> {
    let mut session = WriteSession::new(next, &inner.config, &*inner.policy, &*inner.clock);
    inner.capabilities.load_initial_contents(&mut session)?;
    session.run_gc_if_required(true);
    Ok(())
}
