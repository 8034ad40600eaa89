//! Keyed session store with single-flight execution.
//!
//! Two tiers:
//!
//! - **Live runs**: a lock-guarded map keyed by [`CaseKey`]. Creation is
//!   atomic create-if-absent: exactly one caller becomes the
//!   [`RunOwner`] for a key, every concurrent caller gets a read-only
//!   [`RunHandle`] onto the same run. The owner is the only writer of
//!   the session while it is RUNNING.
//! - **Terminal sessions**: a moka cache. Once a session is terminal it
//!   is immutable and any number of readers share the same `Arc`.
//!   Retention (TTL + capacity) is where an external eviction policy
//!   attaches.
//!
//! An owner that disappears without completing marks its session FAILED
//! on drop, so followers never hang on an abandoned run.

use moka::sync::Cache;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use chrono::Utc;
use credo_core::{Case, CaseKey, Session, SessionState};

use crate::config::StoreConfig;

/// Store-level failures. These are infrastructure faults: the caller
/// surfaces them as a retryable orchestration failure, never as a
/// decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("analysis run for {0} was abandoned before completion")]
    RunAbandoned(CaseKey),
}

struct LiveRun {
    session_id: Uuid,
    tx: watch::Sender<Arc<Session>>,
}

struct Inner {
    live: RwLock<HashMap<CaseKey, LiveRun>>,
    terminal: Cache<CaseKey, Arc<Session>>,
    index: Cache<Uuid, CaseKey>,
}

impl Inner {
    /// Publish a terminal snapshot and retire the live entry. The live
    /// lock spans both moves so `begin` can never observe a key in
    /// neither tier.
    fn finish(&self, key: CaseKey, snapshot: Arc<Session>) {
        let mut live = self.live.write();
        self.terminal.insert(key, snapshot.clone());
        if let Some(run) = live.remove(&key) {
            run.tx.send_replace(snapshot);
        }
    }
}

/// Outcome of [`SessionStore::begin`].
pub enum BeginOutcome {
    /// This caller owns the run for the key.
    Started(RunOwner),

    /// Another caller owns an in-flight run; attach to it.
    Joined(RunHandle),

    /// The key already resolved to a terminal session.
    Finished(Arc<Session>),
}

/// Exclusive write access to one running session.
///
/// Held by the single orchestrator invocation executing the run. All
/// mutation happens on the owner's working copy; `publish` pushes
/// snapshots to followers, `complete` freezes the session.
pub struct RunOwner {
    inner: Arc<Inner>,
    key: CaseKey,
    session: Session,
    completed: bool,
}

impl RunOwner {
    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    /// Read access to the working copy.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access to the working copy. Changes are invisible to
    /// followers until `publish` or `complete`.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Push the current working copy to followers.
    pub fn publish(&self) {
        let snapshot = Arc::new(self.session.clone());
        if let Some(run) = self.inner.live.read().get(&self.key) {
            run.tx.send_replace(snapshot);
        }
    }

    /// A read-only handle onto this run, e.g. to hand to a poller while
    /// the run continues in the background.
    pub fn subscribe(&self) -> RunHandle {
        let live = self.inner.live.read();
        let run = live.get(&self.key).expect("owner exists while live");
        RunHandle {
            session_id: run.session_id,
            rx: run.tx.subscribe(),
        }
    }

    /// Freeze the session in its terminal state and retire the run.
    pub fn complete(mut self) -> Arc<Session> {
        debug_assert!(self.session.state.is_terminal());
        self.completed = true;
        let snapshot = Arc::new(self.session.clone());
        self.inner.finish(self.key, snapshot.clone());
        snapshot
    }
}

impl Drop for RunOwner {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        // Abandoned mid-run (cancellation or a bug upstream): fail the
        // session so followers observe a terminal state.
        tracing::error!(key = %self.key, "run owner dropped before completion, failing session");
        self.session.state = SessionState::Failed;
        self.session.completed_at = Some(Utc::now());
        let snapshot = Arc::new(self.session.clone());
        self.inner.finish(self.key, snapshot);
    }
}

/// Read-only view of an in-flight run.
#[derive(Clone)]
pub struct RunHandle {
    session_id: Uuid,
    rx: watch::Receiver<Arc<Session>>,
}

impl RunHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<Session> {
        self.rx.borrow().clone()
    }

    /// Wait until the run reaches a terminal state.
    pub async fn wait_terminal(mut self) -> Result<Arc<Session>, StoreError> {
        loop {
            {
                let current = self.rx.borrow_and_update().clone();
                if current.state.is_terminal() {
                    return Ok(current);
                }
            }
            if self.rx.changed().await.is_err() {
                // Sender gone. The owner's drop guard publishes a
                // terminal snapshot first, so anything else is a store
                // fault.
                let last = self.rx.borrow().clone();
                if last.state.is_terminal() {
                    return Ok(last);
                }
                return Err(StoreError::RunAbandoned(last.key));
            }
        }
    }
}

/// The session store.
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(config: &StoreConfig) -> Self {
        let terminal = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_live(config.retention)
            .build();
        let index = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_live(config.retention)
            .build();

        Self {
            inner: Arc::new(Inner {
                live: RwLock::new(HashMap::new()),
                terminal,
                index,
            }),
        }
    }

    /// Atomic create-if-absent for a case key.
    ///
    /// Exactly one concurrent caller per key receives
    /// [`BeginOutcome::Started`]; the rest attach to that run or read
    /// the already-terminal session.
    pub fn begin(&self, case: Case) -> BeginOutcome {
        let key = case.key;
        let mut live = self.inner.live.write();

        if let Some(run) = live.get(&key) {
            return BeginOutcome::Joined(RunHandle {
                session_id: run.session_id,
                rx: run.tx.subscribe(),
            });
        }

        if let Some(session) = self.inner.terminal.get(&key) {
            return BeginOutcome::Finished(session);
        }

        let session = Session::new(case);
        let session_id = session.id;
        let (tx, _rx) = watch::channel(Arc::new(session.clone()));
        live.insert(key, LiveRun { session_id, tx });
        drop(live);

        self.inner.index.insert(session_id, key);
        tracing::debug!(%key, %session_id, "session created");

        BeginOutcome::Started(RunOwner {
            inner: self.inner.clone(),
            key,
            session,
            completed: false,
        })
    }

    /// Current session for a key, live or terminal.
    pub fn get(&self, key: CaseKey) -> Option<Arc<Session>> {
        if let Some(run) = self.inner.live.read().get(&key) {
            return Some(run.tx.borrow().clone());
        }
        self.inner.terminal.get(&key)
    }

    /// Current session by server-issued session id.
    pub fn find_by_id(&self, session_id: Uuid) -> Option<Arc<Session>> {
        let key = self.inner.index.get(&session_id)?;
        self.get(key)
    }

    /// Number of live (non-terminal) runs.
    pub fn live_count(&self) -> usize {
        self.inner.live.read().len()
    }
}
