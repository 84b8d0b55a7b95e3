//! Session manager: isolated sessions with persist-after-commit semantics.
//!
//! Each session gets its own directory with an event log and snapshots.
//! Concurrency: Mutex for write serialization, no global mutable state.
//!
//! Commit-before-persist order:
//!   1. the kernel operation runs on the live module and journals events
//!   2. the journal is drained and appended to the log (one fsync)
//!   3. a snapshot is written when the interval boundary was crossed
//!
//! Events are persisted even when the operation reports an error: a
//! failed inner call still commits its nonce. If the append fails the
//! module is put back to its state before the operation, so memory never
//! runs ahead of the log.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use safe_tree_kernel::events::EventEnvelope;
use safe_tree_kernel::{ModuleConfig, ModuleError, SafeTreeModule};
use thiserror::Error;
use tracing::{info, warn};

use crate::event_store::EventStore;
use crate::proto_bridge::{kernel_to_proto, BridgeError};
use crate::replay;
use crate::snapshot;
use crate::snapshot_codec::SnapshotError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("event store: {0}")]
    Io(#[from] std::io::Error),
    #[error("event log frame: {0}")]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("session lock poisoned")]
    Poisoned,
}

/// An isolated module instance with its own event log.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    base_dir: PathBuf,
    module: SafeTreeModule,
    event_store: EventStore,
    snapshot_interval: u64,
}

impl Session {
    /// Open a session, replaying its log if one exists.
    ///
    /// Directory structure:
    ///   <base_dir>/<session_id>/events.log
    ///   <base_dir>/<session_id>/snapshots/
    ///
    /// `config` only seeds a fresh log; an existing log carries its own.
    pub fn open(
        base_dir: &Path,
        session_id: &str,
        config: ModuleConfig,
        snapshot_interval: u64,
    ) -> Result<Self, SessionError> {
        let session_dir = base_dir.join(session_id);
        let event_store = EventStore::open(&session_dir.join("events.log"))?;

        let module = if event_store.last_sequence() > 0 {
            let events = replay::decode_log(&event_store.load_all_events()?)?;
            let module = SafeTreeModule::from_events(&events)?;
            if module.config() != &config {
                warn!(session_id, "stored module config differs from requested; using stored");
            }
            module
        } else {
            SafeTreeModule::new(config)?
        };

        let mut session = Self {
            session_id: session_id.to_string(),
            base_dir: session_dir,
            module,
            event_store,
            snapshot_interval,
        };
        session.persist_pending()?;
        info!(
            session_id,
            sequence = session.current_sequence(),
            hash = %session.current_hash(),
            "session opened"
        );
        Ok(session)
    }

    /// Run one kernel operation and persist what it committed.
    ///
    /// `Err(SessionError::Module(_))` carries the operation's own error;
    /// events it committed before failing are on disk regardless. Any
    /// other error means the append failed: nothing was persisted and the
    /// module is back where it was. A failed interval snapshot is only
    /// logged, since the log already holds the events.
    pub fn execute<T>(
        &mut self,
        op: impl FnOnce(&mut SafeTreeModule) -> Result<T, ModuleError>,
    ) -> Result<T, SessionError> {
        let checkpoint = self.module.clone();
        let outcome = op(&mut self.module);
        let drained = match self.append_pending() {
            Ok(drained) => drained,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "append failed; rolling back");
                self.module = checkpoint;
                return Err(e);
            }
        };
        if let Err(e) = self.snapshot_if_due(&drained) {
            warn!(session_id = %self.session_id, error = %e, "snapshot failed; log is intact");
        }
        Ok(outcome?)
    }

    fn persist_pending(&mut self) -> Result<(), SessionError> {
        let drained = self.append_pending()?;
        self.snapshot_if_due(&drained)
    }

    /// Drain the journal into the log. On error nothing reached the log.
    fn append_pending(&mut self) -> Result<Vec<EventEnvelope>, SessionError> {
        let drained = self.module.drain_events();
        if !drained.is_empty() {
            let frames: Vec<_> = drained.iter().map(kernel_to_proto).collect();
            self.event_store.append_all(&frames)?;
        }
        Ok(drained)
    }

    fn snapshot_if_due(&self, appended: &[EventEnvelope]) -> Result<(), SessionError> {
        let crossed = self.snapshot_interval > 0
            && appended
                .iter()
                .any(|e| e.sequence % self.snapshot_interval == 0);
        if crossed {
            snapshot::save_snapshot(
                &self.snapshot_dir(),
                self.module.last_sequence(),
                self.module.registry(),
            )?;
        }
        Ok(())
    }

    /// Reload the log from disk and rebuild the module from scratch.
    pub fn replay_full(&mut self) -> Result<String, SessionError> {
        let events = self.load_events()?;
        self.module = SafeTreeModule::from_events(&events)?;
        let hash = self.module.canonical_hash();
        info!(session_id = %self.session_id, events = events.len(), %hash, "full replay");
        Ok(hash)
    }

    /// The log as kernel envelopes.
    pub fn load_events(&self) -> Result<Vec<EventEnvelope>, SessionError> {
        Ok(replay::decode_log(&self.event_store.load_all_events()?)?)
    }

    /// Latest snapshot, checked against its own hash and against a replay
    /// of the log up to its sequence. `None` when there is no snapshot.
    pub fn verify_latest_snapshot(&self) -> Result<Option<bool>, SessionError> {
        let Some(snap) = snapshot::load_latest_snapshot(&self.snapshot_dir())? else {
            return Ok(None);
        };
        if !snapshot::verify_snapshot_hash(&snap) {
            warn!(sequence = snap.sequence, "snapshot hash does not match its content");
            return Ok(Some(false));
        }
        let replayed = replay::hash_at(&self.load_events()?, snap.sequence)?;
        if replayed != snap.hash {
            warn!(sequence = snap.sequence, "snapshot diverges from replay");
        }
        Ok(Some(replayed == snap.hash))
    }

    pub fn module(&self) -> &SafeTreeModule {
        &self.module
    }

    pub fn current_hash(&self) -> String {
        self.module.canonical_hash()
    }

    pub fn current_sequence(&self) -> u64 {
        self.module.last_sequence()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.base_dir.join("snapshots")
    }
}

/// Thread-safe session handle.
#[derive(Debug)]
pub struct SharedSession {
    inner: Mutex<Session>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    /// Run one operation under the lock.
    pub fn execute<T>(
        &self,
        op: impl FnOnce(&mut SafeTreeModule) -> Result<T, ModuleError>,
    ) -> Result<T, SessionError> {
        let mut session = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
        session.execute(op)
    }

    pub fn current_hash(&self) -> Result<String, SessionError> {
        let session = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(session.current_hash())
    }

    pub fn current_sequence(&self) -> Result<u64, SessionError> {
        let session = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(session.current_sequence())
    }

    pub fn into_inner(self) -> Result<Session, SessionError> {
        self.inner.into_inner().map_err(|_| SessionError::Poisoned)
    }
}
