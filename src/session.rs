// Per-browser-session state
//
// A session owns one temp directory, created on first use and named from its
// UUID, plus a lock serializing file-mode transfers into that directory.
// Directories are left behind when the process exits or the session is
// dropped from the store.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, OnceCell};
use tracing::debug;
use uuid::Uuid;

/// One browser session
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    temp_root: PathBuf,
    temp_dir: OnceCell<PathBuf>,
    transfer_lock: AsyncMutex<()>,
}

impl SessionContext {
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self::with_id(Uuid::new_v4(), temp_root)
    }

    pub fn with_id(id: Uuid, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            id,
            temp_root: temp_root.into(),
            temp_dir: OnceCell::new(),
            transfer_lock: AsyncMutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path of the session directory, whether or not it exists yet
    pub fn temp_dir_path(&self) -> PathBuf {
        self.temp_root.join(format!("tubedrop_{}", self.id))
    }

    /// The session directory, created on first call
    pub async fn temp_dir(&self) -> std::io::Result<&Path> {
        let dir = self
            .temp_dir
            .get_or_try_init(|| async {
                let dir = self.temp_dir_path();
                tokio::fs::create_dir_all(&dir).await?;
                debug!(session = %self.id, dir = %dir.display(), "created session directory");
                Ok::<_, std::io::Error>(dir)
            })
            .await?;
        Ok(dir.as_path())
    }

    /// Held for the duration of a file-mode transfer
    pub async fn lock_transfers(&self) -> MutexGuard<'_, ()> {
        self.transfer_lock.lock().await
    }
}

/// Sessions idle longer than this are forgotten
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

/// Most sessions kept at once
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug)]
struct StoredSession {
    session: Arc<SessionContext>,
    last_seen: Instant,
}

/// Sessions by id, bounded by an idle timeout and a capacity.
///
/// A session past its idle timeout is treated as unknown. When the store is
/// full the least recently seen session is dropped.
#[derive(Debug)]
pub struct SessionStore {
    temp_root: PathBuf,
    idle_timeout: Duration,
    capacity: usize,
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            idle_timeout: DEFAULT_SESSION_IDLE,
            capacity: DEFAULT_MAX_SESSIONS,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, capacity: usize, idle_timeout: Duration) -> Self {
        self.capacity = capacity.max(1);
        self.idle_timeout = idle_timeout;
        self
    }

    /// Existing session for `id`, or a fresh one when the id is unknown, idle
    /// for too long, or absent. The boolean is true when a session was created.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Arc<SessionContext>, bool) {
        let mut sessions = self.sessions.lock();
        let now = Instant::now();

        if let Some(stored) = id.and_then(|id| sessions.get_mut(&id)) {
            if now.duration_since(stored.last_seen) < self.idle_timeout {
                stored.last_seen = now;
                return (stored.session.clone(), false);
            }
        }

        let idle_timeout = self.idle_timeout;
        sessions.retain(|id, stored| {
            let live = now.duration_since(stored.last_seen) < idle_timeout;
            if !live {
                debug!(session = %id, "session expired");
            }
            live
        });

        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, stored)| stored.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    debug!(session = %id, "session evicted");
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let session = Arc::new(SessionContext::new(&self.temp_root));
        sessions.insert(
            session.id(),
            StoredSession {
                session: session.clone(),
                last_seen: now,
            },
        );
        debug!(session = %session.id(), "new session");
        (session, true)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}
