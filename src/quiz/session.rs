use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use teloxide::types::UserId;
use tokio::sync::Mutex;

use crate::quiz::{Level, Question};

/// One user's quiz in flight.
#[derive(Debug, Clone)]
pub struct Session {
    pub level: Level,
    pub quiz: Vec<Question>,
    pub index: usize,
    pub score: u32,
    /// Monotonic id of this run; stale follow-up work compares against it.
    pub run: u64,
}

impl Session {
    pub fn is_complete(&self) -> bool {
        self.index >= self.quiz.len()
    }
}

/// In-memory sessions keyed by Telegram user. Completed sessions are removed
/// on the spot, so the map only ever holds runs that still expect an answer.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, Session>>,
    runs: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever the user had with a fresh run and returns its id.
    pub async fn start(&self, user: UserId, level: Level, quiz: Vec<Question>) -> u64 {
        let run = self.runs.fetch_add(1, Ordering::Relaxed);
        let session = Session {
            level,
            quiz,
            index: 0,
            score: 0,
            run,
        };
        self.inner.lock().await.insert(user, session);
        run
    }

    /// Runs `f` against the user's live session, then drops the session if
    /// `f` completed it. Returns `None` when the user has no session.
    pub async fn modify<T>(&self, user: UserId, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(&user)?;
        let out = f(session);
        if session.is_complete() {
            sessions.remove(&user);
        }
        Some(out)
    }

    /// Read-only view of the user's live session.
    pub async fn peek<T>(&self, user: UserId, f: impl FnOnce(&Session) -> T) -> Option<T> {
        self.inner.lock().await.get(&user).map(f)
    }

    /// Drops the user's session, if any. Returns whether one existed.
    pub async fn clear(&self, user: UserId) -> bool {
        self.inner.lock().await.remove(&user).is_some()
    }
}
