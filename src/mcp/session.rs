//! Session table for MCP conversations
//!
//! Sessions are keyed by an opaque 128-bit token and progress from `Created` to `Ready`.
//! The table is sharded, so operations on distinct ids never contend on a common lock,
//! and every read-modify-write on one session happens under that entry's exclusive guard.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Ready,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// What a method needs from the caller's session before its handler may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequirement {
    Exists,
    Ready,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session {0} is not ready")]
    NotReady(SessionId),
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> SessionId {
        let now = Utc::now();
        let id = SessionId::generate();
        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                state: SessionState::Created,
                created_at: now,
                last_activity: now,
            },
        );
        info!(session_id = %id, "session created");
        id
    }

    /// Flips `Created` to `Ready`. Repeating it on a ready session changes nothing.
    pub fn mark_ready(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        session.last_activity = Utc::now();
        if session.state == SessionState::Created {
            session.state = SessionState::Ready;
            info!(session_id = %id, "session ready for operation");
        }
        Ok(())
    }

    pub fn get(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.sessions
            .get(id)
            .map(|session| session.clone())
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub fn touch(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        session.last_activity = Utc::now();
        Ok(())
    }

    /// Refreshes activity and checks the state in one critical section, so a
    /// concurrent `mark_ready` is observed either entirely before or after.
    pub fn authorize(
        &self,
        id: &SessionId,
        requirement: SessionRequirement,
    ) -> Result<Session, SessionError> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        session.last_activity = Utc::now();

        if requirement == SessionRequirement::Ready && session.state != SessionState::Ready {
            return Err(SessionError::NotReady(id.clone()));
        }
        Ok(session.clone())
    }

    /// Drops sessions idle for longer than `max_idle`, returning how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.last_activity >= cutoff);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub fn spawn_idle_sweeper(
    store: Arc<SessionStore>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(max_idle);
            if evicted > 0 {
                info!(evicted, remaining = store.len(), "idle sessions evicted");
            } else {
                debug!(remaining = store.len(), "idle session sweep found nothing");
            }
        }
    })
}
