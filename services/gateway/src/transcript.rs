use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Ordered chat history. Turns are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTranscript {
    turns: Vec<Turn>,
}

impl ConversationTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `max_turns` turns, oldest first.
    pub fn recent(&self, max_turns: usize) -> ConversationTranscript {
        let skip = self.turns.len().saturating_sub(max_turns);
        Self {
            turns: self.turns[skip..].to_vec(),
        }
    }
}

#[derive(Debug)]
struct Session {
    transcript: ConversationTranscript,
    last_active: Instant,
}

/// Bounds applied to [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
    pub max_turns: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1_000,
            idle_ttl: Duration::from_secs(3_600),
            max_turns: 20,
        }
    }
}

/// Transcripts by session id.
///
/// Sessions idle for `idle_ttl` are dropped, the least recently active one
/// makes room once `max_sessions` is reached, and each transcript keeps only
/// its last `max_turns` turns.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Copy of the session's transcript; empty for an unknown or expired session.
    pub fn transcript(&self, session_id: Uuid) -> ConversationTranscript {
        self.sessions
            .get(&session_id)
            .filter(|session| session.last_active.elapsed() < self.limits.idle_ttl)
            .map(|session| session.transcript.recent(self.limits.max_turns))
            .unwrap_or_default()
    }

    pub fn record_exchange(&self, session_id: Uuid, message: &str, reply: &str) {
        self.evict(session_id);

        let mut session = self.sessions.entry(session_id).or_insert_with(|| Session {
            transcript: ConversationTranscript::new(),
            last_active: Instant::now(),
        });
        if session.last_active.elapsed() >= self.limits.idle_ttl {
            session.transcript = ConversationTranscript::new();
        }
        session.transcript.push_user(message);
        session.transcript.push_assistant(reply);
        if session.transcript.len() > self.limits.max_turns {
            let trimmed = session.transcript.recent(self.limits.max_turns);
            session.transcript = trimmed;
        }
        session.last_active = Instant::now();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops expired sessions and, if the store is still full, the least
    /// recently active ones. `keep` is never evicted.
    fn evict(&self, keep: Uuid) {
        let ttl = self.limits.idle_ttl;
        let before = self.sessions.len();
        self.sessions
            .retain(|id, session| *id == keep || session.last_active.elapsed() < ttl);

        if !self.sessions.contains_key(&keep) {
            while self.sessions.len() >= self.limits.max_sessions.max(1) {
                let oldest = self
                    .sessions
                    .iter()
                    .min_by_key(|entry| entry.value().last_active)
                    .map(|entry| *entry.key());
                match oldest {
                    Some(id) => {
                        self.sessions.remove(&id);
                    }
                    None => break,
                }
            }
        }

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.sessions.len(), "evicted chat sessions");
        }
    }
}
