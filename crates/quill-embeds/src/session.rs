//! Live preview embed tracking.
//!
//! While an author types, every re-render starts a new preview session for
//! that client. Embeds resolve in the background and report back with the
//! token of the session that requested them; results for superseded
//! sessions are dropped, so a slow fetch can never overwrite newer content.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Generation counter for one client's preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub u64);

/// Resolution state of one embed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EmbedState {
    Loading,
    Resolved { html: String },
    /// Resolution failed; `html` is the fallback shown instead.
    Failed { html: String },
}

impl EmbedState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// HTML to show for a settled embed.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Loading => None,
            Self::Resolved { html } | Self::Failed { html } => Some(html),
        }
    }
}

/// State of one embed in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedSnapshot {
    pub id: usize,
    #[serde(flatten)]
    pub state: EmbedState,
}

struct Session {
    token: SessionToken,
    embeds: BTreeMap<usize, EmbedState>,
}

#[derive(Default)]
struct Sessions {
    next_token: u64,
    by_client: HashMap<String, Session>,
}

/// Tracks preview sessions per client.
pub struct EmbedTracker {
    max_clients: usize,
    inner: Mutex<Sessions>,
}

impl EmbedTracker {
    /// Tracker keeping at most `max_clients` sessions. The oldest session is
    /// evicted when a new client would exceed the bound.
    #[must_use]
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients: max_clients.max(1),
            inner: Mutex::new(Sessions::default()),
        }
    }

    /// Start a new session for `client`, superseding any previous one.
    ///
    /// Every embed in `ids` starts out [`EmbedState::Loading`].
    pub fn begin(&self, client: &str, ids: impl IntoIterator<Item = usize>) -> SessionToken {
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        sessions.next_token += 1;
        let token = SessionToken(sessions.next_token);

        if !sessions.by_client.contains_key(client) && sessions.by_client.len() >= self.max_clients
        {
            let oldest = sessions
                .by_client
                .iter()
                .min_by_key(|(_, session)| session.token)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(client = %oldest, "Evicting preview session");
                sessions.by_client.remove(&oldest);
            }
        }

        sessions.by_client.insert(
            client.to_owned(),
            Session {
                token,
                embeds: ids.into_iter().map(|id| (id, EmbedState::Loading)).collect(),
            },
        );
        token
    }

    /// Record the outcome of one embed.
    ///
    /// Applied only when `token` is the client's current session and the
    /// embed is still loading. Returns whether the state was applied.
    pub fn complete(&self, client: &str, token: SessionToken, id: usize, state: EmbedState) -> bool {
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(session) = sessions.by_client.get_mut(client) else {
            return false;
        };
        if session.token != token {
            tracing::debug!(client, ?token, current = ?session.token, "Dropping stale embed result");
            return false;
        }
        match session.embeds.get_mut(&id) {
            Some(current) if current.is_loading() => {
                *current = state;
                true
            }
            _ => false,
        }
    }

    /// Current embed states, or `None` when `token` has been superseded.
    pub fn snapshot(&self, client: &str, token: SessionToken) -> Option<Vec<EmbedSnapshot>> {
        let sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let session = sessions.by_client.get(client)?;
        if session.token != token {
            return None;
        }
        Some(
            session
                .embeds
                .iter()
                .map(|(id, state)| EmbedSnapshot {
                    id: *id,
                    state: state.clone(),
                })
                .collect(),
        )
    }

    /// Whether `token` is the current session for `client`.
    pub fn is_current(&self, client: &str, token: SessionToken) -> bool {
        let sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .by_client
            .get(client)
            .is_some_and(|session| session.token == token)
    }
}

impl Default for EmbedTracker {
    fn default() -> Self {
        Self::new(1024)
    }
}
