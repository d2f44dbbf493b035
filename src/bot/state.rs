use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::debug;
use teloxide::types::{ChatId, Message, ThreadId, UserId};

use crate::doujin::{DoujinPipeline, HttpSource};

/// A `/get_doujin` link waiting for the user to pick an output format.
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub chat_id: ChatId,
    pub thread_id: Option<ThreadId>,
    pub link: String,
    created_at: Instant,
}

/// One pending request per user. Entries end when the format is chosen,
/// on `/cancel`, or once they are older than the TTL.
#[derive(Clone)]
pub(crate) struct SessionStore {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<UserId, PendingRequest>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replaces any earlier request from the same user.
    pub fn begin(
        &self,
        user: UserId,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        link: impl Into<String>,
    ) {
        let Ok(mut sessions) = self.sessions.write() else {
            return;
        };

        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, pending| pending.created_at.elapsed() < ttl);
        if sessions.len() < before {
            debug!("purged {} expired sessions", before - sessions.len());
        }

        sessions.insert(
            user,
            PendingRequest {
                chat_id,
                thread_id,
                link: link.into(),
                created_at: Instant::now(),
            },
        );
    }

    /// Removes and returns the user's request unless it has expired.
    pub fn take(&self, user: UserId) -> Option<PendingRequest> {
        let pending = self.sessions.write().ok()?.remove(&user)?;
        (pending.created_at.elapsed() < self.ttl).then_some(pending)
    }

    pub fn cancel(&self, user: UserId) -> bool {
        self.take(user).is_some()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub bot_username: String,
    pub pipeline: Arc<DoujinPipeline<dyn HttpSource>>,
    pub(crate) sessions: SessionStore,
    booted_at: i64,
}

impl AppState {
    pub fn new(
        bot_username: String,
        pipeline: DoujinPipeline<dyn HttpSource>,
        session_ttl: Duration,
    ) -> Self {
        let booted_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        Self {
            bot_username,
            pipeline: Arc::new(pipeline),
            sessions: SessionStore::new(session_ttl),
            booted_at,
        }
    }

    /// Commands queued while the bot was offline are not replayed.
    pub(crate) fn is_after_boot(&self, msg: &Message) -> bool {
        msg.date.timestamp() >= self.booted_at
    }
}
