//! Per-user session registry: update-id deduplication + classification.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::commands::{self, Command, SessionStatus};
use crate::domain::UpdateId;

/// Per-user dedup/state record. One per whitelisted user, created at startup,
/// never destroyed during the process lifetime.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: String,
    pub status: SessionStatus,
    pub last_update_id: Option<UpdateId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same update id as the last one processed for this user. Telegram's
    /// at-least-once delivery sometimes redelivers an update; skip it.
    Duplicate,
    /// No session for this user. Callers check the whitelist first, so this
    /// only happens on a misconfigured whitelist or a race at startup.
    NoSession,
    Command(Command),
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(whitelist: &[String]) -> Self {
        let sessions = whitelist
            .iter()
            .map(|user_id| {
                (
                    user_id.clone(),
                    Session {
                        user_id: user_id.clone(),
                        status: SessionStatus::Waiting,
                        last_update_id: None,
                    },
                )
            })
            .collect();

        Self {
            sessions: Mutex::new(sessions),
        }
    }

    /// Dedup + classify under one critical section.
    ///
    /// This must stay cheap: the capture enqueue happens outside this lock,
    /// so one user's full queue cannot stall update processing for everyone
    /// else.
    pub async fn handle_update(
        &self,
        user_id: &str,
        update_id: UpdateId,
        text: &str,
    ) -> UpdateOutcome {
        let mut sessions = self.sessions.lock().await;

        let Some(session) = sessions.get_mut(user_id) else {
            warn!(user_id, "session does not exist");
            return UpdateOutcome::NoSession;
        };

        if session.last_update_id == Some(update_id) {
            info!(user_id, update_id = update_id.0, "duplicate update, skipping");
            return UpdateOutcome::Duplicate;
        }
        session.last_update_id = Some(update_id);

        UpdateOutcome::Command(commands::classify(session.status, text))
    }

    /// Last processed update id for a user (test/introspection hook).
    pub async fn last_update_id(&self, user_id: &str) -> Option<UpdateId> {
        let sessions = self.sessions.lock().await;
        sessions.get(user_id).and_then(|s| s.last_update_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(&["alice".to_string(), "bob".to_string()])
    }

    #[tokio::test]
    async fn duplicate_update_is_a_noop() {
        let reg = registry();

        let first = reg.handle_update("alice", UpdateId(42), "/capture").await;
        assert_eq!(first, UpdateOutcome::Command(Command::Capture));

        let second = reg.handle_update("alice", UpdateId(42), "/capture").await;
        assert_eq!(second, UpdateOutcome::Duplicate);
        assert_eq!(reg.last_update_id("alice").await, Some(UpdateId(42)));
    }

    #[tokio::test]
    async fn update_id_tracks_latest_processed() {
        let reg = registry();

        reg.handle_update("alice", UpdateId(1), "/status").await;
        reg.handle_update("alice", UpdateId(2), "/status").await;
        assert_eq!(reg.last_update_id("alice").await, Some(UpdateId(2)));
    }

    #[tokio::test]
    async fn users_do_not_share_dedup_state() {
        let reg = registry();

        reg.handle_update("alice", UpdateId(7), "/help").await;
        let bob = reg.handle_update("bob", UpdateId(7), "/help").await;
        assert_eq!(bob, UpdateOutcome::Command(Command::Help));
    }

    #[tokio::test]
    async fn unlisted_user_has_no_session() {
        let reg = registry();

        let out = reg.handle_update("mallory", UpdateId(1), "/capture").await;
        assert_eq!(out, UpdateOutcome::NoSession);
        assert_eq!(reg.last_update_id("mallory").await, None);
    }
}
