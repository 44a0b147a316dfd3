use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::types::{PushConfig, PushPayload};

/// Routes realtime payloads to the live sessions of each user.
///
/// A session is one client connection. It gets a bounded outbound queue when it
/// connects and joins exactly one user's room when it subscribes; a user may
/// have any number of sessions. Publishing never blocks: a full queue drops the
/// payload for that session.
pub struct PushRegistry {
    routes: RwLock<Routes>,
    config: PushConfig,
}

#[derive(Default)]
struct Routes {
    sessions: HashMap<String, SessionEntry>,
    rooms: HashMap<String, HashSet<String>>,
}

struct SessionEntry {
    sender: mpsc::Sender<PushPayload>,
    user_id: Option<String>,
}

impl Routes {
    fn leave_room(&mut self, session_id: &str, user_id: &str) {
        if let Some(room) = self.rooms.get_mut(user_id) {
            room.remove(session_id);
            if room.is_empty() {
                self.rooms.remove(user_id);
            }
        }
    }
}

impl PushRegistry {
    /// Create a new push registry
    pub fn new(config: Option<PushConfig>) -> Self {
        Self {
            routes: RwLock::new(Routes::default()),
            config: config.unwrap_or_default(),
        }
    }

    /// Registers a live connection and returns its outbound queue.
    ///
    /// Reconnecting an existing session id replaces its queue and drops its
    /// room membership.
    pub fn connect(&self, session_id: &str) -> mpsc::Receiver<PushPayload> {
        let (sender, receiver) = mpsc::channel(self.config.session_buffer.max(1));
        let mut routes = self.routes.write();

        let previous = routes.sessions.insert(
            session_id.to_string(),
            SessionEntry {
                sender,
                user_id: None,
            },
        );
        if let Some(user_id) = previous.and_then(|entry| entry.user_id) {
            routes.leave_room(session_id, &user_id);
        }

        log::debug!("Session {} connected", session_id);
        receiver
    }

    /// Removes a connection and its room membership. Returns whether it was connected.
    pub fn disconnect(&self, session_id: &str) -> bool {
        let mut routes = self.routes.write();
        match routes.sessions.remove(session_id) {
            Some(entry) => {
                if let Some(user_id) = entry.user_id {
                    routes.leave_room(session_id, &user_id);
                }
                log::debug!("Session {} disconnected", session_id);
                true
            }
            None => false,
        }
    }

    /// Binds a connected session to a user, moving it out of any previous user's room.
    ///
    /// Returns `false` if the session is not connected.
    pub fn subscribe(&self, session_id: &str, user_id: &str) -> bool {
        let mut routes = self.routes.write();
        let previous = match routes.sessions.get_mut(session_id) {
            Some(entry) => entry.user_id.replace(user_id.to_string()),
            None => {
                log::warn!("Cannot subscribe unknown session {} to {}", session_id, user_id);
                return false;
            }
        };

        if let Some(previous) = previous.filter(|p| p != user_id) {
            routes.leave_room(session_id, &previous);
        }
        routes
            .rooms
            .entry(user_id.to_string())
            .or_default()
            .insert(session_id.to_string());

        log::info!("User {} joined their notification room via {}", user_id, session_id);
        true
    }

    /// Unbinds a session from a user. A no-op unless the session is bound to that user.
    pub fn unsubscribe(&self, session_id: &str, user_id: &str) -> bool {
        let mut routes = self.routes.write();
        let bound = match routes.sessions.get_mut(session_id) {
            Some(entry) if entry.user_id.as_deref() == Some(user_id) => {
                entry.user_id = None;
                true
            }
            _ => false,
        };

        if bound {
            routes.leave_room(session_id, user_id);
            log::info!("User {} left their notification room via {}", user_id, session_id);
        }
        bound
    }

    /// Sends a payload to every session of `user_id`.
    ///
    /// Fire-and-forget: with no session connected this does nothing. Returns the
    /// number of sessions the payload was queued for.
    pub fn publish(&self, user_id: &str, payload: &PushPayload) -> usize {
        let routes = self.routes.read();
        let Some(room) = routes.rooms.get(user_id) else {
            log::debug!("No live sessions for {}, skipping push", user_id);
            return 0;
        };

        room.iter()
            .filter_map(|session_id| routes.sessions.get(session_id).map(|e| (session_id, e)))
            .filter(|(session_id, entry)| Self::deliver(session_id, entry, payload))
            .count()
    }

    /// Sends a payload to every session of each listed user.
    pub fn publish_many(&self, user_ids: &[String], payload: &PushPayload) -> usize {
        user_ids
            .iter()
            .map(|user_id| self.publish(user_id, payload))
            .sum()
    }

    /// Sends a payload to every subscribed session.
    pub fn broadcast(&self, payload: &PushPayload) -> usize {
        let routes = self.routes.read();
        routes
            .sessions
            .iter()
            .filter(|(_, entry)| entry.user_id.is_some())
            .filter(|(session_id, entry)| Self::deliver(session_id, entry, payload))
            .count()
    }

    /// Number of live sessions bound to a user.
    pub fn connected_session_count(&self, user_id: &str) -> usize {
        self.routes
            .read()
            .rooms
            .get(user_id)
            .map_or(0, HashSet::len)
    }

    /// Ids of the live sessions bound to a user, sorted.
    pub fn session_ids(&self, user_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .routes
            .read()
            .rooms
            .get(user_id)
            .map(|room| room.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Number of connected sessions, subscribed or not.
    pub fn session_count(&self) -> usize {
        self.routes.read().sessions.len()
    }

    /// Connects a fresh session for `user_id` that disconnects itself when dropped.
    pub fn open_session(self: &Arc<Self>, user_id: &str) -> PushSession {
        let session_id = Uuid::new_v4().to_string();
        let receiver = self.connect(&session_id);
        self.subscribe(&session_id, user_id);

        PushSession {
            session_id,
            user_id: user_id.to_string(),
            receiver,
            registry: Arc::clone(self),
        }
    }

    fn deliver(session_id: &str, entry: &SessionEntry, payload: &PushPayload) -> bool {
        match entry.sender.try_send(payload.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Push queue full for session {}, dropping {}", session_id, payload.id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Session {} is closing, dropping {}", session_id, payload.id);
                false
            }
        }
    }
}

/// A live session handed to a transport handler.
///
/// Dropping it disconnects the session from the registry.
pub struct PushSession {
    session_id: String,
    user_id: String,
    receiver: mpsc::Receiver<PushPayload>,
    registry: Arc<PushRegistry>,
}

impl PushSession {
    /// The generated session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The user this session is bound to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Waits for the next payload. Returns `None` once the session was disconnected.
    pub async fn recv(&mut self) -> Option<PushPayload> {
        self.receiver.recv().await
    }
}

impl Drop for PushSession {
    fn drop(&mut self) {
        self.registry.disconnect(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use notification_store::NotificationType;

    fn payload(title: &str) -> PushPayload {
        PushPayload {
            id: Uuid::new_v4(),
            title: title.to_string(),
            message: "message".to_string(),
            notification_type: NotificationType::General,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_publish_without_sessions_is_noop() {
        let registry = PushRegistry::new(None);
        assert_eq!(registry.publish("nobody", &payload("hello")), 0);
        assert_eq!(registry.connected_session_count("nobody"), 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_every_session_of_user() {
        let registry = PushRegistry::new(None);
        let mut phone = registry.connect("phone");
        let mut laptop = registry.connect("laptop");
        let mut other = registry.connect("other");
        registry.subscribe("phone", "user1");
        registry.subscribe("laptop", "user1");
        registry.subscribe("other", "user2");

        let sent = payload("hello");
        assert_eq!(registry.publish("user1", &sent), 2);
        assert_eq!(registry.connected_session_count("user1"), 2);
        assert_eq!(registry.session_ids("user1"), vec!["laptop", "phone"]);

        assert_eq!(phone.recv().await.unwrap(), sent);
        assert_eq!(laptop.recv().await.unwrap(), sent);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_subscribe_moves_session_between_users() {
        let registry = PushRegistry::new(None);
        let _rx = registry.connect("s1");

        assert!(registry.subscribe("s1", "user1"));
        assert!(registry.subscribe("s1", "user2"));

        assert_eq!(registry.connected_session_count("user1"), 0);
        assert_eq!(registry.connected_session_count("user2"), 1);
    }

    #[test]
    fn test_subscribe_requires_connection() {
        let registry = PushRegistry::new(None);
        assert!(!registry.subscribe("ghost", "user1"));
        assert_eq!(registry.connected_session_count("user1"), 0);
    }

    #[test]
    fn test_unsubscribe_only_matching_user() {
        let registry = PushRegistry::new(None);
        let _rx = registry.connect("s1");
        registry.subscribe("s1", "user1");

        assert!(!registry.unsubscribe("s1", "user2"));
        assert_eq!(registry.connected_session_count("user1"), 1);

        assert!(registry.unsubscribe("s1", "user1"));
        assert_eq!(registry.connected_session_count("user1"), 0);
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let registry = PushRegistry::new(Some(PushConfig { session_buffer: 2 }));
        let mut rx = registry.connect("s1");
        registry.subscribe("s1", "user1");

        assert_eq!(registry.publish("user1", &payload("1")), 1);
        assert_eq!(registry.publish("user1", &payload("2")), 1);
        assert_eq!(registry.publish("user1", &payload("3")), 0);

        assert_eq!(rx.try_recv().unwrap().title, "1");
        assert_eq!(rx.try_recv().unwrap().title, "2");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_and_publish_many() {
        let registry = PushRegistry::new(None);
        let _a = registry.connect("a");
        let _b = registry.connect("b");
        let _idle = registry.connect("idle");
        registry.subscribe("a", "user1");
        registry.subscribe("b", "user2");

        assert_eq!(registry.broadcast(&payload("all")), 2);
        assert_eq!(
            registry.publish_many(&["user1".to_string(), "user3".to_string()], &payload("some")),
            1
        );
    }

    #[tokio::test]
    async fn test_dropping_session_disconnects_it() {
        let registry = Arc::new(PushRegistry::new(None));
        let mut session = registry.open_session("user1");
        assert_eq!(session.user_id(), "user1");
        assert_eq!(registry.connected_session_count("user1"), 1);

        registry.publish("user1", &payload("hi"));
        assert_eq!(session.recv().await.unwrap().title, "hi");

        drop(session);
        assert_eq!(registry.connected_session_count("user1"), 0);
        assert_eq!(registry.session_count(), 0);
    }
}
