//! Room code → live sessions.
//!
//! One reader/writer lock guards the whole map. Fan-out and snapshots take
//! the read side; joins and leaves take the write side, so a room's member
//! set is never observed mid-mutation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use roomcast_core::{RoomCode, SessionId};

use crate::session::Session;

type Members = HashMap<SessionId, Arc<Session>>;

/// Thread-safe mapping from room code to the sessions in that room.
#[derive(Default)]
pub struct Registry {
    rooms: RwLock<HashMap<RoomCode, Members>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session into its room, creating the room on first join.
    pub fn add_to_room(&self, session: Arc<Session>) {
        self.add_to_room_with(session, |_| {});
    }

    /// Insert a session into its room.
    ///
    /// `on_join` runs under the write lock before the insert, with the
    /// members already present. Nothing else can reach the new session until
    /// it returns.
    pub fn add_to_room_with<F>(&self, session: Arc<Session>, on_join: F)
    where
        F: FnOnce(&[Arc<Session>]),
    {
        let mut rooms = self.rooms.write();
        let members = rooms.entry(session.room().clone()).or_default();
        let others: Vec<Arc<Session>> = members.values().cloned().collect();
        on_join(&others);
        let _ = members.insert(session.id().clone(), session);
    }

    /// Remove a session. Returns it if it was present.
    ///
    /// Deletes the room entry once its last member leaves. Removing an absent
    /// session is a no-op, which makes unregistration idempotent.
    pub fn remove_from_room(&self, code: &RoomCode, id: &SessionId) -> Option<Arc<Session>> {
        let mut rooms = self.rooms.write();
        let members = rooms.get_mut(code)?;
        let removed = members.remove(id);
        if members.is_empty() {
            let _ = rooms.remove(code);
        }
        removed
    }

    /// Point-in-time copy of a room's members, in no particular order.
    pub fn snapshot(&self, code: &RoomCode) -> Vec<Arc<Session>> {
        self.rooms
            .read()
            .get(code)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Visit every member of a room while holding the read lock.
    ///
    /// `f` must not block and must not touch the registry.
    pub fn for_each_in_room<F>(&self, code: &RoomCode, mut f: F)
    where
        F: FnMut(&Arc<Session>),
    {
        let rooms = self.rooms.read();
        if let Some(members) = rooms.get(code) {
            members.values().for_each(&mut f);
        }
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Number of sessions across all rooms.
    pub fn session_count(&self) -> usize {
        self.rooms.read().values().map(HashMap::len).sum()
    }

    /// Number of sessions in one room.
    pub fn room_len(&self, code: &RoomCode) -> usize {
        self.rooms.read().get(code).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_core::Identity;
    use tokio_util::sync::CancellationToken;

    fn make_session(user_id: i64, room: &str) -> Arc<Session> {
        let (session, _rx) = Session::new(
            Identity::new(user_id, format!("user{user_id}"), "participant"),
            RoomCode::new(room),
            8,
            &CancellationToken::new(),
        );
        session
    }

    #[test]
    fn add_and_snapshot() {
        let registry = Registry::new();
        let a = make_session(1, "R1");
        let b = make_session(2, "R1");
        registry.add_to_room(a);
        registry.add_to_room(b);

        let snap = registry.snapshot(&RoomCode::new("R1"));
        assert_eq!(snap.len(), 2);
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.session_count(), 2);
    }

    #[test]
    fn rooms_are_isolated() {
        let registry = Registry::new();
        registry.add_to_room(make_session(1, "R1"));
        registry.add_to_room(make_session(2, "R2"));

        assert_eq!(registry.room_len(&RoomCode::new("R1")), 1);
        assert_eq!(registry.room_len(&RoomCode::new("R2")), 1);
        assert_eq!(registry.room_count(), 2);
    }

    #[test]
    fn snapshot_of_unknown_room_is_empty() {
        let registry = Registry::new();
        assert!(registry.snapshot(&RoomCode::new("nope")).is_empty());
        assert_eq!(registry.room_len(&RoomCode::new("nope")), 0);
    }

    #[test]
    fn remove_returns_session_once() {
        let registry = Registry::new();
        let a = make_session(1, "R1");
        let b = make_session(2, "R1");
        let room = a.room().clone();
        let a_id = a.id().clone();
        registry.add_to_room(a);
        registry.add_to_room(b);

        assert!(registry.remove_from_room(&room, &a_id).is_some());
        assert!(registry.remove_from_room(&room, &a_id).is_none());
        assert_eq!(registry.room_len(&room), 1);
    }

    #[test]
    fn last_leave_deletes_room() {
        let registry = Registry::new();
        let a = make_session(1, "R1");
        let room = a.room().clone();
        let id = a.id().clone();
        registry.add_to_room(a);
        assert_eq!(registry.room_count(), 1);

        let _ = registry.remove_from_room(&room, &id);
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn remove_from_unknown_room_is_noop() {
        let registry = Registry::new();
        let removed = registry.remove_from_room(&RoomCode::new("x"), &SessionId::new());
        assert!(removed.is_none());
    }

    #[test]
    fn on_join_sees_existing_members_only() {
        let registry = Registry::new();
        registry.add_to_room(make_session(1, "R1"));
        registry.add_to_room(make_session(2, "R1"));
        registry.add_to_room(make_session(3, "R2"));

        let mut seen = Vec::new();
        registry.add_to_room_with(make_session(4, "R1"), |others| {
            seen = others.iter().map(|s| s.identity().id).collect();
        });
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(registry.room_len(&RoomCode::new("R1")), 3);
    }

    #[test]
    fn for_each_visits_room_members() {
        let registry = Registry::new();
        registry.add_to_room(make_session(1, "R1"));
        registry.add_to_room(make_session(2, "R1"));
        registry.add_to_room(make_session(3, "R2"));

        let mut visited = 0;
        registry.for_each_in_room(&RoomCode::new("R1"), |_| visited += 1);
        assert_eq!(visited, 2);

        registry.for_each_in_room(&RoomCode::new("missing"), |_| visited += 1);
        assert_eq!(visited, 2);
    }
}
