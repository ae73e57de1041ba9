//! Pure data operations on the rooms table, grounded on
//! `original_source/room.py`. Every operation returns a `RoomError` variant
//! instead of the original's `{"status": "N"}` dictionary.
//!
//! This module only touches `Room`/`RoomsTable` state; it never performs
//! network I/O. The caller (the handler) is responsible for taking the
//! `ServerState` lock, calling these methods, dropping the lock, and only
//! then sending packets on the `Connection`s these methods return.

use indexmap::IndexMap;
use protocol::{GameState, UserProfile};
use rand::seq::IteratorRandom;

use crate::connection::Connection;
use crate::error::RoomError;

pub struct RoomUser {
    pub profile: UserProfile,
    pub connection: Connection,
}

pub struct Room {
    pub id: String,
    pub host: Option<i32>,
    pub state: GameState,
    pub live: bool,
    pub locked: bool,
    pub cycle: bool,
    pub users: IndexMap<i32, RoomUser>,
    pub monitors: std::collections::HashSet<i32>,
    pub chart: Option<i32>,
    pub ready: std::collections::HashSet<i32>,
    pub max_users: Option<usize>,
    pub contest_mode: bool,
    pub whitelist: Vec<i32>,
}

impl Room {
    fn new(id: String, host: i32) -> Self {
        Self {
            id,
            host: Some(host),
            state: GameState::SelectChart { chart_id: None },
            live: false,
            locked: false,
            cycle: false,
            users: IndexMap::new(),
            monitors: std::collections::HashSet::new(),
            chart: None,
            ready: std::collections::HashSet::new(),
            max_users: None,
            contest_mode: false,
            whitelist: Vec::new(),
        }
    }

    /// Every non-monitor member's `UserProfile`, insertion order.
    pub fn user_profiles(&self) -> Vec<UserProfile> {
        self.users.values().map(|u| u.profile.clone()).collect()
    }

    pub fn monitor_profiles(&self) -> Vec<UserProfile> {
        self.monitors
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.profile.clone()))
            .collect()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.users.values().map(|u| &u.connection)
    }
}

/// Result of removing the departing user from a room, already reflecting
/// the mandatory pre-removal snapshot described in SPEC_FULL §4.F: the host
/// transfer decision is made *before* the user is removed, so the random
/// draw for a new host never excludes a valid candidate or runs empty.
pub enum LeaveOutcome {
    RoomDestroyed,
    HostTransferred { new_host: i32 },
    NoHostChange,
}

#[derive(Default)]
pub struct RoomsTable {
    rooms: IndexMap<String, Room>,
}

impl RoomsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&mut self, room_id: &str, host_profile: &UserProfile) -> Result<(), RoomError> {
        if self.rooms.contains_key(room_id) {
            return Err(RoomError::RoomExists);
        }
        self.rooms
            .insert(room_id.to_string(), Room::new(room_id.to_string(), host_profile.user_id));
        Ok(())
    }

    pub fn add_user(
        &mut self,
        room_id: &str,
        profile: UserProfile,
        connection: Connection,
    ) -> Result<(), RoomError> {
        let room = self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if room.users.contains_key(&profile.user_id) {
            return Err(RoomError::UserExists);
        }
        room.users.insert(profile.user_id, RoomUser { profile, connection });
        Ok(())
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// First (and by the single-room invariant, only) room containing `user_id`.
    pub fn room_of_user(&self, user_id: i32) -> Option<&str> {
        self.rooms
            .values()
            .find(|room| room.users.contains_key(&user_id))
            .map(|room| room.id.as_str())
    }

    pub fn destroy_room(&mut self, room_id: &str) {
        self.rooms.shift_remove(room_id);
    }

    pub fn set_state(&mut self, room_id: &str, state: GameState) -> Result<(), RoomError> {
        self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?.state = state;
        Ok(())
    }

    pub fn set_chart(&mut self, room_id: &str, chart_id: i32) -> Result<(), RoomError> {
        self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?.chart = Some(chart_id);
        Ok(())
    }

    pub fn set_cycle(&mut self, room_id: &str, cycle: bool) -> Result<(), RoomError> {
        self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?.cycle = cycle;
        Ok(())
    }

    pub fn toggle_lock(&mut self, room_id: &str) -> Result<bool, RoomError> {
        let room = self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        room.locked = !room.locked;
        Ok(room.locked)
    }

    pub fn set_max_users(&mut self, room_id: &str, max_users: Option<usize>) -> Result<(), RoomError> {
        self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?.max_users = max_users;
        Ok(())
    }

    /// Reserved: accepts a global monitor onto a room's monitor set. Per the
    /// Open Question carried from `original_source/main.py`'s `handleJoinRoom`,
    /// the handler currently never calls this on the accept path — it is
    /// provided for admin tooling and future use, preserving the no-op the
    /// original leaves on the hot path.
    pub fn add_monitor(&mut self, room_id: &str, user_id: i32) -> Result<(), RoomError> {
        let room = self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        room.monitors.insert(user_id);
        room.live = true;
        Ok(())
    }

    pub fn remove_monitor(&mut self, room_id: &str, user_id: i32) -> Result<(), RoomError> {
        let room = self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        room.monitors.remove(&user_id);
        Ok(())
    }

    /// Executes the host-transfer protocol for a user leaving `room_id`.
    /// Snapshots the pre-leave state (is this user host? who else is here?)
    /// before mutating, per the mandatory ordering in SPEC_FULL §4.F.
    pub fn remove_user_with_host_transfer(
        &mut self,
        room_id: &str,
        user_id: i32,
    ) -> Result<LeaveOutcome, RoomError> {
        let room = self.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if !room.users.contains_key(&user_id) {
            return Err(RoomError::UserNotFound);
        }

        let was_host = room.host == Some(user_id);
        let candidates: Vec<i32> = room
            .users
            .keys()
            .copied()
            .filter(|id| *id != user_id && !room.monitors.contains(id))
            .collect();
        let new_host = if was_host {
            candidates.into_iter().choose(&mut rand::rng())
        } else {
            None
        };

        room.users.shift_remove(&user_id);
        room.monitors.remove(&user_id);
        room.ready.remove(&user_id);

        if room.users.is_empty() {
            self.destroy_room(room_id);
            return Ok(LeaveOutcome::RoomDestroyed);
        }

        if let Some(new_host_id) = new_host {
            let room = self.rooms.get_mut(room_id).expect("room still present");
            room.host = Some(new_host_id);
            Ok(LeaveOutcome::HostTransferred { new_host: new_host_id })
        } else {
            Ok(LeaveOutcome::NoHostChange)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};

    async fn dummy_connection() -> Connection {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stream, _) = tokio::join!(listener.accept(), TcpStream::connect(addr));
        let (server_stream, _) = stream.unwrap();
        let (_r, w) = server_stream.into_split();
        Connection::spawn(
            w,
            "127.0.0.1:1".parse::<SocketAddr>().unwrap(),
            crate::connection::ConnectionConfig {
                high_water_mark: 8,
                drain_timeout: Duration::from_millis(50),
            },
        )
    }

    #[tokio::test]
    async fn create_then_add_user_then_fetch() {
        let mut table = RoomsTable::new();
        let alice = UserProfile::new(1, "Alice");
        table.create_room("R1", &alice).unwrap();
        assert_eq!(table.create_room("R1", &alice), Err(RoomError::RoomExists));

        let conn = dummy_connection().await;
        table.add_user("R1", alice.clone(), conn.clone()).unwrap();
        assert_eq!(
            table.add_user("R1", alice.clone(), conn),
            Err(RoomError::UserExists)
        );
        assert_eq!(table.room_of_user(1), Some("R1"));
    }

    #[tokio::test]
    async fn host_leaves_with_one_remaining_member_transfers_host() {
        let mut table = RoomsTable::new();
        let alice = UserProfile::new(1, "Alice");
        let bob = UserProfile::new(2, "Bob");
        table.create_room("R1", &alice).unwrap();
        table.add_user("R1", alice.clone(), dummy_connection().await).unwrap();
        table.add_user("R1", bob.clone(), dummy_connection().await).unwrap();

        let outcome = table.remove_user_with_host_transfer("R1", 1).unwrap();
        assert!(matches!(outcome, LeaveOutcome::HostTransferred { new_host: 2 }));
        assert_eq!(table.get("R1").unwrap().host, Some(2));
        assert_eq!(table.room_of_user(1), None);
    }

    #[tokio::test]
    async fn last_member_leaving_destroys_the_room() {
        let mut table = RoomsTable::new();
        let alice = UserProfile::new(1, "Alice");
        table.create_room("R1", &alice).unwrap();
        table.add_user("R1", alice.clone(), dummy_connection().await).unwrap();

        let outcome = table.remove_user_with_host_transfer("R1", 1).unwrap();
        assert!(matches!(outcome, LeaveOutcome::RoomDestroyed));
        assert!(table.get("R1").is_none());
    }

    #[tokio::test]
    async fn non_host_leaving_does_not_change_host() {
        let mut table = RoomsTable::new();
        let alice = UserProfile::new(1, "Alice");
        let bob = UserProfile::new(2, "Bob");
        table.create_room("R1", &alice).unwrap();
        table.add_user("R1", alice.clone(), dummy_connection().await).unwrap();
        table.add_user("R1", bob.clone(), dummy_connection().await).unwrap();

        let outcome = table.remove_user_with_host_transfer("R1", 2).unwrap();
        assert!(matches!(outcome, LeaveOutcome::NoHostChange));
        assert_eq!(table.get("R1").unwrap().host, Some(1));
    }
}
