//! Maps decoded serverbound packets onto room-model operations and outbound
//! sends. Grounded on `original_source/main.py`'s `handle*` functions — one
//! method here per packet kind, same order of side effects.

use protocol::{
    AuthenticateResult, ChatMessage, ClientBoundPacket, FullUserProfile, GameState, JoinRoomResult,
    RoomInfo, RoomOpResult, ServerBoundPacket, UserProfile,
};

use crate::connection::Connection;
use crate::error::{AuthError, RoomError};
use crate::eventbus::Event;
use crate::i10n;
use crate::room::LeaveOutcome;
use crate::state::ServerState;

/// Per-connection handler. Holds the one piece of state that outlives a
/// single packet: the authenticated profile, once known.
pub struct Handler {
    state: ServerState,
    conn: Connection,
    profile: Option<UserProfile>,
}

impl Handler {
    pub fn new(state: ServerState, conn: Connection) -> Self {
        Self {
            state,
            conn,
            profile: None,
        }
    }

    pub fn user_id(&self) -> Option<i32> {
        self.profile.as_ref().map(|p| p.user_id)
    }

    /// Dispatches one decoded packet. Returns `false` when the connection
    /// must close as a result (auth failure, unauthenticated use of an
    /// authenticated-only packet).
    pub async fn handle(&mut self, packet: ServerBoundPacket) -> bool {
        match packet {
            ServerBoundPacket::Authenticate { token } => self.handle_authenticate(token).await,
            ServerBoundPacket::CreateRoom { room_id } => {
                if self.profile.is_none() {
                    return false;
                }
                self.handle_create_room(room_id).await;
                true
            }
            ServerBoundPacket::JoinRoom { room_id } => {
                if self.profile.is_none() {
                    return false;
                }
                self.handle_join_room(room_id).await;
                true
            }
            ServerBoundPacket::LeaveRoom => {
                if self.profile.is_none() {
                    return false;
                }
                self.handle_leave_room().await;
                true
            }
            ServerBoundPacket::SelectChart { chart_id } => {
                if self.profile.is_none() {
                    return false;
                }
                self.handle_select_chart(chart_id).await;
                true
            }
            ServerBoundPacket::RequestStart => {
                if self.profile.is_none() {
                    return false;
                }
                self.handle_request_start().await;
                true
            }
        }
    }

    async fn handle_authenticate(&mut self, token: String) -> bool {
        match self.state.identity().resolve(&token).await {
            Ok(profile) => {
                if let Some(ban) = self
                    .state
                    .security()
                    .lock()
                    .await
                    .is_banned(crate::security::BanType::Id, &profile.user_id.to_string())
                {
                    self.conn.send(&ClientBoundPacket::AuthenticateResult(AuthenticateResult::Failed {
                        reason: AuthError::Banned(ban.reason).to_string(),
                    }));
                    return false;
                }

                let monitor = self.state.is_monitor(profile.user_id);
                self.state
                    .online()
                    .lock()
                    .await
                    .insert(profile.user_id, self.conn.clone());

                let existing_room = {
                    let rooms = self.state.rooms().lock().await;
                    rooms.room_of_user(profile.user_id).map(|id| id.to_string())
                };
                let room_info = match existing_room {
                    Some(room_id) => {
                        let rooms = self.state.rooms().lock().await;
                        rooms.get(&room_id).map(|room| RoomInfo {
                            room_id: room.id.clone(),
                            state: room.state,
                            live: room.live,
                            locked: room.locked,
                            cycle: room.cycle,
                            is_host: room.host == Some(profile.user_id),
                            is_ready: room.ready.contains(&profile.user_id),
                            users: room.user_profiles(),
                            monitors: room.monitor_profiles(),
                        })
                    }
                    None => None,
                };

                self.conn
                    .send(&ClientBoundPacket::AuthenticateResult(AuthenticateResult::Success {
                        profile: FullUserProfile::new(profile.clone(), monitor),
                        room: room_info,
                    }));
                for line in welcome_lines(&profile.username) {
                    self.conn.send(&ClientBoundPacket::Message(ChatMessage::system(line)));
                }
                self.profile = Some(profile);
                true
            }
            Err(e) => {
                self.conn.send(&ClientBoundPacket::AuthenticateResult(AuthenticateResult::Failed {
                    reason: e.to_string(),
                }));
                false
            }
        }
    }

    async fn handle_create_room(&mut self, room_id: String) {
        let Some(profile) = self.profile.clone() else { return };
        let mut rooms = self.state.rooms().lock().await;
        if rooms.room_of_user(profile.user_id).is_some() {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::CreateRoomResult(RoomOpResult::Failed {
                reason: i10n::text("user_already_exist").to_string(),
            }));
            return;
        }
        match rooms.create_room(&room_id, &profile) {
            Ok(()) => {
                rooms
                    .add_user(&room_id, profile.clone(), self.conn.clone())
                    .expect("just created, cannot already contain a user");
                drop(rooms);
                self.state.events().emit(Event::RoomCreated {
                    room_id: room_id.clone(),
                });
                self.state.events().emit(Event::PlayerJoined {
                    room_id,
                    user_id: profile.user_id,
                });
                self.conn.send(&ClientBoundPacket::CreateRoomResult(RoomOpResult::Success));
            }
            Err(RoomError::RoomExists) => {
                self.conn.send(&ClientBoundPacket::CreateRoomResult(RoomOpResult::Failed {
                    reason: i10n::text("room_already_exist").to_string(),
                }));
            }
            Err(_) => unreachable!("create_room only returns RoomExists"),
        }
    }

    async fn handle_join_room(&mut self, room_id: String) {
        let Some(profile) = self.profile.clone() else { return };

        if self.state.is_monitor(profile.user_id) {
            // TODO: original_source's handleJoinRoom never calls addMonitor
            // here either — preserved as a no-op rather than invented.
            return;
        }

        let mut rooms = self.state.rooms().lock().await;
        if rooms.room_of_user(profile.user_id).is_some() {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::JoinRoomResult(JoinRoomResult::Failed {
                reason: i10n::text("user_already_exist").to_string(),
            }));
            return;
        }
        match rooms.add_user(&room_id, profile.clone(), self.conn.clone()) {
            Ok(()) => {
                let room = rooms.get(&room_id).expect("just inserted");
                let state = room.state;
                let participants = FullUserProfile::from_lists(&room.user_profiles(), &room.monitor_profiles());
                let is_live = room.live;
                let others: Vec<Connection> = room
                    .connections()
                    .filter(|c| **c != self.conn)
                    .cloned()
                    .collect();
                drop(rooms);

                self.conn.send(&ClientBoundPacket::JoinRoomResult(JoinRoomResult::Success {
                    state,
                    participants,
                    is_live,
                }));
                for peer in &others {
                    peer.send(&ClientBoundPacket::OnJoinRoom {
                        profile: profile.clone(),
                        monitor: false,
                    });
                }
                self.state.events().emit(Event::PlayerJoined {
                    room_id,
                    user_id: profile.user_id,
                });
            }
            Err(e) => {
                let reason = match e {
                    RoomError::RoomNotFound => i10n::text("room_not_exist"),
                    RoomError::UserExists => i10n::text("user_already_exist"),
                    _ => unreachable!("add_user only returns RoomNotFound or UserExists"),
                };
                self.conn.send(&ClientBoundPacket::JoinRoomResult(JoinRoomResult::Failed {
                    reason: reason.to_string(),
                }));
            }
        }
    }

    async fn handle_leave_room(&mut self) {
        let Some(profile) = self.profile.clone() else { return };
        let mut rooms = self.state.rooms().lock().await;
        let Some(room_id) = rooms.room_of_user(profile.user_id).map(str::to_string) else {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::LeaveRoomResult(RoomOpResult::Failed {
                reason: i10n::text("not_in_room").to_string(),
            }));
            return;
        };

        let outcome = rooms
            .remove_user_with_host_transfer(&room_id, profile.user_id)
            .expect("room_of_user just confirmed membership");

        let peers: Vec<Connection> = match &outcome {
            LeaveOutcome::RoomDestroyed => Vec::new(),
            _ => rooms
                .get(&room_id)
                .map(|room| room.connections().cloned().collect())
                .unwrap_or_default(),
        };
        drop(rooms);

        self.conn.send(&ClientBoundPacket::LeaveRoomResult(RoomOpResult::Success));

        let leave_message = ChatMessage::LeaveRoom {
            user_id: profile.user_id,
            username: profile.username.clone(),
        };
        for peer in &peers {
            peer.send(&ClientBoundPacket::Message(leave_message.clone()));
        }

        match outcome {
            LeaveOutcome::RoomDestroyed => {
                self.state.events().emit(Event::RoomDestroyed { room_id: room_id.clone() });
            }
            LeaveOutcome::HostTransferred { new_host } => {
                let online = self.state.online().lock().await;
                if let Some(conn) = online.get(&new_host) {
                    conn.send(&ClientBoundPacket::ChangeHost { is_host: true });
                }
            }
            LeaveOutcome::NoHostChange => {}
        }
        self.state.events().emit(Event::PlayerLeft {
            room_id,
            user_id: profile.user_id,
        });
    }

    async fn handle_select_chart(&mut self, chart_id: i32) {
        let Some(profile) = self.profile.clone() else { return };
        let mut rooms = self.state.rooms().lock().await;
        let Some(room_id) = rooms.room_of_user(profile.user_id).map(str::to_string) else {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::SelectChartResult(RoomOpResult::Failed {
                reason: i10n::text("not_in_room").to_string(),
            }));
            return;
        };
        let room = rooms.get(&room_id).expect("just located");
        if room.host != Some(profile.user_id) {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::SelectChartResult(RoomOpResult::Failed {
                reason: i10n::text("not_host").to_string(),
            }));
            return;
        }

        rooms.set_chart(&room_id, chart_id).expect("room just located");
        rooms
            .set_state(&room_id, GameState::SelectChart { chart_id: Some(chart_id) })
            .expect("room just located");
        let peers: Vec<Connection> = rooms
            .get(&room_id)
            .map(|room| room.connections().cloned().collect())
            .unwrap_or_default();
        drop(rooms);

        for peer in &peers {
            peer.send(&ClientBoundPacket::ChangeState {
                state: GameState::SelectChart { chart_id: Some(chart_id) },
            });
            peer.send(&ClientBoundPacket::Message(ChatMessage::SelectChart {
                user_id: profile.user_id,
                username: profile.username.clone(),
                chart_id,
            }));
        }
        self.conn.send(&ClientBoundPacket::SelectChartResult(RoomOpResult::Success));
    }

    async fn handle_request_start(&mut self) {
        let Some(profile) = self.profile.clone() else { return };
        let mut rooms = self.state.rooms().lock().await;
        let Some(room_id) = rooms.room_of_user(profile.user_id).map(str::to_string) else {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::RequestStartResult(RoomOpResult::Failed {
                reason: i10n::text("not_in_room").to_string(),
            }));
            return;
        };
        let room = rooms.get(&room_id).expect("just located");
        if room.host != Some(profile.user_id) {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::RequestStartResult(RoomOpResult::Failed {
                reason: i10n::text("not_host").to_string(),
            }));
            return;
        }
        if !matches!(room.state, GameState::SelectChart { .. }) {
            drop(rooms);
            self.conn.send(&ClientBoundPacket::RequestStartResult(RoomOpResult::Failed {
                reason: i10n::text("not_select_chart").to_string(),
            }));
            return;
        }

        rooms
            .set_state(&room_id, GameState::WaitForReady)
            .expect("room just located");
        let peers: Vec<Connection> = rooms
            .get(&room_id)
            .map(|room| room.connections().cloned().collect())
            .unwrap_or_default();
        drop(rooms);

        for peer in &peers {
            peer.send(&ClientBoundPacket::ChangeState { state: GameState::WaitForReady });
        }
        self.conn.send(&ClientBoundPacket::RequestStartResult(RoomOpResult::Success));
    }

    /// Invoked once from the connection's close hook. Removes the user from
    /// the online table and, if they were in a room, runs the same
    /// host-transfer-and-broadcast sequence as an explicit `LeaveRoom`.
    pub async fn on_disconnect(&mut self) {
        let Some(profile) = self.profile.take() else { return };
        self.state.online().lock().await.remove(&profile.user_id);

        let mut rooms = self.state.rooms().lock().await;
        let Some(room_id) = rooms.room_of_user(profile.user_id).map(str::to_string) else {
            return;
        };
        let outcome = rooms
            .remove_user_with_host_transfer(&room_id, profile.user_id)
            .expect("room_of_user just confirmed membership");
        let peers: Vec<Connection> = match &outcome {
            LeaveOutcome::RoomDestroyed => Vec::new(),
            _ => rooms
                .get(&room_id)
                .map(|room| room.connections().cloned().collect())
                .unwrap_or_default(),
        };
        drop(rooms);

        let leave_message = ChatMessage::LeaveRoom {
            user_id: profile.user_id,
            username: profile.username.clone(),
        };
        for peer in &peers {
            peer.send(&ClientBoundPacket::Message(leave_message.clone()));
        }

        match outcome {
            LeaveOutcome::RoomDestroyed => {
                self.state.events().emit(Event::RoomDestroyed { room_id: room_id.clone() });
            }
            LeaveOutcome::HostTransferred { new_host } => {
                let online = self.state.online().lock().await;
                if let Some(conn) = online.get(&new_host) {
                    conn.send(&ClientBoundPacket::ChangeHost { is_host: true });
                }
            }
            LeaveOutcome::NoHostChange => {}
        }
        self.state.events().emit(Event::PlayerLeft { room_id, user_id: profile.user_id });
    }
}

fn welcome_lines(username: &str) -> [String; 4] {
    [
        format!("Welcome, {username}!"),
        "Use /help on the client for a list of commands.".to_string(),
        "This server is provided as-is, with no uptime guarantee.".to_string(),
        "Have fun!".to_string(),
    ]
}
