//! Packet types and the id <-> type registry.
//!
//! This is the only place packet ids are assigned. Serverbound and
//! clientbound ids are independent spaces. Each top-level packet is a Rust
//! enum rather than the original's dynamically-attached `Success`/`Failed`
//! nested classes — one encoder per variant, matched exhaustively.

use crate::byte_buf::ByteBuf;
use crate::chat::ChatMessage;
use crate::error::{CodecError, CodecResult};
use crate::game_state::GameState;
use crate::room_info::RoomInfo;
use crate::user::{FullUserProfile, UserProfile};

/// A plain success/failure result for the packets that carry no extra
/// payload beyond the reason string on failure (LeaveRoom, SelectChart,
/// RequestStart, CreateRoom).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomOpResult {
    Success,
    Failed { reason: String },
}

impl RoomOpResult {
    const TAG_FAILED: u8 = 0x00;
    const TAG_SUCCESS: u8 = 0x01;

    pub fn encode(&self, buf: &mut ByteBuf) {
        match self {
            RoomOpResult::Success => buf.write_byte(Self::TAG_SUCCESS),
            RoomOpResult::Failed { reason } => {
                buf.write_byte(Self::TAG_FAILED);
                buf.write_string(reason);
            }
        }
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        match buf.read_unsigned_byte()? {
            Self::TAG_SUCCESS => Ok(RoomOpResult::Success),
            Self::TAG_FAILED => Ok(RoomOpResult::Failed {
                reason: buf.read_string()?,
            }),
            _other => Err(CodecError::Malformed("unknown result tag")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticateResult {
    Success {
        profile: FullUserProfile,
        room: Option<RoomInfo>,
    },
    Failed {
        reason: String,
    },
}

impl AuthenticateResult {
    pub fn encode(&self, buf: &mut ByteBuf) {
        match self {
            AuthenticateResult::Success { profile, room } => {
                buf.write_byte(RoomOpResult::TAG_SUCCESS);
                profile.encode(buf);
                buf.write_bool(room.is_some());
                if let Some(room) = room {
                    room.encode(buf);
                }
            }
            AuthenticateResult::Failed { reason } => {
                buf.write_byte(RoomOpResult::TAG_FAILED);
                buf.write_string(reason);
            }
        }
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        match buf.read_unsigned_byte()? {
            RoomOpResult::TAG_SUCCESS => {
                let profile = FullUserProfile::decode(buf)?;
                let room = if buf.read_bool()? {
                    Some(RoomInfo::decode(buf)?)
                } else {
                    None
                };
                Ok(AuthenticateResult::Success { profile, room })
            }
            RoomOpResult::TAG_FAILED => Ok(AuthenticateResult::Failed {
                reason: buf.read_string()?,
            }),
            _other => Err(CodecError::Malformed("unknown result tag")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinRoomResult {
    Success {
        state: GameState,
        participants: Vec<FullUserProfile>,
        is_live: bool,
    },
    Failed {
        reason: String,
    },
}

impl JoinRoomResult {
    pub fn encode(&self, buf: &mut ByteBuf) {
        match self {
            JoinRoomResult::Success {
                state,
                participants,
                is_live,
            } => {
                buf.write_byte(RoomOpResult::TAG_SUCCESS);
                state.encode(buf);
                buf.write_varint(participants.len() as u32);
                for p in participants {
                    p.encode(buf);
                }
                buf.write_bool(*is_live);
            }
            JoinRoomResult::Failed { reason } => {
                buf.write_byte(RoomOpResult::TAG_FAILED);
                buf.write_string(reason);
            }
        }
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        match buf.read_unsigned_byte()? {
            RoomOpResult::TAG_SUCCESS => {
                let state = GameState::decode(buf)?;
                let count = buf.read_varint()?;
                let mut participants = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    participants.push(FullUserProfile::decode(buf)?);
                }
                let is_live = buf.read_bool()?;
                Ok(JoinRoomResult::Success {
                    state,
                    participants,
                    is_live,
                })
            }
            RoomOpResult::TAG_FAILED => Ok(JoinRoomResult::Failed {
                reason: buf.read_string()?,
            }),
            _other => Err(CodecError::Malformed("unknown result tag")),
        }
    }
}

/// Packets a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerBoundPacket {
    Authenticate { token: String },
    CreateRoom { room_id: String },
    JoinRoom { room_id: String },
    LeaveRoom,
    SelectChart { chart_id: i32 },
    RequestStart,
}

/// Packets the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientBoundPacket {
    AuthenticateResult(AuthenticateResult),
    CreateRoomResult(RoomOpResult),
    JoinRoomResult(JoinRoomResult),
    LeaveRoomResult(RoomOpResult),
    SelectChartResult(RoomOpResult),
    RequestStartResult(RoomOpResult),
    OnJoinRoom { profile: UserProfile, monitor: bool },
    /// Registered and encodable/decodable, but never sent by the handler —
    /// the handler broadcasts `Message(ChatMessage::LeaveRoom)` instead. See
    /// the Open Questions in SPEC_FULL.md section 9.
    OnLeaveRoom { profile: UserProfile },
    ChangeHost { is_host: bool },
    ChangeState { state: GameState },
    Message(ChatMessage),
}

mod ids {
    pub mod serverbound {
        pub const AUTHENTICATE: u8 = 0x00;
        pub const CREATE_ROOM: u8 = 0x01;
        pub const JOIN_ROOM: u8 = 0x02;
        pub const LEAVE_ROOM: u8 = 0x03;
        pub const SELECT_CHART: u8 = 0x04;
        pub const REQUEST_START: u8 = 0x05;
    }

    pub mod clientbound {
        pub const AUTHENTICATE_RESULT: u8 = 0x00;
        pub const CREATE_ROOM_RESULT: u8 = 0x01;
        pub const JOIN_ROOM_RESULT: u8 = 0x02;
        pub const LEAVE_ROOM_RESULT: u8 = 0x03;
        pub const SELECT_CHART_RESULT: u8 = 0x04;
        pub const REQUEST_START_RESULT: u8 = 0x05;
        pub const ON_JOIN_ROOM: u8 = 0x06;
        pub const ON_LEAVE_ROOM: u8 = 0x07;
        pub const CHANGE_HOST: u8 = 0x08;
        pub const CHANGE_STATE: u8 = 0x09;
        pub const MESSAGE: u8 = 0x0a;
    }
}

impl ServerBoundPacket {
    pub fn decode(frame: &mut ByteBuf) -> CodecResult<Self> {
        let id = frame.read_unsigned_byte()?;
        use ids::serverbound::*;
        match id {
            AUTHENTICATE => Ok(ServerBoundPacket::Authenticate {
                token: frame.read_string()?,
            }),
            CREATE_ROOM => Ok(ServerBoundPacket::CreateRoom {
                room_id: frame.read_string()?,
            }),
            JOIN_ROOM => Ok(ServerBoundPacket::JoinRoom {
                room_id: frame.read_string()?,
            }),
            LEAVE_ROOM => Ok(ServerBoundPacket::LeaveRoom),
            SELECT_CHART => Ok(ServerBoundPacket::SelectChart {
                chart_id: frame.read_i32()?,
            }),
            REQUEST_START => Ok(ServerBoundPacket::RequestStart),
            other => Err(CodecError::UnknownPacketId(other)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = ByteBuf::new();
        use ids::serverbound::*;
        match self {
            ServerBoundPacket::Authenticate { token } => {
                buf.write_byte(AUTHENTICATE);
                buf.write_string(token);
            }
            ServerBoundPacket::CreateRoom { room_id } => {
                buf.write_byte(CREATE_ROOM);
                buf.write_string(room_id);
            }
            ServerBoundPacket::JoinRoom { room_id } => {
                buf.write_byte(JOIN_ROOM);
                buf.write_string(room_id);
            }
            ServerBoundPacket::LeaveRoom => buf.write_byte(LEAVE_ROOM),
            ServerBoundPacket::SelectChart { chart_id } => {
                buf.write_byte(SELECT_CHART);
                buf.write_i32(*chart_id);
            }
            ServerBoundPacket::RequestStart => buf.write_byte(REQUEST_START),
        }
        buf.into_vec()
    }
}

impl ClientBoundPacket {
    pub fn decode(frame: &mut ByteBuf) -> CodecResult<Self> {
        let id = frame.read_unsigned_byte()?;
        use ids::clientbound::*;
        match id {
            AUTHENTICATE_RESULT => Ok(ClientBoundPacket::AuthenticateResult(
                AuthenticateResult::decode(frame)?,
            )),
            CREATE_ROOM_RESULT => Ok(ClientBoundPacket::CreateRoomResult(RoomOpResult::decode(
                frame,
            )?)),
            JOIN_ROOM_RESULT => Ok(ClientBoundPacket::JoinRoomResult(JoinRoomResult::decode(
                frame,
            )?)),
            LEAVE_ROOM_RESULT => Ok(ClientBoundPacket::LeaveRoomResult(RoomOpResult::decode(
                frame,
            )?)),
            SELECT_CHART_RESULT => Ok(ClientBoundPacket::SelectChartResult(RoomOpResult::decode(
                frame,
            )?)),
            REQUEST_START_RESULT => Ok(ClientBoundPacket::RequestStartResult(
                RoomOpResult::decode(frame)?,
            )),
            ON_JOIN_ROOM => {
                let profile = UserProfile::decode(frame)?;
                let monitor = frame.read_bool()?;
                Ok(ClientBoundPacket::OnJoinRoom { profile, monitor })
            }
            ON_LEAVE_ROOM => Ok(ClientBoundPacket::OnLeaveRoom {
                profile: UserProfile::decode(frame)?,
            }),
            CHANGE_HOST => Ok(ClientBoundPacket::ChangeHost {
                is_host: frame.read_bool()?,
            }),
            CHANGE_STATE => Ok(ClientBoundPacket::ChangeState {
                state: GameState::decode(frame)?,
            }),
            MESSAGE => Ok(ClientBoundPacket::Message(ChatMessage::decode(frame)?)),
            other => Err(CodecError::UnknownPacketId(other)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = ByteBuf::new();
        use ids::clientbound::*;
        match self {
            ClientBoundPacket::AuthenticateResult(r) => {
                buf.write_byte(AUTHENTICATE_RESULT);
                r.encode(&mut buf);
            }
            ClientBoundPacket::CreateRoomResult(r) => {
                buf.write_byte(CREATE_ROOM_RESULT);
                r.encode(&mut buf);
            }
            ClientBoundPacket::JoinRoomResult(r) => {
                buf.write_byte(JOIN_ROOM_RESULT);
                r.encode(&mut buf);
            }
            ClientBoundPacket::LeaveRoomResult(r) => {
                buf.write_byte(LEAVE_ROOM_RESULT);
                r.encode(&mut buf);
            }
            ClientBoundPacket::SelectChartResult(r) => {
                buf.write_byte(SELECT_CHART_RESULT);
                r.encode(&mut buf);
            }
            ClientBoundPacket::RequestStartResult(r) => {
                buf.write_byte(REQUEST_START_RESULT);
                r.encode(&mut buf);
            }
            ClientBoundPacket::OnJoinRoom { profile, monitor } => {
                buf.write_byte(ON_JOIN_ROOM);
                profile.encode(&mut buf);
                buf.write_bool(*monitor);
            }
            ClientBoundPacket::OnLeaveRoom { profile } => {
                buf.write_byte(ON_LEAVE_ROOM);
                profile.encode(&mut buf);
            }
            ClientBoundPacket::ChangeHost { is_host } => {
                buf.write_byte(CHANGE_HOST);
                buf.write_bool(*is_host);
            }
            ClientBoundPacket::ChangeState { state } => {
                buf.write_byte(CHANGE_STATE);
                state.encode(&mut buf);
            }
            ClientBoundPacket::Message(msg) => {
                buf.write_byte(MESSAGE);
                msg.encode(&mut buf);
            }
        }
        buf.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serverbound_roundtrip() {
        let samples = [
            ServerBoundPacket::Authenticate {
                token: "tok".to_string(),
            },
            ServerBoundPacket::CreateRoom {
                room_id: "R1".to_string(),
            },
            ServerBoundPacket::JoinRoom {
                room_id: "R1".to_string(),
            },
            ServerBoundPacket::LeaveRoom,
            ServerBoundPacket::SelectChart { chart_id: 5 },
            ServerBoundPacket::RequestStart,
        ];
        for packet in samples {
            let bytes = packet.encode();
            let mut frame = ByteBuf::from_vec(bytes);
            assert_eq!(ServerBoundPacket::decode(&mut frame).unwrap(), packet);
        }
    }

    #[test]
    fn clientbound_roundtrip() {
        let samples = [
            ClientBoundPacket::AuthenticateResult(AuthenticateResult::Success {
                profile: FullUserProfile::new(UserProfile::new(1, "a"), false),
                room: None,
            }),
            ClientBoundPacket::CreateRoomResult(RoomOpResult::Success),
            ClientBoundPacket::JoinRoomResult(JoinRoomResult::Failed {
                reason: "room_not_exist".to_string(),
            }),
            ClientBoundPacket::OnJoinRoom {
                profile: UserProfile::new(2, "b"),
                monitor: false,
            },
            ClientBoundPacket::ChangeHost { is_host: true },
            ClientBoundPacket::ChangeState {
                state: GameState::WaitForReady,
            },
            ClientBoundPacket::Message(ChatMessage::system("hi")),
        ];
        for packet in samples {
            let bytes = packet.encode();
            let mut frame = ByteBuf::from_vec(bytes);
            assert_eq!(ClientBoundPacket::decode(&mut frame).unwrap(), packet);
        }
    }

    #[test]
    fn unknown_serverbound_id_is_an_error() {
        let mut frame = ByteBuf::from_vec(vec![0xff]);
        assert_eq!(
            ServerBoundPacket::decode(&mut frame).unwrap_err(),
            CodecError::UnknownPacketId(0xff)
        );
    }
}
