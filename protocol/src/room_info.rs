use crate::byte_buf::ByteBuf;
use crate::error::CodecResult;
use crate::game_state::GameState;
use crate::user::{FullUserProfile, UserProfile};

/// A snapshot of a room, embedded in `Authenticate.Success` when the caller
/// is already in a room at the time they reconnect/authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: String,
    pub state: GameState,
    pub live: bool,
    pub locked: bool,
    pub cycle: bool,
    pub is_host: bool,
    pub is_ready: bool,
    pub users: Vec<UserProfile>,
    pub monitors: Vec<UserProfile>,
}

impl RoomInfo {
    /// Each participant is written as `[int32 userId][FullUserProfile]` —
    /// the userId is redundant with the one inside FullUserProfile, but the
    /// wire format carries it that way and this preserves it bit-exactly.
    pub fn encode(&self, buf: &mut ByteBuf) {
        buf.write_string(&self.room_id);
        self.state.encode(buf);
        buf.write_bool(self.live);
        buf.write_bool(self.locked);
        buf.write_bool(self.cycle);
        buf.write_bool(self.is_host);
        buf.write_bool(self.is_ready);

        let combined = FullUserProfile::from_lists(&self.users, &self.monitors);
        buf.write_varint(combined.len() as u32);
        for entry in &combined {
            buf.write_i32(entry.profile.user_id);
            entry.encode(buf);
        }
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        let room_id = buf.read_string()?;
        let state = GameState::decode(buf)?;
        let live = buf.read_bool()?;
        let locked = buf.read_bool()?;
        let cycle = buf.read_bool()?;
        let is_host = buf.read_bool()?;
        let is_ready = buf.read_bool()?;

        let count = buf.read_varint()?;
        let mut users = Vec::new();
        let mut monitors = Vec::new();
        for _ in 0..count {
            let _redundant_user_id = buf.read_i32()?;
            let entry = FullUserProfile::decode(buf)?;
            if entry.monitor {
                monitors.push(entry.profile);
            } else {
                users.push(entry.profile);
            }
        }

        Ok(Self {
            room_id,
            state,
            live,
            locked,
            cycle,
            is_host,
            is_ready,
            users,
            monitors,
        })
    }
}
