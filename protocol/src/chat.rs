use crate::byte_buf::ByteBuf;
use crate::error::{CodecError, CodecResult};

/// The payload carried by a clientbound `Message` packet. Discriminated by
/// a leading tag byte, mirroring the original's polymorphic message classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    Chat { user_id: i32, text: String },
    LeaveRoom { user_id: i32, username: String },
    SelectChart { user_id: i32, username: String, chart_id: i32 },
    StartPlaying,
}

impl ChatMessage {
    const TAG_CHAT: u8 = 0;
    const TAG_LEAVE_ROOM: u8 = 1;
    const TAG_SELECT_CHART: u8 = 2;
    const TAG_START_PLAYING: u8 = 3;

    pub fn encode(&self, buf: &mut ByteBuf) {
        match self {
            ChatMessage::Chat { user_id, text } => {
                buf.write_byte(Self::TAG_CHAT);
                buf.write_i32(*user_id);
                buf.write_string(text);
            }
            ChatMessage::LeaveRoom { user_id, username } => {
                buf.write_byte(Self::TAG_LEAVE_ROOM);
                buf.write_i32(*user_id);
                buf.write_string(username);
            }
            ChatMessage::SelectChart {
                user_id,
                username,
                chart_id,
            } => {
                buf.write_byte(Self::TAG_SELECT_CHART);
                buf.write_i32(*user_id);
                buf.write_string(username);
                buf.write_i32(*chart_id);
            }
            ChatMessage::StartPlaying => buf.write_byte(Self::TAG_START_PLAYING),
        }
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        match buf.read_unsigned_byte()? {
            Self::TAG_CHAT => Ok(ChatMessage::Chat {
                user_id: buf.read_i32()?,
                text: buf.read_string()?,
            }),
            Self::TAG_LEAVE_ROOM => Ok(ChatMessage::LeaveRoom {
                user_id: buf.read_i32()?,
                username: buf.read_string()?,
            }),
            Self::TAG_SELECT_CHART => Ok(ChatMessage::SelectChart {
                user_id: buf.read_i32()?,
                username: buf.read_string()?,
                chart_id: buf.read_i32()?,
            }),
            Self::TAG_START_PLAYING => Ok(ChatMessage::StartPlaying),
            _ => Err(CodecError::Malformed("unknown chat message tag")),
        }
    }

    /// Constructor for the system-chat convenience used by welcome messages
    /// and admin broadcasts, which have no originating user (`-1`, matching
    /// the original's sentinel for server-authored chat lines).
    pub fn system(text: impl Into<String>) -> Self {
        ChatMessage::Chat {
            user_id: -1,
            text: text.into(),
        }
    }
}
