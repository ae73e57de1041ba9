//! The wire protocol: a VarInt/byte codec, a version handshake + length
//! framing layer, and the packet registry used by the room server. Kept
//! dependency-free beyond `bytes`/`thiserror` — this crate has no knowledge
//! of rooms, connections, or the server's runtime.

mod byte_buf;
mod chat;
mod error;
mod frame;
mod game_state;
mod packet;
mod room_info;
mod user;
mod varint;

pub use byte_buf::ByteBuf;
pub use chat::ChatMessage;
pub use error::{CodecError, CodecResult};
pub use frame::{encode_frame, FrameDecoder, SUPPORTED_VERSION};
pub use game_state::GameState;
pub use packet::{
    AuthenticateResult, ClientBoundPacket, JoinRoomResult, RoomOpResult, ServerBoundPacket,
};
pub use room_info::RoomInfo;
pub use user::{FullUserProfile, UserProfile};
