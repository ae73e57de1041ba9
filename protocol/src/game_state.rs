use crate::byte_buf::ByteBuf;
use crate::error::{CodecError, CodecResult};

/// The state of a room's current game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    SelectChart { chart_id: Option<i32> },
    WaitForReady,
    Playing,
    Settling,
}

impl GameState {
    const TAG_SELECT_CHART: u8 = 0;
    const TAG_WAIT_FOR_READY: u8 = 1;
    const TAG_PLAYING: u8 = 2;
    const TAG_SETTLING: u8 = 3;

    pub fn encode(&self, buf: &mut ByteBuf) {
        match self {
            GameState::SelectChart { chart_id } => {
                buf.write_byte(Self::TAG_SELECT_CHART);
                buf.write_bool(chart_id.is_some());
                if let Some(id) = chart_id {
                    buf.write_i32(*id);
                }
            }
            GameState::WaitForReady => buf.write_byte(Self::TAG_WAIT_FOR_READY),
            GameState::Playing => buf.write_byte(Self::TAG_PLAYING),
            GameState::Settling => buf.write_byte(Self::TAG_SETTLING),
        }
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        match buf.read_unsigned_byte()? {
            Self::TAG_SELECT_CHART => {
                let chart_id = if buf.read_bool()? {
                    Some(buf.read_i32()?)
                } else {
                    None
                };
                Ok(GameState::SelectChart { chart_id })
            }
            Self::TAG_WAIT_FOR_READY => Ok(GameState::WaitForReady),
            Self::TAG_PLAYING => Ok(GameState::Playing),
            Self::TAG_SETTLING => Ok(GameState::Settling),
            _ => Err(CodecError::Malformed("unknown game state tag")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_variant() {
        for state in [
            GameState::SelectChart { chart_id: None },
            GameState::SelectChart { chart_id: Some(99) },
            GameState::WaitForReady,
            GameState::Playing,
            GameState::Settling,
        ] {
            let mut buf = ByteBuf::new();
            state.encode(&mut buf);
            assert_eq!(GameState::decode(&mut buf).unwrap(), state);
        }
    }
}
