use crate::byte_buf::ByteBuf;
use crate::error::{CodecError, CodecResult};

/// The only handshake byte this server accepts. A real deployment would
/// grow this into a set as the protocol gains versions; today there is one.
pub const SUPPORTED_VERSION: u8 = 0x01;

/// Incremental frame decoder for one connection's inbound byte stream.
///
/// Two states, matching the original Netty-style pipeline: first a single
/// version byte is consumed once, then every subsequent frame is a
/// `[VarInt length][body]` pair. `feed` appends newly-read bytes;
/// `decode_frames` extracts every frame that is fully buffered so far and
/// compacts the already-consumed prefix away.
pub struct FrameDecoder {
    buf: ByteBuf,
    handshake_done: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: ByteBuf::new(),
            handshake_done: false,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.write_bytes(bytes);
    }

    /// Consumes the version handshake byte once enough data is buffered.
    /// Returns `Ok(true)` once the handshake has completed (on this call or
    /// a previous one), `Ok(false)` if still waiting for the byte.
    fn try_handshake(&mut self) -> CodecResult<bool> {
        if self.handshake_done {
            return Ok(true);
        }
        self.buf.mark_reader_index();
        match self.buf.read_unsigned_byte() {
            Ok(version) if version == SUPPORTED_VERSION => {
                self.handshake_done = true;
                Ok(true)
            }
            Ok(version) => Err(CodecError::UnsupportedVersion(version)),
            Err(CodecError::NeedMoreData) => {
                self.buf.reset_reader_index();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Decode every frame that is fully available in the buffer right now.
    pub fn decode_frames(&mut self) -> CodecResult<Vec<ByteBuf>> {
        if !self.try_handshake()? {
            return Ok(Vec::new());
        }

        let mut frames = Vec::new();
        loop {
            self.buf.mark_reader_index();
            let len = match self.buf.read_varint() {
                Ok(len) => len as usize,
                Err(CodecError::NeedMoreData) => {
                    self.buf.reset_reader_index();
                    break;
                }
                Err(e) => return Err(e),
            };
            if !self.buf.is_readable(len) {
                self.buf.reset_reader_index();
                break;
            }
            let body = self.buf.read_bytes(len)?;
            frames.push(ByteBuf::from_vec(body));
        }
        self.compact();
        Ok(frames)
    }

    /// Drop the already-consumed prefix so the buffer doesn't grow forever
    /// across the life of a long-lived connection.
    fn compact(&mut self) {
        let remaining = self.buf.readable_bytes();
        if remaining == 0 {
            self.buf = ByteBuf::new();
        } else if self.buf.reader_index() > 0 {
            let tail = self
                .buf
                .read_bytes(remaining)
                .expect("readable_bytes matches what remains");
            self.buf = ByteBuf::from_vec(tail);
        }
    }
}

/// Wrap an encoded packet body in the `[VarInt length][body]` frame.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut out = ByteBuf::new();
    out.write_varint(body.len() as u32);
    out.write_bytes(body);
    out.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_version() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x02]);
        assert_eq!(
            decoder.decode_frames().unwrap_err(),
            CodecError::UnsupportedVersion(0x02)
        );
    }

    #[test]
    fn waits_for_handshake_byte() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode_frames().unwrap(), Vec::new());
    }

    #[test]
    fn decodes_multiple_frames_fed_in_pieces() {
        let mut decoder = FrameDecoder::new();
        let frame_a = encode_frame(b"hello");
        let frame_b = encode_frame(b"world");

        decoder.feed(&[SUPPORTED_VERSION]);
        decoder.feed(&frame_a[..2]);
        assert_eq!(decoder.decode_frames().unwrap(), Vec::new());

        decoder.feed(&frame_a[2..]);
        decoder.feed(&frame_b);
        let frames = decoder.decode_frames().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_written(), b"hello");
        assert_eq!(frames[1].as_written(), b"world");
    }

    #[test]
    fn bad_varint_length_is_fatal() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[SUPPORTED_VERSION]);
        decoder.feed(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert_eq!(decoder.decode_frames().unwrap_err(), CodecError::BadVarint);
    }
}
