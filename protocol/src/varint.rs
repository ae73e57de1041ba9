use crate::byte_buf::ByteBuf;
use crate::error::{CodecError, CodecResult};

/// Max bytes a 32-bit value can take: ceil(32 / 7).
const MAX_BYTES: u32 = 5;

/// Unsigned LEB128: 7 data bits per byte, high bit set = continuation.
///
/// Leaves the buffer's reader index untouched on error, so a caller that
/// only had a partial varint buffered can retry once more bytes arrive.
pub(crate) fn decode(buf: &mut ByteBuf) -> CodecResult<u32> {
    let start = buf.reader_index();
    let mut value: u32 = 0;
    for i in 0..MAX_BYTES {
        let byte = match buf.read_unsigned_byte() {
            Ok(b) => b,
            Err(e) => {
                buf.set_reader_index(start);
                return Err(e);
            }
        };
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    buf.set_reader_index(start);
    Err(CodecError::BadVarint)
}

pub(crate) fn encode(buf: &mut ByteBuf, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.write_byte(byte);
        if value == 0 {
            break;
        }
    }
}
