use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CodecError, CodecResult};
use crate::varint;

/// A growable byte sequence with an independent read cursor, mirroring the
/// Netty-style buffer the original wire codec was built against. Backed by
/// `bytes::BytesMut` so a finished buffer can be handed to a connection's
/// outbound queue (`Bytes`) without copying.
///
/// Writes always append at the end; reads advance `reader_index`. The
/// reader index can be marked and reset, which the frame decoder relies on
/// to back out of a partially-buffered frame.
#[derive(Debug, Clone, Default)]
pub struct ByteBuf {
    data: BytesMut,
    reader_index: usize,
    mark: usize,
}

impl ByteBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&data[..]),
            reader_index: 0,
            mark: 0,
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    /// The bytes written so far, ignoring the reader cursor.
    pub fn as_written(&self) -> &[u8] {
        &self.data
    }

    pub fn readable_bytes(&self) -> usize {
        self.data.len() - self.reader_index
    }

    pub fn is_readable(&self, n: usize) -> bool {
        self.readable_bytes() >= n
    }

    pub fn mark_reader_index(&mut self) {
        self.mark = self.reader_index;
    }

    pub fn reset_reader_index(&mut self) {
        self.reader_index = self.mark;
    }

    pub fn reader_index(&self) -> usize {
        self.reader_index
    }

    pub(crate) fn set_reader_index(&mut self, index: usize) {
        self.reader_index = index;
    }

    fn require(&self, n: usize) -> CodecResult<()> {
        if self.is_readable(n) {
            Ok(())
        } else {
            Err(CodecError::NeedMoreData)
        }
    }

    pub fn read_unsigned_byte(&mut self) -> CodecResult<u8> {
        self.require(1)?;
        let b = self.data[self.reader_index];
        self.reader_index += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> CodecResult<Vec<u8>> {
        self.require(n)?;
        let slice = self.data[self.reader_index..self.reader_index + n].to_vec();
        self.reader_index += n;
        Ok(slice)
    }

    pub fn write_byte(&mut self, b: u8) {
        self.data.put_u8(b);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }

    pub fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_unsigned_byte()? != 0)
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_byte(if v { 1 } else { 0 });
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().expect("exactly 4 bytes")))
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes(bytes.try_into().expect("exactly 2 bytes")))
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_i16(&mut self) -> CodecResult<i16> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_le_bytes(bytes.try_into().expect("exactly 2 bytes")))
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("exactly 4 bytes")))
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().expect("exactly 8 bytes")))
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("exactly 8 bytes")))
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_f32(&mut self) -> CodecResult<f32> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().expect("exactly 4 bytes")))
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_f64(&mut self) -> CodecResult<f64> {
        let bytes = self.read_bytes(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().expect("exactly 8 bytes")))
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn read_varint(&mut self) -> CodecResult<u32> {
        varint::decode(self)
    }

    pub fn write_varint(&mut self, value: u32) {
        varint::encode(self, value);
    }

    pub fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_and_byte_roundtrip() {
        let mut buf = ByteBuf::new();
        buf.write_bool(true);
        buf.write_byte(7);
        assert_eq!(buf.read_bool().unwrap(), true);
        assert_eq!(buf.read_unsigned_byte().unwrap(), 7);
    }

    #[test]
    fn string_roundtrip() {
        let mut buf = ByteBuf::new();
        buf.write_string("Alice");
        assert_eq!(buf.read_string().unwrap(), "Alice");
    }

    #[test]
    fn short_read_is_need_more_data() {
        let mut buf = ByteBuf::new();
        buf.write_byte(1);
        assert_eq!(buf.read_i32().unwrap_err(), CodecError::NeedMoreData);
    }

    #[test]
    fn mark_and_reset_reader_index() {
        let mut buf = ByteBuf::new();
        buf.write_bytes(&[1, 2, 3]);
        buf.mark_reader_index();
        buf.read_unsigned_byte().unwrap();
        buf.reset_reader_index();
        assert_eq!(buf.read_unsigned_byte().unwrap(), 1);
    }

    #[test]
    fn i32_roundtrip_little_endian() {
        let mut buf = ByteBuf::new();
        buf.write_i32(-42);
        assert_eq!(buf.as_written(), &(-42i32).to_le_bytes());
        assert_eq!(buf.read_i32().unwrap(), -42);
    }

    #[test]
    fn wide_integer_and_float_roundtrip() {
        let mut buf = ByteBuf::new();
        buf.write_i16(-7);
        buf.write_u32(4_000_000_000);
        buf.write_u64(u64::MAX);
        buf.write_f64(1.5);
        assert_eq!(buf.read_i16().unwrap(), -7);
        assert_eq!(buf.read_u32().unwrap(), 4_000_000_000);
        assert_eq!(buf.read_u64().unwrap(), u64::MAX);
        assert_eq!(buf.read_f64().unwrap(), 1.5);
    }
}
