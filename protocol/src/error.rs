use thiserror::Error;

/// Errors raised while decoding or encoding the wire protocol.
///
/// `NeedMoreData` is not fatal: callers (the frame layer) interpret it as
/// "wait for more bytes", whereas every other variant is a protocol-fatal
/// error that must close the connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("need more data")]
    NeedMoreData,
    #[error("malformed varint")]
    BadVarint,
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    #[error("unknown packet id {0}")]
    UnknownPacketId(u8),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
