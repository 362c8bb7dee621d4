// RTMP protocol errors

use thiserror::Error;

/// Handshake failure
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("unsupported RTMP version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("peer requested the complex handshake (C1 version is not zero)")]
    ComplexHandshakeUnsupported,

    #[error("C2 does not match the S1 previously sent")]
    HandshakeVerifyFailed,

    #[error("handshake timed out")]
    Timeout,

    #[error("handshake i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chunk stream protocol failure
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk stream {csid} started with format {format}, a full header (format 0) is required")]
    NewStreamWithoutFullHeader { csid: u32, format: u8 },

    #[error("received format {format} chunk on stream {csid} while a message is still incomplete")]
    UnexpectedFormatMidMessage { csid: u32, format: u8 },

    #[error("chunk read timed out")]
    Timeout,

    #[error("chunk i/o error: {0}")]
    Io(#[from] std::io::Error),
}
