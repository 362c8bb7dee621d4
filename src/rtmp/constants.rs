// RTMP constants

// Handshake

/// RTMP protocol version for the simple handshake
pub const RTMP_VERSION: u8 = 3;

/// Size in bytes of C1, C2, S1 and S2
pub const RTMP_HANDSHAKE_SIZE: usize = 1536;

// Chunk types
pub const RTMP_CHUNK_TYPE_0: u8 = 0; // 11-bytes: timestamp(3) + length(3) + message type(1) + stream id(4)
pub const RTMP_CHUNK_TYPE_1: u8 = 1; // 7-bytes: delta(3) + length(3) + message type(1)
pub const RTMP_CHUNK_TYPE_2: u8 = 2; // 3-bytes: delta(3)
pub const RTMP_CHUNK_TYPE_3: u8 = 3; // 0-byte

// RTMP channel ids (chunk stream ids used for outgoing messages)
pub const RTMP_CHANNEL_PROTOCOL: u32 = 2;
pub const RTMP_CHANNEL_INVOKE: u32 = 3;
pub const RTMP_CHANNEL_MEDIA: u32 = 4;

/// Gets RTMP message header size from the chunk format
pub fn get_rtmp_header_size(format: u8) -> usize {
    match format {
        0 => 11,
        1 => 7,
        2 => 3,
        _ => 0,
    }
}

// Message types

/* Protocol Control Messages */
pub const RTMP_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const RTMP_TYPE_ABORT: u8 = 2;
pub const RTMP_TYPE_ACKNOWLEDGEMENT: u8 = 3; // bytes read report
pub const RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE: u8 = 5; // server bandwidth
pub const RTMP_TYPE_SET_PEER_BANDWIDTH: u8 = 6; // client bandwidth

/* User Control Messages Event (4) */
pub const RTMP_TYPE_EVENT: u8 = 4;

pub const RTMP_TYPE_AUDIO: u8 = 8;
pub const RTMP_TYPE_VIDEO: u8 = 9;

/* Data Message */
pub const RTMP_TYPE_DATA: u8 = 18; // AMF0

/* Command Message */
pub const RTMP_TYPE_INVOKE: u8 = 20; // AMF0

// Stream status event codes (user control)

pub const STREAM_BEGIN: u16 = 0x00;
pub const STREAM_EOF: u16 = 0x01;

// Chunk sizes

/// Chunk size every peer starts reading with, until renegotiated
pub const RTMP_READ_CHUNK_SIZE_DEFAULT: usize = 128;

/// Chunk size this server writes with (announced via set-chunk-size)
pub const RTMP_WRITE_CHUNK_SIZE_DEFAULT: usize = 4096;

pub const RTMP_MIN_CHUNK_SIZE: usize = 128;
pub const RTMP_MAX_CHUNK_SIZE: usize = 65536;

// Flow control values announced on connect

pub const RTMP_WINDOW_ACK: u32 = 5_000_000;
pub const RTMP_PEER_BANDWIDTH: u32 = 5_000_000;

/// Peer bandwidth limit type (0-Hard, 1-Soft, 2-Dynamic)
pub const RTMP_PEER_BANDWIDTH_TYPE_DYNAMIC: u8 = 2;

// Timeouts

/// Socket read timeout (seconds)
pub const RTMP_READ_TIMEOUT_SECONDS: u64 = 60;
