// Chunk read logic

use std::{collections::HashMap, time::Duration};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::timeout,
};

use crate::rtmp::{
    get_rtmp_header_size, ChunkError, RtmpPacket, RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1,
    RTMP_CHUNK_TYPE_3, RTMP_EXTENDED_TIMESTAMP_THRESHOLD, RTMP_READ_CHUNK_SIZE_DEFAULT,
    RTMP_READ_TIMEOUT_SECONDS,
};

/// Parser state of the read side of a session
pub struct RtmpSessionReadStatus {
    /// Chunk assembly per chunk stream id
    pub channels: HashMap<u32, RtmpPacket>,

    /// Max payload bytes per incoming chunk,
    /// updated by received set-chunk-size messages
    pub read_max_chunk_size: usize,
}

impl RtmpSessionReadStatus {
    /// Creates the initial read status
    pub fn new() -> RtmpSessionReadStatus {
        RtmpSessionReadStatus {
            channels: HashMap::new(),
            read_max_chunk_size: RTMP_READ_CHUNK_SIZE_DEFAULT,
        }
    }
}

impl Default for RtmpSessionReadStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of reading a single chunk
pub struct ChunkReadResult {
    /// Exact wire bytes of the chunk (headers + payload fragment),
    /// ready to forward to egress channels
    pub wire_bytes: Vec<u8>,

    /// The assembled message, when this chunk completed one
    pub message: Option<RtmpPacket>,
}

/// Reads exactly buf.len() bytes, with the session read timeout
async fn read_exact_timeout<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
    buf: &mut [u8],
) -> Result<(), ChunkError> {
    match timeout(
        Duration::from_secs(RTMP_READ_TIMEOUT_SECONDS),
        read_stream.read_exact(buf),
    )
    .await
    {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(ChunkError::Io(e)),
        Err(_) => Err(ChunkError::Timeout),
    }
}

fn read_u24_be(buf: &[u8]) -> u32 {
    ((buf[0] as u32) << 16) | ((buf[1] as u32) << 8) | (buf[2] as u32)
}

/// Reads one RTMP chunk, updating the per-csid assembly.
///
/// Header fields absent for the chunk format are inherited from the
/// previous chunk on the same chunk stream. Timestamps of format 1 and 2
/// chunks are deltas accumulated onto the stream clock; a format 3 chunk
/// that starts a new message reapplies the last delta.
///
/// # Arguments
///
/// * `read_stream` - IO stream to read bytes
/// * `read_status` - Parser state
///
/// # Return value
///
/// The wire bytes of the chunk, plus the completed message when the
/// chunk filled its payload.
pub async fn read_rtmp_chunk<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
    read_status: &mut RtmpSessionReadStatus,
) -> Result<ChunkReadResult, ChunkError> {
    let read_max_chunk_size = read_status.read_max_chunk_size;

    let mut wire_bytes: Vec<u8> = Vec::new();

    // Basic header: format (2 bits) + chunk stream id (6 / 14 / 22 bits)

    let mut start_byte = [0u8; 1];

    read_exact_timeout(read_stream, &mut start_byte).await?;
    wire_bytes.push(start_byte[0]);

    let format = start_byte[0] >> 6;
    let csid_raw = (start_byte[0] & 0x3F) as u32;

    let csid: u32 = match csid_raw {
        0 => {
            let mut b = [0u8; 1];

            read_exact_timeout(read_stream, &mut b).await?;
            wire_bytes.push(b[0]);

            64 + (b[0] as u32)
        }
        1 => {
            let mut b = [0u8; 2];

            read_exact_timeout(read_stream, &mut b).await?;
            wire_bytes.extend(b);

            64 + (b[0] as u32) + ((b[1] as u32) << 8)
        }
        _ => csid_raw,
    };

    // Locate the assembly for this chunk stream.
    // The first chunk of a stream must carry a full header.

    if !read_status.channels.contains_key(&csid) && format != RTMP_CHUNK_TYPE_0 {
        return Err(ChunkError::NewStreamWithoutFullHeader { csid, format });
    }

    let assembly = read_status
        .channels
        .entry(csid)
        .or_insert_with(RtmpPacket::new_blank);

    // Only continuation chunks may arrive while a message is incomplete
    if assembly.bytes > 0 && format != RTMP_CHUNK_TYPE_3 {
        return Err(ChunkError::UnexpectedFormatMidMessage { csid, format });
    }

    assembly.header.format = format;
    assembly.header.channel_id = csid;

    // Message header, size given by the format

    let header_size = get_rtmp_header_size(format);
    let mut header = vec![0u8; header_size];

    if header_size > 0 {
        read_exact_timeout(read_stream, &mut header).await?;
        wire_bytes.extend(&header);
    }

    match format {
        RTMP_CHUNK_TYPE_0 => {
            let timestamp_field = read_u24_be(&header[0..3]);

            assembly.header.length = read_u24_be(&header[3..6]) as usize;
            assembly.header.packet_type = header[6];
            assembly.header.stream_id = LittleEndian::read_u32(&header[7..11]);
            assembly.header.has_extended_timestamp =
                timestamp_field >= RTMP_EXTENDED_TIMESTAMP_THRESHOLD;

            let timestamp = if assembly.header.has_extended_timestamp {
                let mut b = [0u8; 4];

                read_exact_timeout(read_stream, &mut b).await?;
                wire_bytes.extend(b);

                BigEndian::read_u32(&b)
            } else {
                timestamp_field
            };

            // Absolute timestamp resets the clock
            assembly.header.timestamp = timestamp;
            assembly.clock = timestamp;
            assembly.delta = 0;
        }
        RTMP_CHUNK_TYPE_3 => {
            if assembly.bytes == 0 {
                // New message on this stream: the last delta applies again
                assembly.clock = assembly.clock.wrapping_add(assembly.delta);
                assembly.header.timestamp = assembly.clock;
            }

            // A message whose first chunk used the extended timestamp
            // carries it on every continuation chunk as well
            if assembly.header.has_extended_timestamp {
                let mut b = [0u8; 4];

                read_exact_timeout(read_stream, &mut b).await?;
                wire_bytes.extend(b);
            }
        }
        _ => {
            // Format 1 and 2: timestamp delta
            let delta_field = read_u24_be(&header[0..3]);

            if format == RTMP_CHUNK_TYPE_1 {
                assembly.header.length = read_u24_be(&header[3..6]) as usize;
                assembly.header.packet_type = header[6];
            }

            assembly.header.has_extended_timestamp =
                delta_field >= RTMP_EXTENDED_TIMESTAMP_THRESHOLD;

            let delta = if assembly.header.has_extended_timestamp {
                let mut b = [0u8; 4];

                read_exact_timeout(read_stream, &mut b).await?;
                wire_bytes.extend(b);

                BigEndian::read_u32(&b)
            } else {
                delta_field
            };

            assembly.delta = delta;
            assembly.clock = assembly.clock.wrapping_add(delta);
            assembly.header.timestamp = assembly.clock;
        }
    }

    // Payload fragment

    let remaining = assembly.header.length.saturating_sub(assembly.bytes);
    let to_read = remaining.min(read_max_chunk_size);

    if to_read > 0 {
        let mut payload = vec![0u8; to_read];

        read_exact_timeout(read_stream, &mut payload).await?;

        assembly.payload.extend(&payload);
        assembly.bytes += to_read;
        wire_bytes.extend(payload);
    }

    // Emit the message once the payload is complete

    let message = if assembly.bytes >= assembly.header.length {
        let mut msg = RtmpPacket::new_blank();

        msg.header = assembly.header.clone();
        msg.header.format = RTMP_CHUNK_TYPE_0;
        msg.header.timestamp = assembly.clock;
        msg.clock = assembly.clock;
        msg.payload = assembly.payload.clone();
        msg.bytes = assembly.bytes;

        assembly.reset_payload();

        Some(msg)
    } else {
        None
    };

    Ok(ChunkReadResult {
        wire_bytes,
        message,
    })
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{RTMP_TYPE_VIDEO, RTMP_WRITE_CHUNK_SIZE_DEFAULT};

    /// Decodes a full byte buffer into messages
    async fn decode_all(mut bytes: &[u8], read_chunk_size: usize) -> Vec<RtmpPacket> {
        let mut read_status = RtmpSessionReadStatus::new();
        read_status.read_max_chunk_size = read_chunk_size;

        let mut messages = Vec::new();

        while !bytes.is_empty() {
            let result = read_rtmp_chunk(&mut bytes, &mut read_status).await.unwrap();

            if let Some(message) = result.message {
                messages.push(message);
            }
        }

        messages
    }

    #[tokio::test]
    async fn test_chunk_round_trip() {
        for payload_len in [0usize, 1, 127, 128, 129, 4095, 4096, 4097, 100000] {
            for chunk_size in [128usize, RTMP_WRITE_CHUNK_SIZE_DEFAULT] {
                let mut packet = RtmpPacket::new_blank();

                packet.header.format = RTMP_CHUNK_TYPE_0;
                packet.header.channel_id = 3;
                packet.header.packet_type = RTMP_TYPE_VIDEO;
                packet.header.stream_id = 1;
                packet.header.timestamp = 1000;
                packet.payload = (0..payload_len).map(|i| (i & 0xFF) as u8).collect();
                packet.header.length = payload_len;

                let bytes = packet.create_chunks(chunk_size);
                let messages = decode_all(&bytes, chunk_size).await;

                assert_eq!(messages.len(), 1, "len={} cs={}", payload_len, chunk_size);

                let message = &messages[0];

                assert_eq!(message.header.packet_type, RTMP_TYPE_VIDEO);
                assert_eq!(message.header.stream_id, 1);
                assert_eq!(message.header.timestamp, 1000);
                assert_eq!(message.header.length, payload_len);
                assert_eq!(message.payload, packet.payload);
            }
        }
    }

    #[tokio::test]
    async fn test_header_format_inheritance() {
        let payload: Vec<u8> = vec![0xAB; 500];

        let mut bytes: Vec<u8> = Vec::new();

        // Format 0: ts=1000, len=500, type=9, msid=1
        bytes.push(0x03);
        bytes.extend([0x00, 0x03, 0xE8]);
        bytes.extend([0x00, 0x01, 0xF4]);
        bytes.push(0x09);
        bytes.extend([0x01, 0x00, 0x00, 0x00]);
        bytes.extend(&payload);

        // Format 2 on the same csid: delta=40
        bytes.push(0x83);
        bytes.extend([0x00, 0x00, 0x28]);
        bytes.extend(&payload);

        // Format 3: everything inherited, delta applies again
        bytes.push(0xC3);
        bytes.extend(&payload);

        let messages = decode_all(&bytes, 4096).await;

        assert_eq!(messages.len(), 3);

        for (i, expected_ts) in [1000u32, 1040, 1080].iter().enumerate() {
            assert_eq!(messages[i].header.timestamp, *expected_ts);
            assert_eq!(messages[i].header.length, 500);
            assert_eq!(messages[i].header.packet_type, 9);
            assert_eq!(messages[i].header.stream_id, 1);
        }
    }

    #[tokio::test]
    async fn test_extended_timestamp_round_trip() {
        let timestamp: u32 = 0x0100_0000;

        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 3;
        packet.header.packet_type = RTMP_TYPE_VIDEO;
        packet.header.stream_id = 1;
        packet.header.timestamp = timestamp;
        packet.payload = vec![0x11; 300];
        packet.header.length = 300;

        // 128 byte chunks force continuation chunks, each carrying
        // the extended timestamp again
        let bytes = packet.create_chunks(128);

        // The 3-byte timestamp field is pinned to the marker value
        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);
        // The extended field follows the 11-byte message header
        assert_eq!(BigEndian::read_u32(&bytes[12..16]), timestamp);

        // 3 pieces: basic(1) + header(11) + ext(4) + 128 + [basic(1) + ext(4) + 128] x2 (44 last)
        assert_eq!(bytes.len(), 1 + 11 + 4 + 300 + 2 * (1 + 4));

        let messages = decode_all(&bytes, 128).await;

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].header.timestamp, timestamp);
        assert_eq!(messages[0].payload.len(), 300);
    }

    #[tokio::test]
    async fn test_csid_encoding_boundaries() {
        for (csid, expected_basic_len) in
            [(2u32, 1usize), (63, 1), (64, 2), (319, 2), (320, 3), (65599, 3)]
        {
            let basic = RtmpPacket::serialize_basic_header(RTMP_CHUNK_TYPE_0, csid);

            assert_eq!(basic.len(), expected_basic_len, "csid={}", csid);

            let mut packet = RtmpPacket::new_blank();

            packet.header.format = RTMP_CHUNK_TYPE_0;
            packet.header.channel_id = csid;
            packet.header.packet_type = 8;
            packet.header.stream_id = 1;
            packet.payload = vec![0x55; 10];
            packet.header.length = 10;

            let messages = decode_all(&packet.create_chunks(128), 128).await;

            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].header.channel_id, csid);
        }
    }

    #[tokio::test]
    async fn test_new_csid_requires_format_0() {
        // Format 1 chunk on a never-seen csid
        let bytes: Vec<u8> = vec![0x43, 0x00, 0x00, 0x28, 0x00, 0x00, 0x01, 0x09, 0xAA];

        let mut read_status = RtmpSessionReadStatus::new();
        let mut reader: &[u8] = &bytes;

        match read_rtmp_chunk(&mut reader, &mut read_status).await {
            Err(ChunkError::NewStreamWithoutFullHeader { csid, format }) => {
                assert_eq!(csid, 3);
                assert_eq!(format, 1);
            }
            _ => panic!("expected NewStreamWithoutFullHeader"),
        }
    }

    #[tokio::test]
    async fn test_mid_message_requires_format_3() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 3;
        packet.header.packet_type = 9;
        packet.header.stream_id = 1;
        packet.payload = vec![0x00; 200];
        packet.header.length = 200;

        let bytes = packet.create_chunks(128);

        let mut read_status = RtmpSessionReadStatus::new();

        // First chunk of the message (128 of 200 bytes)
        let first_chunk_len = 1 + 11 + 128;
        let mut reader: &[u8] = &bytes[..first_chunk_len];

        let result = read_rtmp_chunk(&mut reader, &mut read_status).await.unwrap();
        assert!(result.message.is_none());

        // A format 0 chunk arriving mid-message is a protocol error
        let bad: Vec<u8> = vec![
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x09, 0x01, 0x00, 0x00, 0x00, 0xAA,
        ];
        let mut bad_reader: &[u8] = &bad;

        match read_rtmp_chunk(&mut bad_reader, &mut read_status).await {
            Err(ChunkError::UnexpectedFormatMidMessage { csid, format }) => {
                assert_eq!(csid, 3);
                assert_eq!(format, 0);
            }
            _ => panic!("expected UnexpectedFormatMidMessage"),
        }
    }
}
