// RTMP packet model

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{
    get_rtmp_header_size, RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1, RTMP_CHUNK_TYPE_2,
    RTMP_CHUNK_TYPE_3,
};

/// Absolute timestamp values from this one up are sent
/// through the 4-byte extended timestamp field
pub const RTMP_EXTENDED_TIMESTAMP_THRESHOLD: u32 = 0xFFFFFF;

/// Header of an RTMP packet
#[derive(Clone)]
pub struct RtmpPacketHeader {
    /// Chunk format (0..3)
    pub format: u8,

    /// Chunk stream ID
    pub channel_id: u32,

    /// Absolute timestamp
    pub timestamp: u32,

    /// Payload length
    pub length: usize,

    /// Message type
    pub packet_type: u8,

    /// Message stream ID
    pub stream_id: u32,

    /// True if the timestamp travels in the extended field
    pub has_extended_timestamp: bool,
}

/// RTMP packet
///
/// Doubles as the per-csid assembly record of the chunk reader:
/// the header keeps the last seen values for inheritance, the clock
/// accumulates deltas, and the payload buffer fills across chunks
#[derive(Clone)]
pub struct RtmpPacket {
    /// Packet header
    pub header: RtmpPacketHeader,

    /// Accumulated absolute timestamp
    pub clock: u32,

    /// Last timestamp delta seen (reapplied by format 3 chunks starting a message)
    pub delta: u32,

    /// Number of payload bytes received so far
    pub bytes: usize,

    /// Packet payload
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    /// Creates new blank RTMP packet
    pub fn new_blank() -> RtmpPacket {
        RtmpPacket {
            header: RtmpPacketHeader {
                format: 0,
                channel_id: 0,
                timestamp: 0,
                length: 0,
                packet_type: 0,
                stream_id: 0,
                has_extended_timestamp: false,
            },
            clock: 0,
            delta: 0,
            bytes: 0,
            payload: Vec::new(),
        }
    }

    /// Resets the payload buffer for the next message on the same chunk stream,
    /// keeping the header fields for inheritance
    pub fn reset_payload(&mut self) {
        self.payload.truncate(0);
        self.bytes = 0;
    }

    /// Serializes the basic header of an RTMP chunk
    ///
    /// # Arguments
    ///
    /// * `format` - Chunk format
    /// * `channel_id` - Chunk stream ID
    pub fn serialize_basic_header(format: u8, channel_id: u32) -> Vec<u8> {
        if channel_id >= 64 + 256 {
            vec![
                (format << 6) | 1,
                ((channel_id - 64) & 0xFF) as u8,
                (((channel_id - 64) >> 8) & 0xFF) as u8,
            ]
        } else if channel_id >= 64 {
            vec![format << 6, ((channel_id - 64) & 0xFF) as u8]
        } else {
            vec![(format << 6) | (channel_id as u8)]
        }
    }

    /// Serializes the message header of an RTMP chunk
    ///
    /// # Arguments
    ///
    /// * `stream_id` - The message stream ID to use (format 0 only)
    pub fn serialize_chunk_message_header(&self, stream_id: u32) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(get_rtmp_header_size(self.header.format));

        if self.header.format <= RTMP_CHUNK_TYPE_2 {
            let mut b: Vec<u8> = vec![0; 4];

            if self.header.timestamp >= RTMP_EXTENDED_TIMESTAMP_THRESHOLD {
                BigEndian::write_u32(&mut b, RTMP_EXTENDED_TIMESTAMP_THRESHOLD);
            } else {
                BigEndian::write_u32(&mut b, self.header.timestamp);
            }

            out.extend(&b[1..]);
        }

        if self.header.format <= RTMP_CHUNK_TYPE_1 {
            let mut b: Vec<u8> = vec![0; 4];

            BigEndian::write_u32(&mut b, self.header.length as u32);

            out.extend(&b[1..]);
            out.push(self.header.packet_type);
        }

        if self.header.format == RTMP_CHUNK_TYPE_0 {
            // The message stream id is the only little-endian
            // field in the chunk headers
            let mut b: Vec<u8> = vec![0; 4];

            LittleEndian::write_u32(&mut b, stream_id);

            out.extend(b);
        }

        out
    }

    /// Creates the wire-level chunks for an RTMP packet
    ///
    /// # Arguments
    ///
    /// * `out_chunk_size` - Max payload size per chunk
    pub fn create_chunks(&self, out_chunk_size: usize) -> Vec<u8> {
        self.create_chunks_for_stream(self.header.stream_id, out_chunk_size)
    }

    /// Creates the wire-level chunks for an RTMP packet,
    /// overriding the message stream ID
    ///
    /// The first chunk carries a full (format 0) header, the rest
    /// are format 3 continuations. The extended timestamp, when in
    /// use, is repeated on every chunk of the message.
    ///
    /// # Arguments
    ///
    /// * `stream_id` - The message stream ID
    /// * `out_chunk_size` - Max payload size per chunk
    pub fn create_chunks_for_stream(&self, stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
        let basic_header =
            Self::serialize_basic_header(self.header.format, self.header.channel_id);

        let basic_header_3 =
            Self::serialize_basic_header(RTMP_CHUNK_TYPE_3, self.header.channel_id);

        let message_header = self.serialize_chunk_message_header(stream_id);

        let use_extended_timestamp =
            self.header.timestamp >= RTMP_EXTENDED_TIMESTAMP_THRESHOLD;

        let payload_size = self.header.length.min(self.payload.len());

        let mut chunks: Vec<u8> =
            Vec::with_capacity(basic_header.len() + message_header.len() + payload_size + 4);

        chunks.extend(&basic_header);
        chunks.extend(&message_header);

        if use_extended_timestamp {
            let mut b: Vec<u8> = vec![0; 4];
            BigEndian::write_u32(&mut b, self.header.timestamp);
            chunks.extend(b);
        }

        let mut payload_offset: usize = 0;

        loop {
            let piece_size = (payload_size - payload_offset).min(out_chunk_size);

            chunks.extend(&self.payload[payload_offset..payload_offset + piece_size]);

            payload_offset += piece_size;

            if payload_offset >= payload_size {
                break;
            }

            chunks.extend(&basic_header_3);

            if use_extended_timestamp {
                let mut b: Vec<u8> = vec![0; 4];
                BigEndian::write_u32(&mut b, self.header.timestamp);
                chunks.extend(b);
            }
        }

        chunks
    }
}
