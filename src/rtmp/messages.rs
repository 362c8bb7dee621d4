// RTMP message generators

use byteorder::{BigEndian, ByteOrder};

use crate::amf::AMF0Value;

use super::{
    RtmpCommand, RtmpData, RtmpPacket, RTMP_CHANNEL_INVOKE, RTMP_CHANNEL_MEDIA,
    RTMP_CHUNK_TYPE_0, RTMP_TYPE_DATA, RTMP_TYPE_INVOKE,
};

/// Makes RTMP window ACK message
pub fn rtmp_make_window_ack(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP control message to indicate peer bandwidth
pub fn rtmp_make_peer_bandwidth_set_message(size: u32, limit_type: u8) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);
    b[16] = limit_type;

    b
}

/// Makes RTMP control message to indicate chunk size
pub fn rtmp_make_chunk_size_set_message(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP user control message to indicate stream status
/// Use one of these for status: STREAM_BEGIN, STREAM_EOF
pub fn rtmp_make_stream_status_message(status: u16, stream_id: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];

    BigEndian::write_u16(&mut b[12..14], status);
    BigEndian::write_u32(&mut b[14..18], stream_id);

    b
}

/// Makes RTMP invoke command message
pub fn rtmp_make_invoke_message(
    cmd: &RtmpCommand,
    stream_id: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut packet = RtmpPacket::new_blank();

    packet.header.format = RTMP_CHUNK_TYPE_0;
    packet.header.channel_id = RTMP_CHANNEL_INVOKE;
    packet.header.packet_type = RTMP_TYPE_INVOKE;
    packet.header.stream_id = stream_id;
    packet.payload = cmd.encode();
    packet.header.length = packet.payload.len();

    packet.create_chunks(out_chunk_size)
}

/// Makes RTMP data message
pub fn rtmp_make_data_message(data: &RtmpData, stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
    let mut packet = RtmpPacket::new_blank();

    packet.header.format = RTMP_CHUNK_TYPE_0;
    packet.header.channel_id = RTMP_CHANNEL_INVOKE;
    packet.header.packet_type = RTMP_TYPE_DATA;
    packet.header.stream_id = stream_id;
    packet.payload = data.encode();
    packet.header.length = packet.payload.len();

    packet.create_chunks(out_chunk_size)
}

/// Makes RTMP onStatus message
pub fn rtmp_make_status_message(
    stream_id: u32,
    level: &str,
    code: &str,
    description: Option<&str>,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("onStatus".to_string());

    cmd.set_argument("transId", AMF0Value::Number { value: 0.0 });
    cmd.set_argument("cmdObj", AMF0Value::Null);

    let mut info: Vec<(String, AMF0Value)> = vec![
        (
            "level".to_string(),
            AMF0Value::String {
                value: level.to_string(),
            },
        ),
        (
            "code".to_string(),
            AMF0Value::String {
                value: code.to_string(),
            },
        ),
    ];

    if let Some(d) = description {
        info.push((
            "description".to_string(),
            AMF0Value::String {
                value: d.to_string(),
            },
        ));
    }

    cmd.set_argument("info", AMF0Value::Object { properties: info });

    rtmp_make_invoke_message(&cmd, stream_id, out_chunk_size)
}

/// Makes message to respond to a connect command
pub fn rtmp_make_connect_response(trans_id: i64, out_chunk_size: usize) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId",
        AMF0Value::Number {
            value: trans_id as f64,
        },
    );

    cmd.set_argument(
        "cmdObj",
        AMF0Value::Object {
            properties: vec![
                (
                    "fmsVer".to_string(),
                    AMF0Value::String {
                        value: "FMS/3,0,1,123".to_string(),
                    },
                ),
                (
                    "capabilities".to_string(),
                    AMF0Value::Number { value: 31.0 },
                ),
            ],
        },
    );

    cmd.set_argument(
        "info",
        AMF0Value::Object {
            properties: vec![
                (
                    "level".to_string(),
                    AMF0Value::String {
                        value: "status".to_string(),
                    },
                ),
                (
                    "code".to_string(),
                    AMF0Value::String {
                        value: "NetConnection.Connect.Success".to_string(),
                    },
                ),
                (
                    "description".to_string(),
                    AMF0Value::String {
                        value: "Connection succeeded".to_string(),
                    },
                ),
                (
                    "objectEncoding".to_string(),
                    AMF0Value::Number { value: 0.0 },
                ),
            ],
        },
    );

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes message to respond to a createStream command
pub fn rtmp_make_create_stream_response(
    trans_id: i64,
    stream_index: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId",
        AMF0Value::Number {
            value: trans_id as f64,
        },
    );

    cmd.set_argument("cmdObj", AMF0Value::Null);

    cmd.set_argument(
        "info",
        AMF0Value::Number {
            value: stream_index as f64,
        },
    );

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes RTMP sample access message
pub fn rtmp_make_sample_access_message(stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
    let mut data = RtmpData::new("|RtmpSampleAccess".to_string());

    data.set_argument("bool1", AMF0Value::Bool { value: false });
    data.set_argument("bool2", AMF0Value::Bool { value: false });

    rtmp_make_data_message(&data, stream_id, out_chunk_size)
}

/// Creates a metadata replay message from cached payload bytes
pub fn rtmp_make_metadata_message(
    stream_id: u32,
    metadata: &[u8],
    timestamp: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut packet = RtmpPacket::new_blank();

    packet.header.format = RTMP_CHUNK_TYPE_0;
    packet.header.channel_id = RTMP_CHANNEL_INVOKE;
    packet.header.packet_type = RTMP_TYPE_DATA;
    packet.header.stream_id = stream_id;
    packet.header.timestamp = timestamp;
    packet.payload = metadata.to_vec();
    packet.header.length = packet.payload.len();

    packet.create_chunks(out_chunk_size)
}

/// Creates a media (audio or video) message from cached payload bytes
pub fn rtmp_make_media_message(
    packet_type: u8,
    stream_id: u32,
    payload: &[u8],
    timestamp: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut packet = RtmpPacket::new_blank();

    packet.header.format = RTMP_CHUNK_TYPE_0;
    packet.header.channel_id = RTMP_CHANNEL_MEDIA;
    packet.header.packet_type = packet_type;
    packet.header.stream_id = stream_id;
    packet.header.timestamp = timestamp;
    packet.payload = payload.to_vec();
    packet.header.length = packet.payload.len();

    packet.create_chunks(out_chunk_size)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{
        RTMP_PEER_BANDWIDTH_TYPE_DYNAMIC, RTMP_TYPE_EVENT, RTMP_TYPE_SET_CHUNK_SIZE,
        RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE, STREAM_BEGIN,
    };

    #[test]
    fn test_protocol_control_messages() {
        let window_ack = rtmp_make_window_ack(5_000_000);

        assert_eq!(window_ack[7], RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE);
        assert_eq!(BigEndian::read_u32(&window_ack[12..16]), 5_000_000);

        let peer_bw =
            rtmp_make_peer_bandwidth_set_message(5_000_000, RTMP_PEER_BANDWIDTH_TYPE_DYNAMIC);

        assert_eq!(peer_bw[7], RTMP_TYPE_SET_PEER_BANDWIDTH);
        assert_eq!(BigEndian::read_u32(&peer_bw[12..16]), 5_000_000);
        assert_eq!(peer_bw[16], RTMP_PEER_BANDWIDTH_TYPE_DYNAMIC);

        let chunk_size = rtmp_make_chunk_size_set_message(4096);

        assert_eq!(chunk_size[7], RTMP_TYPE_SET_CHUNK_SIZE);
        assert_eq!(BigEndian::read_u32(&chunk_size[12..16]), 4096);
    }

    #[test]
    fn test_stream_status_message() {
        let msg = rtmp_make_stream_status_message(STREAM_BEGIN, 7);

        assert_eq!(msg[7], RTMP_TYPE_EVENT);
        // 6 byte payload: u16 event + u32 stream id
        assert_eq!(BigEndian::read_u16(&msg[12..14]), STREAM_BEGIN);
        assert_eq!(BigEndian::read_u32(&msg[14..18]), 7);
    }
}
