// Logic to handle video packets

use std::sync::Arc;

use crate::{
    log::Logger,
    rtmp::{RtmpPacket, RTMP_CHANNEL_MEDIA, RTMP_CHUNK_TYPE_0, RTMP_TYPE_VIDEO},
    server::RelayServerContext,
};

use super::SessionContext;

/// Video frame type signalling a keyframe
const FRAME_TYPE_KEYFRAME: u8 = 1;

/// Handles a VIDEO RTMP packet
///
/// The raw chunk bytes were already forwarded by the session loop.
/// This caches the first video payload (typically the AVC sequence
/// header) and, on a keyframe, promotes the subscribers waiting for
/// a clean GOP boundary into the active egress set.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `packet` - The packet
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_packet_video(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    packet: &RtmpPacket,
) -> bool {
    let publisher = match &session_context.status.publisher {
        Some(p) => p,
        None => {
            logger.log_debug("Video packet ignored: session is not publishing");

            return true;
        }
    };

    if packet.payload.is_empty() {
        logger.log_debug("Packet error: empty video packet");

        return true;
    }

    logger.log_trace(&format!("VIDEO PACKET: {} bytes", packet.payload.len()));

    if publisher
        .set_first_video(Arc::new(packet.payload.clone()))
        .await
    {
        logger.log_debug("Cached video codec header");
    }

    let frame_type = (packet.payload[0] >> 4) & 0x0F;

    if frame_type == FRAME_TYPE_KEYFRAME && publisher.has_waiting_egress().await {
        // Re-chunk the keyframe so it is the first data payload
        // the promoted subscribers receive after the init frames

        let mut keyframe = RtmpPacket::new_blank();

        keyframe.header.format = RTMP_CHUNK_TYPE_0;
        keyframe.header.channel_id = RTMP_CHANNEL_MEDIA;
        keyframe.header.packet_type = RTMP_TYPE_VIDEO;
        keyframe.header.stream_id = packet.header.stream_id;
        keyframe.header.timestamp = packet.header.timestamp;
        keyframe.payload = packet.payload.clone();
        keyframe.header.length = keyframe.payload.len();

        let keyframe_chunks = keyframe.create_chunks(server_context.config.chunk_size);

        let promoted = publisher
            .promote_waiting_egress(Arc::new(keyframe_chunks))
            .await;

        if promoted > 0 {
            logger.log_debug(&format!("Promoted {} subscriber(s) at keyframe", promoted));
        }
    }

    true
}
