// Logic to handle audio packets

use std::sync::Arc;

use crate::{log::Logger, rtmp::RtmpPacket};

use super::SessionContext;

/// Handles an AUDIO RTMP packet
///
/// The raw chunk bytes were already forwarded by the session loop;
/// this caches the first audio payload (typically the AAC sequence
/// header) for subscribers joining later.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `session_context` - Session context
/// * `packet` - The packet
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_packet_audio(
    logger: &Arc<Logger>,
    session_context: &mut SessionContext,
    packet: &RtmpPacket,
) -> bool {
    let publisher = match &session_context.status.publisher {
        Some(p) => p,
        None => {
            logger.log_debug("Audio packet ignored: session is not publishing");

            return true;
        }
    };

    if packet.payload.is_empty() {
        logger.log_debug("Packet error: empty audio packet");

        return true;
    }

    logger.log_trace(&format!("AUDIO PACKET: {} bytes", packet.payload.len()));

    if publisher
        .set_first_audio(Arc::new(packet.payload.clone()))
        .await
    {
        logger.log_debug("Cached audio codec header");
    }

    true
}
