// Logic to handle AMF0 data packets

use std::sync::Arc;

use crate::{
    log::Logger,
    rtmp::{RtmpData, RtmpPacket},
};

use super::SessionContext;

/// Handles a DATA RTMP packet (AMF0)
///
/// Caches the payload of the first @setDataFrame message so it can be
/// replayed to subscribers at play time.
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
pub async fn handle_rtmp_packet_data(
    logger: &Arc<Logger>,
    session_context: &mut SessionContext,
    packet: &RtmpPacket,
) -> bool {
    let publisher = match &session_context.status.publisher {
        Some(p) => p,
        None => {
            logger.log_trace("Data packet ignored: session is not publishing");

            return true;
        }
    };

    let data = match RtmpData::decode(&packet.payload) {
        Ok(d) => d,
        Err(e) => {
            logger.log_debug(&format!("Packet error: bad AMF0 data: {}", e));

            return false;
        }
    };

    if data.tag == "@setDataFrame"
        && publisher
            .set_metadata(Arc::new(packet.payload.clone()))
            .await
    {
        logger.log_debug("Cached stream metadata");
    }

    true
}
