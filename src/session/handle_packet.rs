// Packet dispatch logic

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        RtmpPacket, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_AUDIO, RTMP_TYPE_DATA,
        RTMP_TYPE_EVENT, RTMP_TYPE_INVOKE, RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH,
        RTMP_TYPE_VIDEO, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    },
    server::RelayServerContext,
};

use super::{
    handle_rtmp_packet_audio, handle_rtmp_packet_data, handle_rtmp_packet_invoke,
    handle_rtmp_packet_video, RtmpSessionReadStatus, SessionContext,
};

/// Handles a fully assembled RTMP message
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `write_stream` - IO stream to write bytes
/// * `packet` - The packet to handle
/// * `read_status` - Parser state of the read side
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_packet<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
    packet: &RtmpPacket,
    read_status: &mut RtmpSessionReadStatus,
) -> bool {
    match packet.header.packet_type {
        RTMP_TYPE_SET_CHUNK_SIZE => {
            if packet.payload.len() < 4 {
                logger.log_debug("Packet error: set-chunk-size payload too short");

                return false;
            }

            let size = BigEndian::read_u32(&packet.payload[0..4]) as usize;

            if size == 0 {
                logger.log_debug("Packet error: set-chunk-size of zero");

                return false;
            }

            read_status.read_max_chunk_size = size;

            logger.log_debug(&format!("Read chunk size updated: {}", size));

            true
        }
        RTMP_TYPE_ABORT
        | RTMP_TYPE_ACKNOWLEDGEMENT
        | RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE
        | RTMP_TYPE_SET_PEER_BANDWIDTH
        | RTMP_TYPE_EVENT => {
            logger.log_trace(&format!(
                "Control message ignored: type={}",
                packet.header.packet_type
            ));

            true
        }
        RTMP_TYPE_AUDIO => handle_rtmp_packet_audio(logger, session_context, packet).await,
        RTMP_TYPE_VIDEO => {
            handle_rtmp_packet_video(logger, server_context, session_context, packet).await
        }
        RTMP_TYPE_DATA => handle_rtmp_packet_data(logger, session_context, packet).await,
        RTMP_TYPE_INVOKE => {
            handle_rtmp_packet_invoke(
                logger,
                server_context,
                session_context,
                write_stream,
                packet,
                read_status,
            )
            .await
        }
        _ => {
            logger.log_debug(&format!(
                "Unknown message type ignored: {}",
                packet.header.packet_type
            ));

            true
        }
    }
}
