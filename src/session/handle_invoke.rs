// Invoke packet handling logic

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{RtmpCommand, RtmpPacket},
    server::RelayServerContext,
};

use super::{
    handle_rtmp_command_connect, handle_rtmp_command_create_stream, handle_rtmp_command_play,
    handle_rtmp_command_publish, RtmpSessionReadStatus, SessionContext,
};

/// Handles an INVOKE RTMP packet (AMF0 command)
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
pub async fn handle_rtmp_packet_invoke<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
    packet: &RtmpPacket,
    read_status: &mut RtmpSessionReadStatus,
) -> bool {
    let cmd = match RtmpCommand::decode(&packet.payload) {
        Ok(c) => c,
        Err(e) => {
            logger.log_debug(&format!("Packet error: could not decode RTMP command: {}", e));

            return false;
        }
    };

    logger.log_trace(&format!("COMMAND RECEIVED: {}", cmd.cmd));

    match cmd.cmd.as_str() {
        "connect" => {
            handle_rtmp_command_connect(logger, server_context, session_context, write_stream, &cmd)
                .await
        }
        "createStream" => {
            handle_rtmp_command_create_stream(
                logger,
                server_context,
                session_context,
                write_stream,
                &cmd,
            )
            .await
        }
        "releaseStream" | "FCPublish" => {
            // Publishers tolerate silence for these
            logger.log_debug(&format!("Command acknowledged silently: {}", cmd.cmd));

            true
        }
        "publish" => {
            handle_rtmp_command_publish(
                logger,
                server_context,
                session_context,
                write_stream,
                &cmd,
                packet,
                read_status,
            )
            .await
        }
        "play" => {
            handle_rtmp_command_play(
                logger,
                server_context,
                session_context,
                write_stream,
                &cmd,
                packet,
            )
            .await
        }
        "FCUnpublish" | "deleteStream" | "closeStream" | "pause" => {
            // Teardown happens on disconnect
            logger.log_debug(&format!("Command ignored: {}", cmd.cmd));

            true
        }
        _ => {
            logger.log_debug(&format!("Unrecognized command: {}", cmd.cmd));

            true
        }
    }
}
