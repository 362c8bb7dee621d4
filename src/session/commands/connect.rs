// Connect command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        rtmp_make_chunk_size_set_message, rtmp_make_connect_response,
        rtmp_make_peer_bandwidth_set_message, rtmp_make_window_ack, RtmpCommand,
        RTMP_PEER_BANDWIDTH, RTMP_PEER_BANDWIDTH_TYPE_DYNAMIC, RTMP_WINDOW_ACK,
    },
    server::RelayServerContext,
    session::{session_write_bytes, SessionContext},
    utils::validate_key_string,
};

/// Handles the connect command
///
/// Records the app name and negotiates the connection parameters:
/// window ack size, peer bandwidth and write chunk size, followed by
/// the _result reply.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `write_stream` - IO stream to write bytes
/// * `cmd` - The command to handle
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_command_connect<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
    cmd: &RtmpCommand,
) -> bool {
    // Load and validate parameters

    let channel = match cmd
        .get_argument("cmdObj")
        .and_then(|cmd_obj| cmd_obj.get_object_property("app"))
    {
        Some(app) => {
            let app_str = app.get_string();

            if !validate_key_string(app_str, server_context.config.key_max_length) {
                logger.log_debug(&format!("Command error: invalid app value: {}", app_str));

                return false;
            }

            app_str.to_string()
        }
        None => {
            logger.log_debug("Command error: app property not provided");

            return false;
        }
    };

    if session_context.status.channel.is_some() {
        logger.log_debug("Protocol error: connect received, but already connected");

        return false;
    }

    session_context.status.channel = Some(channel);

    let trans_id = cmd.get_transaction_id();

    // Send window ACK

    let window_ack_bytes = rtmp_make_window_ack(RTMP_WINDOW_ACK);

    if let Err(e) = session_write_bytes(write_stream, &window_ack_bytes).await {
        logger.log_debug(&format!("Send error: could not send window ACK: {}", e));

        return false;
    }

    // Set peer bandwidth

    let peer_bandwidth_bytes =
        rtmp_make_peer_bandwidth_set_message(RTMP_PEER_BANDWIDTH, RTMP_PEER_BANDWIDTH_TYPE_DYNAMIC);

    if let Err(e) = session_write_bytes(write_stream, &peer_bandwidth_bytes).await {
        logger.log_debug(&format!("Send error: could not set peer bandwidth: {}", e));

        return false;
    }

    // Set chunk size for writes

    let chunk_size_bytes =
        rtmp_make_chunk_size_set_message(server_context.config.chunk_size as u32);

    if let Err(e) = session_write_bytes(write_stream, &chunk_size_bytes).await {
        logger.log_debug(&format!("Send error: could not set chunk size: {}", e));

        return false;
    }

    // Respond

    let connect_response_bytes =
        rtmp_make_connect_response(trans_id, server_context.config.chunk_size);

    if let Err(e) = session_write_bytes(write_stream, &connect_response_bytes).await {
        logger.log_debug(&format!("Send error: could not send connect response: {}", e));

        return false;
    }

    // Done

    true
}
