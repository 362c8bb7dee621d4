// CreateStream command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger, rtmp::{rtmp_make_create_stream_response, RtmpCommand},
    server::RelayServerContext, session::{session_write_bytes, SessionContext},
};

/// Handles the createStream command
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
pub async fn handle_rtmp_command_create_stream<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
    cmd: &RtmpCommand,
) -> bool {
    let trans_id = cmd.get_transaction_id();

    // Create stream

    session_context.status.streams = session_context.status.streams.wrapping_add(1);

    let stream_index = session_context.status.streams as u32;

    // Respond

    let response_bytes = rtmp_make_create_stream_response(
        trans_id,
        stream_index,
        server_context.config.chunk_size,
    );

    if let Err(e) = session_write_bytes(write_stream, &response_bytes).await {
        logger.log_debug(&format!("Send error: could not send createStream response: {}", e));

        return false;
    }

    // Done

    true
}
