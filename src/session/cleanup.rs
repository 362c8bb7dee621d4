// Session cleanup logic

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{log::Logger, server::RelayServerContext};

use super::{SessionContext, SessionStage};

/// Cleans up a session after its main loop ends
///
/// For publishers: posts the exit signal on every egress channel, then
/// removes the registry entry so the key can be published again.
/// Always closes the socket, which also stops subscriber bridges.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `write_stream` - IO stream to write bytes
pub async fn do_session_cleanup<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
) {
    if let Some(publisher) = session_context.status.publisher.take() {
        // Every egress channel gets the exit signal before the
        // registry entry is freed for a re-publish
        publisher.shutdown().await;

        server_context
            .registry
            .remove(&publisher.stream_key, session_context.id)
            .await;

        if server_context.config.log_requests {
            logger.log_info(&format!("Stream unpublished: {}", publisher.stream_key));
        }
    }

    session_context.status.stage = SessionStage::Closed;

    // Close the socket

    let mut write_stream_v = write_stream.lock().await;

    if write_stream_v.shutdown().await.is_ok() {
        logger.log_debug("Connection closed");
    }
}
