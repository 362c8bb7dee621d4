// Connection handling logic

use std::{net::IpAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    session::{handle_rtmp_session, SessionContext},
};

use super::RelayServerContextExtended;

/// Handles an incoming connection (after accepting it)
///
/// # Arguments
///
/// * `logger` - The server logger
/// * `server_context` - The extended server context
/// * `read_stream` - The stream to read from the client
/// * `write_stream` - The stream to write to the client
/// * `ip` - The client IP address
pub async fn handle_connection<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    server_context: RelayServerContextExtended,
    read_stream: TR,
    write_stream: Arc<Mutex<TW>>,
    ip: IpAddr,
) {
    // Generate an unique ID for the session

    let mut session_id_generator_v = server_context.session_id_generator.lock().await;
    let session_id = session_id_generator_v.generate_id();
    drop(session_id_generator_v);

    // Create a logger for the session

    let session_logger = Arc::new(logger.make_child_logger(&format!("[#{}] ", session_id)));

    // Log request

    if server_context.base.config.log_requests {
        session_logger.log_info(&format!("Connection accepted from {}", ip));
    }

    // Handle session

    handle_rtmp_session(
        session_logger,
        server_context.base,
        SessionContext::new(session_id, ip),
        read_stream,
        write_stream,
    )
    .await;
}
