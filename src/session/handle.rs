// Logic to handle RTMP sessions

use std::sync::Arc;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger, rtmp::rtmp_handshake_server, server::RelayServerContext,
};

use super::{
    do_session_cleanup, handle_rtmp_packet, read_rtmp_chunk, RtmpSessionReadStatus,
    SessionContext, SessionStage,
};

/// Handles an RTMP session, from the handshake to the teardown
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `read_stream` - IO stream to read bytes from the client
/// * `write_stream` - IO stream to write bytes to the client
pub async fn handle_rtmp_session<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    server_context: RelayServerContext,
    mut session_context: SessionContext,
    mut read_stream: TR,
    write_stream: Arc<Mutex<TW>>,
) {
    // Handshake stage

    let handshake_result = {
        let mut write_stream_v = write_stream.lock().await;

        rtmp_handshake_server(&mut read_stream, &mut *write_stream_v).await
    };

    if let Err(e) = handshake_result {
        if server_context.config.log_requests {
            logger.log_info(&format!("Handshake failed: {}", e));
        }

        do_session_cleanup(&logger, &server_context, &mut session_context, &write_stream).await;

        return;
    }

    logger.log_debug("Handshake completed");

    session_context.status.stage = SessionStage::Command;

    // Command and streaming stages

    let mut read_status = RtmpSessionReadStatus::new();

    while session_context.status.stage != SessionStage::Closed {
        let (wire_bytes, message) = match read_rtmp_chunk(&mut read_stream, &mut read_status).await
        {
            Ok(c) => (c.wire_bytes, c.message),
            Err(e) => {
                if server_context.config.log_requests {
                    logger.log_debug(&format!("Session ended: {}", e));
                }

                break;
            }
        };

        // While streaming, every parsed chunk is forwarded verbatim
        // to the active egress channels

        if session_context.status.stage == SessionStage::Streaming
            && session_context.status.is_publisher
        {
            if let Some(publisher) = &session_context.status.publisher {
                let dropped = publisher.broadcast_chunk(Arc::new(wire_bytes)).await;

                for channel_id in dropped {
                    if server_context.config.log_requests {
                        logger.log_info(&format!(
                            "Egress channel {} dropped: queue overflow",
                            channel_id
                        ));
                    }
                }
            }
        }

        if let Some(packet) = message {
            let continue_session = handle_rtmp_packet(
                &logger,
                &server_context,
                &mut session_context,
                &write_stream,
                &packet,
                &mut read_status,
            )
            .await;

            if !continue_session {
                break;
            }
        }
    }

    // Teardown

    do_session_cleanup(&logger, &server_context, &mut session_context, &write_stream).await;
}
