// Publish command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    relay::spawn_destination_bridge,
    rtmp::{RtmpCommand, RtmpPacket},
    server::RelayServerContext,
    session::{send_status_message, RtmpSessionReadStatus, SessionContext, SessionStage},
    streams::{egress_channel, PublisherSession},
    utils::validate_key_string,
};

/// Handles the publish command
///
/// Authorizes the stream key against the user directory, registers the
/// publisher session, opens a destination sink per authorized endpoint
/// and advances the session to the streaming stage.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `write_stream` - IO stream to write bytes
/// * `cmd` - The command to handle
/// * `packet` - The packet carrying the command
/// * `read_status` - Parser state of the read side
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_command_publish<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
    cmd: &RtmpCommand,
    packet: &RtmpPacket,
    read_status: &RtmpSessionReadStatus,
) -> bool {
    let publish_stream_id = packet.header.stream_id;

    // Load and validate parameters

    let channel = match &session_context.status.channel {
        Some(c) => c.clone(),
        None => {
            logger.log_debug("Protocol error: received publish before connect");

            send_refusal(
                logger,
                write_stream,
                publish_stream_id,
                "NetStream.Publish.BadConnection",
                "No app is selected",
                server_context.config.chunk_size,
            )
            .await;

            return false;
        }
    };

    if session_context.status.is_publisher || session_context.status.is_player {
        logger.log_debug("Protocol error: session already streaming");

        send_refusal(
            logger,
            write_stream,
            publish_stream_id,
            "NetStream.Publish.BadConnection",
            "Connection already publishing",
            server_context.config.chunk_size,
        )
        .await;

        return false;
    }

    let key = match cmd.get_stream_name() {
        Some(k) => k.to_string(),
        None => {
            logger.log_debug("Command error: streamName property not provided");

            send_refusal(
                logger,
                write_stream,
                publish_stream_id,
                "NetStream.Publish.BadName",
                "No stream key provided",
                server_context.config.chunk_size,
            )
            .await;

            return false;
        }
    };

    if !validate_key_string(&key, server_context.config.key_max_length) {
        logger.log_debug("Command error: invalid streamName value");

        send_refusal(
            logger,
            write_stream,
            publish_stream_id,
            "NetStream.Publish.BadName",
            "Invalid stream key provided",
            server_context.config.chunk_size,
        )
        .await;

        return false;
    }

    // Resolve authorization, exactly once per publish attempt

    let authorization = match server_context.directory.lookup(&key).await {
        Ok(a) => a,
        Err(e) => {
            logger.log_warning(&format!("Directory lookup failed: {}", e));

            send_refusal(
                logger,
                write_stream,
                publish_stream_id,
                "NetStream.Publish.BadName",
                "Invalid stream key provided",
                server_context.config.chunk_size,
            )
            .await;

            return false;
        }
    };

    if !authorization.authorized {
        if server_context.config.log_requests {
            logger.log_info("Publish refused: stream key not authorized");
        }

        send_refusal(
            logger,
            write_stream,
            publish_stream_id,
            "NetStream.Publish.BadName",
            "Invalid stream key provided",
            server_context.config.chunk_size,
        )
        .await;

        return false;
    }

    // Register the publisher. A second publisher on the same key is refused.

    let publisher = Arc::new(PublisherSession::new(&key, &channel, session_context.id));

    if server_context
        .registry
        .register(publisher.clone())
        .await
        .is_err()
    {
        if server_context.config.log_requests {
            logger.log_info("Publish refused: stream in use");
        }

        send_refusal(
            logger,
            write_stream,
            publish_stream_id,
            "NetStream.Publish.BadName",
            "Stream in use",
            server_context.config.chunk_size,
        )
        .await;

        return false;
    }

    // Open a destination sink per authorized endpoint.
    // An unavailable destination is skipped, the rest keep publishing.

    for (index, destination) in authorization.destinations.iter().enumerate() {
        let url = if !destination.url.is_empty() {
            destination.url.clone()
        } else {
            match server_context.catalog.resolve_url(&destination.name) {
                Some(u) => u.to_string(),
                None => {
                    logger.log_warning(&format!(
                        "No transport URL for destination: {}",
                        destination.name
                    ));

                    continue;
                }
            }
        };

        // Each destination publishes with its own key
        let url_with_key = format!("{}/{}", url.trim_end_matches('/'), destination.key);

        let mut sink = match server_context.connector.open(&url_with_key).await {
            Ok(s) => s,
            Err(e) => {
                logger.log_warning(&format!(
                    "Destination {} unavailable: {}",
                    destination.name, e
                ));

                continue;
            }
        };

        if let Err(e) = sink.prepare(read_status.read_max_chunk_size).await {
            logger.log_warning(&format!(
                "Destination {} refused the stream: {}",
                destination.name, e
            ));

            continue;
        }

        let (sender, receiver) = egress_channel(index as u64);

        publisher.add_active_egress(sender).await;

        spawn_destination_bridge(
            Arc::new(logger.make_child_logger(&format!("[DEST:{}] ", destination.name))),
            receiver,
            sink,
        );

        if server_context.config.log_requests {
            logger.log_info(&format!("Restreaming to {}", destination.name));
        }
    }

    // Update the session status

    session_context.status.is_publisher = true;
    session_context.status.publish_stream_id = publish_stream_id;
    session_context.status.publisher = Some(publisher);
    session_context.status.stage = SessionStage::Streaming;

    // Respond with status message

    if let Err(e) = send_status_message(
        write_stream.as_ref(),
        publish_stream_id,
        "status",
        "NetStream.Publish.Start",
        Some("Published"),
        server_context.config.chunk_size,
    )
    .await
    {
        logger.log_debug(&format!("Send error: could not send status message: {}", e));
    }

    // Log

    if server_context.config.log_requests {
        logger.log_info(&format!("PUBLISH ({}): {}/{}", publish_stream_id, channel, key));
    }

    // Done

    true
}

/// Sends an error onStatus reply, logging send failures
async fn send_refusal<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    logger: &Arc<Logger>,
    write_stream: &Arc<Mutex<TW>>,
    stream_id: u32,
    code: &str,
    description: &str,
    chunk_size: usize,
) {
    if let Err(e) = send_status_message(
        write_stream.as_ref(),
        stream_id,
        "error",
        code,
        Some(description),
        chunk_size,
    )
    .await
    {
        logger.log_debug(&format!("Send error: could not send status message: {}", e));
    }
}
