// Play command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    relay::spawn_subscriber_bridge,
    rtmp::{
        rtmp_make_media_message, rtmp_make_metadata_message, rtmp_make_sample_access_message,
        rtmp_make_stream_status_message, RtmpCommand, RtmpPacket, RTMP_TYPE_AUDIO,
        RTMP_TYPE_VIDEO, STREAM_BEGIN,
    },
    server::RelayServerContext,
    session::{
        send_status_message, session_write_bytes, SessionContext, SessionStage,
    },
    streams::egress_channel,
};

/// Handles the play command
///
/// Locates the publisher in the registry, replays the cached metadata
/// and init frames, and enrolls the subscriber in the waiting egress
/// set so the live feed starts at the next keyframe.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - Server context
/// * `session_context` - Session context
/// * `write_stream` - IO stream to write bytes
/// * `cmd` - The command to handle
/// * `packet` - The packet carrying the command
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_command_play<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Arc<Logger>,
    server_context: &RelayServerContext,
    session_context: &mut SessionContext,
    write_stream: &Arc<Mutex<TW>>,
    cmd: &RtmpCommand,
    packet: &RtmpPacket,
) -> bool {
    let play_stream_id = packet.header.stream_id;
    let chunk_size = server_context.config.chunk_size;

    // Load and validate parameters

    let stream_name = match cmd.get_stream_name() {
        Some(k) => k.to_string(),
        None => {
            logger.log_debug("Command error: streamName property not provided");

            return false;
        }
    };

    if session_context.status.is_publisher || session_context.status.is_player {
        logger.log_debug("Protocol error: session already streaming");

        return false;
    }

    // Locate the publisher

    let publisher = match server_context.registry.lookup(&stream_name).await {
        Some(p) => p,
        None => {
            if server_context.config.log_requests {
                logger.log_info(&format!("Play refused: no publisher for {}", stream_name));
            }

            if let Err(e) = send_status_message(
                write_stream.as_ref(),
                play_stream_id,
                "error",
                "NetStream.Play.StreamNotFound",
                Some("Stream not found"),
                chunk_size,
            )
            .await
            {
                logger.log_debug(&format!("Send error: could not send status message: {}", e));
            }

            return false;
        }
    };

    // Stream begin

    let stream_status_bytes = rtmp_make_stream_status_message(STREAM_BEGIN, play_stream_id);

    if let Err(e) = session_write_bytes(write_stream.as_ref(), &stream_status_bytes).await {
        logger.log_debug(&format!("Send error: could not send stream status: {}", e));

        return false;
    }

    // Play start status

    if let Err(e) = send_status_message(
        write_stream.as_ref(),
        play_stream_id,
        "status",
        "NetStream.Play.Start",
        Some("Playing"),
        chunk_size,
    )
    .await
    {
        logger.log_debug(&format!("Send error: could not send status message: {}", e));

        return false;
    }

    // Sample access

    let sample_access_bytes = rtmp_make_sample_access_message(play_stream_id, chunk_size);

    if let Err(e) = session_write_bytes(write_stream.as_ref(), &sample_access_bytes).await {
        logger.log_debug(&format!("Send error: could not send sample access: {}", e));

        return false;
    }

    // Replay the cached init frames, copied out once

    let frames = publisher.get_init_frames().await;

    if let Some(metadata) = frames.metadata {
        let metadata_bytes =
            rtmp_make_metadata_message(play_stream_id, &metadata, 0, chunk_size);

        if let Err(e) = session_write_bytes(write_stream.as_ref(), &metadata_bytes).await {
            logger.log_debug(&format!("Send error: could not send metadata: {}", e));

            return false;
        }
    }

    if let Some(first_audio) = frames.first_audio {
        let audio_bytes =
            rtmp_make_media_message(RTMP_TYPE_AUDIO, play_stream_id, &first_audio, 0, chunk_size);

        if let Err(e) = session_write_bytes(write_stream.as_ref(), &audio_bytes).await {
            logger.log_debug(&format!("Send error: could not send audio codec header: {}", e));

            return false;
        }
    }

    if let Some(first_video) = frames.first_video {
        let video_bytes =
            rtmp_make_media_message(RTMP_TYPE_VIDEO, play_stream_id, &first_video, 0, chunk_size);

        if let Err(e) = session_write_bytes(write_stream.as_ref(), &video_bytes).await {
            logger.log_debug(&format!("Send error: could not send video codec header: {}", e));

            return false;
        }
    }

    // Enroll the subscriber. The channel stays in the waiting set
    // until the publisher emits its next keyframe.

    let (sender, receiver) = egress_channel(session_context.id);

    publisher.add_waiting_egress(sender).await;

    spawn_subscriber_bridge(
        Arc::new(logger.make_child_logger("[PLAY] ")),
        receiver,
        write_stream.clone(),
    );

    // Update the session status

    session_context.status.is_player = true;
    session_context.status.play_stream_id = play_stream_id;
    session_context.status.stage = SessionStage::Streaming;

    // Log

    if server_context.config.log_requests {
        logger.log_info(&format!("PLAY ({}): {}", play_stream_id, stream_name));
    }

    // Done

    true
}
