// Bridge tasks draining egress channels

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{log::Logger, session::session_write_bytes, streams::EgressReceiver};

use super::DestinationSink;

/// Spawns the task that drains an egress channel into a destination sink.
/// On exit it finishes the stream and closes the sink.
///
/// # Arguments
///
/// * `logger` - Bridge logger
/// * `receiver` - Consumer half of the egress channel
/// * `sink` - Prepared destination sink
pub fn spawn_destination_bridge(
    logger: Arc<Logger>,
    mut receiver: EgressReceiver,
    mut sink: Box<dyn DestinationSink>,
) {
    tokio::spawn(async move {
        while let Some(blob) = receiver.recv().await {
            if let Err(e) = sink.write(&blob).await {
                logger.log_debug(&format!("Destination write error: {}", e));
                break;
            }
        }

        if let Err(e) = sink.finish().await {
            logger.log_debug(&format!("Destination finish error: {}", e));
        }

        let _ = sink.close().await;

        logger.log_debug("Destination bridge ended");
    });
}

/// Spawns the task that drains an egress channel to a local subscriber.
///
/// # Arguments
///
/// * `logger` - Bridge logger
/// * `receiver` - Consumer half of the egress channel
/// * `write_stream` - Write half of the subscriber connection
pub fn spawn_subscriber_bridge<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static>(
    logger: Arc<Logger>,
    mut receiver: EgressReceiver,
    write_stream: Arc<Mutex<TW>>,
) {
    tokio::spawn(async move {
        while let Some(blob) = receiver.recv().await {
            if let Err(e) = session_write_bytes(&write_stream, &blob).await {
                logger.log_debug(&format!("Subscriber write error: {}", e));
                break;
            }
        }

        logger.log_debug("Subscriber bridge ended");
    });
}
