// Relay server

mod config;
mod connection_handle;
mod context;
mod ip_count;
mod session_id_generator;
mod tcp;

use std::sync::Arc;

pub use config::*;
pub use connection_handle::*;
pub use context::*;
pub use ip_count::*;
pub use session_id_generator::*;
pub use tcp::*;
use tokio::sync::Mutex;

use crate::log::Logger;

/// Runs the relay server until the listener dies
///
/// # Arguments
///
/// * `logger` - Server logger
/// * `server_context` - Server context
pub async fn run_server(logger: Logger, server_context: RelayServerContext) {
    let ip_counter = Arc::new(Mutex::new(IpConnectionCounter::new(
        server_context.config.as_ref(),
    )));
    let session_id_generator = Arc::new(Mutex::new(SessionIdGenerator::new()));

    let (end_notifier, mut end_receiver) = tokio::sync::mpsc::channel::<()>(1);

    tcp_server(
        Arc::new(logger.make_child_logger("[SERVER:TCP] ")),
        RelayServerContextExtended {
            base: server_context,
            ip_counter,
            session_id_generator,
        },
        end_notifier,
    );

    end_receiver
        .recv()
        .await
        .expect("could not receive signal from TCP server task");
}
