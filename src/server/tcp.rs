// TCP server

use std::{net::IpAddr, sync::Arc};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::{mpsc::Sender, Mutex},
};

use crate::log::Logger;

use super::{handle_connection, RelayServerContextExtended};

/// Runs the TCP accept loop on its own task
///
/// # Arguments
///
/// * `logger` - Server logger
/// * `server_context` - Extended server context
/// * `end_notifier` - Notified when the listener dies
pub fn tcp_server(
    logger: Arc<Logger>,
    server_context: RelayServerContextExtended,
    end_notifier: Sender<()>,
) {
    tokio::spawn(async move {
        let listen_addr = server_context.base.config.get_tcp_listen_addr();

        // Create listener

        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                logger.log_error(&format!("Could not create TCP listener: {}", e));
                end_notifier
                    .send(())
                    .await
                    .expect("failed to notify the main task");
                return;
            }
        };

        logger.log_info(&format!("Listening on {}", listen_addr));

        loop {
            match listener.accept().await {
                Ok((connection, addr)) => {
                    handle_connection_tcp(
                        connection,
                        addr.ip(),
                        server_context.clone(),
                        logger.clone(),
                    );
                }
                Err(e) => {
                    logger.log_error(&format!("Could not accept connection: {}", e));
                    end_notifier
                        .send(())
                        .await
                        .expect("failed to notify the main task");
                    return;
                }
            }
        }
    });
}

fn handle_connection_tcp(
    connection: TcpStream,
    ip: IpAddr,
    server_context: RelayServerContextExtended,
    logger: Arc<Logger>,
) {
    tokio::spawn(async move {
        let is_exempted = server_context
            .base
            .config
            .max_concurrent_connections_whitelist
            .contains_ip(&ip);

        let mut should_accept = true;

        if !is_exempted {
            let mut ip_counter_v = server_context.ip_counter.lock().await;
            should_accept = ip_counter_v.add(&ip);
            drop(ip_counter_v);
        }

        if should_accept {
            let (read_stream, write_stream) = connection.into_split();

            handle_connection(
                logger.clone(),
                server_context.clone(),
                read_stream,
                Arc::new(Mutex::new(write_stream)),
                ip,
            )
            .await;

            // After the connection is closed, remove it from the IP counter
            if !is_exempted {
                let mut ip_counter_v = server_context.ip_counter.lock().await;
                ip_counter_v.remove(&ip);
                drop(ip_counter_v);
            }
        } else {
            if server_context.base.config.log_requests {
                logger.log_info(&format!(
                    "Rejected request from {} due to connection limit",
                    ip
                ));
            }

            drop(connection);
        }
    });
}
