// Destination sinks (outbound RTMP push)

use std::io;

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
use url::Url;

use crate::{
    amf::AMF0Value,
    rtmp::{
        rtmp_handshake_client, rtmp_make_chunk_size_set_message, rtmp_make_invoke_message,
        RtmpCommand, RTMP_READ_CHUNK_SIZE_DEFAULT,
    },
};

const RTMP_DEFAULT_PORT: u16 = 1935;

/// Message stream id assumed for the announced publish stream.
/// Responses from the remote are not parsed, and ingest servers
/// allocate stream 1 for the first createStream.
const PUSH_STREAM_ID: u32 = 1;

/// Opaque byte sink for one outbound destination
#[async_trait]
pub trait DestinationSink: Send {
    /// Announces the stream to the remote ingest
    ///
    /// # Arguments
    ///
    /// * `inbound_chunk_size` - Chunk size the relayed bytes are framed with
    async fn prepare(&mut self, inbound_chunk_size: usize) -> io::Result<()>;

    /// Writes fully framed RTMP chunk bytes
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Ends the stream on the remote side
    async fn finish(&mut self) -> io::Result<()>;

    /// Closes the connection
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens destination sinks
#[async_trait]
pub trait DestinationConnector: Send + Sync {
    /// Opens a sink for a destination
    ///
    /// # Arguments
    ///
    /// * `url_with_key` - Ingest URL with the stream key as last path segment
    async fn open(&self, url_with_key: &str) -> io::Result<Box<dyn DestinationSink>>;
}

/// Connector dialing remote RTMP ingest servers over TCP
pub struct RtmpPushConnector;

#[async_trait]
impl DestinationConnector for RtmpPushConnector {
    async fn open(&self, url_with_key: &str) -> io::Result<Box<dyn DestinationSink>> {
        let parsed = Url::parse(url_with_key)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "destination URL has no host")
            })?
            .to_string();

        let port = parsed.port().unwrap_or(RTMP_DEFAULT_PORT);

        // The app is the URL path without the trailing stream key
        let mut segments: Vec<&str> = match parsed.path_segments() {
            Some(segments) => segments.filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        };

        if segments.len() < 2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "destination URL must contain an app and a stream key",
            ));
        }

        let key = segments.pop().unwrap_or_default().to_string();
        let app = segments.join("/");

        let connection = TcpStream::connect((host.as_str(), port)).await?;
        let (read_half, write_half) = connection.into_split();

        let tc_url = format!("rtmp://{}:{}/{}", host, port, app);

        Ok(Box::new(RtmpPushSink {
            app,
            key,
            tc_url,
            read_half: Some(read_half),
            write_half,
        }))
    }
}

/// Sink relaying chunk bytes to a remote RTMP ingest server.
///
/// The announcement is fire and forget: connect, createStream and
/// publish are written in sequence and the remote replies are drained
/// by a background task and discarded.
pub struct RtmpPushSink {
    app: String,
    key: String,
    tc_url: String,

    read_half: Option<OwnedReadHalf>,
    write_half: OwnedWriteHalf,
}

#[async_trait]
impl DestinationSink for RtmpPushSink {
    async fn prepare(&mut self, inbound_chunk_size: usize) -> io::Result<()> {
        let mut read_half = match self.read_half.take() {
            Some(r) => r,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "sink already prepared",
                ));
            }
        };

        rtmp_handshake_client(&mut read_half, &mut self.write_half)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

        // The remote reads at the default size until told otherwise,
        // so the commands below are framed with the default and the
        // new size is announced first
        self.write_half
            .write_all(&rtmp_make_chunk_size_set_message(inbound_chunk_size as u32))
            .await?;

        let mut connect_cmd = RtmpCommand::new("connect".to_string());

        connect_cmd.set_argument("transId", AMF0Value::Number { value: 1.0 });
        connect_cmd.set_argument(
            "cmdObj",
            AMF0Value::Object {
                properties: vec![
                    (
                        "app".to_string(),
                        AMF0Value::String {
                            value: self.app.clone(),
                        },
                    ),
                    (
                        "type".to_string(),
                        AMF0Value::String {
                            value: "nonprivate".to_string(),
                        },
                    ),
                    (
                        "tcUrl".to_string(),
                        AMF0Value::String {
                            value: self.tc_url.clone(),
                        },
                    ),
                ],
            },
        );

        self.write_half
            .write_all(&rtmp_make_invoke_message(
                &connect_cmd,
                0,
                RTMP_READ_CHUNK_SIZE_DEFAULT,
            ))
            .await?;

        let mut create_stream_cmd = RtmpCommand::new("createStream".to_string());

        create_stream_cmd.set_argument("transId", AMF0Value::Number { value: 2.0 });
        create_stream_cmd.set_argument("cmdObj", AMF0Value::Null);

        self.write_half
            .write_all(&rtmp_make_invoke_message(
                &create_stream_cmd,
                0,
                RTMP_READ_CHUNK_SIZE_DEFAULT,
            ))
            .await?;

        let mut publish_cmd = RtmpCommand::new("publish".to_string());

        publish_cmd.set_argument("transId", AMF0Value::Number { value: 3.0 });
        publish_cmd.set_argument("cmdObj", AMF0Value::Null);
        publish_cmd.set_argument(
            "streamName",
            AMF0Value::String {
                value: self.key.clone(),
            },
        );
        publish_cmd.set_argument(
            "type",
            AMF0Value::String {
                value: "live".to_string(),
            },
        );

        self.write_half
            .write_all(&rtmp_make_invoke_message(
                &publish_cmd,
                PUSH_STREAM_ID,
                RTMP_READ_CHUNK_SIZE_DEFAULT,
            ))
            .await?;

        self.write_half.flush().await?;

        // Drain and discard whatever the remote sends back.
        // The task ends when the connection closes.
        tokio::spawn(async move {
            let mut buf = vec![0; 4096];

            while let Ok(n) = read_half.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        });

        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_half.write_all(bytes).await?;
        self.write_half.flush().await
    }

    async fn finish(&mut self) -> io::Result<()> {
        let mut delete_stream_cmd = RtmpCommand::new("deleteStream".to_string());

        delete_stream_cmd.set_argument("transId", AMF0Value::Number { value: 0.0 });
        delete_stream_cmd.set_argument("cmdObj", AMF0Value::Null);
        delete_stream_cmd.set_argument(
            "streamId",
            AMF0Value::Number {
                value: PUSH_STREAM_ID as f64,
            },
        );

        self.write_half
            .write_all(&rtmp_make_invoke_message(
                &delete_stream_cmd,
                0,
                RTMP_READ_CHUNK_SIZE_DEFAULT,
            ))
            .await?;

        self.write_half.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.write_half.shutdown().await
    }
}
