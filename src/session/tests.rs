// Session flow tests

use std::{
    collections::HashMap,
    net::IpAddr,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream, WriteHalf},
    sync::Mutex,
};

use crate::{
    amf::AMF0Value,
    directory::{DestinationEndpoint, MemoryUserDirectory, StreamAuthorization},
    log::Logger,
    relay::{DestinationConnector, DestinationSink, ServicesCatalog},
    rtmp::{
        rtmp_make_invoke_message, rtmp_make_media_message, rtmp_make_stream_status_message,
        RtmpCommand, RtmpData, RTMP_HANDSHAKE_SIZE, RTMP_TYPE_AUDIO, RTMP_TYPE_DATA,
        RTMP_VERSION, STREAM_BEGIN,
    },
    server::{RelayConfiguration, RelayServerContext},
    session::{handle_rtmp_session, SessionContext},
    streams::{PublisherSession, StreamRegistry},
    utils::IpRangeConfig,
};

// Test doubles

struct RecordingSink {
    data: Arc<std::sync::Mutex<Vec<u8>>>,
    prepared: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl DestinationSink for RecordingSink {
    async fn prepare(&mut self, _inbound_chunk_size: usize) -> std::io::Result<()> {
        self.prepared.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.data.lock().unwrap().extend(bytes);
        Ok(())
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct OpenedSink {
    url: String,
    data: Arc<std::sync::Mutex<Vec<u8>>>,
    prepared: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

#[derive(Default)]
struct RecordingConnector {
    opened: std::sync::Mutex<Vec<OpenedSink>>,
}

#[async_trait]
impl DestinationConnector for RecordingConnector {
    async fn open(&self, url_with_key: &str) -> std::io::Result<Box<dyn DestinationSink>> {
        let data = Arc::new(std::sync::Mutex::new(Vec::new()));
        let prepared = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        self.opened.lock().unwrap().push(OpenedSink {
            url: url_with_key.to_string(),
            data: data.clone(),
            prepared: prepared.clone(),
            closed: closed.clone(),
        });

        Ok(Box::new(RecordingSink {
            data,
            prepared,
            closed,
        }))
    }
}

// Harness

fn test_config() -> RelayConfiguration {
    RelayConfiguration {
        port: 1935,
        bind_address: "127.0.0.1".to_string(),
        chunk_size: 4096,
        key_max_length: 128,
        max_concurrent_connections_per_ip: 4,
        max_concurrent_connections_whitelist: IpRangeConfig::new_from_string("").unwrap(),
        directory_url: "".to_string(),
        services_catalog_path: "".to_string(),
        log_requests: false,
    }
}

fn test_context(
    directory: MemoryUserDirectory,
    connector: Arc<RecordingConnector>,
) -> RelayServerContext {
    RelayServerContext {
        config: Arc::new(test_config()),
        registry: Arc::new(StreamRegistry::new()),
        directory: Arc::new(directory),
        connector,
        catalog: Arc::new(ServicesCatalog::empty()),
    }
}

struct TestClient {
    write: WriteHalf<DuplexStream>,
    received: Arc<std::sync::Mutex<Vec<u8>>>,
    reader_task: tokio::task::JoinHandle<()>,
    session_task: tokio::task::JoinHandle<()>,
}

/// Spawns a session over an in-memory stream and performs the
/// handshake and connect sequence from the client side
async fn start_client(server_context: &RelayServerContext, session_id: u64) -> TestClient {
    let (client, server) = tokio::io::duplex(1 << 20);

    let (server_read, server_write) = tokio::io::split(server);
    let (mut client_read, mut client_write) = tokio::io::split(client);

    let session_task = tokio::spawn(handle_rtmp_session(
        Arc::new(Logger::new_disabled()),
        server_context.clone(),
        SessionContext::new(session_id, IpAddr::from_str("127.0.0.1").unwrap()),
        server_read,
        Arc::new(Mutex::new(server_write)),
    ));

    // Handshake

    let mut c0_c1 = vec![0u8; 1 + RTMP_HANDSHAKE_SIZE];
    c0_c1[0] = RTMP_VERSION;

    client_write.write_all(&c0_c1).await.unwrap();

    let mut s0_s1_s2 = vec![0u8; 1 + 2 * RTMP_HANDSHAKE_SIZE];
    client_read.read_exact(&mut s0_s1_s2).await.unwrap();

    client_write
        .write_all(&s0_s1_s2[1..1 + RTMP_HANDSHAKE_SIZE])
        .await
        .unwrap();

    // Collect everything the server sends from now on

    let received = Arc::new(std::sync::Mutex::new(Vec::new()));
    let received_clone = received.clone();

    let reader_task = tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];

        while let Ok(n) = client_read.read(&mut buf).await {
            if n == 0 {
                break;
            }

            received_clone.lock().unwrap().extend(&buf[..n]);
        }
    });

    let mut client = TestClient {
        write: client_write,
        received,
        reader_task,
        session_task,
    };

    // Connect

    let mut connect_cmd = RtmpCommand::new("connect".to_string());

    connect_cmd.set_argument("transId", AMF0Value::Number { value: 1.0 });
    connect_cmd.set_argument(
        "cmdObj",
        AMF0Value::Object {
            properties: vec![(
                "app".to_string(),
                AMF0Value::String {
                    value: "live".to_string(),
                },
            )],
        },
    );

    client.send(&rtmp_make_invoke_message(&connect_cmd, 0, 4096)).await;

    client.wait_for(b"NetConnection.Connect.Success").await;

    // Create stream

    let mut create_stream_cmd = RtmpCommand::new("createStream".to_string());

    create_stream_cmd.set_argument("transId", AMF0Value::Number { value: 2.0 });
    create_stream_cmd.set_argument("cmdObj", AMF0Value::Null);

    client
        .send(&rtmp_make_invoke_message(&create_stream_cmd, 0, 4096))
        .await;

    client
}

impl TestClient {
    async fn send(&mut self, bytes: &[u8]) {
        self.write.write_all(bytes).await.unwrap();
    }

    async fn send_publish(&mut self, stream_name: &str) {
        let mut publish_cmd = RtmpCommand::new("publish".to_string());

        publish_cmd.set_argument("transId", AMF0Value::Number { value: 3.0 });
        publish_cmd.set_argument("cmdObj", AMF0Value::Null);
        publish_cmd.set_argument(
            "streamName",
            AMF0Value::String {
                value: stream_name.to_string(),
            },
        );
        publish_cmd.set_argument(
            "type",
            AMF0Value::String {
                value: "live".to_string(),
            },
        );

        self.send(&rtmp_make_invoke_message(&publish_cmd, 1, 4096)).await;
    }

    async fn send_play(&mut self, stream_name: &str) {
        let mut play_cmd = RtmpCommand::new("play".to_string());

        play_cmd.set_argument("transId", AMF0Value::Number { value: 4.0 });
        play_cmd.set_argument("cmdObj", AMF0Value::Null);
        play_cmd.set_argument(
            "streamName",
            AMF0Value::String {
                value: stream_name.to_string(),
            },
        );

        self.send(&rtmp_make_invoke_message(&play_cmd, 1, 4096)).await;
    }

    /// Waits until the pattern shows up in the received bytes
    async fn wait_for(&self, needle: &[u8]) -> usize {
        for _ in 0..500 {
            if let Some(pos) = find_subsequence(&self.received.lock().unwrap(), needle) {
                return pos;
            }

            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        panic!(
            "pattern not received: {:02X?} (got {} bytes)",
            needle,
            self.received.lock().unwrap().len()
        );
    }

    fn received_contains(&self, needle: &[u8]) -> bool {
        find_subsequence(&self.received.lock().unwrap(), needle).is_some()
    }

    /// Drops the client side of the connection
    fn disconnect(self) -> tokio::task::JoinHandle<()> {
        self.reader_task.abort();
        drop(self.write);

        self.session_task
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Waits for a condition with a timeout
async fn wait_until<F: Fn() -> bool>(cond: F, what: &str) {
    for _ in 0..500 {
        if cond() {
            return;
        }

        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("condition never satisfied: {}", what);
}

fn directory_with_two_destinations() -> MemoryUserDirectory {
    let mut entries = HashMap::new();

    entries.insert(
        "abc".to_string(),
        StreamAuthorization {
            authorized: true,
            destinations: vec![
                DestinationEndpoint {
                    name: "T".to_string(),
                    url: "rtmp://t.example/live".to_string(),
                    key: "key-t".to_string(),
                },
                DestinationEndpoint {
                    name: "Y".to_string(),
                    url: "rtmp://y.example/live".to_string(),
                    key: "key-y".to_string(),
                },
            ],
        },
    );

    MemoryUserDirectory::new(entries, false)
}

// Tests

#[tokio::test]
async fn test_publish_flow() {
    let connector = Arc::new(RecordingConnector::default());
    let server_context = test_context(directory_with_two_destinations(), connector.clone());

    let mut client = start_client(&server_context, 1).await;

    client.send_publish("abc").await;
    client.wait_for(b"NetStream.Publish.Start").await;

    // The registry holds the key, and a sink per destination is
    // open and prepared, each with its own destination key

    let publisher = server_context.registry.lookup("abc").await.unwrap();

    assert_eq!(publisher.session_id, 1);
    assert_eq!(publisher.app_name, "live");

    let urls: Vec<String> = connector
        .opened
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.url.clone())
        .collect();

    assert_eq!(
        urls,
        vec![
            "rtmp://t.example/live/key-t".to_string(),
            "rtmp://y.example/live/key-y".to_string(),
        ]
    );

    for sink in connector.opened.lock().unwrap().iter() {
        assert!(sink.prepared.load(Ordering::SeqCst));
    }

    // Stream metadata and media: the raw chunk bytes reach every sink
    // and the init caches fill up

    let mut metadata = RtmpData::new("@setDataFrame".to_string());

    metadata.set_argument(
        "method",
        AMF0Value::String {
            value: "onMetaData".to_string(),
        },
    );
    metadata.set_argument(
        "dataObj",
        AMF0Value::EcmaArray {
            items: vec![("duration".to_string(), AMF0Value::Number { value: 0.0 })],
        },
    );

    let metadata_payload = metadata.encode();
    let metadata_chunk = {
        let mut packet = crate::rtmp::RtmpPacket::new_blank();
        packet.header.channel_id = 6;
        packet.header.packet_type = RTMP_TYPE_DATA;
        packet.header.stream_id = 1;
        packet.payload = metadata_payload.clone();
        packet.header.length = packet.payload.len();
        packet.create_chunks(4096)
    };

    client.send(&metadata_chunk).await;

    let audio_payload: Vec<u8> = vec![0xAF, 0x00, 0x12, 0x10];
    let audio_chunk = rtmp_make_media_message(RTMP_TYPE_AUDIO, 1, &audio_payload, 0, 4096);

    client.send(&audio_chunk).await;

    let expected: Vec<u8> = [metadata_chunk.as_slice(), audio_chunk.as_slice()].concat();

    wait_until(
        || {
            connector
                .opened
                .lock()
                .unwrap()
                .iter()
                .all(|sink| *sink.data.lock().unwrap() == expected)
        },
        "sinks received the forwarded chunks",
    )
    .await;

    let frames = publisher.get_init_frames().await;

    assert_eq!(*frames.metadata.unwrap(), metadata_payload);
    assert_eq!(*frames.first_audio.unwrap(), audio_payload);
}

#[tokio::test]
async fn test_publish_unauthorized() {
    let connector = Arc::new(RecordingConnector::default());
    let server_context = test_context(directory_with_two_destinations(), connector.clone());

    let mut client = start_client(&server_context, 1).await;

    client.send_publish("unknown-key").await;
    client.wait_for(b"NetStream.Publish.BadName").await;

    assert!(server_context.registry.lookup("unknown-key").await.is_none());
    assert!(connector.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_stream_in_use() {
    let connector = Arc::new(RecordingConnector::default());
    let server_context = test_context(directory_with_two_destinations(), connector.clone());

    // Another session already owns the key
    server_context
        .registry
        .register(Arc::new(PublisherSession::new("abc", "live", 50)))
        .await
        .unwrap();

    let mut client = start_client(&server_context, 1).await;

    client.send_publish("abc").await;
    client.wait_for(b"NetStream.Publish.BadName").await;

    let publisher = server_context.registry.lookup("abc").await.unwrap();

    assert_eq!(publisher.session_id, 50);
}

#[tokio::test]
async fn test_publisher_teardown() {
    let connector = Arc::new(RecordingConnector::default());
    let server_context = test_context(directory_with_two_destinations(), connector.clone());

    let mut client = start_client(&server_context, 1).await;

    client.send_publish("abc").await;
    client.wait_for(b"NetStream.Publish.Start").await;

    assert!(server_context.registry.lookup("abc").await.is_some());

    // Publisher disconnect: every sink is closed and the key is freed
    let session_task = client.disconnect();
    session_task.await.unwrap();

    assert!(server_context.registry.lookup("abc").await.is_none());

    wait_until(
        || {
            connector
                .opened
                .lock()
                .unwrap()
                .iter()
                .all(|sink| sink.closed.load(Ordering::SeqCst))
        },
        "sinks closed on teardown",
    )
    .await;

    // The key is immediately publishable again
    server_context
        .registry
        .register(Arc::new(PublisherSession::new("abc", "live", 2)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_play_flow() {
    let connector = Arc::new(RecordingConnector::default());
    let server_context = test_context(directory_with_two_destinations(), connector.clone());

    // A publisher for "abc" exists, with cached init frames
    let publisher = Arc::new(PublisherSession::new("abc", "live", 99));

    let metadata: Vec<u8> = b"METADATA-PAYLOAD".to_vec();
    let first_audio: Vec<u8> = vec![0xAF, 0x00, 0xA1, 0xA2, 0xA3];
    let first_video: Vec<u8> = vec![0x17, 0x00, 0xB1, 0xB2, 0xB3];

    publisher.set_metadata(Arc::new(metadata.clone())).await;
    publisher.set_first_audio(Arc::new(first_audio.clone())).await;
    publisher.set_first_video(Arc::new(first_video.clone())).await;

    server_context.registry.register(publisher.clone()).await.unwrap();

    let mut client = start_client(&server_context, 2).await;

    client.send_play("abc").await;

    // The init sequence arrives in order: StreamBegin, Play.Start,
    // |RtmpSampleAccess, metadata, audio header, video header

    client.wait_for(&first_video).await;

    let stream_begin = rtmp_make_stream_status_message(STREAM_BEGIN, 1);

    let positions = [
        client.wait_for(&stream_begin).await,
        client.wait_for(b"NetStream.Play.Start").await,
        client.wait_for(b"|RtmpSampleAccess").await,
        client.wait_for(&metadata).await,
        client.wait_for(&first_audio).await,
        client.wait_for(&first_video).await,
    ];

    for pair in positions.windows(2) {
        assert!(pair[0] < pair[1], "init sequence out of order: {:?}", positions);
    }

    // Chunks broadcast before the next keyframe must not reach
    // the subscriber

    let pre_keyframe: Vec<u8> = b"MID-GOP-CHUNK".to_vec();

    publisher.broadcast_chunk(Arc::new(pre_keyframe.clone())).await;

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!client.received_contains(&pre_keyframe));

    // The keyframe promotes the subscriber, and from then on the
    // live chunks flow

    let keyframe: Vec<u8> = b"KEYFRAME-CHUNK".to_vec();
    let live: Vec<u8> = b"LIVE-CHUNK".to_vec();

    publisher.promote_waiting_egress(Arc::new(keyframe.clone())).await;
    publisher.broadcast_chunk(Arc::new(live.clone())).await;

    let keyframe_pos = client.wait_for(&keyframe).await;
    let live_pos = client.wait_for(&live).await;

    assert!(keyframe_pos < live_pos);
    assert!(!client.received_contains(&pre_keyframe));
}

#[tokio::test]
async fn test_play_stream_not_found() {
    let connector = Arc::new(RecordingConnector::default());
    let server_context = test_context(directory_with_two_destinations(), connector.clone());

    let mut client = start_client(&server_context, 1).await;

    client.send_play("missing").await;
    client.wait_for(b"NetStream.Play.StreamNotFound").await;
}
