// RTMP session status model

use std::sync::Arc;

use crate::streams::PublisherSession;

/// Stages of an RTMP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    /// Performing the handshake
    Handshake,

    /// Dispatching AMF0 commands
    Command,

    /// Ingesting (publisher) or egressing (player) media
    Streaming,

    /// Terminal stage
    Closed,
}

/// RTMP session status
///
/// Owned and mutated by the session task only.
pub struct RtmpSessionStatus {
    /// Current stage
    pub stage: SessionStage,

    /// App name, set by the connect command
    pub channel: Option<String>,

    /// Counter for createStream
    pub streams: u64,

    /// True if the session is publishing
    pub is_publisher: bool,

    /// True if the session is playing
    pub is_player: bool,

    /// Message stream id the publish command used
    pub publish_stream_id: u32,

    /// Message stream id the play command used
    pub play_stream_id: u32,

    /// Shared publisher state, present while publishing
    pub publisher: Option<Arc<PublisherSession>>,
}

impl RtmpSessionStatus {
    /// Creates the initial session status
    pub fn new() -> RtmpSessionStatus {
        RtmpSessionStatus {
            stage: SessionStage::Handshake,
            channel: None,
            streams: 0,
            is_publisher: false,
            is_player: false,
            publish_stream_id: 0,
            play_stream_id: 0,
            publisher: None,
        }
    }
}

impl Default for RtmpSessionStatus {
    fn default() -> Self {
        Self::new()
    }
}
