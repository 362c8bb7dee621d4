// RTMP command

use std::{collections::HashMap, sync::LazyLock};

use crate::amf::{AMF0DecodeError, AMF0Value, AMFDecodingCursor};

/// RTMP command
///
/// Commands travel as an AMF0 sequence: the command name, the numeric
/// transaction id and then positional arguments. Known commands get a
/// name for each position so handlers can look arguments up by key.
pub struct RtmpCommand {
    /// Command name
    pub cmd: String,

    /// Named arguments
    pub arguments: HashMap<String, AMF0Value>,
}

static RTMP_COMMAND_ARGUMENTS: LazyLock<HashMap<&'static str, Vec<&'static str>>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        m.insert("_result", vec!["transId", "cmdObj", "info"]);
        m.insert("_error", vec!["transId", "cmdObj", "info", "streamId"]);
        m.insert("onStatus", vec!["transId", "cmdObj", "info"]);

        m.insert("connect", vec!["transId", "cmdObj", "args"]);
        m.insert("call", vec!["transId", "cmdObj", "args"]);
        m.insert("createStream", vec!["transId", "cmdObj"]);
        m.insert("close", vec!["transId", "cmdObj"]);

        m.insert("releaseStream", vec!["transId", "cmdObj", "streamName"]);
        m.insert("FCPublish", vec!["transId", "cmdObj", "streamName"]);
        m.insert("FCUnpublish", vec!["transId", "cmdObj", "streamName"]);

        m.insert(
            "publish",
            vec!["transId", "cmdObj", "streamName", "type"],
        );
        m.insert(
            "play",
            vec![
                "transId",
                "cmdObj",
                "streamName",
                "start",
                "duration",
                "reset",
            ],
        );

        m.insert("deleteStream", vec!["transId", "cmdObj", "streamId"]);
        m.insert("closeStream", vec!["transId", "cmdObj"]);
        m.insert("pause", vec!["transId", "cmdObj", "pause", "ms"]);

        m
    });

impl RtmpCommand {
    /// Creates RtmpCommand
    pub fn new(cmd: String) -> RtmpCommand {
        RtmpCommand {
            cmd,
            arguments: HashMap::new(),
        }
    }

    /// Sets argument
    pub fn set_argument(&mut self, arg_name: &str, value: AMF0Value) {
        self.arguments.insert(arg_name.to_string(), value);
    }

    /// Gets argument
    pub fn get_argument(&self, arg_name: &str) -> Option<&AMF0Value> {
        self.arguments.get(arg_name)
    }

    /// Gets the transaction id, or 0 if missing
    pub fn get_transaction_id(&self) -> i64 {
        match self.get_argument("transId") {
            Some(t) => t.get_integer(),
            None => 0,
        }
    }

    /// Gets the stream name argument (for publish / play / release commands)
    pub fn get_stream_name(&self) -> Option<&str> {
        match self.get_argument("streamName") {
            Some(AMF0Value::String { value }) => Some(value.as_str()),
            Some(AMF0Value::LongString { value }) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Encodes the command
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = AMF0Value::String {
            value: self.cmd.clone(),
        }
        .encode();

        if let Some(arg_list) = RTMP_COMMAND_ARGUMENTS.get(self.cmd.as_str()) {
            for arg_name in arg_list {
                match self.arguments.get(*arg_name) {
                    Some(val) => {
                        buf.extend(val.encode());
                    }
                    None => {
                        // Arguments are positional, a gap ends the list
                        break;
                    }
                }
            }
        }

        buf
    }

    /// Decodes a command from bytes
    pub fn decode(data: &[u8]) -> Result<RtmpCommand, AMF0DecodeError> {
        let mut cursor = AMFDecodingCursor::new(data);

        let cmd_amf = AMF0Value::read(&mut cursor)?;
        let cmd = cmd_amf.get_string();

        let mut c = RtmpCommand::new(cmd.to_string());

        if let Some(arg_list) = RTMP_COMMAND_ARGUMENTS.get(cmd) {
            let mut i: usize = 0;

            while i < arg_list.len() && !cursor.ended() {
                let val = AMF0Value::read(&mut cursor)?;

                c.set_argument(arg_list[i], val);

                i += 1;
            }
        }

        Ok(c)
    }
}

// Tests
