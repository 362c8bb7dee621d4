// RTMP data messages (AMF0 type 18)

use std::{collections::HashMap, sync::LazyLock};

use crate::amf::{AMF0DecodeError, AMF0Value, AMFDecodingCursor};

/// RTMP data message
pub struct RtmpData {
    /// Data tag
    pub tag: String,

    /// Named arguments
    pub arguments: HashMap<String, AMF0Value>,
}

static RTMP_DATA_ARGUMENTS: LazyLock<HashMap<&'static str, Vec<&'static str>>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        m.insert("@setDataFrame", vec!["method", "dataObj"]);
        m.insert("onMetaData", vec!["dataObj"]);
        m.insert("|RtmpSampleAccess", vec!["bool1", "bool2"]);

        m
    });

impl RtmpData {
    /// Creates RtmpData
    pub fn new(tag: String) -> RtmpData {
        RtmpData {
            tag,
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

    /// Encodes the data message
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = AMF0Value::String {
            value: self.tag.clone(),
        }
        .encode();

        if let Some(arg_list) = RTMP_DATA_ARGUMENTS.get(self.tag.as_str()) {
            for arg_name in arg_list {
                if let Some(val) = self.arguments.get(*arg_name) {
                    buf.extend(val.encode());
                }
            }
        }

        buf
    }

    /// Decodes a data message from bytes
    pub fn decode(data: &[u8]) -> Result<RtmpData, AMF0DecodeError> {
        let mut cursor = AMFDecodingCursor::new(data);

        let tag_amf = AMF0Value::read(&mut cursor)?;
        let tag = tag_amf.get_string();

        let mut d = RtmpData::new(tag.to_string());

        if let Some(arg_list) = RTMP_DATA_ARGUMENTS.get(tag) {
            let mut i: usize = 0;

            while i < arg_list.len() && !cursor.ended() {
                let val = AMF0Value::read(&mut cursor)?;

                d.set_argument(arg_list[i], val);

                i += 1;
            }
        }

        Ok(d)
    }
}
