// AMF0 value

use byteorder::{BigEndian, ByteOrder};

use super::{AMF0DecodeError, AMFDecodingCursor};

const AMF0_TYPE_NUMBER: u8 = 0x00;
const AMF0_TYPE_BOOL: u8 = 0x01;
const AMF0_TYPE_STRING: u8 = 0x02;
const AMF0_TYPE_OBJECT: u8 = 0x03;
const AMF0_TYPE_NULL: u8 = 0x05;
const AMF0_TYPE_UNDEFINED: u8 = 0x06;
const AMF0_TYPE_ECMA_ARRAY: u8 = 0x08;
const AMF0_TYPE_STRICT_ARRAY: u8 = 0x0A;
const AMF0_TYPE_DATE: u8 = 0x0B;
const AMF0_TYPE_LONG_STRING: u8 = 0x0C;

const AMF0_OBJECT_TERM_CODE: u8 = 0x09;

/// Max length of a short string (longer strings are encoded as long strings)
const AMF0_SHORT_STRING_MAX_LENGTH: usize = 0xFFFF;

/// AMF0 compatible value
///
/// Objects and ECMA arrays keep their properties in author order,
/// since the wire format is an ordered pair list
#[derive(Debug, Clone, PartialEq)]
pub enum AMF0Value {
    Number {
        value: f64,
    },
    Bool {
        value: bool,
    },
    String {
        value: String,
    },
    Object {
        properties: Vec<(String, AMF0Value)>,
    },
    Null,
    Undefined,
    EcmaArray {
        items: Vec<(String, AMF0Value)>,
    },
    StrictArray {
        items: Vec<AMF0Value>,
    },
    Date {
        timestamp: f64,
        timezone: i16,
    },
    LongString {
        value: String,
    },
}

impl AMF0Value {
    // Value check functions:

    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, AMF0Value::Undefined)
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AMF0Value::Null)
    }

    /// Returns the value as boolean
    pub fn get_bool(&self) -> bool {
        match self {
            AMF0Value::Bool { value } => *value,
            AMF0Value::Number { value } => *value != 0.0,
            _ => false,
        }
    }

    /// Returns the value as integer
    pub fn get_integer(&self) -> i64 {
        match self {
            AMF0Value::Number { value } => *value as i64,
            AMF0Value::Date { timestamp, .. } => *timestamp as i64,
            _ => 0,
        }
    }

    /// Returns the value as float
    pub fn get_float(&self) -> f64 {
        match self {
            AMF0Value::Number { value } => *value,
            AMF0Value::Date { timestamp, .. } => *timestamp,
            _ => 0.0,
        }
    }

    /// Returns the value as string
    pub fn get_string(&self) -> &str {
        match self {
            AMF0Value::String { value } => value.as_str(),
            AMF0Value::LongString { value } => value.as_str(),
            _ => "",
        }
    }

    /// Returns the properties of the value (for objects and ECMA arrays)
    pub fn get_object(&self) -> Option<&Vec<(String, AMF0Value)>> {
        match self {
            AMF0Value::Object { properties } => Some(properties),
            AMF0Value::EcmaArray { items } => Some(items),
            _ => None,
        }
    }

    /// Gets the value of a property (for objects and ECMA arrays)
    pub fn get_object_property(&self, property_name: &str) -> Option<&AMF0Value> {
        self.get_object()?
            .iter()
            .find(|(key, _)| key == property_name)
            .map(|(_, value)| value)
    }

    /// Returns the value as array (for strict arrays)
    pub fn get_array(&self) -> Option<&Vec<AMF0Value>> {
        match self {
            AMF0Value::StrictArray { items } => Some(items),
            _ => None,
        }
    }

    // Encoding functions:

    /// Encodes the value into bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AMF0Value::Number { value } => {
                let mut buf = vec![AMF0_TYPE_NUMBER];
                buf.extend(Self::encode_number(*value));
                buf
            }
            AMF0Value::Bool { value } => {
                vec![AMF0_TYPE_BOOL, if *value { 0x01 } else { 0x00 }]
            }
            AMF0Value::String { value } => {
                if value.len() > AMF0_SHORT_STRING_MAX_LENGTH {
                    let mut buf = vec![AMF0_TYPE_LONG_STRING];
                    buf.extend(Self::encode_long_string(value));
                    buf
                } else {
                    let mut buf = vec![AMF0_TYPE_STRING];
                    buf.extend(Self::encode_short_string(value));
                    buf
                }
            }
            AMF0Value::Object { properties } => {
                let mut buf = vec![AMF0_TYPE_OBJECT];
                buf.extend(Self::encode_pair_list(properties));
                buf
            }
            AMF0Value::Null => vec![AMF0_TYPE_NULL],
            AMF0Value::Undefined => vec![AMF0_TYPE_UNDEFINED],
            AMF0Value::EcmaArray { items } => {
                let mut buf = vec![AMF0_TYPE_ECMA_ARRAY, 0, 0, 0, 0];
                BigEndian::write_u32(&mut buf[1..5], items.len() as u32);
                buf.extend(Self::encode_pair_list(items));
                buf
            }
            AMF0Value::StrictArray { items } => {
                let mut buf = vec![AMF0_TYPE_STRICT_ARRAY, 0, 0, 0, 0];
                BigEndian::write_u32(&mut buf[1..5], items.len() as u32);

                for item in items {
                    buf.extend(item.encode());
                }

                buf
            }
            AMF0Value::Date {
                timestamp,
                timezone,
            } => {
                let mut buf = vec![AMF0_TYPE_DATE];
                buf.extend(Self::encode_number(*timestamp));

                let mut tz = vec![0; 2];
                BigEndian::write_i16(&mut tz, *timezone);
                buf.extend(tz);

                buf
            }
            AMF0Value::LongString { value } => {
                let mut buf = vec![AMF0_TYPE_LONG_STRING];
                buf.extend(Self::encode_long_string(value));
                buf
            }
        }
    }

    /// Encodes a number value
    fn encode_number(num: f64) -> Vec<u8> {
        let mut buf = vec![0; 8];
        BigEndian::write_f64(&mut buf, num);
        buf
    }

    /// Encodes a short string value (u16 length prefix)
    fn encode_short_string(s: &str) -> Vec<u8> {
        let mut buf = vec![0; 2];
        BigEndian::write_u16(&mut buf, s.len() as u16);
        buf.extend(s.bytes());
        buf
    }

    /// Encodes a long string value (u32 length prefix)
    fn encode_long_string(s: &str) -> Vec<u8> {
        let mut buf = vec![0; 4];
        BigEndian::write_u32(&mut buf, s.len() as u32);
        buf.extend(s.bytes());
        buf
    }

    /// Encodes an ordered pair list, followed by the object end marker
    fn encode_pair_list(pairs: &[(String, AMF0Value)]) -> Vec<u8> {
        let mut buf = Vec::new();

        for (key, value) in pairs {
            buf.extend(Self::encode_short_string(key));
            buf.extend(value.encode());
        }

        buf.extend(Self::encode_short_string(""));
        buf.push(AMF0_OBJECT_TERM_CODE);

        buf
    }

    // Decoding functions:

    /// Reads a single value from the cursor
    pub fn read(cursor: &mut AMFDecodingCursor) -> Result<AMF0Value, AMF0DecodeError> {
        let marker = cursor.read_u8()?;

        match marker {
            AMF0_TYPE_NUMBER => Ok(AMF0Value::Number {
                value: cursor.read_f64()?,
            }),
            AMF0_TYPE_BOOL => Ok(AMF0Value::Bool {
                value: cursor.read_u8()? != 0,
            }),
            AMF0_TYPE_STRING => Ok(AMF0Value::String {
                value: cursor.read_short_string()?,
            }),
            AMF0_TYPE_OBJECT => Ok(AMF0Value::Object {
                properties: Self::read_pair_list(cursor)?,
            }),
            AMF0_TYPE_NULL => Ok(AMF0Value::Null),
            AMF0_TYPE_UNDEFINED => Ok(AMF0Value::Undefined),
            AMF0_TYPE_ECMA_ARRAY => {
                // The associative count is advisory, the pair list
                // ends with the regular object end marker
                let _count = cursor.read_u32()?;

                Ok(AMF0Value::EcmaArray {
                    items: Self::read_pair_list(cursor)?,
                })
            }
            AMF0_TYPE_STRICT_ARRAY => {
                let count = cursor.read_u32()? as usize;
                let mut items = Vec::with_capacity(count.min(1024));

                for _ in 0..count {
                    items.push(Self::read(cursor)?);
                }

                Ok(AMF0Value::StrictArray { items })
            }
            AMF0_TYPE_DATE => {
                let timestamp = cursor.read_f64()?;
                let timezone = cursor.read_i16()?;

                Ok(AMF0Value::Date {
                    timestamp,
                    timezone,
                })
            }
            AMF0_TYPE_LONG_STRING => Ok(AMF0Value::LongString {
                value: cursor.read_long_string()?,
            }),
            _ => Err(AMF0DecodeError::UnknownMarker { marker }),
        }
    }

    /// Reads an ordered pair list, up to the object end marker
    fn read_pair_list(
        cursor: &mut AMFDecodingCursor,
    ) -> Result<Vec<(String, AMF0Value)>, AMF0DecodeError> {
        let mut pairs = Vec::new();

        loop {
            let key = cursor.read_short_string()?;

            if key.is_empty() {
                let terminator = cursor.read_u8()?;

                if terminator == AMF0_OBJECT_TERM_CODE {
                    return Ok(pairs);
                }

                return Err(AMF0DecodeError::UnknownMarker { marker: terminator });
            }

            let value = Self::read(cursor)?;

            pairs.push((key, value));
        }
    }
}

/// Decodes a full buffer into a sequence of AMF0 values
pub fn amf0_decode_all(data: &[u8]) -> Result<Vec<AMF0Value>, AMF0DecodeError> {
    let mut cursor = AMFDecodingCursor::new(data);
    let mut values = Vec::new();

    while !cursor.ended() {
        values.push(AMF0Value::read(&mut cursor)?);
    }

    Ok(values)
}

/// Encodes a sequence of AMF0 values into a buffer
pub fn amf0_encode_all(values: &[AMF0Value]) -> Vec<u8> {
    let mut buf = Vec::new();

    for value in values {
        buf.extend(value.encode());
    }

    buf
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amf0_command_round_trip() {
        let values = vec![
            AMF0Value::String {
                value: "connect".to_string(),
            },
            AMF0Value::Number { value: 1.0 },
            AMF0Value::Object {
                properties: vec![(
                    "app".to_string(),
                    AMF0Value::String {
                        value: "live".to_string(),
                    },
                )],
            },
            AMF0Value::Null,
        ];

        let encoded = amf0_encode_all(&values);
        let decoded = amf0_decode_all(&encoded).unwrap();

        assert_eq!(decoded, values);
    }

    #[test]
    fn test_amf0_bool_encoding() {
        let encoded_false = AMF0Value::Bool { value: false }.encode();

        assert_eq!(encoded_false, vec![0x01, 0x00]);

        let encoded_true = AMF0Value::Bool { value: true }.encode();

        assert_eq!(encoded_true, vec![0x01, 0x01]);
    }

    #[test]
    fn test_amf0_object_order_preserved() {
        let value = AMF0Value::Object {
            properties: vec![
                ("zebra".to_string(), AMF0Value::Number { value: 1.0 }),
                ("alpha".to_string(), AMF0Value::Number { value: 2.0 }),
            ],
        };

        let decoded = amf0_decode_all(&value.encode()).unwrap();

        match &decoded[0] {
            AMF0Value::Object { properties } => {
                assert_eq!(properties[0].0, "zebra");
                assert_eq!(properties[1].0, "alpha");
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_amf0_ecma_array_and_date() {
        let values = vec![
            AMF0Value::EcmaArray {
                items: vec![(
                    "duration".to_string(),
                    AMF0Value::Number { value: 0.0 },
                )],
            },
            AMF0Value::Date {
                timestamp: 1234567890.0,
                timezone: 0,
            },
            AMF0Value::StrictArray {
                items: vec![AMF0Value::Bool { value: true }, AMF0Value::Null],
            },
        ];

        let decoded = amf0_decode_all(&amf0_encode_all(&values)).unwrap();

        assert_eq!(decoded, values);
    }

    #[test]
    fn test_amf0_unknown_marker() {
        let err = amf0_decode_all(&[0x22, 0x00]).unwrap_err();

        assert_eq!(err, AMF0DecodeError::UnknownMarker { marker: 0x22 });
    }

    #[test]
    fn test_amf0_truncated_buffer() {
        // Number marker with only 4 of the 8 payload bytes
        let err = amf0_decode_all(&[0x00, 0x01, 0x02, 0x03, 0x04]).unwrap_err();

        assert_eq!(err, AMF0DecodeError::UnexpectedEnd);
    }
}
