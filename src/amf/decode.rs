// AMF decoding cursor

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// AMF0 decoding error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AMF0DecodeError {
    #[error("unknown AMF0 marker: 0x{marker:02x}")]
    UnknownMarker { marker: u8 },

    #[error("unexpected end of AMF0 buffer")]
    UnexpectedEnd,

    #[error("AMF0 string is not valid UTF-8")]
    InvalidString,
}

/// Cursor over a buffer being decoded
pub struct AMFDecodingCursor<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> AMFDecodingCursor<'a> {
    /// Creates a cursor over a buffer
    pub fn new(buffer: &'a [u8]) -> AMFDecodingCursor<'a> {
        AMFDecodingCursor { buffer, pos: 0 }
    }

    /// Reads n bytes, advancing the cursor
    pub fn read(&mut self, n: usize) -> Result<&'a [u8], AMF0DecodeError> {
        if self.pos + n > self.buffer.len() {
            return Err(AMF0DecodeError::UnexpectedEnd);
        }

        let pos = self.pos;
        self.pos += n;

        Ok(&self.buffer[pos..pos + n])
    }

    /// Reads a single byte
    pub fn read_u8(&mut self) -> Result<u8, AMF0DecodeError> {
        Ok(self.read(1)?[0])
    }

    /// Reads a big-endian u16
    pub fn read_u16(&mut self) -> Result<u16, AMF0DecodeError> {
        Ok(BigEndian::read_u16(self.read(2)?))
    }

    /// Reads a big-endian i16
    pub fn read_i16(&mut self) -> Result<i16, AMF0DecodeError> {
        Ok(BigEndian::read_i16(self.read(2)?))
    }

    /// Reads a big-endian u32
    pub fn read_u32(&mut self) -> Result<u32, AMF0DecodeError> {
        Ok(BigEndian::read_u32(self.read(4)?))
    }

    /// Reads a big-endian f64
    pub fn read_f64(&mut self) -> Result<f64, AMF0DecodeError> {
        Ok(BigEndian::read_f64(self.read(8)?))
    }

    /// Reads a length-prefixed UTF-8 string (u16 length)
    pub fn read_short_string(&mut self) -> Result<String, AMF0DecodeError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read(len)?;

        String::from_utf8(bytes.to_vec()).map_err(|_| AMF0DecodeError::InvalidString)
    }

    /// Reads a length-prefixed UTF-8 string (u32 length)
    pub fn read_long_string(&mut self) -> Result<String, AMF0DecodeError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read(len)?;

        String::from_utf8(bytes.to_vec()).map_err(|_| AMF0DecodeError::InvalidString)
    }

    /// Returns true if the cursor reached the end of the buffer
    pub fn ended(&self) -> bool {
        self.pos >= self.buffer.len()
    }
}
