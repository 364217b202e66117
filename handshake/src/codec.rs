//! Newline-delimited JSON framing for handshake records

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LinesCodec};

use crate::error::{HandshakeError, Result};

/// Serialize a message into a single JSON record (no trailing newline).
pub fn encode_record<M: Serialize>(message: &M) -> Result<String> {
    serde_json::to_string(message).map_err(Into::into)
}

/// Parse one JSON record.
pub fn decode_record<M: DeserializeOwned>(record: &str) -> Result<M> {
    serde_json::from_str(record).map_err(Into::into)
}

/// Frames handshake messages as JSON lines.
///
/// Decoding yields raw records so the state machines own parsing. A stream
/// that ends in the middle of a record is reported as
/// [`HandshakeError::ConnectionClosed`]; the partial bytes are dropped.
#[derive(Debug, Clone)]
pub struct HelloCodec {
    lines: LinesCodec,
}

impl HelloCodec {
    pub fn new(max_record_len: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_record_len),
        }
    }

    pub fn max_record_len(&self) -> usize {
        self.lines.max_length()
    }
}

impl Decoder for HelloCodec {
    type Item = String;
    type Error = HandshakeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        Ok(self.lines.decode(src)?)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => {
                src.clear();
                Err(HandshakeError::ConnectionClosed)
            }
        }
    }
}

impl<M: Serialize> Encoder<M> for HelloCodec {
    type Error = HandshakeError;

    fn encode(&mut self, message: M, dst: &mut BytesMut) -> Result<()> {
        let record = encode_record(&message)?;
        Ok(self.lines.encode(record, dst)?)
    }
}
