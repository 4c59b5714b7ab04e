//! Bracketed frame parsing and NUL-delimited stream reassembly
//!
//! Every message on both robot ports has the shape `[code][payload]` and is
//! terminated by a NUL byte. Replies may be concatenated in one read or split
//! across several, so the reader keeps the unterminated tail between reads.

use super::decode::{decode_payload, Value};
use crate::{MecaError, Result};

/// Message terminator on the wire
pub const TERMINATOR: u8 = 0;

/// One `[code][payload]` unit of the wire protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: u32,
    pub payload: String,
}

impl Frame {
    pub fn new(code: u32, payload: impl Into<String>) -> Self {
        Self {
            code,
            payload: payload.into(),
        }
    }

    /// Parse a single segment (terminator already removed)
    ///
    /// Stray NUL bytes and surrounding whitespace are ignored. The code must be
    /// a decimal number and the payload must be enclosed in one bracket pair.
    pub fn parse(segment: &str) -> Result<Self> {
        let cleaned = segment.replace('\0', "");
        let text = cleaned.trim();

        let rest = text
            .strip_prefix('[')
            .ok_or_else(|| MecaError::Protocol(format!("Frame must start with '[': {:?}", text)))?;
        let (code, rest) = rest
            .split_once(']')
            .ok_or_else(|| MecaError::Protocol(format!("Unterminated response code: {:?}", text)))?;
        let code = code
            .trim()
            .parse::<u32>()
            .map_err(|_| MecaError::Protocol(format!("Invalid response code {:?}", code)))?;

        let payload = rest
            .strip_prefix('[')
            .and_then(|p| p.strip_suffix(']'))
            .ok_or_else(|| MecaError::Protocol(format!("Malformed payload for code {}: {:?}", code, rest)))?;

        Ok(Self::new(code, payload))
    }

    /// Decode the payload according to this frame's code
    pub fn decode(&self) -> Value {
        decode_payload(self.code, &self.payload)
    }

    /// Wire representation including the terminator
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = format!("[{}][{}]", self.code, self.payload).into_bytes();
        bytes.push(TERMINATOR);
        bytes
    }
}

/// Splits an unbounded byte stream into complete NUL-terminated segments
///
/// After every [`push`](Self::push) exactly one trailing fragment is retained
/// (possibly empty); it is prepended to the next chunk before re-splitting.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    partial: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes, returning all segments it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut data = std::mem::take(&mut self.partial);
        data.extend_from_slice(chunk);

        let mut segments: Vec<&[u8]> = data.split(|b| *b == TERMINATOR).collect();
        // split always yields at least one element, the unterminated tail
        let tail = segments.pop().unwrap_or_default();
        self.partial = tail.to_vec();

        segments
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .map(|segment| String::from_utf8_lossy(segment).into_owned())
            .collect()
    }

    /// Feed bytes and parse each completed segment into a frame
    ///
    /// Segments that are not valid frames are logged and skipped.
    pub fn push_frames(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.push(chunk)
            .iter()
            .filter_map(|segment| match Frame::parse(segment) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::debug!("Skipping unparsable segment: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Bytes buffered from an unterminated frame
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }

    pub fn clear(&mut self) {
        self.partial.clear();
    }
}
