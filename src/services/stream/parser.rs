//! Frame Parser
//!
//! Stateful splitter for the execution stream. Raw transport chunks are
//! accumulated and cut at the blank-line record separator; each complete
//! fragment is decoded into a [`StreamFrame`]. A malformed fragment is
//! logged and skipped so a single bad frame never kills the stream.

use super::event::{decode_fragment, StreamFrame};

/// Record separator between frames
const FRAME_SEPARATOR: &str = "\n\n";

/// Stateful frame parser for one stream.
///
/// Not restartable: create a fresh parser per stream.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: String,
}

impl FrameParser {
    /// Create a parser for a new stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw transport chunk, returning the frames completed by it
    /// in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(separator) = self.buffer.find(FRAME_SEPARATOR) {
            let fragment = self.buffer[..separator].to_string();
            self.buffer.drain(..separator + FRAME_SEPARATOR.len());

            if let Some(frame) = Self::decode(&fragment) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush any trailing fragment once the transport has closed.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        let fragment = std::mem::take(&mut self.buffer);
        Self::decode(&fragment).into_iter().collect()
    }

    fn decode(fragment: &str) -> Option<StreamFrame> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return None;
        }
        match decode_fragment(fragment) {
            Ok(frame) => Some(frame),
            Err(err) => {
                tracing::warn!("[FrameParser] Skipping frame: {}", err);
                None
            }
        }
    }
}
