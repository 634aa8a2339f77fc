//! Execution Stream Decoding
//!
//! Turns the raw chunked body of a graph execution stream into discrete,
//! typed event frames. Chunks do not align with frame boundaries, so the
//! parser buffers across chunks; malformed frames are logged and skipped
//! without terminating stream consumption.

pub mod event;
pub mod parser;

// Re-export main types
pub use event::{FrameError, StreamEvent, StreamFrame};
pub use parser::FrameParser;
