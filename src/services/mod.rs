//! Services
//!
//! The session core: the message store, the stream decoder, the lifecycle
//! controller with its polling fallback, and the collaborator seams it
//! drives.

pub mod backend;
pub mod http;
pub mod polling;
pub mod session;
pub mod store;
pub mod stream;

pub use backend::{ChunkStream, GraphTransport, InvocationClient, TurnStore};
pub use http::HttpBackend;
pub use polling::{InvocationPoller, INVOCATION_POLL_INTERVAL};
pub use session::ChatSession;
pub use store::MessageStore;
pub use stream::{FrameParser, StreamEvent, StreamFrame};
