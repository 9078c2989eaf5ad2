//! Real-time metrics stream
//!
//! - [`controller`]: connection lifecycle, duplicate suppression, reconnects
//! - [`sse`]: `text/event-stream` framing used by the HTTP transport

pub mod controller;
pub mod sse;

pub use controller::{
    MessageStream, StreamConnectionState, StreamController, StreamSettings, StreamStatus,
    StreamTransport, Subscription,
};
pub use sse::SseDecoder;
