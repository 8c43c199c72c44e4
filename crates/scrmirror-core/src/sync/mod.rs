//! Thread handoff primitives shared by the client channels.

pub mod bounded_queue;
pub mod frame_buffer;

pub use bounded_queue::{BoundedQueue, QueueClosed};
pub use frame_buffer::{FrameBuffer, FrameBufferError, FramePolicy, RenderGuard};
