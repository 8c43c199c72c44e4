//! Local clipboard adapters implementing `PlatformClipboard`.
//!
//! Desktop clipboard access belongs to the windowing layer the client is
//! embedded in; that layer supplies its own implementation. The in-memory
//! clipboard here backs the headless binary and the tests.

pub mod memory;

pub use memory::MemoryClipboard;
