//! Message-bus seam for the Anvil installer client.
//!
//! The installer's services live behind an asynchronous message bus.
//! This crate defines the neutral vocabulary the client stack speaks:
//! the [`MessageBus`] trait (request/response plus topic subscriptions),
//! the [`Signal`] push-notification type, bus address resolution, and an
//! in-process [`MemoryBus`] for embedding and tests. Real socket
//! transports implement [`MessageBus`] in their own crates.

pub mod address;
pub mod bus;
pub mod error;
pub mod memory;
pub mod message;

// ── Primary re-exports ──────────────────────────────────────────────
pub use address::{ADDRESS_FILE, BusAddress, DEFAULT_ADDRESS};
pub use bus::MessageBus;
pub use error::BusError;
pub use memory::MemoryBus;
pub use message::{SERVICE_VANISHED, Signal, SignalStream, topic_matches};
