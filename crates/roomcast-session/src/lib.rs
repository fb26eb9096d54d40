//! Connection registry for Roomcast.
//!
//! This crate knows who is connected:
//!
//! 1. **Identity**: handing out a fresh [`PlayerId`] per handshake
//!    ([`ConnectionRegistry::register`])
//! 2. **Delivery**: each [`Session`] carries the [`Outbox`] through
//!    which any task can queue text for that connection
//! 3. **Room pointer**: which room, if any, the player is in
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← reads room pointers and outboxes, updates them on join/leave
//!     ↕
//! Session Layer (this crate)  ← identities and delivery handles
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, RoomId
//! ```
//!
//! [`PlayerId`]: roomcast_protocol::PlayerId

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::ConnectionRegistry;
pub use session::{outbox, Outbox, OutboxReceiver, Session};
