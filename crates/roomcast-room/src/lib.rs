//! Room management for Roomcast.
//!
//! Rooms are plain data owned by a [`RoomDirectory`]; the server guards
//! the directory and the connection registry with a single lock, so
//! every join, leave, rename and seed change is atomic.
//!
//! # Key types
//!
//! - [`Room`]: bounded member set, display names, stored world seed
//! - [`RoomDirectory`]: creates rooms, joins/leaves players, deletes
//!   rooms the moment they empty, captures broadcast recipients
//! - [`deliver`]: fan-out to captured outboxes with per-recipient isolation
//! - [`RoomConfig`]: room settings (capacity)

mod config;
mod directory;
mod error;
mod room;

pub use config::RoomConfig;
pub use directory::{deliver, RoomDirectory};
pub use error::RoomError;
pub use room::Room;
