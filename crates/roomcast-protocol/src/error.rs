//! Error types for the protocol layer.
//!
//! Each crate in Roomcast defines its own error enum. A `ProtocolError`
//! always means the client sent text that could not be understood; it
//! never means the connection or the rooms are in a bad state.

/// Errors that can occur while decoding client input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A field that must be a decimal number was not one.
    ///
    /// `field` names what the server asked for ("player ID", "room ID"),
    /// `value` is the raw text the client sent back.
    #[error("invalid {field}: '{value}'")]
    InvalidNumber {
        /// Human-readable name of the expected field.
        field: &'static str,
        /// The text that failed to parse.
        value: String,
    },

    /// The message is structurally invalid.
    ///
    /// For example, a `MoveTo` payload without three comma-separated
    /// parts, or an empty world seed.
    #[error("invalid {field}: '{value}'")]
    InvalidMessage {
        /// Human-readable name of the expected field.
        field: &'static str,
        /// The text that was rejected.
        value: String,
    },
}
