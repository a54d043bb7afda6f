//! Unified error types for the rack controller core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! firmware entry point's error handling uniform. Variants are `Copy` so they
//! can be passed through the servicing cycle without allocation.
//!
//! Connectivity loss is not an error here: gated operations
//! degrade to [`PublishError::Offline`] instead.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bring-up step failed in a way that cannot be deferred.
    Init(&'static str),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation. The message names the field.
    ValidationFailed(&'static str),
    /// Persistent storage could not be read or written.
    Storage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Storage => write!(f, "storage I/O failed"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Messaging errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`MessagingPort`](crate::app::ports::MessagingPort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingError {
    /// No broker session is currently established.
    NotConnected,
    /// The client refused or failed to queue the packet.
    SendFailed,
    /// Topic or payload exceeds what the client can buffer.
    TooLarge,
}

impl fmt::Display for MessagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected to broker"),
            Self::SendFailed => write!(f, "send failed"),
            Self::TooLarge => write!(f, "packet too large"),
        }
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// The network link is down; nothing was handed to the messaging client.
    Offline,
    /// The document could not be serialised.
    Encode,
    /// The messaging client rejected the publish.
    Rejected(MessagingError),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "network link down"),
            Self::Encode => write!(f, "document encoding failed"),
            Self::Rejected(e) => write!(f, "rejected by messaging client: {e}"),
        }
    }
}

impl core::error::Error for MessagingError {}

impl core::error::Error for PublishError {}

impl From<MessagingError> for PublishError {
    fn from(e: MessagingError) -> Self {
        Self::Rejected(e)
    }
}
