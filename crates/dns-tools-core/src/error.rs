//! Error types for dns-tools
//!
//! Every failure the core can observe falls into one of a small, closed set
//! of kinds. Each variant carries the structured context a caller needs to
//! act on it (record id, FQDN, attempted address) so tests and callers can
//! match on the kind instead of parsing message text.

use std::net::IpAddr;
use thiserror::Error;

/// Result type alias for dns-tools operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dns-tools
#[derive(Error, Debug)]
pub enum Error {
    /// Address lookup, zone resolution or record listing failed.
    ///
    /// Retried on the next tick; no state changes.
    #[error("Lookup of {what} failed: {message}")]
    TransientLookup {
        /// What was being looked up (e.g. "current address", "zone example.com")
        what: String,
        /// Underlying failure
        message: String,
    },

    /// An address or record content did not parse.
    ///
    /// Aborts the current reconciliation pass.
    #[error("Malformed data {input:?}: {context}")]
    MalformedData {
        /// The offending input
        input: String,
        /// Where the input came from
        context: String,
    },

    /// The state store could not be read or written
    #[error("State store error for key {key}: {message}")]
    Persistence {
        /// State key
        key: String,
        /// Underlying failure
        message: String,
    },

    /// A notification sink rejected or failed to deliver a message
    #[error("Notification via {sink} failed: {message}")]
    Notification {
        /// Sink name (e.g. "slack", "cloudevents")
        sink: String,
        /// Underlying failure
        message: String,
    },

    /// A single record update failed; the pass continues with other records
    #[error("Update of record {fqdn} ({record_id}) to {attempted} failed: {message}")]
    RecordUpdate {
        /// Provider record id
        record_id: String,
        /// Record name
        fqdn: String,
        /// Address the update tried to set
        attempted: IpAddr,
        /// Underlying failure
        message: String,
    },

    /// Missing or invalid configuration detected at startup
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Discriminant of [`Error`] without its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransientLookup,
    MalformedData,
    Persistence,
    Notification,
    RecordUpdate,
    Configuration,
}

impl Error {
    /// Create a transient lookup error
    pub fn lookup(what: impl Into<String>, message: impl ToString) -> Self {
        Self::TransientLookup {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed data error
    pub fn malformed(input: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MalformedData {
            input: input.into(),
            context: context.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Persistence {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error
    pub fn notification(sink: impl Into<String>, message: impl ToString) -> Self {
        Self::Notification {
            sink: sink.into(),
            message: message.to_string(),
        }
    }

    /// Create a per-record update error
    pub fn record_update(
        record_id: impl Into<String>,
        fqdn: impl Into<String>,
        attempted: IpAddr,
        message: impl ToString,
    ) -> Self {
        Self::RecordUpdate {
            record_id: record_id.into(),
            fqdn: fqdn.into(),
            attempted,
            message: message.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransientLookup { .. } => ErrorKind::TransientLookup,
            Self::MalformedData { .. } => ErrorKind::MalformedData,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Notification { .. } => ErrorKind::Notification,
            Self::RecordUpdate { .. } => ErrorKind::RecordUpdate,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}
