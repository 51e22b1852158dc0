//! Change event model
//!
//! A [`ChangeEvent`] records one detected transition of the global address.
//! Its serialized form is the payload handed to structured event sinks; the
//! key names and the empty-string convention for a missing previous address
//! are part of that wire contract.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::net::IpAddr;

/// A detected change of the global address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    previous: Option<IpAddr>,
    current: IpAddr,
}

impl ChangeEvent {
    /// Build the event for a transition from `previous` to `current`
    pub fn new(previous: Option<IpAddr>, current: IpAddr) -> Self {
        Self { previous, current }
    }

    /// The previously persisted address, if any
    pub fn previous(&self) -> Option<IpAddr> {
        self.previous
    }

    /// The newly observed address
    pub fn current(&self) -> IpAddr {
        self.current
    }

    /// Whether this is the first observation (no previous address)
    pub fn is_first_observation(&self) -> bool {
        self.previous.is_none()
    }

    /// Previous address as a string, empty when absent
    pub fn previous_string(&self) -> String {
        self.previous.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// Plain-text message for chat webhooks
    pub fn webhook_text(&self) -> String {
        format!(
            "Changed global ip : {} => {}\n",
            self.previous_string(),
            self.current
        )
    }
}

impl Serialize for ChangeEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChangeGlobalIP", 2)?;
        state.serialize_field("previousGlobalIPv4", &self.previous_string())?;
        state.serialize_field("currentGlobalIPv4", &self.current.to_string())?;
        state.end()
    }
}
