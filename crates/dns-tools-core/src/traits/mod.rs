//! Collaborator traits
//!
//! The core only talks to the outside world through these interfaces.
//!
//! - [`AddressSource`]: Look up the current global address
//! - [`StateStore`]: Persist the last observed address
//! - [`DnsProvider`]: Read and update a zone's records
//! - [`Notifier`]: Deliver change notifications

pub mod address_source;
pub mod dns_provider;
pub mod notifier;
pub mod state_store;

pub use address_source::AddressSource;
pub use dns_provider::{A_RECORD, DnsProvider, DnsRecord};
pub use notifier::Notifier;
pub use state_store::StateStore;
