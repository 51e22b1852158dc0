// # dns-tools-core
//
// Change detection and DNS reconciliation core for dns-tools.
//
// ## Architecture Overview
//
// - **filter**: FQDN include/exclude matching
// - **reconciler**: Aligns a zone's A records with a target address
// - **engine**: Poll loop deciding when the global address changed
// - **event**: Change event model used for notification payloads
// - **traits**: Collaborator interfaces (address lookup, state store,
//   DNS provider, notification sinks)
// - **state**: Memory and file state stores
//
// ## Design Principles
//
// 1. **Pure decisions**: filter matching, record decisions and tick
//    planning are pure functions; only the engine performs I/O
// 2. **Poll-based**: one sequential loop, no overlapping ticks
// 3. **Idempotency**: records already at the target are never rewritten
// 4. **Failure isolation**: every failure is logged where it happens and
//    never stops the loop

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod reconciler;
pub mod state;
pub mod traits;

pub use config::{ReconcileSettings, StateStoreConfig, WatchSettings};
pub use engine::{PollEngine, TickOutcome, TickReport};
pub use error::{Error, ErrorKind, Result};
pub use event::ChangeEvent;
pub use filter::FilterSet;
pub use reconciler::{ReconcileReport, RecordReconciler, SkipReason};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{AddressSource, DnsProvider, DnsRecord, Notifier, StateStore};
