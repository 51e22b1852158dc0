// # State Store Implementations
//
// Local implementations of the StateStore trait. The cluster-backed
// ConfigMap store lives in the `dns-tools-state-kube` crate.

pub mod file;
pub mod memory;

pub use file::{FileStateStore, StateEntry};
pub use memory::MemoryStateStore;
