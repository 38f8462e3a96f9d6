//! The store module contains the implementations of the event store.

// The in-memory implementation is compiled when the `in-memory` feature is
// enabled (this is the default).
#[cfg(feature = "in-memory")]
/// An in-memory event store.
pub mod in_memory;

// The persistent `sled` implementation is compiled when the `sled-storage`
// feature is enabled.
#[cfg(feature = "sled-storage")]
/// A persistent event store using `sled`.
pub mod sled;
