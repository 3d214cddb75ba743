//! Worker groups and their pending results.
//!
//! A [`WorkerGroup`] is the unit of parallelism: one Tokio task per group, each
//! owning a disjoint slice of the route set. Groups never share mutable state,
//! so nothing here needs locking.

mod pending;
mod worker;


pub use pending::PendingResult;
pub use worker::WorkerGroup;

/// Which fetch method a dispatch call runs on every group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// One fetch-and-consume pass per group.
    Once,
    /// Continuous consumption until cancelled, failed or exhausted.
    Forever,
}
