//! In-process collaborators.
//!
//! [`MemoryBroker`] and [`StaticRoutes`] let the dispatcher run without an
//! external broker, for local runs, demos and tests.

mod broker;
mod registry;

pub use broker::*;
pub use registry::*;
