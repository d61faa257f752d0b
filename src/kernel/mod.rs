//! Synchronous core: strategy, event detection and the trigger policy.
//! Nothing in here awaits or performs I/O.

pub mod detector;
pub mod event;
pub mod metrics;
pub mod reactor;
pub mod snapshot;
pub mod strategy;
pub mod time;
pub mod trigger;
