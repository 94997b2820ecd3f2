//! Probe capabilities.
//!
//! Every network interaction with the device is modeled as one of a small
//! set of narrow contracts (submit/observe, listen, probe) instead of one
//! bespoke function per puzzle. The runner composes these without
//! duplicating socket or HTTP handling.

pub mod core;
pub mod timing;
pub mod udp;
