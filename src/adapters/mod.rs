//! Adapters Layer
//!
//! Inbound adapters drive the application (HTTP); outbound adapters
//! implement the domain ports (MaxMind databases).

pub mod inbound;
pub mod outbound;
