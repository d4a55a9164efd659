//! Location Resolver Port
//!
//! Defines the interface for resolving IP addresses to geographic locations.

use crate::domain::entities::LocationRecord;
use crate::domain::errors::LookupError;
use std::net::IpAddr;

/// Resolver for IP address to geographic location.
///
/// This is an outbound port that abstracts the city database.
/// Implementations must allow concurrent read-only lookups.
pub trait LocationResolver: Send + Sync {
    /// Resolve an IP address to its location record.
    ///
    /// Returns `LookupError::LocationNotFound` when the database has no
    /// entry for the address.
    fn locate(&self, ip: IpAddr) -> Result<LocationRecord, LookupError>;
}
