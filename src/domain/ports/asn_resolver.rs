//! ASN Resolver Port
//!
//! Defines the interface for resolving IP addresses to the autonomous
//! system that announces them.

use crate::domain::entities::NetworkOwnershipRecord;
use std::net::IpAddr;

/// Resolver for IP address to network ownership.
///
/// This is an outbound port that abstracts the ASN database. A miss is a
/// normal outcome (unassigned ranges have no ASN), so lookups return Option.
pub trait AsnResolver: Send + Sync {
    /// Resolve the autonomous system owning the given IP.
    fn owner(&self, ip: IpAddr) -> Option<NetworkOwnershipRecord>;

    /// Network prefix (CIDR) of the ASN entry matching the IP.
    ///
    /// Readers that cannot report prefixes keep the default.
    fn network_prefix(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}
