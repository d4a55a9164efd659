//! IP classification
//!
//! Decides whether an address is public (globally routable) or falls in
//! one of the private, loopback or link-local ranges that a client IP can
//! never legitimately come from.

use ipnetwork::IpNetwork;
use once_cell::sync::Lazy;
use std::net::IpAddr;

/// Ranges treated as private for client IP purposes.
const PRIVATE_CIDRS: &[&str] = &[
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "127.0.0.0/8",    // loopback
    "169.254.0.0/16", // link-local
    "::1/128",        // IPv6 loopback
    "fc00::/7",       // IPv6 unique local
    "fe80::/10",      // IPv6 link-local
];

static PRIVATE_NETWORKS: Lazy<Vec<IpNetwork>> = Lazy::new(|| {
    PRIVATE_CIDRS
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect()
});

/// Parse an address string, rejecting anything that is not a bare IP.
pub fn parse_ip(s: &str) -> Option<IpAddr> {
    s.parse().ok()
}

/// Check if an address lies in a private range.
///
/// IPv4-mapped IPv6 addresses are classified by their IPv4 form.
pub fn is_private(ip: IpAddr) -> bool {
    let ip = ip.to_canonical();
    PRIVATE_NETWORKS.iter().any(|net| net.contains(ip))
}

/// Check if a string is a syntactically valid IP address.
pub fn is_valid_ip(s: &str) -> bool {
    parse_ip(s).is_some()
}

/// Check if a string is a private IP. Unparseable input is not private.
pub fn is_private_ip(s: &str) -> bool {
    parse_ip(s).map(is_private).unwrap_or(false)
}

/// Check if a string is a valid IP outside every private range.
pub fn is_valid_public_ip(s: &str) -> bool {
    parse_ip(s).map(|ip| !is_private(ip)).unwrap_or(false)
}
