//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use std::net::IpAddr;

/// How the values of a trusted header are turned into a client IP candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// A single address; only the first occurrence of the header is read.
    /// Accepted only when it is a valid public IP.
    SingleValue,
    /// Comma-separated hop list (X-Forwarded-For). Occurrences are joined in
    /// order; the left-most public entry wins, else the first entry if it is
    /// at least a valid IP.
    HopList,
    /// RFC 7239 `Forwarded` elements; the first public `for=` node wins.
    Rfc7239,
}

/// A header consulted when resolving the client IP, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedHeader {
    pub name: &'static str,
    pub policy: HeaderPolicy,
}

impl TrustedHeader {
    pub const fn new(name: &'static str, policy: HeaderPolicy) -> Self {
        Self { name, policy }
    }
}

/// Cloudflare's connecting-IP header, overwritten at the edge.
pub const CDN_CONNECTING_IP_HEADER: &str = "CF-Connecting-IP";

/// CDN header carrying the visitor's country, used only as a diagnostic hint.
pub const CDN_COUNTRY_HEADER: &str = "CF-IPCountry";

/// Headers consulted by the client IP resolver, highest authority first.
pub const TRUSTED_HEADERS: &[TrustedHeader] = &[
    // Rewritten at the Cloudflare edge
    TrustedHeader::new(CDN_CONNECTING_IP_HEADER, HeaderPolicy::SingleValue),
    // Akamai, Cloudflare Enterprise and some load balancers
    TrustedHeader::new("True-Client-IP", HeaderPolicy::SingleValue),
    // nginx and friends
    TrustedHeader::new("X-Real-IP", HeaderPolicy::SingleValue),
    TrustedHeader::new("X-Forwarded-For", HeaderPolicy::HopList),
    TrustedHeader::new("X-Client-IP", HeaderPolicy::SingleValue),
    TrustedHeader::new("X-Cluster-Client-IP", HeaderPolicy::SingleValue),
    TrustedHeader::new("X-Original-Forwarded-For", HeaderPolicy::SingleValue),
    TrustedHeader::new("X-Forwarded", HeaderPolicy::SingleValue),
    TrustedHeader::new("Forwarded", HeaderPolicy::Rfc7239),
];

/// Where a resolved client IP came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIpSource {
    /// Taken from the named trusted header
    Header(&'static str),
    /// Fell back to the transport peer address
    PeerAddress,
}

impl std::fmt::Display for ClientIpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header(name) => write!(f, "{}", name),
            Self::PeerAddress => write!(f, "peer-address"),
        }
    }
}

/// Best-effort client IP for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClientIp {
    /// The address string, unchanged from its source
    pub ip: String,
    pub source: ClientIpSource,
}

impl ResolvedClientIp {
    pub fn new(ip: impl Into<String>, source: ClientIpSource) -> Self {
        Self {
            ip: ip.into(),
            source,
        }
    }

    /// Parsed address, or None when the result is not a valid IP.
    ///
    /// Header-sourced results always parse; only a malformed peer address
    /// can yield None here.
    pub fn addr(&self) -> Option<IpAddr> {
        self.ip.parse().ok()
    }

    pub fn is_from_header(&self) -> bool {
        matches!(self.source, ClientIpSource::Header(_))
    }
}

impl std::fmt::Display for ResolvedClientIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ip)
    }
}
