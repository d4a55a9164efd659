//! Client IP Resolver - Domain Service
//!
//! Picks the address that represents the real client of a request that may
//! have crossed any number of CDNs and reverse proxies.
//!
//! The trusted headers are evaluated in a fixed priority order (see
//! [`TRUSTED_HEADERS`]); the first header that yields an acceptable address
//! wins. Private, loopback and link-local addresses are rejected at every
//! step, with one exception: when X-Forwarded-For carries no public hop its
//! first entry is still preferred over the transport peer, which behind a
//! cluster ingress is usually an internal pod or balancer address.
//!
//! Resolution never fails. The worst outcome is the raw peer address,
//! private or not, and the caller decides whether that is acceptable.

use crate::domain::ports::RequestHeaders;
use crate::domain::services::ip_classifier::{is_private_ip, is_valid_ip, is_valid_public_ip};
use crate::domain::value_objects::{
    ClientIpSource, HeaderPolicy, ResolvedClientIp, TrustedHeader, CDN_CONNECTING_IP_HEADER,
    CDN_COUNTRY_HEADER, TRUSTED_HEADERS,
};

/// Client IP resolver.
///
/// Stateless: the only data it holds is the static header table, so one
/// instance can be shared across every request handler.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpResolver {
    headers: &'static [TrustedHeader],
}

impl Default for ClientIpResolver {
    fn default() -> Self {
        Self::new(TRUSTED_HEADERS)
    }
}

impl ClientIpResolver {
    /// Create a resolver over a custom priority list.
    pub const fn new(headers: &'static [TrustedHeader]) -> Self {
        Self { headers }
    }

    /// The headers this resolver consults, highest priority first.
    pub fn trusted_headers(&self) -> &'static [TrustedHeader] {
        self.headers
    }

    /// Resolve the client IP from request headers and the transport peer.
    ///
    /// `peer_addr` is returned unchanged when no header qualifies.
    pub fn resolve<H>(&self, headers: &H, peer_addr: &str) -> ResolvedClientIp
    where
        H: RequestHeaders + ?Sized,
    {
        for trusted in self.headers {
            if let Some(ip) = Self::evaluate(trusted, headers) {
                tracing::debug!("client ip {} taken from {}", ip, trusted.name);
                return ResolvedClientIp::new(ip, ClientIpSource::Header(trusted.name));
            }

            if trusted.name.eq_ignore_ascii_case(CDN_CONNECTING_IP_HEADER) {
                // Country header alone proves nothing; it is only reported.
                if let Some(country) = headers.first_value(CDN_COUNTRY_HEADER) {
                    tracing::debug!(
                        "behind CDN ({}: {}) but {} missing or not public: {:?}",
                        CDN_COUNTRY_HEADER,
                        country,
                        CDN_CONNECTING_IP_HEADER,
                        headers.first_value(CDN_CONNECTING_IP_HEADER)
                    );
                }
            }
        }

        if !is_valid_ip(peer_addr) {
            tracing::warn!("peer address {:?} is not a valid IP", peer_addr);
        } else if is_private_ip(peer_addr) {
            tracing::warn!(
                "returning private peer address {} - no usable proxy headers, check proxy configuration",
                peer_addr
            );
        } else {
            tracing::debug!("client ip {} taken from peer address", peer_addr);
        }

        ResolvedClientIp::new(peer_addr, ClientIpSource::PeerAddress)
    }

    /// Run one step of the policy against the request.
    fn evaluate<H>(trusted: &TrustedHeader, headers: &H) -> Option<String>
    where
        H: RequestHeaders + ?Sized,
    {
        let values = headers.get_all(trusted.name);
        if values.is_empty() {
            return None;
        }

        match trusted.policy {
            HeaderPolicy::SingleValue => single_value(&values),
            HeaderPolicy::HopList => hop_list(&values),
            HeaderPolicy::Rfc7239 => forwarded_node(&values),
        }
    }
}

/// Resolve the client IP with the default header table.
pub fn resolve_client_ip<H>(headers: &H, peer_addr: &str) -> String
where
    H: RequestHeaders + ?Sized,
{
    ClientIpResolver::default().resolve(headers, peer_addr).ip
}

/// First occurrence of the header, when it is a public IP.
fn single_value(values: &[&str]) -> Option<String> {
    let value = values.first()?.trim();
    is_valid_public_ip(value).then(|| value.to_string())
}

/// Left-most public hop, else the first hop if it is at least a valid IP.
fn hop_list(values: &[&str]) -> Option<String> {
    let hops: Vec<&str> = values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect();

    for (i, hop) in hops.iter().enumerate() {
        let public = is_valid_public_ip(hop);
        tracing::trace!("hop {}: {} (valid: {}, public: {})", i, hop, is_valid_ip(hop), public);
        if public {
            return Some(hop.to_string());
        }
    }

    let first = hops.first().filter(|hop| is_valid_ip(hop))?;
    tracing::debug!("no public hop, using first forwarded entry {}", first);
    Some(first.to_string())
}

/// First public `for=` node across all RFC 7239 forwarded elements.
fn forwarded_node(values: &[&str]) -> Option<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .flat_map(|element| element.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("for")
                .then(|| strip_node(value.trim()))
        })
        .find(|node| is_valid_public_ip(node))
        .map(str::to_string)
}

/// Strip quotes, IPv6 brackets and a trailing port from a forwarded node.
fn strip_node(node: &str) -> &str {
    let node = node.trim_matches('"');

    if let Some(rest) = node.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }

    match node.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
        _ => node,
    }
}
