//! Domain Entities - Core lookup records
//!
//! These entities carry the result of a geolocation lookup.
//! They are built fresh for every request and never mutated afterwards.

use serde::Serialize;

/// Geographic information resolved from an IP address.
///
/// Fields the database did not populate are left at their empty/zero
/// default, so every field is always present in the rendered output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationRecord {
    /// English country name
    pub country: String,
    /// Country code (ISO 3166-1 alpha-2)
    pub country_code: String,
    /// Name of the first (largest) subdivision
    pub region: String,
    /// ISO code of the first subdivision
    pub region_code: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in kilometers around the coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_radius: Option<u16>,
    /// IANA time zone name (e.g. "America/Chicago")
    pub timezone: String,
}

/// Autonomous-system ownership of the network an IP belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkOwnershipRecord {
    /// Autonomous system number, 0 when unknown
    #[serde(skip_serializing_if = "is_zero")]
    pub asn: u32,
    #[serde(rename = "asn_org", skip_serializing_if = "String::is_empty")]
    pub organization: String,
    /// Network prefix (CIDR) the lookup matched, when the reader exposes it
    #[serde(rename = "asn_network", skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Merged result of a lookup: location plus optional network ownership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoIpRecord {
    /// The IP exactly as it was asked for
    pub ip: String,
    #[serde(flatten)]
    pub location: LocationRecord,
    #[serde(flatten)]
    pub ownership: Option<NetworkOwnershipRecord>,
}

impl GeoIpRecord {
    pub fn new(ip: impl Into<String>, location: LocationRecord) -> Self {
        Self {
            ip: ip.into(),
            location,
            ownership: None,
        }
    }

    /// Autonomous system number, 0 when the ownership lookup found nothing.
    pub fn asn(&self) -> u32 {
        self.ownership.as_ref().map(|o| o.asn).unwrap_or(0)
    }

    pub fn asn_org(&self) -> &str {
        self.ownership
            .as_ref()
            .map(|o| o.organization.as_str())
            .unwrap_or("")
    }

    pub fn asn_network(&self) -> Option<&str> {
        self.ownership.as_ref().and_then(|o| o.network.as_deref())
    }
}
