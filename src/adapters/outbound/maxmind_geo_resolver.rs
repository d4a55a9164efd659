//! MaxMind GeoIP Resolvers
//!
//! Implements `LocationResolver` over a GeoLite2/GeoIP2 City database and
//! `AsnResolver` over a GeoLite2 ASN database.

use crate::domain::entities::{LocationRecord, NetworkOwnershipRecord};
use crate::domain::errors::LookupError;
use crate::domain::ports::{AsnResolver, LocationResolver};
use anyhow::Context;
use ipnetwork::IpNetwork;
use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Locale used for country, subdivision and city names.
const NAME_LOCALE: &str = "en";

fn open(path: &str) -> anyhow::Result<Arc<Reader<Vec<u8>>>> {
    let reader = Reader::open_readfile(path)
        .with_context(|| format!("failed to open MaxMind database {}", path))?;
    Ok(Arc::new(reader))
}

fn localized(names: &Option<BTreeMap<&str, &str>>) -> String {
    names
        .as_ref()
        .and_then(|n| n.get(NAME_LOCALE))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Render the network an address was matched in, e.g. `8.8.8.0/24`.
fn network_cidr(ip: IpAddr, prefix_len: usize) -> Option<String> {
    // IPv4 lookups in an IPv6 tree may report the depth from the tree root.
    let prefix_len = match ip {
        IpAddr::V4(_) if prefix_len > 32 => prefix_len.checked_sub(96)?,
        _ => prefix_len,
    };
    let prefix = u8::try_from(prefix_len).ok()?;
    let host = IpNetwork::new(ip, prefix).ok()?;
    let net = IpNetwork::new(host.network(), prefix).ok()?;
    Some(net.to_string())
}

/// MaxMind City database reader.
pub struct MaxMindCityReader {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindCityReader {
    /// Load a City database from a file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        Ok(Self { reader: open(path)? })
    }

    /// Database type from the metadata (e.g. "GeoLite2-City").
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }
}

impl LocationResolver for MaxMindCityReader {
    fn locate(&self, ip: IpAddr) -> Result<LocationRecord, LookupError> {
        let city: geoip2::City = self.reader.lookup(ip).map_err(|e| match e {
            MaxMindDBError::AddressNotFoundError(_) => LookupError::LocationNotFound(ip),
            other => LookupError::Database(other.to_string()),
        })?;

        let mut record = LocationRecord::default();

        if let Some(country) = &city.country {
            record.country = localized(&country.names);
            record.country_code = country.iso_code.unwrap_or_default().to_string();
        }

        // First subdivision is the largest (e.g. state before county)
        if let Some(sub) = city.subdivisions.as_ref().and_then(|s| s.first()) {
            record.region = localized(&sub.names);
            record.region_code = sub.iso_code.unwrap_or_default().to_string();
        }

        if let Some(c) = &city.city {
            record.city = localized(&c.names);
        }

        if let Some(postal) = &city.postal {
            record.postal_code = postal.code.unwrap_or_default().to_string();
        }

        if let Some(loc) = &city.location {
            record.latitude = loc.latitude.unwrap_or_default();
            record.longitude = loc.longitude.unwrap_or_default();
            record.accuracy_radius = loc.accuracy_radius;
            record.timezone = loc.time_zone.unwrap_or_default().to_string();
        }

        Ok(record)
    }
}

/// MaxMind ASN database reader.
///
/// Reports the matched network prefix alongside the ASN.
pub struct MaxMindAsnReader {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindAsnReader {
    /// Load an ASN database from a file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        Ok(Self { reader: open(path)? })
    }

    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }

    fn lookup(&self, ip: IpAddr) -> Option<(geoip2::Asn<'_>, usize)> {
        match self.reader.lookup_prefix::<geoip2::Asn>(ip) {
            Ok(found) => Some(found),
            Err(MaxMindDBError::AddressNotFoundError(_)) => None,
            Err(e) => {
                tracing::debug!("ASN lookup failed for {}: {}", ip, e);
                None
            }
        }
    }
}

impl AsnResolver for MaxMindAsnReader {
    fn owner(&self, ip: IpAddr) -> Option<NetworkOwnershipRecord> {
        let (asn, prefix_len) = self.lookup(ip)?;
        Some(NetworkOwnershipRecord {
            asn: asn.autonomous_system_number.unwrap_or(0),
            organization: asn
                .autonomous_system_organization
                .unwrap_or_default()
                .to_string(),
            network: network_cidr(ip, prefix_len),
        })
    }

    fn network_prefix(&self, ip: IpAddr) -> Option<String> {
        let (_, prefix_len) = self.lookup(ip)?;
        network_cidr(ip, prefix_len)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    /// Real databases are not shipped with the crate. Run the ignored reader
    /// tests with `cargo test -- --ignored` and these variables set.
    fn city_db() -> MaxMindCityReader {
        let path = std::env::var("GEOIP_TEST_CITY_DB").expect("GEOIP_TEST_CITY_DB not set");
        MaxMindCityReader::from_file(&path).unwrap()
    }

    fn asn_db() -> MaxMindAsnReader {
        let path = std::env::var("GEOIP_TEST_ASN_DB").expect("GEOIP_TEST_ASN_DB not set");
        MaxMindAsnReader::from_file(&path).unwrap()
    }

    #[test]
    fn test_city_from_file_nonexistent() {
        let result = MaxMindCityReader::from_file("/nonexistent/path/GeoLite2-City.mmdb");
        let err = result.err().unwrap();
        assert!(err.to_string().contains("/nonexistent/path/GeoLite2-City.mmdb"));
    }

    #[test]
    fn test_asn_from_file_nonexistent() {
        let result = MaxMindAsnReader::from_file("/nonexistent/path/GeoLite2-ASN.mmdb");
        assert!(result.is_err());
    }

    #[test]
    fn test_readers_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MaxMindCityReader>();
        assert_send_sync::<MaxMindAsnReader>();
    }

    #[test]
    fn test_network_cidr_ipv4() {
        let ip = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
        assert_eq!(network_cidr(ip, 24), Some("8.8.8.0/24".to_string()));
        assert_eq!(network_cidr(ip, 32), Some("8.8.8.8/32".to_string()));
        assert_eq!(network_cidr(ip, 0), Some("0.0.0.0/0".to_string()));
    }

    #[test]
    fn test_network_cidr_ipv4_tree_depth() {
        let ip = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
        assert_eq!(network_cidr(ip, 120), Some("1.1.1.0/24".to_string()));
    }

    #[test]
    fn test_network_cidr_ipv6() {
        let ip: IpAddr = "2001:4860:4860::8888".parse().unwrap();
        assert_eq!(network_cidr(ip, 32), Some("2001:4860::/32".to_string()));
        assert_eq!(network_cidr(ip, 129), None);
    }

    #[test]
    fn test_localized_names() {
        let mut names = BTreeMap::new();
        names.insert("de", "Vereinigte Staaten");
        names.insert("en", "United States");
        assert_eq!(localized(&Some(names)), "United States");
        assert_eq!(localized(&None), "");

        let mut only_de = BTreeMap::new();
        only_de.insert("de", "Brasilien");
        assert_eq!(localized(&Some(only_de)), "");
    }

    #[test]
    #[ignore = "requires GEOIP_TEST_CITY_DB"]
    fn test_resolve_known_ip() {
        let db = city_db();

        // Google's public DNS
        let record = db.locate(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))).unwrap();
        assert_eq!(record.country_code, "US");
        assert!(!record.country.is_empty());
    }

    #[test]
    #[ignore = "requires GEOIP_TEST_CITY_DB"]
    fn test_resolve_private_ip_not_found() {
        let db = city_db();

        let err = db
            .locate(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, LookupError::LocationNotFound(_)));
    }

    #[test]
    #[ignore = "requires GEOIP_TEST_CITY_DB"]
    fn test_resolve_reserved_test_net_not_found() {
        let db = city_db();

        let err = db
            .locate(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))
            .unwrap_err();
        assert!(matches!(err, LookupError::LocationNotFound(_)));
    }

    #[test]
    #[ignore = "requires GEOIP_TEST_ASN_DB"]
    fn test_asn_known_ip() {
        let db = asn_db();

        let owner = db.owner(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))).unwrap();
        assert_eq!(owner.asn, 15169);
        assert!(!owner.organization.is_empty());
        let network = owner.network.unwrap();
        let parsed: IpNetwork = network.parse().unwrap();
        assert!(parsed.contains(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    }

    #[test]
    #[ignore = "requires GEOIP_TEST_ASN_DB"]
    fn test_asn_loopback_missing() {
        let db = asn_db();

        assert!(db.owner(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))).is_none());
        assert!(db
            .network_prefix(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
            .is_none());
    }
}
