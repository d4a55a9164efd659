//! GeoIP Service - Main application use case
//!
//! Combines the location and ASN ports into one merged record and exposes
//! the client IP resolver. This is the primary interface for the inbound
//! adapter.

use crate::domain::entities::{GeoIpRecord, NetworkOwnershipRecord};
use crate::domain::errors::LookupError;
use crate::domain::ports::{AsnResolver, LocationResolver, RequestHeaders};
use crate::domain::services::ip_classifier::parse_ip;
use crate::domain::services::ClientIpResolver;
use crate::domain::value_objects::ResolvedClientIp;
use std::net::IpAddr;
use std::sync::Arc;

/// GeoIP service - lookup facade.
///
/// Holds no mutable state; every lookup builds a fresh record, so the
/// service is shared across request handlers behind an `Arc`.
pub struct GeoIpService {
    locations: Option<Arc<dyn LocationResolver>>,
    owners: Option<Arc<dyn AsnResolver>>,
    client_ip: ClientIpResolver,
}

impl GeoIpService {
    /// Create a new GeoIP service.
    ///
    /// Either database may be missing. Without a location database every
    /// lookup fails with `DatabaseUnavailable`; without an ASN database
    /// records simply carry no ownership fields.
    pub fn new(
        locations: Option<Arc<dyn LocationResolver>>,
        owners: Option<Arc<dyn AsnResolver>>,
    ) -> Self {
        Self {
            locations,
            owners,
            client_ip: ClientIpResolver::default(),
        }
    }

    pub fn has_location_db(&self) -> bool {
        self.locations.is_some()
    }

    pub fn has_asn_db(&self) -> bool {
        self.owners.is_some()
    }

    /// Resolve the real client IP of a request.
    pub fn resolve_client_ip<H>(&self, headers: &H, peer_addr: &str) -> ResolvedClientIp
    where
        H: RequestHeaders + ?Sized,
    {
        self.client_ip.resolve(headers, peer_addr)
    }

    /// Look up an IP given as text.
    ///
    /// The record echoes `ip` exactly as given.
    pub fn lookup(&self, ip: &str) -> Result<GeoIpRecord, LookupError> {
        let addr = parse_ip(ip).ok_or_else(|| LookupError::InvalidIpSyntax(ip.to_string()))?;
        let locations = self.locations.as_ref().ok_or(LookupError::DatabaseUnavailable)?;
        let location = locations.locate(addr)?;

        let mut record = GeoIpRecord::new(ip, location);
        record.ownership = self.resolve_ownership(addr);
        Ok(record)
    }

    /// ASN enrichment. Every miss here is non-fatal.
    fn resolve_ownership(&self, addr: IpAddr) -> Option<NetworkOwnershipRecord> {
        let owners = self.owners.as_ref()?;

        let Some(mut owner) = owners.owner(addr) else {
            tracing::debug!("ASN lookup found nothing for {}", addr);
            return None;
        };

        if owner.network.is_none() {
            owner.network = owners.network_prefix(addr);
            if owner.network.is_none() {
                tracing::debug!("ASN network prefix unavailable for {}", addr);
            }
        }

        Some(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LocationRecord;
    use std::collections::HashMap;

    // ===== Mock Implementations =====

    struct MockLocations {
        records: HashMap<IpAddr, LocationRecord>,
    }

    impl MockLocations {
        fn new() -> Self {
            Self {
                records: HashMap::new(),
            }
        }

        fn with(mut self, ip: &str, country_code: &str, country: &str) -> Self {
            self.records.insert(
                ip.parse().unwrap(),
                LocationRecord {
                    country: country.to_string(),
                    country_code: country_code.to_string(),
                    ..Default::default()
                },
            );
            self
        }
    }

    impl LocationResolver for MockLocations {
        fn locate(&self, ip: IpAddr) -> Result<LocationRecord, LookupError> {
            self.records
                .get(&ip)
                .cloned()
                .ok_or(LookupError::LocationNotFound(ip))
        }
    }

    struct BrokenLocations;

    impl LocationResolver for BrokenLocations {
        fn locate(&self, _ip: IpAddr) -> Result<LocationRecord, LookupError> {
            Err(LookupError::Database("invalid search tree".to_string()))
        }
    }

    struct MockOwners {
        owners: HashMap<IpAddr, (u32, String)>,
        prefixes: bool,
    }

    impl MockOwners {
        fn new(prefixes: bool) -> Self {
            Self {
                owners: HashMap::new(),
                prefixes,
            }
        }

        fn with(mut self, ip: &str, asn: u32, org: &str) -> Self {
            self.owners.insert(ip.parse().unwrap(), (asn, org.to_string()));
            self
        }
    }

    impl AsnResolver for MockOwners {
        fn owner(&self, ip: IpAddr) -> Option<NetworkOwnershipRecord> {
            self.owners.get(&ip).map(|(asn, org)| NetworkOwnershipRecord {
                asn: *asn,
                organization: org.clone(),
                network: None,
            })
        }

        fn network_prefix(&self, ip: IpAddr) -> Option<String> {
            if !self.prefixes {
                return None;
            }
            match ip {
                IpAddr::V4(v4) => {
                    let o = v4.octets();
                    Some(format!("{}.{}.{}.0/24", o[0], o[1], o[2]))
                }
                IpAddr::V6(_) => None,
            }
        }
    }

    /// Reader without prefix support, relying on the trait default.
    struct PlainOwners;

    impl AsnResolver for PlainOwners {
        fn owner(&self, _ip: IpAddr) -> Option<NetworkOwnershipRecord> {
            Some(NetworkOwnershipRecord {
                asn: 64500,
                organization: "EXAMPLE-AS".to_string(),
                network: None,
            })
        }
    }

    fn service() -> GeoIpService {
        let locations = MockLocations::new()
            .with("8.8.8.8", "US", "United States")
            .with("2001:4860:4860::8888", "US", "United States")
            .with("203.0.113.10", "BR", "Brazil");
        let owners = MockOwners::new(true).with("8.8.8.8", 15169, "GOOGLE");
        GeoIpService::new(Some(Arc::new(locations)), Some(Arc::new(owners)))
    }

    // ===== Lookup Tests =====

    #[test]
    fn test_lookup_merges_location_and_asn() {
        let record = service().lookup("8.8.8.8").unwrap();

        assert_eq!(record.ip, "8.8.8.8");
        assert_eq!(record.location.country, "United States");
        assert_eq!(record.location.country_code, "US");
        assert_eq!(record.asn(), 15169);
        assert_eq!(record.asn_org(), "GOOGLE");
        assert_eq!(record.asn_network(), Some("8.8.8.0/24"));
    }

    #[test]
    fn test_lookup_without_asn_entry_succeeds() {
        let record = service().lookup("203.0.113.10").unwrap();

        assert_eq!(record.location.country_code, "BR");
        assert!(record.ownership.is_none());
    }

    #[test]
    fn test_lookup_not_found() {
        let err = service().lookup("192.0.2.1").unwrap_err();
        assert_eq!(
            err,
            LookupError::LocationNotFound("192.0.2.1".parse().unwrap())
        );
    }

    #[test]
    fn test_lookup_invalid_syntax_is_distinct() {
        let err = service().lookup("999.0.0.1").unwrap_err();
        assert_eq!(err, LookupError::InvalidIpSyntax("999.0.0.1".to_string()));
    }

    #[test]
    fn test_lookup_echoes_ip_text() {
        let record = service().lookup("2001:4860:4860::8888").unwrap();
        assert_eq!(record.ip, "2001:4860:4860::8888");
        // No prefix support for IPv6 in the mock, and no ASN entry.
        assert!(record.ownership.is_none());
    }

    #[test]
    fn test_missing_location_db_is_unavailable() {
        let svc = GeoIpService::new(None, Some(Arc::new(MockOwners::new(true))));
        assert_eq!(
            svc.lookup("8.8.8.8").unwrap_err(),
            LookupError::DatabaseUnavailable
        );
        assert!(!svc.has_location_db());
        assert!(svc.has_asn_db());
    }

    #[test]
    fn test_missing_asn_db_omits_ownership() {
        let locations = MockLocations::new().with("8.8.8.8", "US", "United States");
        let svc = GeoIpService::new(Some(Arc::new(locations)), None);

        let record = svc.lookup("8.8.8.8").unwrap();
        assert!(record.ownership.is_none());
        assert_eq!(record.asn(), 0);
    }

    #[test]
    fn test_reader_error_propagates() {
        let svc = GeoIpService::new(Some(Arc::new(BrokenLocations)), None);
        let err = svc.lookup("8.8.8.8").unwrap_err();
        assert!(matches!(err, LookupError::Database(_)));
    }

    #[test]
    fn test_prefix_unsupported_degrades_gracefully() {
        let locations = MockLocations::new().with("8.8.8.8", "US", "United States");
        let svc = GeoIpService::new(Some(Arc::new(locations)), Some(Arc::new(PlainOwners)));

        let record = svc.lookup("8.8.8.8").unwrap();
        assert_eq!(record.asn(), 64500);
        assert_eq!(record.asn_org(), "EXAMPLE-AS");
        assert_eq!(record.asn_network(), None);
    }

    #[test]
    fn test_prefix_disabled_reader() {
        let locations = MockLocations::new().with("8.8.8.8", "US", "United States");
        let owners = MockOwners::new(false).with("8.8.8.8", 15169, "GOOGLE");
        let svc = GeoIpService::new(Some(Arc::new(locations)), Some(Arc::new(owners)));

        let record = svc.lookup("8.8.8.8").unwrap();
        assert_eq!(record.asn(), 15169);
        assert_eq!(record.asn_network(), None);
    }

    // ===== Client IP =====

    #[test]
    fn test_resolve_client_ip_then_lookup() {
        let svc = service();
        let headers: &[(&str, &str)] = &[("X-Forwarded-For", "10.0.0.1, 8.8.8.8")];

        let resolved = svc.resolve_client_ip(headers, "10.244.0.7");
        assert_eq!(resolved.ip, "8.8.8.8");

        let record = svc.lookup(&resolved.ip).unwrap();
        assert_eq!(record.asn(), 15169);
    }

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeoIpService>();
    }

    #[test]
    fn test_concurrent_lookups() {
        let svc = Arc::new(service());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                std::thread::spawn(move || svc.lookup("8.8.8.8").unwrap().asn())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 15169);
        }
    }
}
