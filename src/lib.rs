//! GeoIP API Library
//!
//! IP geolocation lookups over MaxMind databases, and resolution of the
//! real client IP behind CDNs and reverse proxies.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::GeoIpService;
pub use config::{load_config, Config};
pub use domain::entities::{GeoIpRecord, LocationRecord, NetworkOwnershipRecord};
pub use domain::errors::LookupError;
pub use domain::ports::{AsnResolver, LocationResolver, RequestHeaders};
pub use domain::services::{resolve_client_ip, ClientIpResolver};
pub use domain::value_objects::{ClientIpSource, ResolvedClientIp, TRUSTED_HEADERS};
