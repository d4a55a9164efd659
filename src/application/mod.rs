//! Application Layer
//!
//! Use cases that orchestrate the domain ports.

mod geoip_service;

pub use geoip_service::GeoIpService;
