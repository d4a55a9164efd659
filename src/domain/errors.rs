//! Lookup errors.

use std::net::IpAddr;

/// Errors surfaced by a geolocation lookup.
///
/// None of these are fatal to the process; the HTTP layer maps each one
/// to a response status for the current request only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("invalid IP address syntax: {0:?}")]
    InvalidIpSyntax(String),

    #[error("no location data for {0}")]
    LocationNotFound(IpAddr),

    #[error("location database is not loaded")]
    DatabaseUnavailable,

    #[error("location database error: {0}")]
    Database(String),
}
