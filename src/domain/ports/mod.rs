mod asn_resolver;
mod location_resolver;
mod request_headers;

pub use asn_resolver::AsnResolver;
pub use location_resolver::LocationResolver;
pub use request_headers::RequestHeaders;
