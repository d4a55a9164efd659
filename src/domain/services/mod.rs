pub mod client_ip_resolver;
pub mod ip_classifier;

pub use client_ip_resolver::{resolve_client_ip, ClientIpResolver};
