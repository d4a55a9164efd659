//! Domain Layer
//!
//! Pure lookup types, the client IP policy and the ports to the
//! geolocation database. No I/O happens here.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;
