//! Request Headers Port
//!
//! Read-only view of an inbound request's headers, so the client IP policy
//! does not depend on a particular HTTP framework.

/// Case-insensitive, multi-valued header access.
pub trait RequestHeaders {
    /// All values of the named header in the order they were received.
    ///
    /// Values that are not valid text are skipped.
    fn get_all(&self, name: &str) -> Vec<&str>;

    /// First value of the named header.
    fn first_value(&self, name: &str) -> Option<&str> {
        self.get_all(name).into_iter().next()
    }
}

impl RequestHeaders for [(&str, &str)] {
    fn get_all(&self, name: &str) -> Vec<&str> {
        self.iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
            .collect()
    }
}
