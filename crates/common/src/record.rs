//! Opaque credential record drawn from a pool
//!
//! A record is one deliverable line, conventionally `identifier:secret` but
//! any non-blank string is valid. Records are credentials, so the wrapper
//! redacts itself in Debug/Display and zeroizes its memory on drop; the
//! contents only leave through `as_str`/`into_string` at delivery time.

use std::fmt;
use zeroize::Zeroize;

/// One deliverable credential line. Redacted in Debug/Display/logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Record(String);

impl Record {
    /// Wrap a raw credential line.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw line (delivery and persistence only).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the raw line out of the wrapper.
    pub fn into_string(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_redacts_debug_and_display() {
        let record = Record::new("alice@example.com:hunter2");
        assert_eq!(format!("{:?}", record), "[REDACTED]");
        assert_eq!(format!("{}", record), "[REDACTED]");
    }

    #[test]
    fn record_exposes_raw_line() {
        let record = Record::new("alice@example.com:hunter2");
        assert_eq!(record.as_str(), "alice@example.com:hunter2");
        assert_eq!(record.into_string(), "alice@example.com:hunter2");
    }

    #[test]
    fn record_equality_compares_contents() {
        let a = Record::new("a:1");
        let b = Record::new("a:1");
        let c = Record::new("b:2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.clone(), b);
    }
}
