//! Timestamps for confirmations and chat lines.

use chrono::{Local, Utc};

/// Format shared by every timestamp the hub emits, e.g.
/// `2024-05-01 13:45:02.123456`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Source of the `<ts>` prefix on hub output.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time, already formatted for the wire.
    fn now(&self) -> String;
}

/// Wall-clock time, local or UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    utc: bool,
}

impl SystemClock {
    /// A clock reporting the server's local time.
    pub fn local() -> Self {
        Self { utc: false }
    }

    /// A clock reporting UTC.
    pub fn utc() -> Self {
        Self { utc: true }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> String {
        if self.utc {
            Utc::now().format(TIMESTAMP_FORMAT).to_string()
        } else {
            Local::now().format(TIMESTAMP_FORMAT).to_string()
        }
    }
}

/// A clock stuck at one instant. Useful in tests.
#[derive(Debug, Clone)]
pub struct FixedClock(String);

impl FixedClock {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self(timestamp.into())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_system_clock_now_matches_format() {
        for clock in [SystemClock::local(), SystemClock::utc()] {
            let now = clock.now();
            assert!(
                NaiveDateTime::parse_from_str(&now, TIMESTAMP_FORMAT).is_ok(),
                "unparseable timestamp: {now}"
            );
            // "YYYY-MM-DD HH:MM:SS.ffffff"
            assert_eq!(now.len(), 26);
        }
    }

    #[test]
    fn test_fixed_clock_always_returns_same_value() {
        let clock = FixedClock::new("2024-01-01 00:00:00.000000");
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), "2024-01-01 00:00:00.000000");
    }
}
