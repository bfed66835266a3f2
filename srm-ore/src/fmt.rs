//! Formatting helpers for user facing output.

use std::fmt;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Displays a number of seconds as its two most significant units, e.g. `1d 3h` or `42s`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HumanSecs(pub u64);

impl fmt::Display for HumanSecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        static UNITS: &[(u64, &str)] = &[(DAY, "d"), (HOUR, "h"), (MINUTE, "m"), (1, "s")];

        let mut remaining = self.0;
        let mut written = 0;
        for (size, suffix) in UNITS {
            let count = remaining / size;
            if count == 0 {
                continue;
            }
            if written > 0 {
                write!(f, " ")?;
            }
            write!(f, "{count}{suffix}")?;
            remaining -= count * size;
            written += 1;
            if written == 2 {
                break;
            }
        }

        if written == 0 {
            write!(f, "0s")?;
        }
        Ok(())
    }
}
