//! Log severities and level token parsing.
//!
//! Severities are plain integers so that levels between and beyond the
//! canonical four can be expressed as `NAME+N` / `NAME-N`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// `NAME`, optionally followed by `+N` or `-N`. Applied to an uppercased token.
static LEVEL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)(?:([+\-])(\d+))?").expect("valid level pattern"));

/// Canonical level names accepted in configuration tokens.
pub const LEVEL_DEBUG: &str = "DEBUG";
pub const LEVEL_INFO: &str = "INFO";
pub const LEVEL_WARN: &str = "WARN";
pub const LEVEL_ERROR: &str = "ERROR";

/// Level used whenever a token cannot be understood.
pub const DEFAULT_LEVEL: &str = LEVEL_INFO;

/// Totally ordered log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(i32);

impl Severity {
    pub const TRACE: Severity = Severity(-8);
    pub const DEBUG: Severity = Severity(-4);
    pub const INFO: Severity = Severity(0);
    pub const WARN: Severity = Severity(4);
    pub const ERROR: Severity = Severity(8);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }

    /// Parse a level token such as `"error"`, `"DEBUG-2"` or `"INFO+4"`.
    ///
    /// Matching is case-insensitive and unanchored: the first run of ASCII
    /// letters is taken as the name, optionally followed directly by a sign
    /// and digits. Anything that does not yield one of the canonical names
    /// falls back to [`DEFAULT_LEVEL`].
    pub fn from_token(token: &str) -> Severity {
        let fallback = Self::base(DEFAULT_LEVEL).unwrap_or(Severity::INFO);
        let upper = token.to_ascii_uppercase();

        let Some(caps) = LEVEL_TOKEN.captures(&upper) else {
            return fallback;
        };
        let Some(base) = Self::base(&caps[1]) else {
            return fallback;
        };

        match (caps.get(2), caps.get(3)) {
            (Some(sign), Some(digits)) => {
                // oversized offsets saturate
                let magnitude = digits.as_str().parse::<i32>().unwrap_or(i32::MAX);
                let offset = if sign.as_str() == "-" { -magnitude } else { magnitude };
                Severity(base.0.saturating_add(offset))
            }
            _ => base,
        }
    }

    fn base(name: &str) -> Option<Severity> {
        match name {
            LEVEL_DEBUG => Some(Severity::DEBUG),
            LEVEL_INFO => Some(Severity::INFO),
            LEVEL_WARN => Some(Severity::WARN),
            LEVEL_ERROR => Some(Severity::ERROR),
            _ => None,
        }
    }
}

/// Free-function form of [`Severity::from_token`].
pub fn level_from_token(token: &str) -> Severity {
    Severity::from_token(token)
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Severity::TRACE,
            tracing::Level::DEBUG => Severity::DEBUG,
            tracing::Level::INFO => Severity::INFO,
            tracing::Level::WARN => Severity::WARN,
            tracing::Level::ERROR => Severity::ERROR,
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        Severity::from(&level)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, base) = if *self < Severity::INFO {
            (LEVEL_DEBUG, Severity::DEBUG)
        } else if *self < Severity::WARN {
            (LEVEL_INFO, Severity::INFO)
        } else if *self < Severity::ERROR {
            (LEVEL_WARN, Severity::WARN)
        } else {
            (LEVEL_ERROR, Severity::ERROR)
        };
        let offset = i64::from(self.0) - i64::from(base.0);
        match offset {
            0 => f.write_str(name),
            n if n > 0 => write!(f, "{}+{}", name, n),
            n => write!(f, "{}{}", name, n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(Severity::from_token("DEBUG"), Severity::DEBUG);
        assert_eq!(Severity::from_token("info"), Severity::INFO);
        assert_eq!(Severity::from_token("Warn"), Severity::WARN);
        assert_eq!(Severity::from_token("error"), Severity::ERROR);
        assert!(Severity::DEBUG < Severity::INFO);
        assert!(Severity::INFO < Severity::WARN);
        assert!(Severity::WARN < Severity::ERROR);
    }

    #[test]
    fn test_offsets() {
        assert_eq!(Severity::from_token("DEBUG-2").value(), -6);
        assert_eq!(Severity::from_token("ERROR+4").value(), 12);
        assert_eq!(Severity::from_token("info+0"), Severity::INFO);
        assert!(Severity::from_token("INFO") < Severity::from_token("INFO+1"));

        for name in [LEVEL_DEBUG, LEVEL_INFO, LEVEL_WARN, LEVEL_ERROR] {
            let mut prev_up = Severity::from_token(name);
            let mut prev_down = prev_up;
            for k in 1..10 {
                let up = Severity::from_token(&format!("{}+{}", name, k));
                let down = Severity::from_token(&format!("{}-{}", name, k));
                assert!(up > prev_up, "{}+{} should increase", name, k);
                assert!(down < prev_down, "{}-{} should decrease", name, k);
                prev_up = up;
                prev_down = down;
            }
        }
    }

    #[test]
    fn test_fallback_to_default() {
        assert_eq!(Severity::from_token(""), Severity::INFO);
        assert_eq!(Severity::from_token("1234"), Severity::INFO);
        assert_eq!(Severity::from_token("+-+"), Severity::INFO);
        assert_eq!(Severity::from_token("VERBOSE"), Severity::INFO);
        assert_eq!(Severity::from_token("xdebug"), Severity::INFO);
    }

    #[test]
    fn test_tolerates_surrounding_garbage() {
        assert_eq!(Severity::from_token("  warn  "), Severity::WARN);
        assert_eq!(Severity::from_token("12debug"), Severity::DEBUG);
        assert_eq!(Severity::from_token("ERROR+3xyz").value(), 11);
        // sign without digits is ignored
        assert_eq!(Severity::from_token("WARN+"), Severity::WARN);
        assert_eq!(Severity::from_token("WARN 2"), Severity::WARN);
    }

    #[test]
    fn test_oversized_offset_saturates() {
        assert_eq!(Severity::from_token("ERROR+99999999999").value(), i32::MAX);
        assert_eq!(Severity::from_token("DEBUG-99999999999").value(), i32::MIN);
    }

    #[test]
    fn test_display() {
        assert_eq!(Severity::INFO.to_string(), "INFO");
        assert_eq!(Severity::new(2).to_string(), "INFO+2");
        assert_eq!(Severity::new(-6).to_string(), "DEBUG-2");
        assert_eq!(Severity::TRACE.to_string(), "DEBUG-4");
        assert_eq!(Severity::new(12).to_string(), "ERROR+4");
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(Severity::from(tracing::Level::TRACE), Severity::TRACE);
        assert_eq!(Severity::from(&tracing::Level::ERROR), Severity::ERROR);
        assert!(Severity::from(tracing::Level::DEBUG) < Severity::from(tracing::Level::INFO));
    }
}
