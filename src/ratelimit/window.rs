//! Window literal parsing.
//!
//! A window is written as `<digits><unit>`, for example `10s`, `5m`, `2h` or
//! `1d`. The first such literal found anywhere in the string is used; any
//! text around it is ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PathlimitError, Result};

static WINDOW_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)(s|m|h|d)").expect("valid window regex"));

/// Unit suffix of a window literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowUnit {
    /// `s`
    Second,
    /// `m`
    Minute,
    /// `h`
    Hour,
    /// `d`
    Day,
}

impl WindowUnit {
    /// Look up a unit by its suffix letter.
    pub fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            's' => Some(WindowUnit::Second),
            'm' => Some(WindowUnit::Minute),
            'h' => Some(WindowUnit::Hour),
            'd' => Some(WindowUnit::Day),
            _ => None,
        }
    }

    /// Number of seconds in one unit.
    pub fn seconds(&self) -> u64 {
        match self {
            WindowUnit::Second => 1,
            WindowUnit::Minute => 60,
            WindowUnit::Hour => 3600,
            WindowUnit::Day => 86400,
        }
    }
}

/// Convert a window string into whole seconds.
///
/// Fails with [`PathlimitError::MalformedWindow`] when the string holds no
/// literal, [`PathlimitError::ZeroWindow`] when the literal is zero, and
/// [`PathlimitError::WindowOverflow`] when the result does not fit a `u64`.
pub fn parse_window_seconds(raw: &str) -> Result<u64> {
    let captures = WINDOW_LITERAL
        .captures(raw)
        .ok_or_else(|| PathlimitError::MalformedWindow {
            window: raw.to_string(),
        })?;

    // Both groups are mandatory in the pattern.
    let digits = &captures[1];
    let unit = captures[2]
        .chars()
        .next()
        .and_then(WindowUnit::from_suffix)
        .ok_or_else(|| PathlimitError::MalformedWindow {
            window: raw.to_string(),
        })?;

    let overflow = || PathlimitError::WindowOverflow {
        window: raw.to_string(),
    };
    let amount: u64 = digits.parse().map_err(|_| overflow())?;
    let seconds = amount.checked_mul(unit.seconds()).ok_or_else(overflow)?;

    if seconds == 0 {
        return Err(PathlimitError::ZeroWindow {
            window: raw.to_string(),
        });
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_unit() {
        assert_eq!(parse_window_seconds("10s").unwrap(), 10);
        assert_eq!(parse_window_seconds("5m").unwrap(), 300);
        assert_eq!(parse_window_seconds("2h").unwrap(), 7200);
        assert_eq!(parse_window_seconds("1d").unwrap(), 86400);
    }

    #[test]
    fn test_first_literal_wins() {
        assert_eq!(parse_window_seconds("prefix 3h suffix").unwrap(), 10800);
        assert_eq!(parse_window_seconds("1m then 1d").unwrap(), 60);
        // "12x" is not a literal, so scanning continues to "4s".
        assert_eq!(parse_window_seconds("12x4s").unwrap(), 4);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(parse_window_seconds("0030s").unwrap(), 30);
    }

    #[test]
    fn test_malformed_window() {
        for raw in ["no-window-here", "", "10", "s", "10 s", "10w"] {
            let err = parse_window_seconds(raw).unwrap_err();
            assert!(
                matches!(err, PathlimitError::MalformedWindow { .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_window_message_names_grammar() {
        let err = parse_window_seconds("no-window-here").unwrap_err();
        assert!(err.to_string().contains("([0-9]+(s|m|d|h))"));
        assert!(err.to_string().contains("no-window-here"));
    }

    #[test]
    fn test_uppercase_unit_is_not_a_literal() {
        assert!(matches!(
            parse_window_seconds("10S"),
            Err(PathlimitError::MalformedWindow { .. })
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(
            parse_window_seconds("0s"),
            Err(PathlimitError::ZeroWindow { .. })
        ));
        assert!(matches!(
            parse_window_seconds("000d"),
            Err(PathlimitError::ZeroWindow { .. })
        ));
    }

    #[test]
    fn test_overflow_fails_cleanly() {
        assert!(matches!(
            parse_window_seconds("99999999999999999999s"),
            Err(PathlimitError::WindowOverflow { .. })
        ));
        assert!(matches!(
            parse_window_seconds("300000000000000000d"),
            Err(PathlimitError::WindowOverflow { .. })
        ));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse_window_seconds("15m").unwrap();
        for _ in 0..10 {
            assert_eq!(parse_window_seconds("15m").unwrap(), first);
        }
    }

    #[test]
    fn test_unit_table() {
        let table: Vec<_> = ['s', 'm', 'h', 'd']
            .into_iter()
            .map(|suffix| WindowUnit::from_suffix(suffix).map(|unit| unit.seconds()))
            .collect();
        assert_eq!(table, vec![Some(1), Some(60), Some(3600), Some(86400)]);
        assert_eq!(WindowUnit::from_suffix('w'), None);
    }
}
