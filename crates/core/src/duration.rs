//! Duration-string parsing for silent mode windows.

use std::time::Duration;

use crate::error::SwitcherError;

/// Parse a duration string of the form `<integer><unit>` where the unit is
/// `s` (seconds), `m` (minutes) or `h` (hours).
///
/// # Errors
///
/// Returns [`SwitcherError::InvalidInput`] when the number or the unit
/// cannot be parsed.
pub fn parse_duration(value: &str) -> Result<Duration, SwitcherError> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        return Err(SwitcherError::InvalidInput(
            "invalid duration ''".to_string(),
        ));
    };

    let amount: u64 = value[..value.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| SwitcherError::InvalidInput(format!("invalid duration '{value}'")))?;

    match unit {
        's' => Ok(Duration::from_secs(amount)),
        'm' => Ok(Duration::from_secs(amount * 60)),
        'h' => Ok(Duration::from_secs(amount * 3600)),
        _ => Err(SwitcherError::InvalidInput(format!(
            "unit '{unit}' not compatible, try [s, m or h]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_minutes_hours() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_unknown_unit() {
        let err = parse_duration("5d").unwrap_err();
        assert!(err.to_string().contains("not compatible"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5s").is_err());
    }
}
