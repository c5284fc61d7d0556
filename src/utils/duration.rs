//! Compact duration expressions.
//!
//! Giveaway and mute durations are given as a single `<number><unit>` term,
//! e.g. `30s`, `10m`, `2h`, `7d`.

use std::time::Duration;

/// Parse a compact duration expression into a [`Duration`].
///
/// Accepts exactly one positive integer followed by one of `s`, `m`, `h`, `d`
/// (case-insensitive). Returns `None` for anything else, including zero.
///
/// # Examples
///
/// ```
/// use guildwarden::utils::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
/// assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
/// assert_eq!(parse_duration("abc"), None);
/// ```
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();
    if input.len() < 2 {
        return None;
    }

    // The unit may be any character, so split on its char boundary
    let unit = input.chars().last()?;
    let value_part = &input[..input.len() - unit.len_utf8()];
    if !value_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let value: u64 = value_part.parse().ok()?;
    if value == 0 {
        return None;
    }

    let seconds = match unit {
        's' => value,
        'm' => value * 60,
        'h' => value * 60 * 60,
        'd' => value * 60 * 60 * 24,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}

/// Format a duration as a human-readable German string, e.g. "1 Tag, 2 Stunden".
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{} {}", days, if days == 1 { "Tag" } else { "Tage" }));
    }
    if hours > 0 {
        parts.push(format!("{} {}", hours, if hours == 1 { "Stunde" } else { "Stunden" }));
    }
    if minutes > 0 {
        parts.push(format!("{} {}", minutes, if minutes == 1 { "Minute" } else { "Minuten" }));
    }
    if seconds > 0 {
        parts.push(format!("{} {}", seconds, if seconds == 1 { "Sekunde" } else { "Sekunden" }));
    }

    if parts.is_empty() {
        return "0 Sekunden".to_string();
    }

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7_200)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("10S"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration(" 30m "), Some(Duration::from_secs(1_800)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration("-5s"), None);
        assert_eq!(parse_duration("0s"), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("1h30m"), None);
    }

    #[test]
    fn test_parse_duration_multibyte_unit() {
        // Units outside ASCII must be rejected, not split mid-character
        assert_eq!(parse_duration("5ä"), None);
        assert_eq!(parse_duration("10€"), None);
        assert_eq!(parse_duration("ä"), None);
        assert_eq!(parse_duration("äh"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(1)), "1 Sekunde");
        assert_eq!(format_duration(Duration::from_secs(61)), "1 Minute, 1 Sekunde");
        assert_eq!(
            format_duration(Duration::from_secs(90_061)),
            "1 Tag, 1 Stunde, 1 Minute, 1 Sekunde"
        );
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2 Stunden");
        assert_eq!(format_duration(Duration::from_secs(0)), "0 Sekunden");
    }
}
