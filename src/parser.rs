//! Functions for parsing user text.

use std::time::Duration;

use thiserror::Error;

/// Shortest reminder accepted.
pub const MIN_REMINDER: Duration = Duration::from_secs(10);

/// Longest reminder accepted, 14 days.
pub const MAX_REMINDER: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelayError {
    #[error("Invalid time format! Use numbers followed by m (minutes), h (hours), or d (days).")]
    InvalidFormat,

    #[error("Reminders must be between 10 seconds and 14 days.")]
    OutOfRange,

    #[error("Please provide a positive duration (hours, minutes, or seconds).")]
    NotPositive,
}

/// Parse a reminder delay such as `10m`, `2h` or `1d`.
pub fn reminder_delay(input: &str) -> Result<Duration, DelayError> {
    let input = input.trim();
    let Some(unit) = input.chars().last() else {
        return Err(DelayError::InvalidFormat);
    };

    let secs_per_unit = match unit.to_ascii_lowercase() {
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return Err(DelayError::InvalidFormat),
    };

    let amount = &input[..input.len() - unit.len_utf8()];
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DelayError::InvalidFormat);
    }

    // Too many digits for an u64 is out of range as well.
    let secs = amount
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(secs_per_unit))
        .ok_or(DelayError::OutOfRange)?;

    let delay = Duration::from_secs(secs);
    if delay < MIN_REMINDER || delay > MAX_REMINDER {
        return Err(DelayError::OutOfRange);
    }

    Ok(delay)
}

/// Timer length from its parts, with a readable description like `1 hour(s), 5 second(s)`.
pub fn timer_duration(hours: i64, minutes: i64, seconds: i64) -> Result<(Duration, String), DelayError> {
    let total = hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or(DelayError::OutOfRange)?;

    let total = u64::try_from(total)
        .ok()
        .filter(|t| *t > 0)
        .ok_or(DelayError::NotPositive)?;

    if Duration::from_secs(total) > MAX_REMINDER {
        return Err(DelayError::OutOfRange);
    }

    let parts = [(hours, "hour"), (minutes, "minute"), (seconds, "second")]
        .into_iter()
        .filter(|(n, _)| *n != 0)
        .map(|(n, unit)| format!("{n} {unit}(s)"))
        .collect::<Vec<_>>();

    Ok((Duration::from_secs(total), parts.join(", ")))
}

/// Reply to a greeting phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
    pub arabic: &'static str,
    pub english: &'static str,
}

const GREETINGS: &[(&[&str], Greeting)] = &[
    (&["aswrwb", "as", "salam", "salam alaikum"], Greeting {
        arabic: "السلام عليكم ورحمة الله وبركاته",
        english: "May the peace, blessings and mercy of Allah be upon you.",
    }),
    (&["aswr"], Greeting {
        arabic: "السلام عليكم ورحمة الله",
        english: "May the peace and mercy of Allah be upon you.",
    }),
    (&["wswrwb", "ws"], Greeting {
        arabic: "وعليكم السلام ورحمة الله وبركاته",
        english: "And may the peace, blessings and mercy of Allah be upon you.",
    }),
    (&["wswr"], Greeting {
        arabic: "وعليكم السلام ورحمة الله",
        english: "And may the peace and mercy of Allah be upon you.",
    }),
    (&["jzk", "jazakallah"], Greeting {
        arabic: "جزاك الله خيراً",
        english: "May Allah reward you immensely.",
    }),
];

/// Returns the response if the whole message is a known greeting.
pub fn greeting(content: &str) -> Option<&'static Greeting> {
    let content = content.trim().to_lowercase();
    GREETINGS
        .iter()
        .find(|(phrases, _)| phrases.contains(&content.as_str()))
        .map(|(_, greeting)| greeting)
}

/// Returns `true` if `content` contains any of the `banned` strings.
pub fn has_banned(content: &str, banned: &[String]) -> bool {
    banned
        .iter()
        .any(|b| !b.is_empty() && content.contains(b.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_units() {
        assert_eq!(reminder_delay("10m"), Ok(Duration::from_secs(600)));
        assert_eq!(reminder_delay("2H"), Ok(Duration::from_secs(7200)));
        assert_eq!(reminder_delay(" 14d "), Ok(MAX_REMINDER));
    }

    #[test]
    fn reminder_bad_format() {
        for input in ["", "m", "10", "10s", "1.5h", "-1m", "ten m", "10 m", "10mm"] {
            assert_eq!(reminder_delay(input), Err(DelayError::InvalidFormat), "{input}");
        }
    }

    #[test]
    fn reminder_range() {
        assert_eq!(reminder_delay("0m"), Err(DelayError::OutOfRange));
        assert_eq!(reminder_delay("15d"), Err(DelayError::OutOfRange));
        assert_eq!(
            reminder_delay("99999999999999999999999d"),
            Err(DelayError::OutOfRange)
        );
        assert_eq!(
            DelayError::OutOfRange.to_string(),
            "Reminders must be between 10 seconds and 14 days."
        );
    }

    #[test]
    fn timer_parts() {
        let (duration, text) = timer_duration(1, 0, 5).unwrap();
        assert_eq!(duration, Duration::from_secs(3605));
        assert_eq!(text, "1 hour(s), 5 second(s)");

        assert_eq!(timer_duration(0, 0, 0), Err(DelayError::NotPositive));
        assert_eq!(timer_duration(0, -5, 10), Err(DelayError::NotPositive));
        assert_eq!(timer_duration(i64::MAX, 0, 0), Err(DelayError::OutOfRange));
        assert_eq!(timer_duration(14 * 24, 0, 1), Err(DelayError::OutOfRange));
        assert!(timer_duration(14 * 24, 0, 0).is_ok());
    }

    #[test]
    fn greetings() {
        assert_eq!(greeting("  Salam Alaikum ").unwrap().arabic, "السلام عليكم ورحمة الله وبركاته");
        assert_eq!(
            greeting("ws").unwrap().english,
            "And may the peace, blessings and mercy of Allah be upon you."
        );
        assert_eq!(greeting("jazakallah").unwrap().arabic, "جزاك الله خيراً");
        assert!(greeting("as you wish").is_none());
        assert!(greeting("").is_none());
    }

    #[test]
    fn banned_emojis() {
        let banned = vec!["🤡".to_string(), String::new()];
        assert!(has_banned("you 🤡", &banned));
        assert!(!has_banned("hello", &banned));
        assert!(!has_banned("hello", &[]));
    }
}
