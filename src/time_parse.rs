//! Narrow time-expression parsing for callback scheduling.
//!
//! This deliberately captures only "2", "2pm", "2:30", "14:00" style inputs.
//! Anything fancier falls through to the assistant boundary; do not grow this
//! into a general natural-language date parser.

use once_cell::sync::Lazy;
use regex::Regex;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, Time};

static CLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})(?::(\d{2}))?\s*(am|pm)?").expect("clock pattern must compile")
});

/// Parse the first clock-like expression in `text` into a concrete future
/// instant on or after `reference`.  Returns `None` when no such expression
/// exists.
///
/// Hours follow the 12-hour convention.  When no meridiem is given, a bare
/// hour below 8 is assumed to mean the afternoon: trade callbacks happen
/// after lunch, so "2" means 14:00.  An instant already in the past rolls
/// forward by exactly one day, so the result is always a future slot.
pub fn parse_time_expression(text: &str, reference: OffsetDateTime) -> Option<OffsetDateTime> {
    let lowered = text.to_lowercase();
    let captures = CLOCK_PATTERN.captures(&lowered)?;

    let mut hour: u8 = captures.get(1)?.as_str().parse().ok()?;
    let minute: u8 = match captures.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    match captures.get(3).map(|m| m.as_str()) {
        Some("pm") => {
            if hour < 12 {
                hour += 12;
            }
        }
        Some("am") => {
            if hour == 12 {
                hour = 0;
            }
        }
        _ => {
            // Afternoon heuristic: a bare "2" is 2pm, not 2am.
            if (1..8).contains(&hour) {
                hour += 12;
            }
        }
    }

    let slot = Time::from_hms(hour, minute, 0).ok()?;
    let candidate = reference.replace_time(slot);
    if candidate <= reference {
        Some(candidate + Duration::days(1))
    } else {
        Some(candidate)
    }
}

/// Render a proposed callback slot the way it reads in an SMS, e.g. "2:30pm".
pub fn format_callback_time(at: OffsetDateTime) -> String {
    let description =
        format_description!("[hour repr:12 padding:none]:[minute][period case:lower]");
    at.format(&description).unwrap_or_else(|_| at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn bare_hour_assumes_afternoon() {
        let reference = datetime!(2024-03-04 09:00 UTC);
        let parsed = parse_time_expression("2", reference).unwrap();
        assert_eq!(parsed, datetime!(2024-03-04 14:00 UTC));
    }

    #[test]
    fn past_slot_rolls_to_next_day() {
        let reference = datetime!(2024-03-04 15:00 UTC);
        let parsed = parse_time_expression("2", reference).unwrap();
        assert_eq!(parsed, datetime!(2024-03-05 14:00 UTC));
    }

    #[test]
    fn explicit_meridiem_and_minutes() {
        let reference = datetime!(2024-03-04 09:00 UTC);
        let parsed = parse_time_expression("2:30pm", reference).unwrap();
        assert_eq!(parsed, datetime!(2024-03-04 14:30 UTC));
    }

    #[test]
    fn twenty_four_hour_clock_passes_through() {
        let reference = datetime!(2024-03-04 09:00 UTC);
        let parsed = parse_time_expression("14:00 works for me", reference).unwrap();
        assert_eq!(parsed, datetime!(2024-03-04 14:00 UTC));
    }

    #[test]
    fn midnight_is_twelve_am() {
        let reference = datetime!(2024-03-04 09:00 UTC);
        let parsed = parse_time_expression("12am", reference).unwrap();
        assert_eq!(parsed, datetime!(2024-03-05 00:00 UTC));
    }

    #[test]
    fn no_clock_expression_is_none() {
        let reference = datetime!(2024-03-04 09:00 UTC);
        assert!(parse_time_expression("no idea", reference).is_none());
        assert!(parse_time_expression("", reference).is_none());
    }

    #[test]
    fn nonsense_hour_is_none() {
        let reference = datetime!(2024-03-04 09:00 UTC);
        assert!(parse_time_expression("99", reference).is_none());
    }

    #[test]
    fn formats_for_sms() {
        assert_eq!(format_callback_time(datetime!(2024-03-04 14:30 UTC)), "2:30pm");
        assert_eq!(format_callback_time(datetime!(2024-03-04 09:05 UTC)), "9:05am");
    }
}
