//! Canonicalization of caller ids.  Twilio hands us numbers in whatever shape
//! the carrier felt like that day; everything downstream is keyed by the
//! canonical `+61xxxxxxxxx` form produced here.

use crate::consts::COUNTRY_CODE;

const SUBSCRIBER_DIGITS: usize = 9;

/// Collapse a raw phone string to canonical form.  Never fails: garbage in,
/// unvalidated string out.  Callers gate on `is_valid_subscriber_number`
/// before treating the result as a real subscriber.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        // National trunk prefix, e.g. 0412 345 678.
        format!("+{COUNTRY_CODE}{rest}")
    } else if digits.starts_with(COUNTRY_CODE) {
        format!("+{digits}")
    } else {
        format!("+{COUNTRY_CODE}{digits}")
    }
}

/// True iff `phone` is exactly `+<country code>` followed by nine digits.
/// A malformed caller id must suppress the send, never crash the flow.
pub fn is_valid_subscriber_number(phone: &str) -> bool {
    let Some(rest) = phone.strip_prefix('+') else {
        return false;
    };
    let Some(subscriber) = rest.strip_prefix(COUNTRY_CODE) else {
        return false;
    };
    subscriber.len() == SUBSCRIBER_DIGITS && subscriber.chars().all(|c| c.is_ascii_digit())
}
