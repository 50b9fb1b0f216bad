//! Sender identity normalization.

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;
const NATIONAL_DIGITS: usize = 10;

/// Normalizes a phone number to `+<digits>` so inbound senders can be
/// compared with stored contacts.
///
/// Formatting characters are dropped. A leading `+` or `00` marks an
/// international number; a bare ten-digit number is treated as national and
/// prefixed with `default_country_code`. Returns `None` when the input does
/// not look like a phone number.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    let international = trimmed.starts_with('+');
    let mut digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if !international && digits.starts_with("00") {
        digits.drain(..2);
    } else if !international && digits.len() == NATIONAL_DIGITS {
        digits.insert_str(0, default_country_code);
    }

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return None;
    }
    Some(format!("+{digits}"))
}
