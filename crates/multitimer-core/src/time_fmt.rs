//! Duration formatting and parsing shared by the CLI.
//!
//! Countdowns display as fixed-width `HH:MM:SS`; user input additionally
//! accepts the shorter `MM:SS` and plain-seconds forms.

/// Formats milliseconds as `HH:MM:SS`.
///
/// Negative values render as `00:00:00`; hours are not capped at 24.
pub fn format_hms(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Parses `HH:MM:SS`, `MM:SS`, or plain seconds into milliseconds.
///
/// The leading field is unbounded; trailing minute and second fields must
/// be below 60. Returns `None` for anything else, including signs,
/// embedded whitespace, and empty fields.
pub fn parse_hms(input: &str) -> Option<i64> {
    fn number(part: &str) -> Option<i64> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse::<i64>().ok()
    }

    fn sexagesimal(part: &str) -> Option<i64> {
        number(part).filter(|&v| v < 60)
    }

    let parts: Vec<&str> = input.trim().split(':').collect();
    let total_secs = match parts.as_slice() {
        [secs] => number(secs)?,
        [mins, secs] => number(mins)?.checked_mul(60)? + sexagesimal(secs)?,
        [hours, mins, secs] => {
            number(hours)?.checked_mul(3600)?
                + sexagesimal(mins)? * 60
                + sexagesimal(secs)?
        }
        _ => return None,
    };
    total_secs.checked_mul(1000)
}
