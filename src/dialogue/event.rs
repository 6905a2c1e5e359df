use crate::types::TimelineEvent;

/// Parse one timeline event line. A literal dash (hyphen, en dash, or em
/// dash) separates time from description; colons never split, so times
/// like "9:00 AM" keep their minutes. A line with no dash is an untimed
/// event.
pub fn split_event(line: &str) -> TimelineEvent {
    let line = line.trim();
    if let Some((time, description)) = split_on_dash(line) {
        return TimelineEvent {
            time: normalize_time(time),
            description: description.to_string(),
        };
    }
    TimelineEvent {
        time: String::new(),
        description: line.to_string(),
    }
}

/// Split at the first dash that leaves non-empty text on both sides.
fn split_on_dash(line: &str) -> Option<(&str, &str)> {
    for (idx, ch) in line.char_indices() {
        if matches!(ch, '-' | '–' | '—') {
            let left = line[..idx].trim();
            let right = line[idx + ch.len_utf8()..].trim();
            if !left.is_empty() && !right.is_empty() {
                return Some((left, right));
            }
        }
    }
    None
}

/// Normalize common time inputs to `H:MM` or `H:MM AM/PM`.
///
/// Accepted forms: `9`, `9am`, `9:00`, `9:00pm`, `09 00 pm`, `0900pm`.
/// Anything else passes through unchanged.
pub fn normalize_time(input: &str) -> String {
    let s = input.trim();
    if s.is_empty() {
        return String::new();
    }

    let bytes = s.as_bytes();
    let mut i = 0;

    // 1-2 digit hour
    let hour_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() && i - hour_start < 2 {
        i += 1;
    }
    if i == hour_start {
        return s.to_string();
    }
    let hour: u32 = match s[hour_start..i].parse() {
        Ok(h) => h,
        Err(_) => return s.to_string(),
    };

    // Optional single separator, then an optional 2-digit minute
    let mut minutes = "00";
    let after_hour = i;
    if i < bytes.len() && (bytes[i] == b':' || bytes[i] == b' ') {
        i += 1;
    }
    if i + 1 < bytes.len() && bytes[i].is_ascii_digit() && bytes[i + 1].is_ascii_digit() {
        minutes = &s[i..i + 2];
        i += 2;
    } else if i != after_hour && !s[i..].trim_start().eq_ignore_ascii_case("am")
        && !s[i..].trim_start().eq_ignore_ascii_case("pm")
        && !s[i..].trim().is_empty()
    {
        // A separator followed by something that is not a minute pair
        // or meridiem is not a time.
        return s.to_string();
    }

    // Optional meridiem
    let rest = s[i..].trim_start();
    if rest.is_empty() {
        return format!("{hour}:{minutes}");
    }
    if rest.eq_ignore_ascii_case("am") {
        return format!("{hour}:{minutes} AM");
    }
    if rest.eq_ignore_ascii_case("pm") {
        return format!("{hour}:{minutes} PM");
    }

    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::{normalize_time, split_event};

    #[test]
    fn normalizes_bare_hour() {
        assert_eq!(normalize_time("9"), "9:00");
    }

    #[test]
    fn normalizes_meridiem_forms() {
        assert_eq!(normalize_time("9am"), "9:00 AM");
        assert_eq!(normalize_time("9:00pm"), "9:00 PM");
        assert_eq!(normalize_time("09 00 pm"), "9:00 PM");
        assert_eq!(normalize_time("0900pm"), "9:00 PM");
    }

    #[test]
    fn keeps_colon_minutes() {
        assert_eq!(normalize_time("9:30"), "9:30");
        assert_eq!(normalize_time("12:45 AM"), "12:45 AM");
    }

    #[test]
    fn passes_through_non_times() {
        assert_eq!(normalize_time("Morning"), "Morning");
        assert_eq!(normalize_time("9ish"), "9ish");
    }

    #[test]
    fn dash_splits_time_from_description() {
        let event = split_event("9:00 AM - Wake up");
        assert_eq!(event.time, "9:00 AM");
        assert_eq!(event.description, "Wake up");
    }

    #[test]
    fn em_and_en_dashes_split_too() {
        assert_eq!(split_event("Noon – Lunch").time, "Noon");
        assert_eq!(split_event("Dusk — Walk").description, "Walk");
    }

    #[test]
    fn no_dash_means_untimed() {
        let event = split_event("Woke up early");
        assert_eq!(event.time, "");
        assert_eq!(event.description, "Woke up early");
    }

    #[test]
    fn colon_is_never_a_separator() {
        let event = split_event("Note: buy milk");
        assert_eq!(event.time, "");
        assert_eq!(event.description, "Note: buy milk");
    }
}
