use anyhow::{ensure, Context, Result};

/// Parse `HH:MM:SS,mmm` into milliseconds. A `.` before the milliseconds is
/// accepted as well.
pub fn parse_timecode(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split(':').collect();
    ensure!(
        parts.len() == 3,
        "Timecode must look like HH:MM:SS,mmm, got '{}'",
        raw
    );

    let (seconds, millis) = parts[2]
        .split_once([',', '.'])
        .with_context(|| format!("Missing milliseconds in timecode '{}'", raw))?;

    let hours = parse_component(parts[0], "hours", raw)?;
    let minutes = parse_component(parts[1], "minutes", raw)?;
    let seconds = parse_component(seconds, "seconds", raw)?;
    ensure!(
        millis.len() == 3,
        "Milliseconds must have three digits in timecode '{}'",
        raw
    );
    let millis = parse_component(millis, "milliseconds", raw)?;
    ensure!(minutes < 60, "Minutes out of range in timecode '{}'", raw);
    ensure!(seconds < 60, "Seconds out of range in timecode '{}'", raw);

    Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis)
}

fn parse_component(value: &str, label: &str, raw: &str) -> Result<i64> {
    ensure!(
        !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        "Invalid {} component '{}' in timecode '{}'",
        label,
        value,
        raw
    );
    value
        .parse::<i64>()
        .with_context(|| format!("Invalid {} component '{}'", label, value))
}

/// Format milliseconds as `HH:MM:SS,mmm`; negative values clamp to zero.
pub fn format_timecode(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = ms % 3_600_000 / 60_000;
    let seconds = ms % 60_000 / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_representative_values() {
        for ms in [0, 1000, 3_723_456, 359_999_999] {
            let formatted = format_timecode(ms);
            assert_eq!(parse_timecode(&formatted).unwrap(), ms);
            assert_eq!(format_timecode(parse_timecode(&formatted).unwrap()), formatted);
        }
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(format_timecode(0), "00:00:00,000");
        assert_eq!(format_timecode(3_723_456), "01:02:03,456");
        assert_eq!(format_timecode(359_999_999), "99:59:59,999");
    }

    #[test]
    fn accepts_dot_separator() {
        assert_eq!(parse_timecode("00:00:01.500").unwrap(), 1500);
    }

    #[test]
    fn rejects_malformed_timecodes() {
        assert!(parse_timecode("00:01,000").is_err());
        assert!(parse_timecode("00:00:01").is_err());
        assert!(parse_timecode("00:00:01,5").is_err());
        assert!(parse_timecode("00:61:00,000").is_err());
        assert!(parse_timecode("aa:00:00,000").is_err());
    }

    #[test]
    fn clamps_negative_values() {
        assert_eq!(format_timecode(-40), "00:00:00,000");
    }
}
