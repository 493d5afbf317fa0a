use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Parse a user supplied timestamp into UTC.
///
/// RFC 3339 strings keep their own offset. Naive timestamps
/// (`2024-05-01T22:30:00`, `2024-05-01 22:30:00`, with or without seconds)
/// are local time at the observatory, `utc_offset_hours` east of UTC.
pub fn parse_local_timestamp(input: &str, utc_offset_hours: f64) -> Result<DateTime<Utc>, String> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| format!("Invalid date format '{}'. Must be ISO 8601.", input))?;

    let offset_secs = (utc_offset_hours * 3600.0).round() as i32;
    let offset = FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| format!("Invalid UTC offset: {} hours", utc_offset_hours))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("Ambiguous local time '{}'", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_naive_timestamp_uses_site_offset() {
        let utc = parse_local_timestamp("2024-05-01T22:30:00", -3.0).unwrap();
        assert_eq!(utc.hour(), 1);
        assert_eq!(utc.minute(), 30);
        assert_eq!(utc.date_naive().to_string(), "2024-05-02");
    }

    #[test]
    fn test_parse_rfc3339_keeps_its_offset() {
        let utc = parse_local_timestamp("2024-05-01T22:30:00Z", -3.0).unwrap();
        assert_eq!(utc.hour(), 22);
    }

    #[test]
    fn test_parse_space_separated_without_seconds() {
        let utc = parse_local_timestamp("2024-05-01 10:00", 0.0).unwrap();
        assert_eq!(utc.hour(), 10);
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        let err = parse_local_timestamp("yesterday", 0.0).unwrap_err();
        assert!(err.contains("ISO 8601"));
    }
}
