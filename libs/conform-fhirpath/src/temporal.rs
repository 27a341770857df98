//! Parsing for FHIR's partial-precision Date/DateTime/Time string formats.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::value::{DatePrecision, DateTimePrecision, PartialDate, PartialDateTime, PartialTime, TimePrecision, TypedValue};

pub fn parse_date(raw: &str) -> Option<PartialDate> {
    let s = raw.trim();
    let (value, precision) = match s.len() {
        4 if s.chars().all(|c| c.is_ascii_digit()) => {
            (NaiveDate::parse_from_str(&format!("{s}-01-01"), "%Y-%m-%d").ok()?, DatePrecision::Year)
        }
        7 => (NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()?, DatePrecision::Month),
        10 => (NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?, DatePrecision::Day),
        _ => return None,
    };
    Some(PartialDate { raw: raw.to_string(), precision, value })
}

pub fn parse_time(raw: &str) -> Option<PartialTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let precision = if s.contains('.') {
        TimePrecision::Millisecond
    } else if s.matches(':').count() >= 2 {
        TimePrecision::Second
    } else if s.contains(':') {
        TimePrecision::Minute
    } else {
        TimePrecision::Hour
    };
    let value = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(s, "%H"))
        .ok()?;
    Some(PartialTime { raw: raw.to_string(), precision, value })
}

pub fn parse_datetime(raw: &str) -> Option<PartialDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let Some((date_part, rest)) = s.split_once('T') else {
        let date = parse_date(s)?;
        let naive = NaiveDateTime::new(date.value, NaiveTime::from_hms_opt(0, 0, 0)?);
        let precision = match date.precision {
            DatePrecision::Year => DateTimePrecision::Year,
            DatePrecision::Month => DateTimePrecision::Month,
            DatePrecision::Day => DateTimePrecision::Day,
        };
        return Some(PartialDateTime {
            raw: raw.to_string(),
            precision,
            value: DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
            timezone_offset_seconds: None,
        });
    };

    let date = parse_date(date_part)?;
    let (time_part, tz_offset) = split_timezone(rest)?;
    let (time, precision) = parse_datetime_time_part(time_part)?;

    let local = NaiveDateTime::new(date.value, time);
    let value = match tz_offset {
        Some(offset_secs) => {
            let offset = FixedOffset::east_opt(offset_secs)?;
            offset.from_local_datetime(&local).single()?.with_timezone(&Utc)
        }
        None => DateTime::<Utc>::from_naive_utc_and_offset(local, Utc),
    };

    Some(PartialDateTime { raw: raw.to_string(), precision, value, timezone_offset_seconds: tz_offset })
}

fn split_timezone(rest: &str) -> Option<(&str, Option<i32>)> {
    if let Some(stripped) = rest.strip_suffix('Z') {
        return Some((stripped, Some(0)));
    }
    if let Some(pos) = rest.rfind(['+', '-']) {
        let (time, tz) = rest.split_at(pos);
        if tz.len() >= 6 && tz.as_bytes().get(3) == Some(&b':') {
            let sign = if tz.starts_with('-') { -1 } else { 1 };
            let hours: i32 = tz[1..3].parse().ok()?;
            let minutes: i32 = tz[4..6].parse().ok()?;
            return Some((time, Some(sign * (hours * 3600 + minutes * 60))));
        }
    }
    Some((rest, None))
}

fn parse_datetime_time_part(time_part: &str) -> Option<(NaiveTime, DateTimePrecision)> {
    let time_part = time_part.trim();
    if time_part.is_empty() {
        return Some((NaiveTime::from_hms_opt(0, 0, 0)?, DateTimePrecision::Day));
    }

    let (main, frac) = time_part.split_once('.').map(|(a, b)| (a, Some(b))).unwrap_or((time_part, None));
    let parts: Vec<&str> = main.split(':').collect();
    let (hour_str, minute_str, second_str, precision) = match parts.as_slice() {
        [hh] => (*hh, "0", "0", DateTimePrecision::Minute),
        [hh, mm] => (*hh, *mm, "0", DateTimePrecision::Minute),
        [hh, mm, ss] => (
            *hh,
            *mm,
            *ss,
            if frac.is_some() { DateTimePrecision::Millisecond } else { DateTimePrecision::Second },
        ),
        _ => return None,
    };

    let hour: u32 = hour_str.trim().parse().ok()?;
    let minute: u32 = minute_str.trim().parse().ok()?;
    let second: u32 = second_str.trim().parse().ok()?;
    let nanos: u32 = match frac {
        Some(frac) => {
            let digits: String = frac.chars().take(3).collect();
            format!("{digits:0<3}").parse::<u32>().ok()? * 1_000_000
        }
        None => 0,
    };

    Some((NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?, precision))
}

/// Best-effort temporal parse used when lifting a raw JSON string into a
/// [`TypedValue`]: try DateTime, then Date, then Time, falling back to a
/// plain string so ordinary text is never misclassified as temporal.
pub fn parse_as_temporal(raw: &str) -> Option<TypedValue> {
    if raw.contains('T') {
        return parse_datetime(raw).map(TypedValue::DateTime);
    }
    if looks_like_date(raw) {
        return parse_date(raw).map(TypedValue::Date);
    }
    if looks_like_time(raw) {
        return parse_time(raw).map(TypedValue::Time);
    }
    None
}

fn looks_like_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.len() {
        4 => bytes.iter().all(u8::is_ascii_digit),
        7 => bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'-' && bytes[5..7].iter().all(u8::is_ascii_digit),
        10 => {
            bytes[..4].iter().all(u8::is_ascii_digit)
                && bytes[4] == b'-'
                && bytes[5..7].iter().all(u8::is_ascii_digit)
                && bytes[7] == b'-'
                && bytes[8..10].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

fn looks_like_time(s: &str) -> bool {
    s.len() >= 5
        && s.as_bytes()[2] == b':'
        && s.as_bytes()[..2].iter().all(u8::is_ascii_digit)
        && s.as_bytes()[3..5].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_precision_date() {
        let d = parse_date("2020").unwrap();
        assert_eq!(d.precision, DatePrecision::Year);
    }

    #[test]
    fn parses_full_datetime_with_offset() {
        let dt = parse_datetime("2020-01-01T10:00:00-05:00").unwrap();
        assert_eq!(dt.timezone_offset_seconds, Some(-5 * 3600));
        assert_eq!(dt.precision, DateTimePrecision::Second);
    }

    #[test]
    fn date_only_string_is_not_misread_as_time() {
        assert!(parse_as_temporal("2020-01-01").is_some());
        assert!(matches!(parse_as_temporal("hello"), None));
    }

    #[test]
    fn parses_millisecond_precision_time() {
        let t = parse_time("10:30:00.500").unwrap();
        assert_eq!(t.precision, TimePrecision::Millisecond);
    }
}
