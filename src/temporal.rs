//! ISO-8601 instants as they appear in temporal filters.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Parses the instant forms the lexer accepts: a year, year-month, date, or a
/// date with a time of day, optional fraction and optional zone. Missing
/// fields default to the start of the period; a missing zone means UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let (date_part, time_part) = match text.split_once(|c: char| c == 'T' || c == 't') {
        Some((date, time)) => (date, Some(time)),
        None => (text, None),
    };

    let mut fields = date_part.splitn(3, '-');
    let year = fields.next()?.parse::<i32>().ok()?;
    let month = fields.next().map_or(Some(1), |m| m.parse::<u32>().ok())?;
    let day = fields.next().map_or(Some(1), |d| d.parse::<u32>().ok())?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let Some(time_part) = time_part else {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    };

    let (clock, offset_seconds) = split_zone(time_part)?;
    let time = NaiveTime::parse_from_str(clock, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
        .ok()?;
    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Splits `10:00:00+02:00` into the clock text and the zone offset in seconds.
fn split_zone(time: &str) -> Option<(&str, i32)> {
    if let Some(clock) = time.strip_suffix(['Z', 'z']) {
        return Some((clock, 0));
    }
    let Some(sign_at) = time.rfind(['+', '-']) else {
        return Some((time, 0));
    };
    let (clock, zone) = time.split_at(sign_at);
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let (hours, minutes) = zone[1..].split_once(':')?;
    let seconds = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    Some((clock, sign * seconds))
}

/// Writes an instant as UTC with millisecond precision, or with the precision
/// needed to keep sub-millisecond instants exact.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    let format = if instant.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    instant.to_rfc3339_opts(format, true)
}
