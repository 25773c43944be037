//! Calendar-day normalization for attendance keys.
//!
//! Every incoming date collapses to its UTC calendar day so that any two
//! timestamps on the same day hit the same (student, date) row.

use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

const DAY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const NAIVE_MINUTES: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const NAIVE_SECONDS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Parse `YYYY-MM-DD`, an RFC 3339 timestamp, or an offset-less
/// `YYYY-MM-DDTHH:MM[:SS[.f]]` (read as UTC) and return its UTC day.
pub fn normalize_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if let Ok(day) = Date::parse(raw, DAY) {
        return Some(day);
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(day_of(ts));
    }
    [NAIVE_FRACTION, NAIVE_SECONDS, NAIVE_MINUTES]
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(raw, *fmt).ok())
        .map(|naive| naive.assume_utc().date())
}

/// UTC calendar day of an instant.
pub fn day_of(ts: OffsetDateTime) -> Date {
    ts.to_offset(UtcOffset::UTC).date()
}

pub fn format_day(day: Date) -> String {
    day.format(DAY).unwrap_or_else(|_| day.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn plain_day() {
        assert_eq!(normalize_date("2024-01-10"), Some(date!(2024 - 01 - 10)));
    }

    #[test]
    fn same_day_timestamps_collide() {
        let late = normalize_date("2024-05-01T23:59:00Z").unwrap();
        let early = normalize_date("2024-05-01T00:00:01Z").unwrap();
        assert_eq!(late, early);
        assert_eq!(late, date!(2024 - 05 - 01));
    }

    #[test]
    fn offsets_are_shifted_to_utc_first() {
        // 23:30 at -02:00 is already the next UTC day
        assert_eq!(
            normalize_date("2024-05-01T23:30:00-02:00"),
            Some(date!(2024 - 05 - 02))
        );
        assert_eq!(
            normalize_date("2024-05-02T00:30:00+05:00"),
            Some(date!(2024 - 05 - 01))
        );
    }

    #[test]
    fn naive_datetimes_are_read_as_utc() {
        assert_eq!(normalize_date("2024-05-01T23:59"), Some(date!(2024 - 05 - 01)));
        assert_eq!(normalize_date("2024-05-01T10:15:30"), Some(date!(2024 - 05 - 01)));
        assert_eq!(normalize_date("2024-05-01T10:15:30.250"), Some(date!(2024 - 05 - 01)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("2024-13-01"), None);
        assert_eq!(normalize_date("2024-02-30"), None);
    }

    #[test]
    fn day_of_uses_utc() {
        assert_eq!(day_of(datetime!(2024-03-01 01:00 +03:00)), date!(2024 - 02 - 29));
    }

    #[test]
    fn formats_iso_day() {
        assert_eq!(format_day(date!(2024 - 01 - 09)), "2024-01-09");
    }
}
