//! Calendar-day helpers for "today" statistics and date filters.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// UTC bounds of the local calendar day containing `now`:
/// inclusive start of day, exclusive start of the next day.
pub fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = now.date_naive();
    (day_start_utc(day, now), day_start_utc(next_day(day), now))
}

/// UTC bounds of today in local time.
pub fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    local_day_bounds(Local::now())
}

/// UTC bounds of an arbitrary calendar date, interpreted in local time.
pub fn date_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let fallback = Local::now();
    (
        day_start_utc(day, fallback),
        day_start_utc(next_day(day), fallback),
    )
}

fn next_day(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(day)
}

fn day_start_utc(day: NaiveDate, fallback: DateTime<Local>) -> DateTime<Utc> {
    Local
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or(fallback)
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn bounds_are_roughly_one_day_apart() {
        // A DST transition can stretch or shrink the local day by an hour.
        let (start, end) = today_bounds();
        assert!(end - start >= Duration::hours(23));
        assert!(end - start <= Duration::hours(25));
    }

    #[test]
    fn now_falls_inside_today() {
        let now = Utc::now();
        let (start, end) = today_bounds();
        assert!(start <= now && now < end);
    }

    #[test]
    fn date_bounds_cover_the_named_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let (start, end) = date_bounds(day);
        assert!(end > start);
        assert_eq!(start.with_timezone(&Local).date_naive(), day);
    }
}
