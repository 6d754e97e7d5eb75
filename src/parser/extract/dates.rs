//! Shared date and time parsing primitives. Best-effort: every function
//! returns `None` rather than guessing when no pattern matches, and invalid
//! calendar dates (31/02) fall out as `None` through the checked chrono
//! constructors.

use chrono::{NaiveDate, NaiveTime};

use crate::parser::patterns::{
    month_number, DATE_DAY_ABBR_MONTH_RE, DATE_DAY_FULL_MONTH_RE, DATE_ISO_RE, DATE_SLASH_RE,
    TIME_RE,
};

/// Try each date pattern in library order and return the first parse.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Some(caps) = DATE_DAY_FULL_MONTH_RE.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_DAY_ABBR_MONTH_RE.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = expand_year(caps[3].parse().ok()?, caps[3].len());
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_ISO_RE.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_SLASH_RE.captures(text) {
        // DD/MM/YYYY, UK convention
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Two-digit years: < 50 reads as 20xx, otherwise 19xx.
fn expand_year(year: i32, digits: usize) -> i32 {
    if digits != 2 {
        return year;
    }
    if year < 50 {
        2000 + year
    } else {
        1900 + year
    }
}

/// Parse a time-of-day fragment: "5:00 PM", "5 pm", "17:30", plus the word
/// forms "midday"/"noon" (12:00) and "midnight" (00:00).
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim().to_lowercase();

    if text == "midday" || text == "noon" {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if text == "midnight" {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }

    let caps = TIME_RE.captures(&text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    match caps.get(3).map(|m| m.as_str()) {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn full_month_forms() {
        assert_eq!(parse_date("1st September 2024"), Some(d(2024, 9, 1)));
        assert_eq!(parse_date("1 September 2024"), Some(d(2024, 9, 1)));
        assert_eq!(parse_date("22nd march 2025"), Some(d(2025, 3, 22)));
    }

    #[test]
    fn abbreviated_month_two_digit_year_cutoff() {
        assert_eq!(parse_date("22 Sep 25"), Some(d(2025, 9, 22)));
        assert_eq!(parse_date("22 Sep 87"), Some(d(1987, 9, 22)));
        assert_eq!(parse_date("22 Sep 2025"), Some(d(2025, 9, 22)));
    }

    #[test]
    fn iso_and_slash_forms() {
        assert_eq!(parse_date("2024-09-01"), Some(d(2024, 9, 1)));
        // DD/MM, not MM/DD
        assert_eq!(parse_date("01/09/2024"), Some(d(2024, 9, 1)));
    }

    #[test]
    fn invalid_calendar_date_is_none() {
        assert_eq!(parse_date("31/02/2024"), None);
    }

    #[test]
    fn unrecognized_text_is_none() {
        assert_eq!(parse_date("as soon as possible"), None);
        assert_eq!(parse_date("next spring"), None);
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn clock_times() {
        assert_eq!(parse_time("5:00 PM"), Some(t(17, 0)));
        assert_eq!(parse_time("5 PM"), Some(t(17, 0)));
        assert_eq!(parse_time("12 PM"), Some(t(12, 0)));
        assert_eq!(parse_time("12 AM"), Some(t(0, 0)));
        assert_eq!(parse_time("9:30 am"), Some(t(9, 30)));
    }

    #[test]
    fn word_times() {
        assert_eq!(parse_time("midday"), Some(t(12, 0)));
        assert_eq!(parse_time("noon"), Some(t(12, 0)));
        assert_eq!(parse_time("midnight"), Some(t(0, 0)));
    }

    #[test]
    fn nonsense_time_is_none() {
        assert_eq!(parse_time("whenever"), None);
    }
}
