use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use super::dates::{parse_date, parse_time};
use crate::model::ApplicationWindow;

static OPEN_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)open\s+from\s+(.+?)(?:\s+and\s+close|\s+until|\s+to)").unwrap(),
        Regex::new(r"(?i)applications?\s+open\s+(.+?)(?:\s+and\s+close|\s+until|\s+to)").unwrap(),
    ]
});

static CLOSE_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)close\s+on\s+(.+?)(?:\s+at|\s+by|\s+until)").unwrap(),
        Regex::new(r"(?i)closes?\s+(.+?)(?:\s+at|\s+by|\s+until)").unwrap(),
        Regex::new(r"(?i)deadline\s+(.+?)(?:\s+at|\s+by|\s+until)").unwrap(),
    ]
});

/// "at <time> [TZ]" — the timezone token is a strictly upper-case 3–4 letter
/// abbreviation, kept verbatim.
static AT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat\s+(.+?)(?:\s+((?-i:[A-Z]{3,4}))\b|$)").unwrap());

/// Extract the open/close window from a section's text. A window is only
/// produced when at least one of the two dates was actually found.
pub fn extract(text: &str) -> Option<ApplicationWindow> {
    let open = OPEN_RES
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| parse_date(&caps[1]));
    let close = CLOSE_RES
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| parse_date(&caps[1]));

    let mut close_date = close.map(|d| d.and_time(NaiveTime::MIN));
    let mut timezone = None;

    if let Some(caps) = AT_TIME_RE.captures(text) {
        if let (Some(time), Some(date)) = (parse_time(&caps[1]), close) {
            close_date = Some(date.and_time(time));
        }
        timezone = caps.get(2).map(|m| m.as_str().to_string());
    }

    if open.is_none() && close_date.is_none() {
        return None;
    }

    Some(ApplicationWindow {
        open_date: open.map(|d| d.and_time(NaiveTime::MIN)),
        close_date,
        timezone,
        application_rounds: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn open_and_close_pair() {
        let w = extract(
            "Applications open from 1 June 2025 and close on 31 July 2025 at 5:00 PM GMT.",
        )
        .unwrap();
        assert_eq!(w.open_date, Some(dt(2025, 6, 1, 0, 0)));
        assert_eq!(w.close_date, Some(dt(2025, 7, 31, 17, 0)));
        assert_eq!(w.timezone.as_deref(), Some("GMT"));
    }

    #[test]
    fn close_only_with_midday() {
        let w = extract("The deadline 30 September 2025 at midday BST sharp.").unwrap();
        assert_eq!(w.open_date, None);
        assert_eq!(w.close_date, Some(dt(2025, 9, 30, 12, 0)));
        assert_eq!(w.timezone.as_deref(), Some("BST"));
    }

    #[test]
    fn close_without_time_is_midnight_start_of_day() {
        let w = extract("Applications close 22 Sep 25 by post.").unwrap();
        assert_eq!(w.close_date, Some(dt(2025, 9, 22, 0, 0)));
        assert_eq!(w.timezone, None);
    }

    #[test]
    fn no_window_phrases_is_none() {
        assert_eq!(extract("General information about our grants."), None);
    }

    #[test]
    fn unparseable_dates_is_none() {
        // Phrases match but the fragments hold no recognizable date
        assert_eq!(extract("Applications close soon enough by then."), None);
    }
}
