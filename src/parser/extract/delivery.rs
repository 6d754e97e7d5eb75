use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use super::dates::parse_date;
use crate::model::DeliveryPeriod;

static DELIVERY_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)between\s+(.+?)\s+and\s+(.+?)(?:\.|$)").unwrap(),
        Regex::new(r"(?i)from\s+(.+?)\s+to\s+(.+?)(?:\.|$)").unwrap(),
        Regex::new(r"(?i)must\s+be\s+completed\s+between\s+(.+?)\s+and\s+(.+?)(?:\.|$)").unwrap(),
        Regex::new(r"(?i)completion\s+by\s+(.+?)(?:\.|$)").unwrap(),
    ]
});

/// Extract the period during which funded work must be delivered. Single
/// capture forms ("completion by X") bound only the end of the period.
pub fn extract(text: &str) -> Option<DeliveryPeriod> {
    for re in DELIVERY_RES.iter() {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let first = caps.get(1).and_then(|m| parse_date(m.as_str()));
        let second = caps.get(2).and_then(|m| parse_date(m.as_str()));

        let (start, end) = if caps.get(2).is_some() {
            (first, second)
        } else {
            (None, first)
        };

        if start.is_some() || end.is_some() {
            return Some(DeliveryPeriod {
                start_date: start.map(|d| d.and_time(NaiveTime::MIN)),
                end_date: end.map(|d| d.and_time(NaiveTime::MIN)),
            });
        }
    }

    None
}
