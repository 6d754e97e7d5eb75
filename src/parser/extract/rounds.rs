use std::sync::LazyLock;

use regex::Regex;

use crate::model::ApplicationRound;
use crate::parser::patterns::MONTH_RE;

/// "Round 1:" / "Phase 2:" markers. Everything between one marker and the
/// next (or the end of the section) belongs to that round.
static ROUND_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:round|phase)\s+(\d+)\s*:").unwrap());

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Extract named application rounds. A round needs at least a recognizable
/// month to be worth keeping; rounds without one are dropped — fabricating a
/// date would be worse than omitting the round.
pub fn extract(text: &str) -> Vec<ApplicationRound> {
    let markers: Vec<(usize, usize, String)> = ROUND_MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps[1].to_string()))
        })
        .collect();

    let mut rounds = Vec::new();
    for (k, (_, body_start, number)) in markers.iter().enumerate() {
        let body_end = markers
            .get(k + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(text.len());
        let body = &text[*body_start..body_end];

        let Some(month) = MONTH_RE.find(body) else {
            continue;
        };
        let year = YEAR_RE
            .captures(body)
            .and_then(|caps| caps[1].parse::<i32>().ok());

        rounds.push(ApplicationRound {
            round_name: format!("Round {}", number),
            apply_open_month: Some(month.as_str().to_string()),
            apply_open_year_estimate: year,
            // Filled in by QA when the source later publishes an exact date
            apply_close_date: None,
        });
    }

    rounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_rounds_with_months_and_years() {
        let rounds = extract(
            "Round 1: Opens in November 2025, closes in January. Round 2: Opens in May 2026.",
        );
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].round_name, "Round 1");
        assert_eq!(rounds[0].apply_open_month.as_deref(), Some("November"));
        assert_eq!(rounds[0].apply_open_year_estimate, Some(2025));
        assert_eq!(rounds[1].round_name, "Round 2");
        assert_eq!(rounds[1].apply_open_month.as_deref(), Some("May"));
        assert_eq!(rounds[1].apply_open_year_estimate, Some(2026));
    }

    #[test]
    fn phase_markers_name_rounds_too() {
        let rounds = extract("Phase 1: applications from March 2026 onwards.");
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_name, "Round 1");
        assert_eq!(rounds[0].apply_open_month.as_deref(), Some("March"));
    }

    #[test]
    fn monthless_round_is_dropped() {
        let rounds = extract("Round 1: Opens in June 2026. Round 2: dates to be confirmed.");
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_name, "Round 1");
    }

    #[test]
    fn round_without_year_keeps_month() {
        let rounds = extract("Round 1: Opens in September.");
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].apply_open_month.as_deref(), Some("September"));
        assert_eq!(rounds[0].apply_open_year_estimate, None);
    }

    #[test]
    fn no_markers_is_empty() {
        assert!(extract("Applications accepted all year round.").is_empty());
    }
}
