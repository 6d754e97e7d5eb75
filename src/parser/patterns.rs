//! Shared pattern library: money amounts, tier phrases, dates, times and the
//! month-name table. All matching is plain regex, first-match-wins — the same
//! input text always yields the same result.

use std::sync::LazyLock;

use regex::Regex;

/// Money amount recognizers, tried in order. The capture group is always the
/// numeric part with optional thousands separators.
pub static MONEY_RES: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        // "up to £5,000"
        Regex::new(r"(?i)up to\s*[£$€]?\s*([\d,]+(?:\.\d{2})?)").unwrap(),
        // "over £5,000"
        Regex::new(r"(?i)over\s*[£$€]?\s*([\d,]+(?:\.\d{2})?)").unwrap(),
        // "£5,000"
        Regex::new(r"[£$€]\s*([\d,]+(?:\.\d{2})?)").unwrap(),
        // "5,000 £"
        Regex::new(r"([\d,]+(?:\.\d{2})?)\s*[£$€]").unwrap(),
        // "5,000 pounds"
        Regex::new(r"(?i)([\d,]+(?:\.\d{2})?)\s*(?:pounds?|euros?|dollars?)").unwrap(),
    ]
});

/// "from £X to £Y" explicit range.
pub static MONEY_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)from\s*[£$€]?\s*([\d,]+(?:\.\d{2})?)\s*to\s*[£$€]?\s*([\d,]+(?:\.\d{2})?)")
        .unwrap()
});

/// Lower-cased substrings that mark a heading as introducing a distinct
/// funding tier. Weak signals; a money match in the heading works too.
pub const TIER_PHRASES: &[&str] = &[
    "small grants", "large grants", "micro grants", "major grants",
    "tier 1", "tier 2", "level 1", "level 2", "category a", "category b",
    "round 1", "round 2", "phase 1", "phase 2",
];

// ── Dates ──

/// "1st September 2024" / "1 September 2024"
pub static DATE_DAY_FULL_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d{1,2})(?:st|nd|rd|th)?\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})",
    )
    .unwrap()
});

/// "22 Sep 2025" / "22 Sep 25"
pub static DATE_DAY_ABBR_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{2,4})\b")
        .unwrap()
});

/// "2024-09-01"
pub static DATE_ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());

/// "01/09/2024" — ambiguous order, read as DD/MM (UK convention).
pub static DATE_SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());

/// "5:00 PM", "5 PM", bare "17:30". The word forms (midday/noon/midnight) are
/// handled before this regex is consulted.
pub static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):?(\d{2})?\s*(am|pm)?").unwrap());

/// First month name (full or 3-letter) in a text. Full names listed first so
/// "January" is not clipped to "Jan".
pub static MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\b",
    )
    .unwrap()
});

/// Month name (full or 3-letter, any case) to 1–12.
pub fn month_number(name: &str) -> Option<u32> {
    match name.to_ascii_lowercase().as_str() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}
