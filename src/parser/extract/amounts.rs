use crate::parser::patterns::{MONEY_RANGE_RE, MONEY_RES};

/// A grant amount range pulled out of one piece of text. Either bound may be
/// absent; the currency is not captured here (it stays at the opportunity
/// default until a symbol-to-code mapping exists).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrantRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Scan text for a money amount and disambiguate it by context:
/// "up to" caps the grant, "over" floors it, "from … to …" is an explicit
/// range, and a bare figure is read conservatively as a ceiling.
pub fn extract(text: &str) -> Option<GrantRange> {
    let caps = MONEY_RES.iter().find_map(|re| re.captures(text))?;
    let amount = parse_amount(&caps[1])?;
    let lower = text.to_lowercase();

    if lower.contains("up to") {
        return Some(GrantRange {
            min: None,
            max: Some(amount),
        });
    }
    if lower.contains("over") {
        return Some(GrantRange {
            min: Some(amount),
            max: None,
        });
    }
    if lower.contains("from") && lower.contains("to") {
        // "from £5,000 to £25,000" — no explicit range, no amounts: a
        // half-understood range is worse than none.
        let range = MONEY_RANGE_RE.captures(text)?;
        return Some(GrantRange {
            min: parse_amount(&range[1]),
            max: parse_amount(&range[2]),
        });
    }

    Some(GrantRange {
        min: None,
        max: Some(amount),
    })
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}
