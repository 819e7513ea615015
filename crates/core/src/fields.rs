//! Parsers turning raw form/row text into typed card fragments.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static LIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;,]").expect("invalid list separator regex"));

/// HP/CON pair. Either half may be missing, and a present half may be `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HpCon {
    /// Hit points.
    pub hp: Option<f64>,
    /// Constitution.
    pub con: Option<f64>,
}

/// Split on `;` or `,`, trim each item and drop the empty ones.
pub fn parse_delimited_list(input: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(input)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse numeric text. Blank input is `None`; anything non-numeric is `NaN`.
pub fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.parse::<f64>().unwrap_or(f64::NAN))
}

/// Parse `"HP/CON"` text, splitting on the first `/`.
pub fn parse_hp_con(input: &str) -> HpCon {
    let (left, right) = match input.split_once('/') {
        Some((left, right)) => (left, Some(right)),
        None => (input, None),
    };
    HpCon {
        hp: parse_number(left),
        con: right.and_then(parse_number),
    }
}

/// Inverse of [`parse_hp_con`]. Missing halves render as `?`; a pair with no
/// value at all renders as the empty string.
pub fn format_hp_con(value: &HpCon) -> String {
    if value.hp.is_none() && value.con.is_none() {
        return String::new();
    }
    format!(
        "{}/{}",
        format_optional_number(value.hp, "?"),
        format_optional_number(value.con, "?")
    )
}

/// Render a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

/// JSON form of a parsed number. Non-finite values are kept as text so they
/// survive a trip through the normalizer.
pub(crate) fn number_to_value(value: Option<f64>) -> Value {
    match value {
        None => Value::Null,
        Some(number) if number.is_finite() => Value::from(number),
        Some(number) => Value::String(format_number(number)),
    }
}

pub(crate) fn format_optional_number(value: Option<f64>, missing: &str) -> String {
    value
        .map(format_number)
        .unwrap_or_else(|| missing.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_lists_accept_both_separators() {
        assert_eq!(
            parse_delimited_list(" Car; Truck ,, Bus ;"),
            vec!["Car", "Truck", "Bus"]
        );
        assert!(parse_delimited_list("").is_empty());
        assert!(parse_delimited_list(" ; , ").is_empty());
    }

    #[test]
    fn hp_con_pairs() {
        assert_eq!(
            parse_hp_con("12/4"),
            HpCon {
                hp: Some(12.0),
                con: Some(4.0)
            }
        );
        assert_eq!(parse_hp_con(""), HpCon::default());
        assert_eq!(
            parse_hp_con("12"),
            HpCon {
                hp: Some(12.0),
                con: None
            }
        );
        assert_eq!(
            parse_hp_con("/4"),
            HpCon {
                hp: None,
                con: Some(4.0)
            }
        );
    }

    #[test]
    fn non_numeric_halves_become_nan() {
        let parsed = parse_hp_con("lots/4");
        assert!(parsed.hp.map(f64::is_nan).unwrap_or(false));
        assert_eq!(parsed.con, Some(4.0));
    }

    #[test]
    fn formats_hp_con() {
        assert_eq!(
            format_hp_con(&HpCon {
                hp: Some(12.0),
                con: None
            }),
            "12/?"
        );
        assert_eq!(
            format_hp_con(&HpCon {
                hp: Some(12.0),
                con: Some(4.5)
            }),
            "12/4.5"
        );
        assert_eq!(format_hp_con(&HpCon::default()), "");
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number(" 3 "), Some(3.0));
        assert_eq!(parse_number("   "), None);
        assert!(parse_number("cheap").map(f64::is_nan).unwrap_or(false));
    }
}
