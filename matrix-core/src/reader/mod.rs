//! Tabular Reader (spec.md §4.1): uniform coordinate-addressed access to
//! spreadsheets and PDFs, grounded on `original_source/brokerage/reader.py`
//! (the shared base) plus `spreadsheet_reader.py` and `pdf_reader.py` (the
//! two concrete readers).

pub mod pdf;
pub mod spreadsheet;

use crate::error::{CoreError, Result};
use regex::Regex;

/// A value read back from a cell or text box, before the caller converts
/// it to the type it expects.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }

    pub fn as_number(&self) -> Result<f64> {
        match self {
            CellValue::Number(n) => Ok(*n),
            CellValue::Text(s) => parse_number(s),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
        }
    }

    fn matches_type(&self, expected: ExpectedType) -> bool {
        match expected {
            ExpectedType::Any => true,
            ExpectedType::Text => matches!(self, CellValue::Text(_)),
            ExpectedType::Number => matches!(self, CellValue::Number(_)),
        }
    }
}

/// The type a `get()` caller expects a cell/box to hold, ported from the
/// source's `SpreadsheetReader.get(..., the_type)` (`isinstance(value,
/// the_type)`). `Any` stands in for the source's `object` wildcard, used
/// where a cell is compared for exact equality rather than read as a
/// specific type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Text,
    Number,
    Any,
}

/// Strips thousands separators before converting, as suppliers routinely
/// publish volume figures like `150,000`.
pub fn parse_number(text: &str) -> Result<f64> {
    let cleaned = text.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .map_err(|_| CoreError::format(format!("expected a number, got '{text}'")))
}

/// Applies `regex` to `text` and converts each capture group to the
/// corresponding entry of `types`, stripping commas before any numeric
/// conversion (spec.md §4.1's `get_matches(locator, regex, [types])`,
/// ported from `original_source/brokerage/reader.py`'s
/// `_validate_and_convert_text`). Fails with `CoreError::Format` on no
/// match, or when the regex's group count does not equal `types.len()`.
pub fn get_matches(text: &str, regex: &Regex, types: &[ExpectedType]) -> Result<Vec<CellValue>> {
    let caps = regex
        .captures(text)
        .ok_or_else(|| CoreError::format(format!("'{text}' did not match /{regex}/")))?;
    let group_count = regex.captures_len() - 1;
    if group_count != types.len() {
        return Err(CoreError::format(format!(
            "/{regex}/ has {group_count} capture group(s) but {} type(s) were given",
            types.len()
        )));
    }
    let mut values = Vec::with_capacity(group_count);
    for (i, expected) in types.iter().enumerate() {
        let group = caps
            .get(i + 1)
            .ok_or_else(|| CoreError::format(format!("group {} did not participate in match of '{text}'", i + 1)))?;
        let raw = group.as_str();
        let value = match expected {
            ExpectedType::Number => CellValue::Number(parse_number(raw)?),
            ExpectedType::Text | ExpectedType::Any => CellValue::Text(raw.to_string()),
        };
        values.push(value);
    }
    Ok(values)
}

/// Fetches a single named group as a string (used by date getters, which
/// need text rather than a number).
pub fn get_named_match<'a>(text: &'a str, regex: &Regex, group: &str) -> Result<&'a str> {
    let caps = regex
        .captures(text)
        .ok_or_else(|| CoreError::format(format!("'{text}' did not match /{regex}/")))?;
    caps.name(group)
        .map(|m| m.as_str())
        .ok_or_else(|| CoreError::format(format!("regex has no group named '{group}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_matches_converts_each_group_by_its_type() {
        let re = Regex::new(r"^(?P<low>[\d,]+)\s*-\s*(?P<high>[\d,]+)$").unwrap();
        let values = get_matches("1,500-2,000", &re, &[ExpectedType::Number, ExpectedType::Number]).unwrap();
        assert_eq!(values, vec![CellValue::Number(1500.0), CellValue::Number(2000.0)]);
    }

    #[test]
    fn get_matches_rejects_a_type_count_mismatch() {
        let re = Regex::new(r"^(?P<low>[\d,]+)-(?P<high>[\d,]+)$").unwrap();
        assert!(get_matches("1-2", &re, &[ExpectedType::Number]).is_err());
    }

    #[test]
    fn get_matches_fails_on_no_match() {
        let re = Regex::new(r"^(?P<date>\d+/\d+/\d+)$").unwrap();
        assert!(get_matches("not a date", &re, &[ExpectedType::Text]).is_err());
    }

    #[test]
    fn cell_value_type_matching() {
        assert!(CellValue::Number(1.0).matches_type(ExpectedType::Number));
        assert!(!CellValue::Number(1.0).matches_type(ExpectedType::Text));
        assert!(CellValue::Text("x".into()).matches_type(ExpectedType::Any));
    }
}
