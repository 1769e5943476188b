//! Parser Framework (spec.md §4.3), grounded on
//! `original_source/brokerage/quote_parser.py`.
//!
//! The source's `QuoteParser` is an abstract base class concrete parsers
//! subclass, carrying mutable load-scoped state (`reader`, `file_name`,
//! `_validated`, …). Rust has no implementation inheritance; each concrete
//! parser below owns a `ParserState` by composition and the framework
//! functions in this module operate on explicit arguments rather than
//! `self`.

pub mod registry;
pub mod suppliers;

use crate::error::{CoreError, Result};
use crate::model::Quote;
use crate::reader::spreadsheet::{ColumnRef, SheetLocator, SpreadsheetReader};
use crate::reader::pdf::PdfReader;
use crate::reader::{CellValue, ExpectedType};
use crate::units::EnergyUnit;
use chrono::NaiveDateTime;
use regex::Regex;

/// Load-scoped state every concrete parser carries, matching the fields
/// the source's base class initializes in `__init__`/`load_file`.
#[derive(Default)]
pub struct ParserState {
    pub file_name: Option<String>,
    pub validated: bool,
    pub count: usize,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_until: Option<NaiveDateTime>,
}

impl ParserState {
    pub fn reset_for_load(&mut self, file_name: &str) {
        self.file_name = Some(file_name.to_string());
        self.validated = false;
        self.count = 0;
        self.valid_from = None;
        self.valid_until = None;
    }
}

/// A concrete parser's declared validation rule for one cell: either a
/// regex applied to the cell's text, or an exact value.
pub enum ExpectedCell {
    Matches(Regex),
    Equals(CellValue),
}

/// `rate_class_ids_for_alias` (spec.md §4.3.4): looks up `alias` in a
/// preloaded mapping, returning one `Some(id)` per mapped id, or `[None]`
/// when the alias is absent — the same fallback
/// `original_source/brokerage/quote_parser.py`'s
/// `get_rate_class_ids_for_alias` uses when `_rate_class_aliases` has no
/// entry for the alias. A parser with more than one id per alias yields
/// one quote per id (SPEC_FULL.md §E), as `direct_energy.py` does.
pub fn rate_class_ids_for_alias(mapping: &std::collections::HashMap<String, Vec<i64>>, alias: &str) -> Vec<Option<i64>> {
    match mapping.get(alias) {
        Some(ids) if !ids.is_empty() => ids.iter().map(|&id| Some(id)).collect(),
        _ => vec![None],
    }
}

pub fn validate_sheet_titles(reader: &SpreadsheetReader, expected: &[&str]) -> Result<()> {
    let present = reader.sheet_titles();
    for title in expected {
        if !present.iter().any(|p| p == title) {
            return Err(CoreError::format(format!(
                "expected sheet '{title}' not present; found {present:?}"
            )));
        }
    }
    Ok(())
}

/// Iterates `expected_cells`, failing on the first mismatch — the source
/// does the same rather than collecting every cell mismatch, since a
/// single wrong cell usually means the whole layout has shifted. A
/// `Matches` rule expects text, matching the source's regex-over-
/// `basestring` check; an `Equals` rule's expected type is taken from the
/// `CellValue` variant it was given, the nearest Rust equivalent of the
/// source's untyped `object` comparison that still type-checks.
pub fn validate_expected_cells(
    reader: &SpreadsheetReader,
    expected_cells: &[(SheetLocator, i64, ColumnRef, ExpectedCell)],
) -> Result<()> {
    for (sheet, row, col, expected) in expected_cells {
        let expected_type = match expected {
            ExpectedCell::Matches(_) => ExpectedType::Text,
            ExpectedCell::Equals(CellValue::Text(_)) => ExpectedType::Text,
            ExpectedCell::Equals(CellValue::Number(_)) => ExpectedType::Number,
        };
        let actual = reader.get(sheet.clone(), *row, col.clone(), expected_type)?;
        match expected {
            ExpectedCell::Matches(re) => {
                if !re.is_match(&actual.as_text()) {
                    return Err(CoreError::format(format!(
                        "cell at row {row} did not match /{re}/: got '{}'",
                        actual.as_text()
                    )));
                }
            }
            ExpectedCell::Equals(expected_value) => {
                if actual != *expected_value {
                    return Err(CoreError::format(format!(
                        "cell at row {row} expected {:?}, got {:?}",
                        expected_value, actual
                    )));
                }
            }
        }
    }
    Ok(())
}

/// One extracted annual-consumption band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRange {
    pub low: f64,
    pub high: Option<f64>,
}

#[allow(clippy::too_many_arguments)]
pub fn extract_volume_range(
    reader: &SpreadsheetReader,
    sheet: impl Into<SheetLocator>,
    row: i64,
    col: impl Into<ColumnRef>,
    regex: &Regex,
    fudge_low: bool,
    fudge_high: bool,
    fudge_block_size: i64,
    unit_conversion: Option<(EnergyUnit, EnergyUnit)>,
) -> Result<VolumeRange> {
    let groups = reader.get_matches(sheet, row, col, regex, &[ExpectedType::Number, ExpectedType::Number])?;
    let low_raw = groups.first().map(|v| v.as_number()).transpose()?;
    let high_raw = groups.get(1).map(|v| v.as_number()).transpose()?;

    let mut low = low_raw.unwrap_or(0.0);
    let mut high = high_raw;

    if fudge_low {
        low = fudge(low, fudge_block_size);
    }
    if fudge_high {
        high = high.map(|h| fudge(h, fudge_block_size));
    }

    if let Some((from, to)) = unit_conversion {
        low = crate::units::convert(low, from, to);
        high = high.map(|h| crate::units::convert(h, from, to));
    }

    Ok(VolumeRange { low, high })
}

/// Suppliers frequently publish ranges like "150-500" where the previous
/// row's upper bound was meant to be 149 rather than 150; snapping an
/// off-by-one endpoint to the nearest multiple of `block_size` corrects
/// for that (spec.md §4.3.4, boundary behaviour in §8).
fn fudge(value: f64, block_size: i64) -> f64 {
    let block_size = block_size.max(1);
    let v = value.round() as i64;
    let rem = v.rem_euclid(block_size);
    if rem == 1 {
        (v - 1) as f64
    } else if rem == block_size - 1 {
        (v + 1) as f64
    } else {
        value
    }
}

#[allow(clippy::too_many_arguments)]
pub fn extract_volume_ranges_horizontal(
    reader: &SpreadsheetReader,
    sheet: impl Into<SheetLocator> + Clone,
    row: i64,
    start_col: impl Into<ColumnRef>,
    end_col: impl Into<ColumnRef>,
    regex: &Regex,
    allow_restart_at_zero: bool,
    fudge_low: bool,
    fudge_high: bool,
    fudge_block_size: i64,
    unit_conversion: Option<(EnergyUnit, EnergyUnit)>,
) -> Result<Vec<VolumeRange>> {
    let cols = crate::reader::spreadsheet::column_range(&start_col.into(), &end_col.into(), 1, true)?;
    let mut ranges = Vec::with_capacity(cols.len());
    for col in cols {
        ranges.push(extract_volume_range(
            reader,
            sheet.clone(),
            row,
            col,
            regex,
            fudge_low,
            fudge_high,
            fudge_block_size,
            unit_conversion,
        )?);
    }
    for pair in ranges.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if let Some(a_high) = a.high {
            let contiguous = (a_high - b.low).abs() < 1e-9;
            let restart_ok = allow_restart_at_zero && b.low == 0.0;
            if !contiguous && !restart_ok {
                return Err(CoreError::format(format!(
                    "volume ranges not contiguous: previous high {a_high} != next low {}",
                    b.low
                )));
            }
        }
    }
    Ok(ranges)
}

/// Adjusts a timestamp's minute/second fields to the end of the day, used
/// by `SingleCellDateGetter`-style `valid_until = valid_from + 1 day`
/// arithmetic in concrete parsers.
pub fn next_day(dt: NaiveDateTime) -> NaiveDateTime {
    dt + chrono::Duration::days(1)
}

/// Which source a `DateGetter` reads from. Concrete parsers hold exactly
/// one reader kind, so only one variant here is ever populated per
/// parser; the enum exists to let date getters be declared once and
/// shared by the registry regardless of reader family (spec.md §9's
/// "tagged variants" redesign note).
pub enum DateGetter {
    SpreadsheetSingleCell {
        sheet: SheetLocatorValue,
        row: i64,
        col: ColumnRefValue,
        regex: Option<Regex>,
    },
    SpreadsheetTwoCells {
        sheet: SheetLocatorValue,
        start_row: i64,
        start_col: ColumnRefValue,
        end_row: i64,
        end_col: ColumnRefValue,
        regex: Option<Regex>,
    },
    PdfSingleCell {
        page: usize,
        y: f64,
        x: f64,
        regex: Option<Regex>,
    },
    PdfTwoCells {
        page: usize,
        start_y: f64,
        start_x: f64,
        end_y: f64,
        end_x: f64,
        regex: Option<Regex>,
    },
    FileName {
        regex: Regex,
    },
}

/// Owned copies of the locator types so `DateGetter` can be constructed
/// once (typically as a `const`/associated value on a parser type)
/// without borrowing the reader.
#[derive(Clone)]
pub enum SheetLocatorValue {
    Index(usize),
    Title(&'static str),
}

impl SheetLocatorValue {
    fn to_locator(&self) -> SheetLocator {
        match self {
            SheetLocatorValue::Index(i) => SheetLocator::Index(*i),
            SheetLocatorValue::Title(t) => SheetLocator::Title((*t).to_string()),
        }
    }
}

#[derive(Clone)]
pub enum ColumnRefValue {
    Index(usize),
    Letter(&'static str),
}

impl ColumnRefValue {
    fn to_col(&self) -> ColumnRef {
        match self {
            ColumnRefValue::Index(i) => ColumnRef::Index(*i),
            ColumnRefValue::Letter(l) => ColumnRef::Letter((*l).to_string()),
        }
    }
}

fn cell_as_datetime(value: &CellValue) -> Result<NaiveDateTime> {
    match value {
        CellValue::Number(n) => Ok(crate::dates::excel_number_to_datetime(*n)),
        CellValue::Text(s) => crate::dates::parse_datetime(s),
    }
}

impl DateGetter {
    pub fn get_dates(
        &self,
        spreadsheet: Option<&SpreadsheetReader>,
        pdf: Option<&PdfReader>,
        file_name: &str,
        attachment_pattern: Option<&Regex>,
    ) -> Result<(NaiveDateTime, NaiveDateTime)> {
        match self {
            DateGetter::SpreadsheetSingleCell { sheet, row, col, regex } => {
                let reader = spreadsheet.ok_or_else(|| CoreError::format("no spreadsheet reader loaded"))?;
                let cell = reader.get(sheet.to_locator(), *row, col.to_col(), ExpectedType::Any)?;
                let from = match regex {
                    None => cell_as_datetime(&cell)?,
                    Some(re) => crate::dates::parse_datetime(crate::reader::get_named_match(
                        &cell.as_text(),
                        re,
                        "date",
                    )?)?,
                };
                Ok((from, next_day(from)))
            }
            DateGetter::SpreadsheetTwoCells {
                sheet,
                start_row,
                start_col,
                end_row,
                end_col,
                regex,
            } => {
                let reader = spreadsheet.ok_or_else(|| CoreError::format("no spreadsheet reader loaded"))?;
                let start_cell = reader.get(sheet.to_locator(), *start_row, start_col.to_col(), ExpectedType::Any)?;
                let end_cell = reader.get(sheet.to_locator(), *end_row, end_col.to_col(), ExpectedType::Any)?;
                let parse = |cell: &CellValue| -> Result<NaiveDateTime> {
                    match regex {
                        None => cell_as_datetime(cell),
                        Some(re) => crate::dates::parse_datetime(crate::reader::get_named_match(&cell.as_text(), re, "date")?),
                    }
                };
                let from = parse(&start_cell)?;
                let until = parse(&end_cell)?;
                if from == until {
                    return Err(CoreError::format(
                        "valid_from and valid_until were equal; likely a tolerance mismatch picking the same box twice",
                    ));
                }
                Ok((from, next_day(until)))
            }
            DateGetter::PdfSingleCell { page, y, x, regex } => {
                let reader = pdf.ok_or_else(|| CoreError::format("no pdf reader loaded"))?;
                let text = reader.get(*page, *y, *x)?;
                let from = match regex {
                    None => crate::dates::parse_datetime(&text)?,
                    Some(re) => crate::dates::parse_datetime(crate::reader::get_named_match(&text, re, "date")?)?,
                };
                Ok((from, next_day(from)))
            }
            DateGetter::PdfTwoCells {
                page,
                start_y,
                start_x,
                end_y,
                end_x,
                regex,
            } => {
                let reader = pdf.ok_or_else(|| CoreError::format("no pdf reader loaded"))?;
                let start_text = reader.get(*page, *start_y, *start_x)?;
                let end_text = reader.get(*page, *end_y, *end_x)?;
                let parse = |text: &str| -> Result<NaiveDateTime> {
                    match regex {
                        None => crate::dates::parse_datetime(text),
                        Some(re) => crate::dates::parse_datetime(crate::reader::get_named_match(text, re, "date")?),
                    }
                };
                let from = parse(&start_text)?;
                let until = parse(&end_text)?;
                if from == until {
                    return Err(CoreError::format(
                        "valid_from and valid_until were equal; likely a tolerance mismatch picking the same box twice",
                    ));
                }
                Ok((from, next_day(until)))
            }
            DateGetter::FileName { regex } => {
                let _ = attachment_pattern;
                let normalized = file_name.replace('_', "-");
                let date_text = crate::reader::get_named_match(&normalized, regex, "date")?;
                let from = crate::dates::parse_datetime(date_text)?;
                Ok((from, next_day(from)))
            }
        }
    }
}

/// A produced quote that has not yet been counted/rounded by the
/// framework; concrete parsers build this and hand it to
/// `QuoteParser::extract_quotes`'s sink via `finish_quote`.
pub fn finish_quote(mut quote: Quote, rounding_digits: Option<u32>) -> Quote {
    if let Some(digits) = rounding_digits {
        let factor = 10f64.powi(digits as i32);
        quote.price = (quote.price * factor).round() / factor;
    }
    quote
}

/// Lifecycle contract every concrete parser implements (spec.md §4.3.1).
/// `extract_quotes` is push-based rather than returning an iterator: a
/// trait object cannot hand back `impl Iterator`, and the driver (C8)
/// needs to buffer in fixed-size batches anyway, so quotes are delivered
/// to a sink closure as they are produced — preserving the O(batch)
/// memory bound of spec.md §5 without needing generic associated types.
pub trait QuoteParser {
    /// Stable short identifier used in metric names (`NAME` in the
    /// source).
    fn name(&self) -> &'static str;

    fn load(
        &mut self,
        file_path: &std::path::Path,
        file_name: &str,
        matrix_format: &crate::model::MatrixFormat,
    ) -> Result<()>;

    fn validate(&mut self) -> Result<()>;

    fn extract_quotes(&mut self, sink: &mut dyn FnMut(Quote) -> Result<()>) -> Result<()>;

    fn count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fudge_snaps_off_by_one_low() {
        assert_eq!(fudge(149.0, 10), 150.0);
    }

    #[test]
    fn fudge_snaps_off_by_one_high() {
        assert_eq!(fudge(151.0, 10), 150.0);
    }

    #[test]
    fn fudge_leaves_round_values_alone() {
        assert_eq!(fudge(150.0, 10), 150.0);
    }

    #[test]
    fn rate_class_ids_for_alias_fans_out_one_id_per_mapping() {
        let mut mapping = std::collections::HashMap::new();
        mapping.insert("Direct-electric-OH-AEP-R1".to_string(), vec![11, 12]);
        let ids = rate_class_ids_for_alias(&mapping, "Direct-electric-OH-AEP-R1");
        assert_eq!(ids, vec![Some(11), Some(12)]);
    }

    #[test]
    fn rate_class_ids_for_alias_falls_back_to_none_when_unmapped() {
        let mapping = std::collections::HashMap::new();
        let ids = rate_class_ids_for_alias(&mapping, "no-such-alias");
        assert_eq!(ids, vec![None]);
    }
}
