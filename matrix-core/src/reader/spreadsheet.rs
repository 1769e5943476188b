//! Spreadsheet-backed Tabular Reader, grounded on
//! `original_source/brokerage/spreadsheet_reader.py`. Backed by `calamine`,
//! the same crate the teacher uses for workbook parsing
//! (`backend/src/parser.rs`).

use crate::error::{CoreError, Result};
use crate::reader::{CellValue, ExpectedType};
use calamine::{open_workbook_auto, DataType, Range, Reader as CalamineReader};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Addresses a sheet either by its 0-based position or its title.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetLocator {
    Index(usize),
    Title(String),
}

impl From<&str> for SheetLocator {
    fn from(s: &str) -> Self {
        SheetLocator::Title(s.to_string())
    }
}

impl From<usize> for SheetLocator {
    fn from(i: usize) -> Self {
        SheetLocator::Index(i)
    }
}

/// A spreadsheet column, addressable by zero-based index or by the letter
/// scheme shown in spreadsheet UIs (A, B, … Z, AA, …).
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    Index(usize),
    Letter(String),
}

impl ColumnRef {
    pub fn to_index(&self) -> Result<usize> {
        match self {
            ColumnRef::Index(i) => Ok(*i),
            ColumnRef::Letter(letter) => col_letter_to_index(letter),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        ColumnRef::Letter(s.to_string())
    }
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        ColumnRef::Index(i)
    }
}

/// Base-26 letter-to-index conversion (`A` -> 0, `Z` -> 25, `AA` -> 26, …),
/// ported from `SpreadsheetReader.col_letter_to_index`.
pub fn col_letter_to_index(letter: &str) -> Result<usize> {
    let mut total: i64 = 0;
    for c in letter.to_ascii_lowercase().chars() {
        if !c.is_ascii_lowercase() {
            return Err(CoreError::format(format!("'{letter}' is not a valid column letter")));
        }
        total = total * 26 + (c as i64 - 'a' as i64 + 1);
    }
    total -= 1;
    if total < 0 {
        return Err(CoreError::format(format!("'{letter}' is not a valid column letter")));
    }
    Ok(total as usize)
}

/// Yields column indices from `start` to `stop`, inclusive by default, as
/// `SpreadsheetReader.column_range` does. Either end may be a letter or an
/// index.
pub fn column_range(start: &ColumnRef, stop: &ColumnRef, step: usize, inclusive: bool) -> Result<Vec<usize>> {
    let start_idx = start.to_index()?;
    let stop_idx = stop.to_index()?;
    let end = if inclusive { stop_idx + 1 } else { stop_idx };
    Ok((start_idx..end).step_by(step.max(1)).collect())
}

pub struct SpreadsheetReader {
    sheets: HashMap<String, Range<DataType>>,
    sheet_order: Vec<String>,
}

impl SpreadsheetReader {
    pub fn new() -> Self {
        SpreadsheetReader {
            sheets: HashMap::new(),
            sheet_order: Vec::new(),
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<()> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| CoreError::read(format!("{}: {e}", path.display())))?;
        let names = workbook.sheet_names().to_owned();
        for name in &names {
            if let Some(Ok(range)) = workbook.worksheet_range(name) {
                self.sheets.insert(name.clone(), range);
            }
        }
        self.sheet_order = names;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        !self.sheet_order.is_empty()
    }

    /// Subset check against `EXPECTED_SHEET_TITLES`, not equality.
    pub fn sheet_titles(&self) -> &[String] {
        &self.sheet_order
    }

    fn resolve_sheet(&self, locator: &SheetLocator) -> Result<&str> {
        match locator {
            SheetLocator::Index(i) => self
                .sheet_order
                .get(*i)
                .map(|s| s.as_str())
                .ok_or_else(|| CoreError::format(format!("no sheet at index {i}"))),
            SheetLocator::Title(t) => {
                if self.sheets.contains_key(t) {
                    Ok(t.as_str())
                } else {
                    Err(CoreError::format(format!("no sheet titled '{t}'")))
                }
            }
        }
    }

    fn range(&self, locator: &SheetLocator) -> Result<&Range<DataType>> {
        let title = self.resolve_sheet(locator)?;
        self.sheets
            .get(title)
            .ok_or_else(|| CoreError::format(format!("no sheet titled '{title}'")))
    }

    pub fn height(&self, sheet: impl Into<SheetLocator>) -> Result<usize> {
        Ok(self.range(&sheet.into())?.height())
    }

    pub fn width(&self, sheet: impl Into<SheetLocator>) -> Result<usize> {
        Ok(self.range(&sheet.into())?.width())
    }

    /// `row` is 1-based, exactly as shown in spreadsheet UIs: row 1 is the
    /// literal first row of the sheet (commonly the header row), row 2 the
    /// next, and so on — the reader does not special-case a header.
    /// Fails with `FormatError` both when the cell is out of range and
    /// when it holds a value that does not match `expected` — the source's
    /// `get(..., the_type)` raises `ValidationError` for the same two
    /// cases, each carrying the four neighboring cells' values.
    pub fn get(&self, sheet: impl Into<SheetLocator>, row: i64, col: impl Into<ColumnRef>, expected: ExpectedType) -> Result<CellValue> {
        let sheet = sheet.into();
        let col = col.into();
        let range = self.range(&sheet)?;
        if row < 1 {
            return Err(CoreError::format(format!("row {row} is not a valid 1-based row")));
        }
        let row_idx = (row - 1) as usize;
        let col_idx = col.to_index()?;
        let cell = range.get((row_idx, col_idx)).ok_or_else(|| {
            CoreError::format(format!(
                "no cell at row {}, col {} ({})",
                row, col_idx,
                self.neighbor_str(range, row_idx, col_idx)
            ))
        })?;
        let value = cell_to_value(cell);
        if !value.matches_type(expected) {
            return Err(CoreError::format(format!(
                "at ({}, {row}, {col_idx}), expected type {:?}, found '{}' with type {} ({})",
                sheet_display(&sheet),
                expected,
                value.as_text(),
                value.type_name(),
                self.neighbor_str(range, row_idx, col_idx)
            )));
        }
        Ok(value)
    }

    /// Fetches the cell at `(sheet, row, col)` as text, applies `regex`,
    /// and converts each capture group per `types` (spec.md §4.1's
    /// `get_matches(locator, regex, [types])`).
    pub fn get_matches(
        &self,
        sheet: impl Into<SheetLocator>,
        row: i64,
        col: impl Into<ColumnRef>,
        regex: &Regex,
        types: &[ExpectedType],
    ) -> Result<Vec<CellValue>> {
        let text = self.get(sheet, row, col, ExpectedType::Text)?.as_text();
        crate::reader::get_matches(&text, regex, types)
    }

    /// Builds the up/down/left/right neighbor diagnostic string the
    /// source's `get_neighbor_str()` closure produces, shared by both the
    /// out-of-range and type-mismatch error paths.
    fn neighbor_str(&self, range: &Range<DataType>, row: usize, col: usize) -> String {
        let neighbor = |r: i64, c: i64| -> String {
            if r < 0 || c < 0 {
                return "<out of range>".to_string();
            }
            range
                .get((r as usize, c as usize))
                .map(|v| cell_to_value(v).as_text())
                .unwrap_or_else(|| "<empty>".to_string())
        };
        format!(
            "up={}, down={}, left={}, right={}",
            neighbor(row as i64 - 1, col as i64),
            neighbor(row as i64 + 1, col as i64),
            neighbor(row as i64, col as i64 - 1),
            neighbor(row as i64, col as i64 + 1),
        )
    }
}

fn sheet_display(locator: &SheetLocator) -> String {
    match locator {
        SheetLocator::Index(i) => i.to_string(),
        SheetLocator::Title(t) => t.clone(),
    }
}

impl Default for SpreadsheetReader {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Int(i) => CellValue::Number(*i as f64),
        DataType::Float(f) => CellValue::Number(*f),
        DataType::String(s) => CellValue::Text(s.clone()),
        DataType::Bool(b) => CellValue::Text(b.to_string()),
        DataType::DateTime(d) => CellValue::Number(*d),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_conversion_matches_excel() {
        assert_eq!(col_letter_to_index("A").unwrap(), 0);
        assert_eq!(col_letter_to_index("Z").unwrap(), 25);
        assert_eq!(col_letter_to_index("AA").unwrap(), 26);
    }

    #[test]
    fn column_range_is_inclusive_by_default() {
        let r = column_range(&ColumnRef::Letter("A".into()), &ColumnRef::Letter("C".into()), 1, true).unwrap();
        assert_eq!(r, vec![0, 1, 2]);
    }

    #[test]
    fn column_range_exclusive() {
        let r = column_range(&ColumnRef::Letter("A".into()), &ColumnRef::Letter("C".into()), 1, false).unwrap();
        assert_eq!(r, vec![0, 1]);
    }
}
