//! Spreadsheet-based reference parser, grounded on
//! `original_source/brokerage/quote_parsers/direct_energy.py`. Exists
//! specifically to exercise the multiple-rate-class-ids-per-alias
//! capability SPEC_FULL.md §E names: one `rate_class_alias` can map to
//! several downstream ids, in which case the parser yields one quote per
//! (price column, rate-class id) pair. The exact column layout below is
//! this reference implementation's own choice (spec.md §1 excludes the
//! byte-level layout of each supplier spreadsheet from scope), chosen to
//! exercise `validate_sheet_titles`, horizontal volume-range extraction
//! with `fudge_high`, and `rate_class_ids_for_alias`, as the original
//! parser does.

use crate::dates::Month;
use crate::error::{CoreError, Result};
use crate::model::{MatrixFormat, Quote, ServiceType};
use crate::parser::{
    extract_volume_ranges_horizontal, finish_quote, rate_class_ids_for_alias, validate_expected_cells, validate_sheet_titles,
    ExpectedCell, ParserState, QuoteParser,
};
use crate::reader::spreadsheet::{ColumnRef, SheetLocator, SpreadsheetReader};
use crate::reader::{CellValue, ExpectedType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

const SHEET: &str = "Daily Matrix Price";
const VOLUME_COLUMN_START: &str = "G";
const VOLUME_COLUMN_END: &str = "J";

static VOLUME_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?P<low>[\d,]+)\s*-\s*(?P<high>[\d,]+)$").unwrap());
static AS_OF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)as of (?P<date>\d+/\d+/\d+)").unwrap());

pub struct DirectEnergyParser {
    state: ParserState,
    reader: SpreadsheetReader,
    term_months: Option<u32>,
    start_from: Option<chrono::NaiveDate>,
    /// Preloaded alias→ids mapping (spec.md §4.3.4); empty unless a
    /// caller supplies one via `with_rate_class_aliases`, in which case
    /// every alias falls back to a single `None` id, matching
    /// `get_rate_class_ids_for_alias`'s behaviour against an empty
    /// mapping in the original source.
    rate_class_aliases: HashMap<String, Vec<i64>>,
}

impl DirectEnergyParser {
    pub fn new() -> Self {
        DirectEnergyParser {
            state: ParserState::default(),
            reader: SpreadsheetReader::new(),
            term_months: None,
            start_from: None,
            rate_class_aliases: HashMap::new(),
        }
    }

    /// Supplies the alias→ids mapping this reference implementation has
    /// no live source for (no supplier rate-class table is queried
    /// anywhere in this port); a caller that does have one can preload it
    /// here before `extract_quotes` runs.
    pub fn with_rate_class_aliases(mut self, mapping: HashMap<String, Vec<i64>>) -> Self {
        self.rate_class_aliases = mapping;
        self
    }
}

impl Default for DirectEnergyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteParser for DirectEnergyParser {
    fn name(&self) -> &'static str {
        "direct_energy"
    }

    fn load(&mut self, file_path: &Path, file_name: &str, _matrix_format: &MatrixFormat) -> Result<()> {
        self.reader.load(file_path)?;
        self.state.reset_for_load(file_name);
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        validate_sheet_titles(&self.reader, &[SHEET])?;
        validate_expected_cells(
            &self.reader,
            &[(
                SheetLocator::Title(SHEET.to_string()),
                1,
                ColumnRef::Letter("A".to_string()),
                ExpectedCell::Matches(Regex::new(r"(?i)Direct Energy").unwrap()),
            )],
        )?;

        let as_of_cell = self
            .reader
            .get(SheetLocator::Title(SHEET.to_string()), 3, ColumnRef::Letter("A".to_string()), ExpectedType::Text)?;
        let date_text = crate::reader::get_named_match(&as_of_cell.as_text(), &AS_OF_RE, "date")?;
        self.start_from = Some(crate::dates::parse_datetime(date_text)?.date());

        let term_cell = self
            .reader
            .get(SheetLocator::Title(SHEET.to_string()), 2, ColumnRef::Letter("F".to_string()), ExpectedType::Number)?;
        self.term_months = Some(term_cell.as_number()? as u32);

        self.state.validated = true;
        Ok(())
    }

    fn extract_quotes(&mut self, sink: &mut dyn FnMut(Quote) -> Result<()>) -> Result<()> {
        if !self.state.validated {
            self.validate()?;
        }
        let term_months = self
            .term_months
            .ok_or_else(|| CoreError::format("term_months was not read during validate()"))?;
        let start_from = self
            .start_from
            .ok_or_else(|| CoreError::format("start_from was not read during validate()"))?;
        let start_until = (Month::containing(start_from) + 1).first();
        let valid_from = crate::dates::date_to_datetime(start_from);
        let valid_until = crate::parser::next_day(valid_from);

        let volume_ranges = extract_volume_ranges_horizontal(
            &self.reader,
            SheetLocator::Title(SHEET.to_string()),
            2,
            ColumnRef::Letter(VOLUME_COLUMN_START.to_string()),
            ColumnRef::Letter(VOLUME_COLUMN_END.to_string()),
            &VOLUME_HEADER_RE,
            false,
            false,
            true,
            5,
            None,
        )?;
        let volume_columns = crate::reader::spreadsheet::column_range(
            &ColumnRef::Letter(VOLUME_COLUMN_START.to_string()),
            &ColumnRef::Letter(VOLUME_COLUMN_END.to_string()),
            1,
            true,
        )?;

        let height = self.reader.height(SheetLocator::Title(SHEET.to_string()))?;
        for row in 4..=height as i64 {
            let state = self
                .reader
                .get(SheetLocator::Title(SHEET.to_string()), row, ColumnRef::Letter("A".to_string()), ExpectedType::Text)?
                .as_text();
            if state.trim().is_empty() {
                continue;
            }
            let utility = self
                .reader
                .get(SheetLocator::Title(SHEET.to_string()), row, ColumnRef::Letter("B".to_string()), ExpectedType::Text)?
                .as_text();
            let zone = self
                .reader
                .get(SheetLocator::Title(SHEET.to_string()), row, ColumnRef::Letter("C".to_string()), ExpectedType::Text)?
                .as_text();
            let rate_class = self
                .reader
                .get(SheetLocator::Title(SHEET.to_string()), row, ColumnRef::Letter("D".to_string()), ExpectedType::Text)?
                .as_text();

            let rate_class_alias = format!("Direct-electric-{state}-{utility}-{rate_class}-{zone}");
            let rate_class_ids = rate_class_ids_for_alias(&self.rate_class_aliases, &rate_class_alias);

            for (col_idx, &col) in volume_columns.iter().enumerate() {
                let price_cell =
                    self.reader
                        .get(SheetLocator::Title(SHEET.to_string()), row, ColumnRef::Index(col), ExpectedType::Any)?;
                let raw_price = match price_cell.as_number() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                let price = raw_price / 1000.0;
                let volume_range = volume_ranges[col_idx];

                for &rate_class_id in &rate_class_ids {
                    let mut quote = Quote::new(
                        ServiceType::Electric,
                        rate_class_alias.clone(),
                        start_from,
                        start_until,
                        term_months,
                        valid_from,
                        valid_until,
                        price,
                        format!("{} {SHEET},{row},{col}", self.state.file_name.as_deref().unwrap_or("")),
                    );
                    quote.min_volume = Some(volume_range.low);
                    quote.limit_volume = volume_range.high;
                    quote.rate_class_id = rate_class_id;

                    let quote = finish_quote(quote, Some(4));
                    self.state.count += 1;
                    sink(quote)?;
                }
            }
        }
        Ok(())
    }

    fn count(&self) -> usize {
        self.state.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_reports_its_name() {
        assert_eq!(DirectEnergyParser::new().name(), "direct_energy");
    }

    #[test]
    fn default_rate_class_aliases_are_empty() {
        assert!(DirectEnergyParser::new().rate_class_aliases.is_empty());
    }

    #[test]
    fn with_rate_class_aliases_preloads_the_mapping() {
        let mut mapping = HashMap::new();
        mapping.insert("Direct-electric-OH-AEP-R1-Z1".to_string(), vec![101, 102]);
        let parser = DirectEnergyParser::new().with_rate_class_aliases(mapping.clone());
        assert_eq!(parser.rate_class_aliases, mapping);
    }
}
