//! PDF-based reference parser, grounded on
//! `original_source/brokerage/quote_parsers/volunteer.py`. Coordinates
//! below are this reference implementation's own choice of a plausible
//! one-page gas matrix layout (spec.md §1 excludes the exact supplier
//! byte-layouts from scope); the point is to exercise the PDF reader's
//! offset calibration, a two-cell date getter, and an "adder" subtracted
//! from a headline price, as the original parser does.

use crate::error::{CoreError, Result};
use crate::model::{MatrixFormat, Quote, ServiceType};
use crate::parser::{finish_quote, DateGetter, ParserState, QuoteParser};
use crate::reader::pdf::PdfReader;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)effective date").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<date>\d+/\d+/\d+)").unwrap());
static RATE_CLASS_Y: f64 = 600.0;
static RATE_CLASS_X: f64 = 72.0;
static PRICE_Y: f64 = 560.0;
static PRICE_X: f64 = 300.0;
static ADDER_Y: f64 = 560.0;
static ADDER_X: f64 = 380.0;

pub struct VolunteerParser {
    state: ParserState,
    reader: PdfReader,
    date_getter: DateGetter,
}

impl VolunteerParser {
    pub fn new() -> Self {
        VolunteerParser {
            state: ParserState::default(),
            reader: PdfReader::new(40.0),
            date_getter: DateGetter::PdfTwoCells {
                page: 1,
                start_y: 538.0,
                start_x: 310.0,
                end_y: 538.0,
                end_x: 380.0,
                regex: Some(DATE_RE.clone()),
            },
        }
    }
}

impl Default for VolunteerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteParser for VolunteerParser {
    fn name(&self) -> &'static str {
        "volunteer"
    }

    fn load(&mut self, file_path: &Path, file_name: &str, _matrix_format: &MatrixFormat) -> Result<()> {
        self.reader.load(file_path)?;
        // Layout drifts slightly issue to issue; calibrate against a
        // label that is always present near the top of page 1.
        self.reader.set_offset_by_element_regex(&LABEL_RE, 650.0, 72.0)?;
        self.state.reset_for_load(file_name);
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if !self.reader.is_loaded() {
            return Err(CoreError::format("pdf was not loaded"));
        }
        // The source does many fuzzy label checks here instead of the
        // spreadsheet parser's exact EXPECTED_CELLS, because PDF layout
        // tolerance makes exact cell addresses unreliable; confirm the
        // one label this parser depends on for date extraction is
        // present at all before extracting.
        self.reader.get_matches(1, 538.0, 310.0, &DATE_RE)?;
        self.state.validated = true;
        Ok(())
    }

    fn extract_quotes(&mut self, sink: &mut dyn FnMut(Quote) -> Result<()>) -> Result<()> {
        if !self.state.validated {
            self.validate()?;
        }

        let (valid_from, valid_until) = self.date_getter.get_dates(None, Some(&self.reader), "", None)?;
        let start_from = valid_from.date();
        let start_until = crate::parser::next_day(valid_from).date();

        let rate_class = self.reader.get(1, RATE_CLASS_Y, RATE_CLASS_X)?;
        let headline_price: f64 = crate::reader::parse_number(&self.reader.get(1, PRICE_Y, PRICE_X)?)?;
        let adder: f64 = self
            .reader
            .get(1, ADDER_Y, ADDER_X)
            .ok()
            .and_then(|t| crate::reader::parse_number(&t).ok())
            .unwrap_or(0.0);

        let price = headline_price - adder;
        let rate_class_alias = format!("Volunteer-gas-{}", rate_class.trim());

        let quote = Quote::new(
            ServiceType::Gas,
            rate_class_alias,
            start_from,
            start_until,
            12,
            valid_from,
            valid_until,
            price,
            format!("{} page1", self.state.file_name.as_deref().unwrap_or("")),
        );
        let quote = finish_quote(quote, Some(4));
        self.state.count += 1;
        sink(quote)?;
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
        assert_eq!(VolunteerParser::new().name(), "volunteer");
    }
}
