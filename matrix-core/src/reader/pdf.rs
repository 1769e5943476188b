//! PDF-backed Tabular Reader, grounded on
//! `original_source/brokerage/pdf_reader.py`. The source reads pdfminer's
//! `LTTextBox` layout objects; `lopdf` (used elsewhere in this corpus by
//! the `faktura` crate's low-level PDF access) gives raw content streams
//! instead, so this reader walks the `Tm`/`Td`/`Tj`/`TJ` text-positioning
//! operators itself to reconstruct each run of text and the point it was
//! drawn at. Unlike pdfminer's box-merging, each positioned run is treated
//! as its own box — a deliberate simplification, noted in DESIGN.md.

use crate::error::{CoreError, Result};
use lopdf::content::Content;
use lopdf::Document;
use std::path::Path;

#[derive(Debug, Clone)]
struct TextRun {
    text: String,
    x: f64,
    y: f64,
}

pub struct PdfReader {
    pages: Vec<Vec<TextRun>>,
    tolerance: f64,
    offset_x: f64,
    offset_y: f64,
}

impl PdfReader {
    pub fn new(tolerance: f64) -> Self {
        PdfReader {
            pages: Vec::new(),
            tolerance,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<()> {
        let doc = Document::load(path).map_err(|e| CoreError::Pdf(e.to_string()))?;
        let mut pages = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let content_data = doc
                .get_page_content(page_id)
                .map_err(|e| CoreError::Pdf(e.to_string()))?;
            let content = Content::decode(&content_data).map_err(|e| CoreError::Pdf(e.to_string()))?;
            pages.push(extract_text_runs(&content));
        }
        self.pages = pages;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        !self.pages.is_empty()
    }

    fn page(&self, page_number: usize) -> Result<&[TextRun]> {
        self.pages
            .get(page_number.saturating_sub(1))
            .map(|v| v.as_slice())
            .ok_or_else(|| CoreError::format(format!("no page {page_number}")))
    }

    fn distance(run: &TextRun, x: f64, y: f64) -> f64 {
        ((run.x - x).powi(2) + (run.y - y).powi(2)).sqrt()
    }

    /// Finds the closest text box to `(x, y)` (after applying the stored
    /// offset) within `self.tolerance`. Fails with `CoreError::Format`,
    /// including the closest candidate's own text and coordinates for
    /// debugging, matching the source's error detail.
    pub fn get(&self, page_number: usize, y: f64, x: f64) -> Result<String> {
        let runs = self.page(page_number)?;
        let qx = x + self.offset_x;
        let qy = y + self.offset_y;
        let closest = runs
            .iter()
            .min_by(|a, b| Self::distance(a, qx, qy).total_cmp(&Self::distance(b, qx, qy)));
        match closest {
            Some(run) if Self::distance(run, qx, qy) <= self.tolerance => Ok(run.text.clone()),
            Some(run) => Err(CoreError::format(format!(
                "no text box within tolerance {} of ({qx}, {qy}); closest was '{}' at ({}, {})",
                self.tolerance, run.text, run.x, run.y
            ))),
            None => Err(CoreError::format(format!("page {page_number} has no text"))),
        }
    }

    /// Finds text boxes matching `regex` on the page, sorted by distance
    /// to `(x, y)`, and returns the text of the closest one.
    pub fn get_matches(&self, page_number: usize, y: f64, x: f64, regex: &regex::Regex) -> Result<String> {
        let runs = self.page(page_number)?;
        let qx = x + self.offset_x;
        let qy = y + self.offset_y;
        let mut matching: Vec<&TextRun> = runs.iter().filter(|r| regex.is_match(&r.text)).collect();
        if matching.is_empty() {
            return Err(CoreError::format(format!("no text box on page {page_number} matched /{regex}/")));
        }
        matching.sort_by(|a, b| Self::distance(a, qx, qy).total_cmp(&Self::distance(b, qx, qy)));
        Ok(matching[0].text.clone())
    }

    /// Finds the closest text box matching `regex` on page 1, and records
    /// the delta between its actual position and `(expected_x,
    /// expected_y)`; every subsequent `get`/`get_matches` call applies that
    /// delta. Accommodates files whose layout shifts between issues.
    pub fn set_offset_by_element_regex(&mut self, regex: &regex::Regex, expected_y: f64, expected_x: f64) -> Result<()> {
        let runs = self.page(1)?;
        let matching: Vec<&TextRun> = runs.iter().filter(|r| regex.is_match(&r.text)).collect();
        let closest = matching
            .iter()
            .min_by(|a, b| Self::distance(a, 0.0, 0.0).total_cmp(&Self::distance(b, 0.0, 0.0)))
            .ok_or_else(|| CoreError::format(format!("no text box matched /{regex}/ for offset calibration")))?;
        self.offset_x = closest.x - expected_x;
        self.offset_y = closest.y - expected_y;
        Ok(())
    }
}

/// Walks content-stream operators tracking the current text matrix,
/// emitting one `TextRun` per `Tj`/`TJ` show-text operation at the point
/// the text matrix held when it ran.
fn extract_text_runs(content: &Content) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let (mut tx, mut ty) = (0.0_f64, 0.0_f64);
    let (mut line_x, mut line_y) = (0.0_f64, 0.0_f64);

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                tx = 0.0;
                ty = 0.0;
                line_x = 0.0;
                line_y = 0.0;
            }
            "Tm" => {
                if op.operands.len() == 6 {
                    if let (Some(e), Some(f)) = (as_f64(&op.operands[4]), as_f64(&op.operands[5])) {
                        tx = e;
                        ty = f;
                        line_x = e;
                        line_y = f;
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() == 2 {
                    if let (Some(dx), Some(dy)) = (as_f64(&op.operands[0]), as_f64(&op.operands[1])) {
                        line_x += dx;
                        line_y += dy;
                        tx = line_x;
                        ty = line_y;
                    }
                }
            }
            "T*" => {
                tx = line_x;
                ty = line_y;
            }
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(decode_pdf_string) {
                    if !text.trim().is_empty() {
                        runs.push(TextRun { text, x: tx, y: ty });
                    }
                }
            }
            "TJ" => {
                if let Some(lopdf::Object::Array(items)) = op.operands.first() {
                    let mut text = String::new();
                    for item in items {
                        if let Some(s) = decode_pdf_string(item) {
                            text.push_str(&s);
                        }
                    }
                    if !text.trim().is_empty() {
                        runs.push(TextRun { text, x: tx, y: ty });
                    }
                }
            }
            "'" | "\"" => {
                ty = line_y;
                tx = line_x;
                if let Some(text) = op.operands.last().and_then(decode_pdf_string) {
                    if !text.trim().is_empty() {
                        runs.push(TextRun { text, x: tx, y: ty });
                    }
                }
            }
            _ => {}
        }
    }
    runs
}

fn as_f64(obj: &lopdf::Object) -> Option<f64> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f64),
        lopdf::Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Approximates simple-font text decoding by treating each byte as a
/// Latin-1 code point. Sufficient for the ASCII-range supplier documents
/// this reference implementation targets; a CID/embedded-font document
/// would need the PDF's actual `/Encoding`/`ToUnicode` CMap, which is out
/// of scope here.
fn decode_pdf_string(obj: &lopdf::Object) -> Option<String> {
    match obj {
        lopdf::Object::String(bytes, _) => Some(bytes.iter().map(|&b| b as char).collect()),
        _ => None,
    }
}
