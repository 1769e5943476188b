//! Parser Registry (spec.md §4 C6), grounded on
//! `original_source/brokerage/quote_parsers/__init__.py`'s
//! `CLASSES_FOR_FORMATS` dict. Re-implemented as a static registry keyed
//! by `MatrixFormat.id` per the redesign note in spec.md §9: nothing in
//! this pipeline needs to load parsers dynamically, so the dictionary of
//! classes becomes a dictionary of factory functions over a closed set of
//! concrete types.

use super::suppliers::{aep::AepParser, direct_energy::DirectEnergyParser, volunteer::VolunteerParser};
use super::QuoteParser;
use once_cell::sync::Lazy;
use std::collections::HashMap;

type Factory = fn() -> Box<dyn QuoteParser>;

static REGISTRY: Lazy<HashMap<i64, Factory>> = Lazy::new(|| {
    let mut m: HashMap<i64, Factory> = HashMap::new();
    m.insert(6, (|| Box::new(AepParser::new())) as Factory);
    m.insert(12, (|| Box::new(VolunteerParser::new())) as Factory);
    m.insert(20, (|| Box::new(DirectEnergyParser::new())) as Factory);
    m
});

/// Instantiates the concrete parser registered for `matrix_format_id`, or
/// `None` if no parser is registered — the caller treats that the same as
/// an `UnknownFormatError` upstream in the format resolver, since a format
/// with no parser cannot be processed.
pub fn parser_for_format(matrix_format_id: i64) -> Option<Box<dyn QuoteParser>> {
    REGISTRY.get(&matrix_format_id).map(|factory| factory())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_formats_resolve_to_a_parser() {
        assert!(parser_for_format(6).is_some());
        assert!(parser_for_format(12).is_some());
        assert!(parser_for_format(20).is_some());
    }

    #[test]
    fn unknown_format_resolves_to_nothing() {
        assert!(parser_for_format(999).is_none());
    }
}
