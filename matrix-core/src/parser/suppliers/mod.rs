//! Reference parser implementations (spec.md §1: "A reference
//! implementation of two representative parsers ... suffices"). One
//! spreadsheet-based, grounded on
//! `original_source/brokerage/quote_parsers/aep.py`; one PDF-based,
//! grounded on `original_source/brokerage/quote_parsers/volunteer.py`. A
//! third, grounded on
//! `original_source/brokerage/quote_parsers/direct_energy.py`, is added to
//! exercise the multiple-rate-class-ids-per-alias capability SPEC_FULL.md
//! §E names as a feature of the framework, not just the two required
//! parsers.

pub mod aep;
pub mod direct_energy;
pub mod volunteer;
