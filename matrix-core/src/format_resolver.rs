//! Format Resolver (spec.md §4.5 C7), grounded on
//! `original_source/brokerage/model.py`'s `Supplier.get_format`. Needs
//! nothing beyond an in-memory `Supplier` and a file name, so it lives in
//! `matrix-core` rather than `matrix-cli` even though the email driver
//! (C8) is the only caller.

use crate::error::{CoreError, Result};
use crate::model::{MatrixFormat, Supplier};
use regex::RegexBuilder;

/// Finds the unique `MatrixFormat` among `supplier.formats` whose
/// `match_body` equals `is_body` and whose `attachment_pattern` is either
/// absent or matches `file_name` case-insensitively with dot-matches-
/// newline (so a multi-line email subject can still match a pattern
/// anchored with `.*`).
pub fn resolve_format<'a>(supplier: &'a Supplier, file_name: &str, is_body: bool) -> Result<&'a MatrixFormat> {
    let mut matches = Vec::new();
    for format in &supplier.formats {
        if format.match_body != is_body {
            continue;
        }
        let is_match = match &format.attachment_pattern {
            None => true,
            Some(pattern) => RegexBuilder::new(pattern)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|e| CoreError::format(format!("invalid attachment_pattern '{pattern}': {e}")))?
                .is_match(file_name),
        };
        if is_match {
            matches.push(format);
        }
    }

    match matches.len() {
        1 => Ok(matches[0]),
        0 => Err(CoreError::unsupported(format!(
            "no format of supplier '{}' matches file '{file_name}' (match_body={is_body})",
            supplier.name
        ))),
        _ => Err(CoreError::unsupported(format!(
            "{} formats of supplier '{}' all match file '{file_name}' (match_body={is_body}); attachment_pattern must be unambiguous",
            matches.len(),
            supplier.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: i64, pattern: Option<&str>, match_body: bool) -> MatrixFormat {
        MatrixFormat {
            id,
            supplier_id: "s1".to_string(),
            name: format!("format-{id}"),
            attachment_pattern: pattern.map(str::to_string),
            match_body,
        }
    }

    fn supplier(formats: Vec<MatrixFormat>) -> Supplier {
        Supplier {
            id: "s1".to_string(),
            name: "Acme".to_string(),
            email_recipient: Some("acme@ingest.example".to_string()),
            formats,
        }
    }

    #[test]
    fn single_match_resolves() {
        let s = supplier(vec![format(1, Some(r"price\.xlsx"), false)]);
        let resolved = resolve_format(&s, "price.xlsx", false).unwrap();
        assert_eq!(resolved.id, 1);
    }

    #[test]
    fn wildcard_format_matches_any_name() {
        let s = supplier(vec![format(1, None, false)]);
        assert!(resolve_format(&s, "whatever.xlsx", false).is_ok());
    }

    #[test]
    fn no_match_is_an_error() {
        let s = supplier(vec![format(1, Some(r"price\.xlsx"), false)]);
        assert!(resolve_format(&s, "other.xlsx", false).is_err());
    }

    #[test]
    fn ambiguous_match_is_an_error() {
        let s = supplier(vec![format(1, Some(r"price.*"), false), format(2, None, false)]);
        assert!(resolve_format(&s, "price.xlsx", false).is_err());
    }

    #[test]
    fn match_body_flag_partitions_candidates() {
        let s = supplier(vec![
            format(1, Some(r"Quotes for .*"), true),
            format(2, Some(r"price\.xlsx"), false),
        ]);
        let resolved = resolve_format(&s, "Quotes for\n2016-05-04", true).unwrap();
        assert_eq!(resolved.id, 1);
    }

    #[test]
    fn pattern_match_is_case_insensitive() {
        let s = supplier(vec![format(1, Some(r"PRICE\.XLSX"), false)]);
        assert!(resolve_format(&s, "price.xlsx", false).is_ok());
    }
}
