//! Per-service-type bounds checking, grounded on
//! `original_source/brokerage/validation.py`. All violated conditions are
//! collected and reported together, never first-error-only.

use crate::error::{CoreError, Result};
use crate::model::{Quote, ServiceType};
use chrono::NaiveDate;

struct Bounds {
    min_start_from: NaiveDate,
    max_start_from: NaiveDate,
    term_months: std::ops::RangeInclusive<u32>,
    price: std::ops::RangeInclusive<f64>,
    max_min_volume: f64,
    limit_volume: std::ops::RangeInclusive<f64>,
    limit_minus_min: std::ops::RangeInclusive<f64>,
}

fn bounds_for(service_type: ServiceType) -> Bounds {
    let min_start_from = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let max_start_from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    match service_type {
        ServiceType::Electric => Bounds {
            min_start_from,
            max_start_from,
            term_months: 1..=60,
            price: 0.01..=1.00,
            max_min_volume: 4_000_000.0,
            limit_volume: 10_000.0..=5_000_000.0,
            limit_minus_min: 0.0..=5_000_000.0,
        },
        ServiceType::Gas => Bounds {
            min_start_from,
            max_start_from,
            term_months: 1..=60,
            price: 0.05..=5.00,
            max_min_volume: 1_000_000.0,
            limit_volume: 2_000.0..=1_000_000.0,
            limit_minus_min: 0.0..=1_000_000.0,
        },
    }
}

/// Validates one quote against the rules for its service type, returning
/// a single `CoreError::Validation` joining every violated condition's
/// message. Calling this twice in a row on the same quote is equivalent
/// to calling it once (§8 "idempotence of validation").
pub fn validate_quote(quote: &Quote) -> Result<()> {
    let bounds = bounds_for(quote.service_type);
    let mut violations = Vec::new();

    if quote.start_from >= quote.start_until {
        violations.push(format!(
            "start_from ({}) must be before start_until ({})",
            quote.start_from, quote.start_until
        ));
    }
    if quote.valid_from >= quote.valid_until {
        violations.push(format!(
            "valid_from ({}) must be before valid_until ({})",
            quote.valid_from, quote.valid_until
        ));
    }
    if quote.start_from < bounds.min_start_from || quote.start_from > bounds.max_start_from {
        violations.push(format!(
            "start_from ({}) out of range [{}, {}]",
            quote.start_from, bounds.min_start_from, bounds.max_start_from
        ));
    }
    if !bounds.term_months.contains(&quote.term_months) {
        violations.push(format!(
            "term_months ({}) out of range [{}, {}]",
            quote.term_months,
            bounds.term_months.start(),
            bounds.term_months.end()
        ));
    }
    if !bounds.price.contains(&quote.price) {
        violations.push(format!(
            "price ({}) out of range [{}, {}] for {}",
            quote.price,
            bounds.price.start(),
            bounds.price.end(),
            quote.service_type.as_str()
        ));
    }

    if let Some(min_volume) = quote.min_volume {
        if min_volume < 0.0 {
            violations.push(format!("min_volume ({min_volume}) must be >= 0"));
        }
        if min_volume > bounds.max_min_volume {
            violations.push(format!(
                "min_volume ({min_volume}) exceeds maximum {}",
                bounds.max_min_volume
            ));
        }
    }
    if let Some(limit_volume) = quote.limit_volume {
        if !bounds.limit_volume.contains(&limit_volume) {
            violations.push(format!(
                "limit_volume ({limit_volume}) out of range [{}, {}]",
                bounds.limit_volume.start(),
                bounds.limit_volume.end()
            ));
        }
    }
    if let (Some(min_volume), Some(limit_volume)) = (quote.min_volume, quote.limit_volume) {
        if limit_volume < min_volume {
            violations.push(format!(
                "limit_volume ({limit_volume}) must be >= min_volume ({min_volume})"
            ));
        }
        let diff = limit_volume - min_volume;
        if !bounds.limit_minus_min.contains(&diff) {
            violations.push(format!(
                "limit_volume - min_volume ({diff}) out of range [{}, {}]",
                bounds.limit_minus_min.start(),
                bounds.limit_minus_min.end()
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(CoreError::validation(violations.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Quote;
    use chrono::NaiveDate;

    fn base_quote() -> Quote {
        Quote::new(
            ServiceType::Electric,
            "PA-ComEd-RS1",
            NaiveDate::from_ymd_opt(2018, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 4, 1).unwrap(),
            12,
            NaiveDate::from_ymd_opt(2018, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2018, 3, 2).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            0.08,
            "priceA.xlsx sheet1,3,D",
        )
    }

    #[test]
    fn valid_quote_passes() {
        assert!(validate_quote(&base_quote()).is_ok());
    }

    #[test]
    fn price_out_of_range_is_rejected() {
        let mut q = base_quote();
        q.price = 5.0;
        let err = validate_quote(&q).unwrap_err().to_string();
        assert!(err.contains("price"));
    }

    #[test]
    fn all_violations_are_collected_together() {
        let mut q = base_quote();
        q.price = 5.0;
        q.term_months = 0;
        let err = validate_quote(&q).unwrap_err().to_string();
        assert!(err.contains("price"));
        assert!(err.contains("term_months"));
    }

    #[test]
    fn validate_is_idempotent() {
        let q = base_quote();
        let first = validate_quote(&q).is_ok();
        let second = validate_quote(&q).is_ok();
        assert_eq!(first, second);
    }

    #[test]
    fn gas_uses_gas_bounds() {
        let mut q = base_quote();
        q.service_type = ServiceType::Gas;
        q.price = 0.08; // valid for electric, not for gas
        assert!(validate_quote(&q).is_err());
    }
}
