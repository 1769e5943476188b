//! Core entities, grounded on `original_source/brokerage/model.py`.
//!
//! The source's `_Base` mixin derives `clone`/`__eq__`/column-dict
//! conversion through SQLAlchemy's reflective `class_mapper`. Per the
//! redesign note in `spec.md` §9 these are ordinary derived traits here —
//! no runtime reflection.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Electric,
    Gas,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Electric => "electric",
            ServiceType::Gas => "gas",
        }
    }
}

/// Identity of an energy supplier. `email_recipient` is unique across all
/// suppliers when present (spec.md §3 invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub email_recipient: Option<String>,
    pub formats: Vec<MatrixFormat>,
}

/// A second, independent record of the supplier kept in the downstream
/// "altitude" store (`original_source/brokerage/model.py`'s `Company`),
/// used only to stamp inserted quotes with a foreign id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierAlias {
    pub external_id: String,
    pub name: String,
}

/// One file layout belonging to a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixFormat {
    pub id: i64,
    pub supplier_id: String,
    pub name: String,
    /// Regex over file name (or, when `match_body` is set, email subject).
    /// `None` matches any file name.
    pub attachment_pattern: Option<String>,
    pub match_body: bool,
}

/// One extracted fixed-price offer, the polymorphic `Quote` base of
/// `original_source/brokerage/model.py` collapsed with its `MatrixQuote`
/// subtype — there is exactly one concrete kind of quote in this port, so
/// the base/subtype split the source needed for ORM polymorphism is not
/// reproduced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub service_type: ServiceType,
    pub rate_class_alias: String,
    pub rate_class_id: Option<i64>,
    pub start_from: NaiveDate,
    pub start_until: NaiveDate,
    pub term_months: u32,
    pub valid_from: NaiveDateTime,
    pub valid_until: NaiveDateTime,
    pub min_volume: Option<f64>,
    pub limit_volume: Option<f64>,
    pub price: f64,
    pub purchase_of_receivables: bool,
    pub dual_billing: bool,
    pub date_received: NaiveDateTime,
    pub file_reference: String,
    /// Stamped once the owning supplier's external id is known; every
    /// quote that reaches the gateway must carry one before insert.
    pub supplier_id: Option<String>,
}

impl Quote {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        service_type: ServiceType,
        rate_class_alias: impl Into<String>,
        start_from: NaiveDate,
        start_until: NaiveDate,
        term_months: u32,
        valid_from: NaiveDateTime,
        valid_until: NaiveDateTime,
        price: f64,
        file_reference: impl Into<String>,
    ) -> Self {
        Quote {
            service_type,
            rate_class_alias: rate_class_alias.into(),
            rate_class_id: None,
            start_from,
            start_until,
            term_months,
            valid_from,
            valid_until,
            min_volume: None,
            limit_volume: None,
            price,
            purchase_of_receivables: false,
            dual_billing: true,
            date_received: Utc::now().naive_utc(),
            file_reference: file_reference.into(),
            supplier_id: None,
        }
    }
}
