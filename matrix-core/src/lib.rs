//! Matrix ingestion core library: readers, parsers, validation and the
//! format resolver. Everything in this crate is pure — no mail, database,
//! or object-store I/O, which lives in `matrix-cli` instead, mirroring
//! this workspace's `core-engine`/`backend` split.

pub mod dates;
pub mod error;
pub mod format_resolver;
pub mod model;
pub mod parser;
pub mod preprocess;
pub mod reader;
pub mod units;
pub mod validation;

pub use error::{CoreError, Result};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_links() {
        assert!(crate::units::convert(1.0, crate::units::EnergyUnit::Mwh, crate::units::EnergyUnit::Kwh) == 1000.0);
    }
}
