//! Error taxonomy for the mail-handling binary, grounded on
//! `core-engine/src/error.rs`'s enum-plus-constructor-methods style and
//! extended with the driver-level errors spec.md §7 names that have no
//! counterpart in `matrix_core::CoreError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("malformed email: {0}")]
    Email(String),

    #[error("recipient matched zero or multiple suppliers: {0}")]
    UnknownSupplier(String),

    #[error("no format of supplier matched file '{0}'")]
    UnknownFormat(String),

    #[error("the email had files but none matched any format")]
    NoFiles,

    #[error("file(s) were parsed but zero quotes were produced")]
    NoQuotes,

    #[error("{0}")]
    MultipleErrors(String),

    #[error(transparent)]
    Core(#[from] matrix_core::CoreError),

    #[error("database error: {0}")]
    Db(#[from] surrealdb::Error),

    #[error("mail parsing error: {0}")]
    MailParse(#[from] mailparse::MailParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn email(msg: impl Into<String>) -> Self {
        Self::Email(msg.into())
    }

    pub fn unknown_supplier(msg: impl Into<String>) -> Self {
        Self::UnknownSupplier(msg.into())
    }

    pub fn unknown_format(msg: impl Into<String>) -> Self {
        Self::UnknownFormat(msg.into())
    }

    /// Aggregates one error message per failed file, carrying the file
    /// count the way `MultipleErrors` in spec.md §7 does.
    pub fn multiple(file_errors: &[(String, String)]) -> Self {
        let joined = file_errors
            .iter()
            .map(|(file, msg)| format!("{file}: {msg}"))
            .collect::<Vec<_>>()
            .join("; ");
        Self::MultipleErrors(format!("{} file(s) failed: {joined}", file_errors.len()))
    }

    /// `UnknownFormatError` is the one driver-level error that is
    /// per-file recoverable (spec.md §7); everything else rolls back and
    /// is aggregated.
    pub fn is_unknown_format(&self) -> bool {
        matches!(self, PipelineError::UnknownFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_unknown_format_is_true_only_for_that_variant() {
        assert!(PipelineError::unknown_format("no format matched").is_unknown_format());
        assert!(!PipelineError::unknown_supplier("ambiguous").is_unknown_format());
        assert!(!PipelineError::NoFiles.is_unknown_format());
    }
}
