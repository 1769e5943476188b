use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("could not read source file: {0}")]
    Read(String),

    #[error("unexpected file shape: {0}")]
    Format(String),

    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("quote validation failed: {0}")]
    Validation(String),

    #[error("unit conversion error: {0}")]
    Unit(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("excel parsing error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("pdf parsing error: {0}")]
    Pdf(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn preprocessing(msg: impl Into<String>) -> Self {
        Self::Preprocessing(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unit(msg: impl Into<String>) -> Self {
        Self::Unit(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
