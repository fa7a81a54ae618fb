use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaiverError {
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Malformed input PDF: {0}")]
    MalformedPdf(String),
    #[error("Could not allocate a unique waiver ID after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },
    #[error("Invalid date format: {0}")]
    DateError(String),
    #[error("Invalid input: {0}")]
    InputError(String),
    #[error("Failed to load logo: {0}")]
    LogoError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WaiverError>;
