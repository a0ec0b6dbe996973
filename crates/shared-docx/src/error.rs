use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid DOCX package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Package part not found: {0}")]
    MissingPart(String),

    #[error("Malformed package part: {0}")]
    Malformed(String),

    #[error("Document has no paragraphs to annotate")]
    NoParagraphs,
}

pub type Result<T> = std::result::Result<T, DocxError>;
