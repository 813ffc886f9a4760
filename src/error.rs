use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    /// The printer rejected a page; the whole job is considered failed.
    #[error("printing failed on page {page} of {total}")]
    PrintFailed { page: usize, total: usize },
}
