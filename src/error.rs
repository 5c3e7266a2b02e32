use thiserror::Error;

/// Why a single input line could not be turned into a [`crate::Fill`].
///
/// Always recoverable: the line is skipped and the run continues.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("expected a JSON object, found {0}")]
    NotObject(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid decimal for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("unknown side: {0}")]
    UnknownSide(String),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: DecodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PnlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(feature = "python")]
impl From<PnlError> for pyo3::PyErr {
    fn from(err: PnlError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyValueError};
        match err {
            PnlError::Io(e) => PyIOError::new_err(e.to_string()),
            PnlError::Config(msg) => PyValueError::new_err(msg),
        }
    }
}
