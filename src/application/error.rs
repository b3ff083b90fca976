use thiserror::Error;

/// The four failure kinds callers can distinguish. Everything the core
/// can fail with maps onto one of these; nothing terminates the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Store => "store",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Concurrent write on payer {payer}, retry exhausted")]
    Conflict { payer: String },

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::Store(_) => ErrorKind::Store,
        }
    }
}
