use thiserror::Error;

/// Error taxonomy shared by every subsystem: storage, indexing, search, and jobs
/// all return `Result<T, Error>` rather than panicking.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("index missing: {0}")]
    IndexMissing(String),

    #[error("store busy: {0}")]
    StoreBusy(String),

    #[error("handler error: {0}")]
    HandlerError(String),

    #[error("no handler registered for job type '{0}'")]
    NoHandler(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Parse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Error::StoreBusy(err.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound(err.to_string()),
            other => Error::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
