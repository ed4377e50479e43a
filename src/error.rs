use thiserror::Error;

use crate::date::{AppliedDate, DateError};
use crate::parser::ExtractionError;

pub type Result<T, E = TrackError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("invalid application: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidDate(#[from] DateError),

    #[error("already tracked '{position}' at '{company}' on {date_applied}")]
    DuplicateRecord {
        company: String,
        position: String,
        date_applied: AppliedDate,
    },

    #[error("application #{0} not found")]
    NotFound(i64),

    #[error("failed to {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("storage I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Attaches the failing operation to a rusqlite error. Date conversion
/// failures on read are surfaced as `InvalidDate` instead of a storage error.
pub trait StorageContext<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|source| match source {
            rusqlite::Error::FromSqlConversionFailure(idx, ty, err) => {
                match err.downcast::<DateError>() {
                    Ok(date_err) => TrackError::InvalidDate(*date_err),
                    Err(other) => TrackError::Storage {
                        operation,
                        source: rusqlite::Error::FromSqlConversionFailure(idx, ty, other),
                    },
                }
            }
            source => TrackError::Storage { operation, source },
        })
    }
}
