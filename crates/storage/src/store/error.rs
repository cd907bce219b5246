#![forbid(unsafe_code)]

use tl_core::{ChangeDecodeError, QueryError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("failpoint {0} triggered")]
    Failpoint(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("query: {0}")]
    Query(#[from] QueryError),
    #[error("corrupt change row: {0}")]
    Decode(#[from] ChangeDecodeError),
    #[error("corrupt {table} row: {detail}")]
    InvalidRow { table: &'static str, detail: String },
    #[error("config: {0}")]
    Config(String),
    #[error("unknown {entity} id {id}")]
    UnknownId { entity: &'static str, id: String },
}

impl StoreError {
    pub(crate) fn unknown(entity: &'static str, id: impl ToString) -> Self {
        Self::UnknownId {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_row(table: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidRow {
            table,
            detail: detail.into(),
        }
    }

    /// The store rejected a write; the surrounding transaction was rolled back.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Sql(_) | Self::Failpoint(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}
