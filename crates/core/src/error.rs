#![forbid(unsafe_code)]

use crate::criteria::Operator;
use thiserror::Error;

/// Rejected patch or entity payload. Nothing is written when this is raised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_nullable(field: &'static str) -> Self {
        Self::new(field, "must not be null")
    }

    pub fn blank(field: &'static str) -> Self {
        Self::new(field, "must not be blank")
    }

    pub fn too_long(field: &'static str, max_chars: usize) -> Self {
        Self::new(field, format!("must be at most {max_chars} characters"))
    }
}

/// Criteria that cannot be compiled against the requested entity type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("field path must not be empty")]
    EmptyPath,
    #[error("field path {path:?} contains an empty segment")]
    EmptySegment { path: String },
    #[error("field path {path:?} contains whitespace")]
    WhitespaceInPath { path: String },
    #[error("unknown field {segment:?} on {entity}")]
    UnknownField {
        entity: &'static str,
        segment: String,
    },
    #[error("{segment:?} on {entity} is not a relation and cannot be traversed")]
    NotARelation {
        entity: &'static str,
        segment: String,
    },
    #[error("{operator} on {path} expects {expected}")]
    TypeMismatch {
        path: String,
        operator: Operator,
        expected: &'static str,
    },
    #[error("{operator} on {path} does not accept null")]
    NullNotAllowed { path: String, operator: Operator },
    #[error("criteria typed for {typed} cannot query {requested}")]
    EntityMismatch {
        typed: &'static str,
        requested: &'static str,
    },
    #[error("invalid page request: {0}")]
    InvalidPage(&'static str),
}

/// A stored change row whose discriminator or payload does not fit its family.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChangeDecodeError {
    #[error("unknown {family} change kind {kind:?}")]
    UnknownKind { family: &'static str, kind: String },
    #[error("{family} change {kind} is missing column {column}")]
    MissingColumn {
        family: &'static str,
        kind: &'static str,
        column: &'static str,
    },
}
