#![forbid(unsafe_code)]

//! Caller-built filter trees. A tree is plain data; it is checked against an
//! entity type either up front through [`TypedCriteria`] or when translated.

use crate::QueryError;
use crate::schema::{EntityType, ResolvedPath, ScalarType};
use serde::{Deserialize, Serialize};
use std::fmt;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Like,
    StartsWith,
    EndsWith,
    Contains,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not-equals",
            Operator::GreaterThan => "greater-than",
            Operator::LessThan => "less-than",
            Operator::Like => "like",
            Operator::StartsWith => "starts-with",
            Operator::EndsWith => "ends-with",
            Operator::Contains => "contains",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used by the ordering and pattern operators. Booleans render
    /// the way SQLite stores them.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(value) => Some(if *value { "1" } else { "0" }.to_string()),
            Value::Integer(value) => Some(value.to_string()),
            Value::Text(value) => Some(value.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Dotted path such as `task.project.id`. Segments are never empty and never
/// contain whitespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        if value.trim().is_empty() {
            return Err(QueryError::EmptyPath);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(QueryError::WhitespaceInPath {
                path: value.to_string(),
            });
        }
        if value.split('.').any(str::is_empty) {
            return Err(QueryError::EmptySegment {
                path: value.to_string(),
            });
        }
        Ok(Self {
            raw: value.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.raw
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criteria {
    Condition {
        path: FieldPath,
        operator: Operator,
        value: Value,
    },
    All(Vec<Criteria>),
    Any(Vec<Criteria>),
}

impl Criteria {
    /// Matches everything.
    pub fn none() -> Self {
        Criteria::All(Vec::new())
    }

    pub fn condition(
        path: &str,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        Ok(Criteria::Condition {
            path: FieldPath::parse(path)?,
            operator,
            value: value.into(),
        })
    }

    pub fn eq(path: &str, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::condition(path, Operator::Equals, value)
    }

    pub fn ne(path: &str, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::condition(path, Operator::NotEquals, value)
    }

    pub fn gt(path: &str, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::condition(path, Operator::GreaterThan, value)
    }

    pub fn lt(path: &str, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::condition(path, Operator::LessThan, value)
    }

    pub fn like(path: &str, pattern: &str) -> Result<Self, QueryError> {
        Self::condition(path, Operator::Like, pattern)
    }

    pub fn starts_with(path: &str, prefix: &str) -> Result<Self, QueryError> {
        Self::condition(path, Operator::StartsWith, prefix)
    }

    pub fn ends_with(path: &str, suffix: &str) -> Result<Self, QueryError> {
        Self::condition(path, Operator::EndsWith, suffix)
    }

    pub fn contains(path: &str, needle: &str) -> Result<Self, QueryError> {
        Self::condition(path, Operator::Contains, needle)
    }

    pub fn all(children: impl IntoIterator<Item = Criteria>) -> Self {
        Criteria::All(children.into_iter().collect())
    }

    pub fn any(children: impl IntoIterator<Item = Criteria>) -> Self {
        Criteria::Any(children.into_iter().collect())
    }

    pub fn and(self, other: Criteria) -> Self {
        match self {
            Criteria::All(mut children) => {
                children.push(other);
                Criteria::All(children)
            }
            single => Criteria::All(vec![single, other]),
        }
    }

    pub fn or(self, other: Criteria) -> Self {
        match self {
            Criteria::Any(mut children) => {
                children.push(other);
                Criteria::Any(children)
            }
            single => Criteria::Any(vec![single, other]),
        }
    }

    /// Resolves every path against `entity` and checks each operand.
    pub fn validate(&self, entity: EntityType) -> Result<(), QueryError> {
        match self {
            Criteria::Condition {
                path,
                operator,
                value,
            } => {
                let resolved = entity.resolve(path)?;
                check_operand(&resolved, *operator, value)
            }
            Criteria::All(children) | Criteria::Any(children) => children
                .iter()
                .try_for_each(|child| child.validate(entity)),
        }
    }
}

/// A criteria tree already checked against its root entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedCriteria {
    entity: EntityType,
    criteria: Criteria,
}

impl TypedCriteria {
    pub fn new(entity: EntityType, criteria: Criteria) -> Result<Self, QueryError> {
        criteria.validate(entity)?;
        Ok(Self { entity, criteria })
    }

    pub fn entity(&self) -> EntityType {
        self.entity
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }
}

/// Checks that `value` is an acceptable operand for `operator` on `resolved`.
pub fn check_operand(
    resolved: &ResolvedPath,
    operator: Operator,
    value: &Value,
) -> Result<(), QueryError> {
    let mismatch = |expected: &'static str| QueryError::TypeMismatch {
        path: resolved.path().to_string(),
        operator,
        expected,
    };

    if value.is_null() {
        return match operator {
            Operator::Equals | Operator::NotEquals => Ok(()),
            _ => Err(QueryError::NullNotAllowed {
                path: resolved.path().to_string(),
                operator,
            }),
        };
    }

    match operator {
        Operator::Equals | Operator::NotEquals => match (resolved.ty(), value) {
            (ScalarType::Integer | ScalarType::Timestamp, Value::Integer(_)) => Ok(()),
            (ScalarType::Integer | ScalarType::Timestamp, _) => Err(mismatch("an integer")),
            (ScalarType::Text, Value::Text(_)) => Ok(()),
            (ScalarType::Text, _) => Err(mismatch("text")),
            (ScalarType::Bool, Value::Bool(_)) => Ok(()),
            (ScalarType::Bool, _) => Err(mismatch("a boolean")),
            (ScalarType::Date, Value::Text(text)) if crate::model::parse_date(text).is_some() => {
                Ok(())
            }
            (ScalarType::Date, _) => Err(mismatch("an ISO date (YYYY-MM-DD)")),
        },
        Operator::GreaterThan | Operator::LessThan => Ok(()),
        Operator::Like | Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
            match value {
                Value::Text(_) => Ok(()),
                _ => Err(mismatch("a text pattern")),
            }
        }
    }
}
