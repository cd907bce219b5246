#![forbid(unsafe_code)]

//! Compiles a [`Criteria`] tree into a SQL predicate over the root entity's
//! table, adding one `LEFT JOIN` per distinct relation prefix the tree walks.
//!
//! The root table is aliased `t0`, joins `j1`, `j2`, ... in first-use order.
//! Parameters are positional (`?`) and appear in `params` in text order.

use super::query::{SortDirection, SortKey};
use rusqlite::types::Value as SqlValue;
use tl_core::criteria::check_operand;
use tl_core::model::{format_date, parse_date};
use tl_core::schema::RelationStep;
use tl_core::{Criteria, EntityType, Operator, QueryError, ResolvedPath, ScalarType, Value};

const ROOT_ALIAS: &str = "t0";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    /// Canonical relation path this join stands for, e.g. `pull_request.task`.
    pub prefix: String,
    pub alias: String,
    pub table: &'static str,
    pub on: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Specification {
    root: EntityType,
    joins: Vec<Join>,
    predicate: String,
    params: Vec<SqlValue>,
}

impl Specification {
    /// Fails with [`QueryError`] on the first path or operand that does not
    /// fit `root`; nothing touches the database.
    pub fn translate(root: EntityType, criteria: &Criteria) -> Result<Self, QueryError> {
        let mut spec = Self {
            root,
            joins: Vec::new(),
            predicate: String::new(),
            params: Vec::new(),
        };
        spec.predicate = spec.compile(criteria)?;
        tracing::trace!(
            entity = root.name(),
            predicate = %spec.predicate,
            joins = spec.joins.len(),
            params = spec.params.len(),
            "criteria compiled"
        );
        Ok(spec)
    }

    pub fn root(&self) -> EntityType {
        self.root
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// `FROM` target: the root table followed by every join.
    pub fn from_clause(&self) -> String {
        let mut out = format!("{} {ROOT_ALIAS}", self.root.table());
        for join in &self.joins {
            out.push_str(&format!(" LEFT JOIN {} {} ON {}", join.table, join.alias, join.on));
        }
        out
    }

    /// Resolves sort keys (joining as needed) into an `ORDER BY` clause, or
    /// an empty string when there are none.
    pub fn order_by(&mut self, keys: &[SortKey]) -> Result<String, QueryError> {
        let mut terms = Vec::with_capacity(keys.len());
        for key in keys {
            let resolved = self.root.resolve(&key.path)?;
            let column = self.column_ref(&resolved);
            let direction = match key.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            terms.push(format!("{column} {direction}"));
        }
        if terms.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(" ORDER BY {}", terms.join(", ")))
    }

    fn compile(&mut self, criteria: &Criteria) -> Result<String, QueryError> {
        match criteria {
            Criteria::Condition {
                path,
                operator,
                value,
            } => {
                let resolved = self.root.resolve(path)?;
                check_operand(&resolved, *operator, value)?;
                let column = self.column_ref(&resolved);
                Ok(self.condition(&column, resolved.ty(), *operator, value))
            }
            Criteria::All(children) => self.group(children, " AND ", "1=1"),
            Criteria::Any(children) => self.group(children, " OR ", "1=0"),
        }
    }

    fn group(
        &mut self,
        children: &[Criteria],
        separator: &str,
        empty: &str,
    ) -> Result<String, QueryError> {
        if children.is_empty() {
            return Ok(empty.to_string());
        }
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            parts.push(format!("({})", self.compile(child)?));
        }
        Ok(parts.join(separator))
    }

    fn condition(
        &mut self,
        column: &str,
        ty: ScalarType,
        operator: Operator,
        value: &Value,
    ) -> String {
        if value.is_null() {
            // Operands were checked: only equality operators reach here with null.
            return match operator {
                Operator::NotEquals => format!("{column} IS NOT NULL"),
                _ => format!("{column} IS NULL"),
            };
        }

        let rendered = value.render().unwrap_or_default();
        match operator {
            Operator::Equals => {
                self.params.push(equality_param(ty, value));
                format!("{column} = ?")
            }
            Operator::NotEquals => {
                self.params.push(equality_param(ty, value));
                format!("{column} <> ?")
            }
            Operator::GreaterThan => {
                self.params.push(SqlValue::Text(rendered));
                format!("CAST({column} AS TEXT) > ?")
            }
            Operator::LessThan => {
                self.params.push(SqlValue::Text(rendered));
                format!("CAST({column} AS TEXT) < ?")
            }
            Operator::Like => self.pattern(column, rendered),
            Operator::StartsWith => self.pattern(column, format!("{}%", escape_like(&rendered))),
            Operator::EndsWith => self.pattern(column, format!("%{}", escape_like(&rendered))),
            Operator::Contains => self.pattern(column, format!("%{}%", escape_like(&rendered))),
        }
    }

    fn pattern(&mut self, column: &str, pattern: String) -> String {
        self.params.push(SqlValue::Text(pattern));
        format!("CAST({column} AS TEXT) LIKE ? ESCAPE '\\'")
    }

    /// Joins every relation on the path and returns `alias.column`.
    fn column_ref(&mut self, resolved: &ResolvedPath) -> String {
        let mut alias = ROOT_ALIAS.to_string();
        for step in resolved.steps() {
            alias = self.join(&alias, step);
        }
        format!("{alias}.{}", resolved.column())
    }

    fn join(&mut self, from_alias: &str, step: &RelationStep) -> String {
        if let Some(existing) = self.joins.iter().find(|join| join.prefix == step.prefix) {
            return existing.alias.clone();
        }
        let alias = format!("j{}", self.joins.len() + 1);
        self.joins.push(Join {
            prefix: step.prefix.clone(),
            alias: alias.clone(),
            table: step.target.table(),
            on: format!("{alias}.id = {from_alias}.{}", step.column),
        });
        alias
    }
}

fn equality_param(ty: ScalarType, value: &Value) -> SqlValue {
    match (ty, value) {
        (ScalarType::Date, Value::Text(text)) => match parse_date(text) {
            Some(date) => SqlValue::Text(format_date(date)),
            None => SqlValue::Text(text.clone()),
        },
        (_, Value::Bool(flag)) => SqlValue::Integer(i64::from(*flag)),
        (_, Value::Integer(number)) => SqlValue::Integer(*number),
        (_, Value::Text(text)) => SqlValue::Text(text.clone()),
        (_, Value::Null) => SqlValue::Null,
    }
}

/// Escapes LIKE wildcards so the value matches literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
