#![forbid(unsafe_code)]

use super::spec::Specification;
use super::*;
use rusqlite::Row;
use rusqlite::types::Value as SqlValue;
use tl_core::model::{Project, PullRequest, Sprint, Task, User};
use tl_core::{
    ChangeFamily, ChangeRecord, Criteria, EntityType, FieldPath, QueryError, TypedCriteria,
};

/// A stored type `find` can return: its schema entry, select list and row
/// decoder.
pub trait Queryable: Sized {
    const ENTITY: EntityType;

    fn columns() -> &'static [&'static str];

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError>;
}

impl Queryable for User {
    const ENTITY: EntityType = EntityType::User;

    fn columns() -> &'static [&'static str] {
        support::USER_COLUMNS
    }

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        support::user_from_row(row)
    }
}

impl Queryable for Project {
    const ENTITY: EntityType = EntityType::Project;

    fn columns() -> &'static [&'static str] {
        support::PROJECT_COLUMNS
    }

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        support::project_from_row(row)
    }
}

impl Queryable for Sprint {
    const ENTITY: EntityType = EntityType::Sprint;

    fn columns() -> &'static [&'static str] {
        support::SPRINT_COLUMNS
    }

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        support::sprint_from_row(row)
    }
}

impl Queryable for Task {
    const ENTITY: EntityType = EntityType::Task;

    fn columns() -> &'static [&'static str] {
        support::TASK_COLUMNS
    }

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        support::task_from_row(row)
    }
}

impl Queryable for PullRequest {
    const ENTITY: EntityType = EntityType::PullRequest;

    fn columns() -> &'static [&'static str] {
        support::PULL_REQUEST_COLUMNS
    }

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        support::pull_request_from_row(row)
    }
}

impl<C: ChangeFamily> Queryable for ChangeRecord<C> {
    const ENTITY: EntityType = C::ENTITY;

    fn columns() -> &'static [&'static str] {
        C::COLUMNS
    }

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        support::change_from_row::<C>(row)
    }
}

/// Zero-based page index and fixed page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    pub fn first(size: usize) -> Self {
        Self::new(0, size)
    }

    fn limit_offset(self, max_size: usize) -> Result<(i64, i64), QueryError> {
        if self.size == 0 {
            return Err(QueryError::InvalidPage("page size must be positive"));
        }
        if self.size > max_size {
            return Err(QueryError::InvalidPage("page size exceeds max_page_size"));
        }
        let offset = self
            .page
            .checked_mul(self.size)
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or(QueryError::InvalidPage("page index is too large"))?;
        let limit =
            i64::try_from(self.size).map_err(|_| QueryError::InvalidPage("page size is too large"))?;
        Ok((limit, offset))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One `ORDER BY` term. Paths resolve like criteria paths and may cross
/// relations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub path: FieldPath,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(path: &str) -> Result<Self, QueryError> {
        Ok(Self {
            path: FieldPath::parse(path)?,
            direction: SortDirection::Asc,
        })
    }

    pub fn desc(path: &str) -> Result<Self, QueryError> {
        Ok(Self {
            path: FieldPath::parse(path)?,
            direction: SortDirection::Desc,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    /// Matches across all pages.
    pub total: u64,
}

impl SqliteStore {
    /// Page of `T` rows matching `criteria`, ordered by `sort`.
    ///
    /// Order is only stable when `sort` ends in a key unique per row; no
    /// tiebreak is added.
    pub fn find<T: Queryable>(
        &self,
        criteria: &Criteria,
        page: PageRequest,
        sort: &[SortKey],
    ) -> Result<Page<T>, StoreError> {
        let (limit, offset) = page.limit_offset(self.config.max_page_size)?;
        let mut spec = Specification::translate(T::ENTITY, criteria)?;
        let order_by = spec.order_by(sort)?;

        // One read snapshot for the total and the page.
        let tx = self.conn.unchecked_transaction()?;
        let total = count_tx(&tx, &spec)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {}{order_by} LIMIT ? OFFSET ?",
            support::select_list("t0", T::columns()),
            spec.from_clause(),
            spec.predicate(),
        );
        let mut values: Vec<SqlValue> = spec.params().to_vec();
        values.push(SqlValue::Integer(limit));
        values.push(SqlValue::Integer(offset));

        let mut items = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(values))?;
            while let Some(row) = rows.next()? {
                items.push(T::from_row(row)?);
            }
        }
        tx.commit()?;

        tracing::debug!(
            entity = T::ENTITY.name(),
            page = page.page,
            returned = items.len(),
            total,
            "find"
        );
        Ok(Page {
            items,
            page: page.page,
            size: page.size,
            total,
        })
    }

    /// `find` with the configured default page size.
    pub fn find_page<T: Queryable>(
        &self,
        criteria: &Criteria,
        page: usize,
        sort: &[SortKey],
    ) -> Result<Page<T>, StoreError> {
        self.find(
            criteria,
            PageRequest::new(page, self.config.default_page_size),
            sort,
        )
    }

    pub fn count<T: Queryable>(&self, criteria: &Criteria) -> Result<u64, StoreError> {
        let spec = Specification::translate(T::ENTITY, criteria)?;
        count_tx(&self.conn, &spec)
    }

    /// `find` for criteria checked up front; `T` must be the type they were
    /// checked against.
    pub fn find_typed<T: Queryable>(
        &self,
        criteria: &TypedCriteria,
        page: PageRequest,
        sort: &[SortKey],
    ) -> Result<Page<T>, StoreError> {
        ensure_entity::<T>(criteria)?;
        self.find(criteria.criteria(), page, sort)
    }

    pub fn count_typed<T: Queryable>(&self, criteria: &TypedCriteria) -> Result<u64, StoreError> {
        ensure_entity::<T>(criteria)?;
        self.count::<T>(criteria.criteria())
    }
}

fn ensure_entity<T: Queryable>(criteria: &TypedCriteria) -> Result<(), QueryError> {
    if criteria.entity() == T::ENTITY {
        return Ok(());
    }
    Err(QueryError::EntityMismatch {
        typed: criteria.entity().name(),
        requested: T::ENTITY.name(),
    })
}

fn count_tx(conn: &Connection, spec: &Specification) -> Result<u64, StoreError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        spec.from_clause(),
        spec.predicate()
    );
    let count: i64 = conn.query_row(
        &sql,
        rusqlite::params_from_iter(spec.params().iter()),
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or_default())
}
