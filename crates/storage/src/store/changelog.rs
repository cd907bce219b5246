#![forbid(unsafe_code)]

//! Append-only change log. Rows are inserted once and never updated.

use super::*;
use rusqlite::params;
use rusqlite::types::Value as SqlValue;
use tl_core::{ChangeFamily, ChangeRecord, FieldChanges, QueryError, ValidationError};

impl SqliteStore {
    /// Writes one record per recognized field of `changes` in a transaction of
    /// its own. Either every record is stored or none is.
    pub fn record_changes<C: ChangeFamily>(
        &mut self,
        subject_id: i64,
        author: &str,
        changes: &FieldChanges,
    ) -> Result<Vec<ChangeRecord<C>>, StoreError> {
        self.write(|ctx| record_changes_tx::<C>(ctx, subject_id, author, changes))
    }

    /// Full history of one subject, oldest first.
    pub fn change_history<C: ChangeFamily>(
        &self,
        subject_id: i64,
    ) -> Result<Vec<ChangeRecord<C>>, StoreError> {
        history_tx::<C>(&self.conn, subject_id, -1, 0)
    }

    pub fn change_history_page<C: ChangeFamily>(
        &self,
        subject_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChangeRecord<C>>, StoreError> {
        let limit = i64::try_from(limit).map_err(|_| QueryError::InvalidPage("limit is too large"))?;
        let offset =
            i64::try_from(offset).map_err(|_| QueryError::InvalidPage("offset is too large"))?;
        history_tx::<C>(&self.conn, subject_id, limit, offset)
    }
}

pub(in crate::store) fn record_changes_tx<C: ChangeFamily>(
    ctx: &TxContext<'_>,
    subject_id: i64,
    author: &str,
    changes: &FieldChanges,
) -> Result<Vec<ChangeRecord<C>>, StoreError> {
    let author = author.trim();
    if author.is_empty() {
        return Err(ValidationError::blank("author").into());
    }

    let mut records = Vec::with_capacity(changes.len());
    for change in changes {
        let Some(variant) = C::from_field(
            &change.field,
            change.old.as_deref(),
            change.new.as_deref(),
            author,
        ) else {
            tracing::debug!(
                family = C::FAMILY,
                field = %change.field,
                "field has no change kind; not recorded"
            );
            continue;
        };
        records.push(insert_change_tx(ctx, subject_id, author, variant)?);
    }
    Ok(records)
}

fn insert_change_tx<C: ChangeFamily>(
    ctx: &TxContext<'_>,
    subject_id: i64,
    author: &str,
    change: C,
) -> Result<ChangeRecord<C>, StoreError> {
    let payload = change.to_columns();
    let mut columns = Vec::with_capacity(C::COLUMNS.len());
    let mut values: Vec<SqlValue> = Vec::with_capacity(C::COLUMNS.len());
    for column in C::COLUMNS.iter().copied().filter(|column| *column != "id") {
        let value = match column {
            "subject_id" => SqlValue::from(subject_id),
            "author" => SqlValue::from(author.to_string()),
            "occurred_at_ms" => SqlValue::from(ctx.now_ms()),
            "kind" => SqlValue::from(change.kind().to_string()),
            "old_value" => SqlValue::from(payload.old_value.clone()),
            "new_value" => SqlValue::from(payload.new_value.clone()),
            "merged" => SqlValue::from(payload.merged),
            "merged_by" => SqlValue::from(payload.merged_by.clone()),
            other => {
                return Err(StoreError::invalid_row(
                    C::TABLE,
                    format!("no value for column {other}"),
                ));
            }
        };
        columns.push(column);
        values.push(value);
    }

    let placeholders = (1..=values.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {}({}) VALUES ({placeholders})",
        C::TABLE,
        columns.join(", ")
    );
    let tx = ctx.tx();
    tx.execute(&sql, rusqlite::params_from_iter(values))?;
    let id = tx.last_insert_rowid();
    ctx.change_inserted()?;

    Ok(ChangeRecord::new(
        id,
        subject_id,
        author.to_string(),
        ctx.now_ms(),
        change,
    ))
}

/// `limit` of -1 means unbounded.
fn history_tx<C: ChangeFamily>(
    conn: &Connection,
    subject_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<ChangeRecord<C>>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} t0 \
         WHERE t0.subject_id = ?1 \
         ORDER BY t0.occurred_at_ms ASC, t0.id ASC \
         LIMIT ?2 OFFSET ?3",
        support::select_list("t0", C::COLUMNS),
        C::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![subject_id, limit, offset])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(support::change_from_row::<C>(row)?);
    }
    Ok(out)
}
