//! Query execution: the read path (`select`) and the write path (`execute`)
//!
//! Statements use `?` as the portable placeholder and are rewritten for the
//! backend before they reach the driver. Each call borrows its own pooled
//! connection and returns it when the call ends, on success or failure.

use std::borrow::Cow;

use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::{error, info};

use crate::config::Backend;
use crate::error::{OrmError, Result};
use crate::pool::{Database, NativePool};
use crate::row::Row;
use crate::value::Value;

impl Database {
    /// Run a SELECT and return its rows, at most `limit` of them when given.
    /// A limit of zero means no limit.
    pub async fn select(&self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>> {
        log_statement(sql, args);
        let sql = rewrite_placeholders(sql, self.backend());
        let limit = limit.filter(|&n| n > 0);

        match self.pool() {
            NativePool::Mysql(pool) => mysql::fetch(pool, &sql, args, limit).await,
            NativePool::Postgres(pool) => postgres::fetch(pool, &sql, args, limit).await,
            NativePool::Sqlite(pool) => sqlite::fetch(pool, &sql, args, limit).await,
        }
    }

    /// Run an INSERT/UPDATE/DELETE in the configured default mode.
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
        self.execute_with(sql, args, self.autocommit()).await
    }

    /// Run an INSERT/UPDATE/DELETE and return the affected row count.
    ///
    /// With `autocommit = false` the statement runs inside its own
    /// transaction: committed on success, rolled back on error. The original
    /// error is always the one returned; a failing rollback is only logged.
    pub async fn execute_with(&self, sql: &str, args: &[Value], autocommit: bool) -> Result<u64> {
        log_statement(sql, args);
        let sql = rewrite_placeholders(sql, self.backend());

        match self.pool() {
            NativePool::Mysql(pool) => mysql::execute(pool, &sql, args, autocommit).await,
            NativePool::Postgres(pool) => postgres::execute(pool, &sql, args, autocommit).await,
            NativePool::Sqlite(pool) => sqlite::execute(pool, &sql, args, autocommit).await,
        }
    }
}

fn log_statement(sql: &str, args: &[Value]) {
    info!("SQL: {}, {:?}", sql, args);
}

/// Error to report after a failed statement inside a transaction. A failed
/// rollback is logged and never replaces the statement's own error.
fn statement_error(
    err: sqlx::Error,
    rollback: std::result::Result<(), sqlx::Error>,
) -> OrmError {
    if let Err(rollback_err) = rollback {
        error!(error = %rollback_err, "rollback failed after: {}", err);
    }
    err.into()
}

/// Fetch and execute for one native driver. The drivers share no common
/// query-result or executor bounds, so each gets its own copy.
macro_rules! driver {
    ($module:ident, $db:ty, $decode:ident) => {
        mod $module {
            use futures::{StreamExt, TryStreamExt};
            use sqlx::query::Query;
            use sqlx::Pool;
            use tracing::debug;

            use super::{statement_error, $decode};
            use crate::error::Result;
            use crate::row::Row;
            use crate::value::Value;

            type DriverQuery<'q> = Query<'q, $db, <$db as sqlx::Database>::Arguments<'q>>;

            fn bind_all<'q>(query: DriverQuery<'q>, args: &[Value]) -> DriverQuery<'q> {
                args.iter().fold(query, |query, value| match value {
                    Value::Null => query.bind(None::<String>),
                    Value::Bool(b) => query.bind(*b),
                    Value::Int(n) => query.bind(*n),
                    Value::Float(x) => query.bind(*x),
                    Value::Text(s) => query.bind(s.clone()),
                    Value::Bytes(b) => query.bind(b.clone()),
                })
            }

            pub(super) async fn fetch(
                pool: &Pool<$db>,
                sql: &str,
                args: &[Value],
                limit: Option<usize>,
            ) -> Result<Vec<Row>> {
                let query = bind_all(sqlx::query(sql), args);
                let rows: Vec<<$db as sqlx::Database>::Row> = match limit {
                    Some(n) => query.fetch(pool).take(n).try_collect().await?,
                    None => query.fetch_all(pool).await?,
                };
                debug!("rows returned: {}", rows.len());
                rows.iter().map($decode).collect()
            }

            pub(super) async fn execute(
                pool: &Pool<$db>,
                sql: &str,
                args: &[Value],
                autocommit: bool,
            ) -> Result<u64> {
                if autocommit {
                    let done = bind_all(sqlx::query(sql), args).execute(pool).await?;
                    return Ok(done.rows_affected());
                }

                let mut tx = pool.begin().await?;
                let result = bind_all(sqlx::query(sql), args).execute(&mut *tx).await;
                match result {
                    Ok(done) => {
                        tx.commit().await?;
                        Ok(done.rows_affected())
                    }
                    Err(err) => Err(statement_error(err, tx.rollback().await)),
                }
            }
        }
    };
}

driver!(mysql, sqlx::MySql, decode_mysql);
driver!(postgres, sqlx::Postgres, decode_postgres);
driver!(sqlite, sqlx::Sqlite, decode_sqlite);

fn decode_mysql(row: &MySqlRow) -> Result<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_ascii_uppercase();
            match kind.as_str() {
                "BOOLEAN" => Value::Bool(row.try_get_unchecked(idx)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                    Value::Int(row.try_get_unchecked(idx)?)
                }
                k if k.ends_with(" UNSIGNED") => {
                    let n: u64 = row.try_get_unchecked(idx)?;
                    i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Int)
                }
                "FLOAT" => Value::Float(f64::from(row.try_get_unchecked::<f32, _>(idx)?)),
                "DOUBLE" => Value::Float(row.try_get_unchecked(idx)?),
                "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
                    Value::Bytes(row.try_get_unchecked(idx)?)
                }
                "DECIMAL" => Value::Text(row.try_get_unchecked(idx)?),
                _ => Value::Text(row.try_get(idx)?),
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

fn decode_postgres(row: &PgRow) -> Result<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_ascii_uppercase();
            match kind.as_str() {
                "BOOL" => Value::Bool(row.try_get(idx)?),
                "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(idx)?)),
                "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(idx)?)),
                "INT8" => Value::Int(row.try_get(idx)?),
                "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(idx)?)),
                "FLOAT8" => Value::Float(row.try_get(idx)?),
                "BYTEA" => Value::Bytes(row.try_get(idx)?),
                _ => Value::Text(row.try_get(idx)?),
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

/// SQLite values carry their storage class; only `boolean` columns need the
/// declared type, since booleans are stored as integers.
fn decode_sqlite(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else if column.type_info().name().eq_ignore_ascii_case("BOOLEAN") {
            Value::Bool(row.try_get_unchecked(idx)?)
        } else {
            let kind = raw.type_info().name().to_ascii_uppercase();
            match kind.as_str() {
                "INTEGER" | "BIGINT" | "INT8" => Value::Int(row.try_get_unchecked(idx)?),
                "REAL" | "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked(idx)?),
                "BLOB" => Value::Bytes(row.try_get_unchecked(idx)?),
                _ => Value::Text(row.try_get_unchecked(idx)?),
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

/// Rewrite `?` placeholders to the backend's syntax.
///
/// MySQL and SQLite take `?` as-is; Postgres wants `$1, $2, ...`. Question
/// marks inside quoted literals or identifiers are left alone.
pub fn rewrite_placeholders(sql: &str, backend: Backend) -> Cow<'_, str> {
    if backend != Backend::Postgres || !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                out.push(c);
            }
            Some(_) => out.push(c),
            None if c == '\'' || c == '"' || c == '`' => {
                quote = Some(c);
                out.push(c);
            }
            None if c == '?' => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}
