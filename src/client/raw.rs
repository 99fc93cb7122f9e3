//! Raw SQL, bypassing the delegates.

use std::time::Instant;

use sea_orm::{ConnectionTrait, FromQueryResult, QueryResult, Statement, Value};
use serde_json::Value as JsonValue;

use crate::{
    error::{ClientError, ClientResult},
    logging::Logger,
    query::value::json_scalar,
};

const TARGET: &str = "raw";

/// Run a parameterized query and return each row as a JSON object.
pub(crate) async fn query<D: ConnectionTrait>(
    db: &D,
    logger: &Logger,
    sql: &str,
    values: Vec<Value>,
) -> ClientResult<Vec<JsonValue>> {
    let started = Instant::now();
    let statement = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    let rows = fetch_rows(db, statement).await?;
    logger.query(TARGET, sql, started.elapsed());
    Ok(rows)
}

/// Run a parameterized statement and return the number of affected rows.
pub(crate) async fn execute<D: ConnectionTrait>(
    db: &D,
    logger: &Logger,
    sql: &str,
    values: Vec<Value>,
) -> ClientResult<u64> {
    let started = Instant::now();
    let statement = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    let result = db.execute(statement).await?;
    logger.query(TARGET, sql, started.elapsed());
    Ok(result.rows_affected())
}

pub(crate) async fn query_unsafe<D: ConnectionTrait>(
    db: &D,
    logger: &Logger,
    sql: &str,
) -> ClientResult<Vec<JsonValue>> {
    let started = Instant::now();
    let statement = Statement::from_string(db.get_database_backend(), sql);
    let rows = fetch_rows(db, statement).await?;
    logger.query(TARGET, sql, started.elapsed());
    Ok(rows)
}

pub(crate) async fn execute_unsafe<D: ConnectionTrait>(
    db: &D,
    logger: &Logger,
    sql: &str,
) -> ClientResult<u64> {
    let started = Instant::now();
    let result = db.execute_unprepared(sql).await?;
    logger.query(TARGET, sql, started.elapsed());
    Ok(result.rows_affected())
}

async fn fetch_rows<D: ConnectionTrait>(db: &D, statement: Statement) -> ClientResult<Vec<JsonValue>> {
    db.query_all(statement).await?.iter().map(row_json).collect()
}

/// Decode one row as a JSON object. SQLite gives expression columns such as
/// `COUNT(*)` no declared type and the generic decoder reads them as null, so
/// null values are read again as integer, float, then text.
fn row_json(row: &QueryResult) -> ClientResult<JsonValue> {
    let mut json = JsonValue::from_query_result(row, "")?;
    if let JsonValue::Object(map) = &mut json {
        for (column, value) in map.iter_mut() {
            if value.is_null() {
                *value = untyped(row, column);
            }
        }
    }
    Ok(json)
}

fn untyped(row: &QueryResult, column: &str) -> JsonValue {
    if let Ok(Some(n)) = row.try_get::<Option<i64>>("", column) {
        return n.into();
    }
    if let Ok(Some(f)) = row.try_get::<Option<f64>>("", column) {
        return JsonValue::from(f);
    }
    if let Ok(Some(text)) = row.try_get::<Option<String>>("", column) {
        return text.into();
    }
    JsonValue::Null
}

/// Bind values for raw SQL given as JSON. `null` binds as a NULL text value.
pub(crate) fn parameters(json: Option<&JsonValue>) -> ClientResult<Vec<Value>> {
    match json {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                JsonValue::Null => Ok(Value::String(None)),
                other => json_scalar(other),
            })
            .collect(),
        Some(other) => Err(ClientError::validation(format!(
            "`parameters` must be a list, got {other}"
        ))),
    }
}
