//! DuckDB helpers.
//!
//! DuckDB plays two roles: an in-memory staging table for a writer's pending
//! rows, and the query engine that scans a store's parquet files in place.
//! Every scan takes an explicit, already-resolved file list.
use crate::error::{ArchiveError, Result};
use duckdb::types::Value as DuckValue;
use duckdb::{Connection, params_from_iter};
use ra_types::{RecordSchema, Row, Value};
use std::path::PathBuf;

/// Open an in-memory DuckDB for ad-hoc parquet work.
pub fn connect_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `read_parquet(['a', 'b'], ...)` over exactly these files.
///
/// Hive partitioning is switched off: the `date=` directory is layout, not a
/// column, and must not leak into schemas or rows.
pub fn parquet_scan(files: &[PathBuf]) -> String {
    let list = files
        .iter()
        .map(|p| format!("'{}'", p.to_string_lossy().replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("read_parquet([{list}], hive_partitioning = false)")
}

/// Column names and DuckDB types, in file order.
pub fn describe(conn: &Connection, files: &[PathBuf]) -> Result<Vec<(String, String)>> {
    let sql = format!("DESCRIBE SELECT * FROM {}", parquet_scan(files));
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let name: String = r.get(0)?;
        let ty: String = r.get(1)?;
        out.push((name, ty));
    }
    Ok(out)
}

fn from_duck(v: DuckValue) -> Result<Value> {
    Ok(match v {
        DuckValue::Null => Value::Null,
        DuckValue::BigInt(x) => Value::Int64(x),
        DuckValue::Int(x) => Value::Int64(x as i64),
        DuckValue::SmallInt(x) => Value::Int64(x as i64),
        DuckValue::TinyInt(x) => Value::Int64(x as i64),
        DuckValue::UInt(x) => Value::Int64(x as i64),
        DuckValue::USmallInt(x) => Value::Int64(x as i64),
        DuckValue::UTinyInt(x) => Value::Int64(x as i64),
        DuckValue::UBigInt(x) => Value::Int64(i64::try_from(x).map_err(|_| {
            ArchiveError::Validation(format!("unsigned value {x} does not fit Int64"))
        })?),
        DuckValue::Text(s) => Value::Utf8(s),
        other => {
            return Err(ArchiveError::Validation(format!(
                "column value outside the archive type set: {other:?}"
            )));
        }
    })
}

fn to_duck(v: &Value) -> DuckValue {
    match v {
        Value::Null => DuckValue::Null,
        Value::Int64(x) => DuckValue::BigInt(*x),
        Value::Utf8(s) => DuckValue::Text(s.clone()),
    }
}

/// Runs `sql` and decodes every row as `ncols` archive cells.
pub fn query_rows(conn: &Connection, sql: &str, ncols: usize) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let mut row = Vec::with_capacity(ncols);
        for i in 0..ncols {
            row.push(from_duck(r.get::<_, DuckValue>(i)?)?);
        }
        out.push(row);
    }
    Ok(out)
}

/// Every row of every file, in scan order.
pub fn select_rows(conn: &Connection, files: &[PathBuf], limit: Option<usize>) -> Result<Vec<Row>> {
    let ncols = describe(conn, files)?.len();
    let mut sql = format!("SELECT * FROM {}", parquet_scan(files));
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }
    query_rows(conn, &sql, ncols)
}

/// (total rows, distinct rows) across the files.
pub fn count_rows(conn: &Connection, files: &[PathBuf]) -> Result<(i64, i64)> {
    let scan = parquet_scan(files);
    let sql = format!(
        "SELECT (SELECT COUNT(*) FROM {scan})::BIGINT,
                (SELECT COUNT(*) FROM (SELECT DISTINCT * FROM {scan}))::BIGINT"
    );
    Ok(conn.query_row(&sql, [], |r| Ok((r.get(0)?, r.get(1)?)))?)
}

/// Up to `limit` distinct identifiers, newest (largest) first, optionally
/// strictly below `below`.
pub fn distinct_ids(
    conn: &Connection,
    files: &[PathBuf],
    id_col: &str,
    limit: usize,
    below: Option<i64>,
) -> Result<Vec<i64>> {
    let id = quote_ident(id_col);
    let filter = below.map(|b| format!(" WHERE {id} < {b}")).unwrap_or_default();
    let sql = format!(
        "SELECT DISTINCT {id} FROM {scan}{filter} ORDER BY {id} DESC LIMIT {limit}",
        scan = parquet_scan(files)
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([], |r| r.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Rows whose identifier already appeared in another row.
pub fn duplicate_id_count(conn: &Connection, files: &[PathBuf], id_col: &str) -> Result<i64> {
    let id = quote_ident(id_col);
    let sql = format!(
        "SELECT (COUNT({id}) - COUNT(DISTINCT {id}))::BIGINT FROM {}",
        parquet_scan(files)
    );
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

// ---------- staging table ----------

pub fn create_table_sql(table: &str, schema: &RecordSchema) -> String {
    let cols = schema
        .fields
        .iter()
        .map(|f| {
            let not_null = if f.ty.nullable() { "" } else { " NOT NULL" };
            format!("{} {}{}", quote_ident(f.name), f.ty.sql_type(), not_null)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({cols})", quote_ident(table))
}

pub fn create_staging_table(conn: &Connection, table: &str, schema: &RecordSchema) -> Result<()> {
    conn.execute_batch(&create_table_sql(table, schema))?;
    Ok(())
}

/// Append rows in one transaction: either all land or none do.
pub fn insert_rows(conn: &mut Connection, table: &str, schema: &RecordSchema, rows: &[Row]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; schema.len()].join(", ");
    let sql = format!("INSERT INTO {} VALUES ({placeholders})", quote_ident(table));
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter().map(to_duck)))?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Full contents of a staging table in declared column order.
pub fn export_rows(conn: &Connection, table: &str, schema: &RecordSchema) -> Result<Vec<Row>> {
    let cols = schema
        .field_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {cols} FROM {}", quote_ident(table));
    query_rows(conn, &sql, schema.len())
}

pub fn table_row_count(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*)::BIGINT FROM {}", quote_ident(table));
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}
