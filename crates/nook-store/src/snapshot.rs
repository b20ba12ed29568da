//! Whole-engine export and hydration.
//!
//! An export walks every table in [`Table::ALL`] order and every row in
//! primary-key order, so two engines holding the same rows always produce
//! byte-identical snapshot strings.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::Connection;

use crate::codec::{self, Cell, SnapshotImage, TableImage, SNAPSHOT_FORMAT};
use crate::{migrations, open_engine, EngineFactory, Result, StoreError, Table, SCHEMA_VERSION};

/// Export the full engine state.
pub fn export(conn: &Connection) -> Result<SnapshotImage> {
    let mut tables = Vec::with_capacity(Table::ALL.len());

    for table in Table::ALL {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {}",
            table.ident(),
            table.key_column()
        ))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i).map(Cell::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tables.push(TableImage {
            name: table.name().to_string(),
            columns,
            rows,
        });
    }

    Ok(SnapshotImage {
        format: SNAPSHOT_FORMAT,
        schema_version: migrations::version(conn)?,
        tables,
    })
}

/// Export the full engine state as a transport string.
pub fn export_blob(conn: &Connection) -> Result<String> {
    codec::encode(&export(conn)?)
}

/// Tables whose rows differ between two images, in schema order.
pub fn changed_tables(before: &SnapshotImage, after: &SnapshotImage) -> Vec<Table> {
    Table::ALL
        .into_iter()
        .filter(|table| before.table(table.name()) != after.table(table.name()))
        .collect()
}

/// Build a new engine holding exactly the rows of `image`.
///
/// The caller's current engine is never touched; on error nothing changes.
pub fn hydrate(factory: EngineFactory, image: &SnapshotImage) -> Result<Connection> {
    if image.schema_version > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "snapshot schema v{} is newer than supported v{SCHEMA_VERSION}",
            image.schema_version
        )));
    }

    let mut conn = open_engine(factory)?;
    let tx = conn.transaction()?;

    for table_image in &image.tables {
        let table: Table = table_image
            .name
            .parse()
            .map_err(|_| StoreError::Codec(format!("unknown table '{}'", table_image.name)))?;

        let known = table_columns(&tx, table)?;
        if let Some(bad) = table_image.columns.iter().find(|c| !known.contains(c)) {
            return Err(StoreError::Codec(format!(
                "unknown column '{bad}' in table '{table}'"
            )));
        }

        let column_list = table_image
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=table_image.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            table.ident()
        ))?;

        for row in &table_image.rows {
            if row.len() != table_image.columns.len() {
                return Err(StoreError::Codec(format!(
                    "row width {} does not match {} columns in '{table}'",
                    row.len(),
                    table_image.columns.len()
                )));
            }
            stmt.execute(rusqlite::params_from_iter(row.iter()))?;
        }
    }

    tx.commit()?;
    Ok(conn)
}

/// Decode a transport string and hydrate a new engine from it.
pub fn hydrate_blob(factory: EngineFactory, blob: &str) -> Result<Connection> {
    hydrate(factory, &codec::decode(blob)?)
}

/// Column names of a table, in declaration order.
fn table_columns(conn: &Connection, table: Table) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table.ident()))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Integer(i) => Cell::Integer(i),
            Value::Real(f) => Cell::Real(f),
            Value::Text(s) => Cell::Text(s),
            Value::Blob(b) => Cell::Blob(b),
        }
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Cell::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Cell::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
