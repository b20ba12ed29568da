//! Generic document primitives shared by every document table.
//!
//! Each row stores one JSON document in `data` under the table's key column.
//! Tables with a `timestamp` column keep it equal to the document's own
//! timestamp; callers pass that value in as `timestamp`.

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::{Result, StoreError, Table};

/// Insert or replace the document stored under `key`.
pub fn upsert<T: Serialize + ?Sized>(
    conn: &Connection,
    table: Table,
    key: &str,
    document: &T,
    timestamp: Option<i64>,
) -> Result<()> {
    ensure_document_table(table)?;
    let data = codec::encode_document(document)?;

    if table.has_timestamp() {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}, data, timestamp) VALUES (?1, ?2, ?3)",
                table.ident(),
                table.key_column()
            ),
            rusqlite::params![key, data, timestamp.unwrap_or(0)],
        )?;
    } else {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}, data) VALUES (?1, ?2)",
                table.ident(),
                table.key_column()
            ),
            rusqlite::params![key, data],
        )?;
    }
    Ok(())
}

/// Point lookup by key.
pub fn get<T: DeserializeOwned>(conn: &Connection, table: Table, key: &str) -> Result<Option<T>> {
    ensure_document_table(table)?;
    let data: Option<String> = conn
        .query_row(
            &format!(
                "SELECT data FROM {} WHERE {} = ?1",
                table.ident(),
                table.key_column()
            ),
            [key],
            |row| row.get(0),
        )
        .optional()?;

    data.map(|d| codec::decode_document(&d)).transpose()
}

/// Full scan, capped at `limit` rows when `limit > 0`.
///
/// Timestamped tables come back newest first; the rest in key order.
pub fn get_all<T: DeserializeOwned>(conn: &Connection, table: Table, limit: i64) -> Result<Vec<T>> {
    ensure_document_table(table)?;
    let order = if table.has_timestamp() {
        format!("timestamp DESC, {} DESC", table.key_column())
    } else {
        table.key_column().to_string()
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {}, data FROM {} ORDER BY {order} LIMIT ?1",
        table.key_column(),
        table.ident()
    ))?;
    let rows = stmt
        .query_map([sql_limit(limit)], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<(String, String)>, _>>()?;

    Ok(decode_rows(table, rows))
}

/// Newest-first page of a timestamped table.
///
/// With a `cursor`, only rows strictly older than it are returned.
pub fn page<T: DeserializeOwned>(
    conn: &Connection,
    table: Table,
    limit: i64,
    cursor: Option<i64>,
) -> Result<Vec<T>> {
    if !table.has_timestamp() {
        return Err(StoreError::NotFound(format!(
            "timestamp column on '{table}'"
        )));
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {key}, data FROM {} \
         WHERE (?1 IS NULL OR timestamp < ?1) \
         ORDER BY timestamp DESC, {key} DESC LIMIT ?2",
        table.ident(),
        key = table.key_column()
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![cursor, sql_limit(limit)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<(String, String)>, _>>()?;

    Ok(decode_rows(table, rows))
}

/// Remove the row stored under `key`. Returns whether a row existed.
pub fn delete(conn: &Connection, table: Table, key: &str) -> Result<bool> {
    let removed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1",
            table.ident(),
            table.key_column()
        ),
        [key],
    )?;
    Ok(removed > 0)
}

/// Whether a row exists under `key`.
pub fn exists(conn: &Connection, table: Table, key: &str) -> Result<bool> {
    let found: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            table.ident(),
            table.key_column()
        ),
        [key],
        |row| row.get(0),
    )?;
    Ok(found != 0)
}

/// Number of rows in a table.
pub fn count(conn: &Connection, table: Table) -> Result<i64> {
    Ok(conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", table.ident()),
        [],
        |row| row.get(0),
    )?)
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: i64) -> i64 {
    if limit <= 0 {
        -1
    } else {
        limit
    }
}

fn ensure_document_table(table: Table) -> Result<()> {
    if table.is_document() {
        Ok(())
    } else {
        Err(StoreError::NotFound(format!("document table '{table}'")))
    }
}

/// Decode rows, skipping (and logging) any that no longer parse.
fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<(String, String)>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|(key, data)| match codec::decode_document(&data) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(table = %table, key = %key, "skipping corrupt row: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn post(conn: &Connection, id: &str, ts: i64) {
        upsert(conn, Table::Posts, id, &json!({"id": id, "timestamp": ts}), Some(ts))
            .expect("upsert post");
    }

    fn ids(docs: &[Value]) -> Vec<&str> {
        docs.iter().filter_map(|d| d["id"].as_str()).collect()
    }

    #[test]
    fn test_upsert_replaces() {
        let conn = test_db();
        upsert(&conn, Table::Posts, "p1", &json!({"id": "p1", "content": "a"}), Some(1))
            .expect("first");
        upsert(&conn, Table::Posts, "p1", &json!({"id": "p1", "content": "b"}), Some(1))
            .expect("second");

        assert_eq!(count(&conn, Table::Posts).expect("count"), 1);
        let doc: Value = get(&conn, Table::Posts, "p1").expect("get").expect("present");
        assert_eq!(doc["content"], "b");
    }

    #[test]
    fn test_get_round_trip_and_absent() {
        let conn = test_db();
        let doc = json!({"email": "a@test.com", "profile": {"name": "alice"}});
        upsert(&conn, Table::Users, "a@test.com", &doc, None).expect("upsert");

        let back: Option<Value> = get(&conn, Table::Users, "a@test.com").expect("get");
        assert_eq!(back, Some(doc));
        let missing: Option<Value> = get(&conn, Table::Users, "b@test.com").expect("get");
        assert!(missing.is_none());
    }

    #[test]
    fn test_cursor_pagination() {
        let conn = test_db();
        post(&conn, "p100", 100);
        post(&conn, "p300", 300);
        post(&conn, "p200", 200);

        let first: Vec<Value> = page(&conn, Table::Posts, 2, None).expect("page");
        assert_eq!(ids(&first), ["p300", "p200"]);

        let second: Vec<Value> = page(&conn, Table::Posts, 2, Some(200)).expect("page");
        assert_eq!(ids(&second), ["p100"]);
    }

    #[test]
    fn test_page_requires_timestamp_column() {
        let conn = test_db();
        let result: Result<Vec<Value>> = page(&conn, Table::Groups, 10, None);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_get_all_limits() {
        let conn = test_db();
        for (i, ts) in [10, 20, 30].into_iter().enumerate() {
            post(&conn, &format!("p{i}"), ts);
        }

        let all: Vec<Value> = get_all(&conn, Table::Posts, 0).expect("all");
        assert_eq!(all.len(), 3);
        let negative: Vec<Value> = get_all(&conn, Table::Posts, -5).expect("all");
        assert_eq!(negative.len(), 3);
        let capped: Vec<Value> = get_all(&conn, Table::Posts, 2).expect("capped");
        assert_eq!(ids(&capped), ["p2", "p1"]);
    }

    #[test]
    fn test_empty_table() {
        let conn = test_db();
        let all: Vec<Value> = get_all(&conn, Table::Ads, 0).expect("all");
        assert!(all.is_empty());
        let first: Vec<Value> = page(&conn, Table::Ads, 10, None).expect("page");
        assert!(first.is_empty());
    }

    #[test]
    fn test_corrupt_row_is_skipped() {
        let conn = test_db();
        upsert(&conn, Table::Groups, "g1", &json!({"id": "g1"}), None).expect("upsert");
        conn.execute(
            "INSERT INTO \"groups\" (id, data) VALUES ('g2', '{broken')",
            [],
        )
        .expect("raw insert");

        let all: Vec<Value> = get_all(&conn, Table::Groups, 0).expect("all");
        assert_eq!(ids(&all), ["g1"]);

        let corrupt: Result<Option<Value>> = get(&conn, Table::Groups, "g2");
        assert!(matches!(corrupt, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_delete_and_exists() {
        let conn = test_db();
        upsert(&conn, Table::Chats, "u1_u2", &json!({"id": "u1_u2"}), None).expect("upsert");
        assert!(exists(&conn, Table::Chats, "u1_u2").expect("exists"));

        assert!(delete(&conn, Table::Chats, "u1_u2").expect("delete"));
        assert!(!delete(&conn, Table::Chats, "u1_u2").expect("second delete"));
        assert!(!exists(&conn, Table::Chats, "u1_u2").expect("exists"));
    }

    #[test]
    fn test_fixed_shape_tables_rejected() {
        let conn = test_db();
        let result = upsert(&conn, Table::Permissions, "a@test.com", &json!({}), None);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
