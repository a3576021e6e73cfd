use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, Transaction};
use serde_json::Value;
use tokio_rusqlite::Connection;

use crate::error::Result;

use super::schema::SCHEMA;

/// A JSON document store kept in SQLite.
///
/// Documents are grouped into named collections and addressed by a string id. Writes merge
/// fields into whatever is already stored instead of replacing the document, so a field left
/// out of a later write keeps its earlier value.
#[derive(Clone)]
pub struct DocumentDb {
    conn: Connection,
}

impl DocumentDb {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collection = collection.to_string();
        let id = id.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let raw = conn
                    .query_row(
                        "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection, id],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(raw)
            })
            .await?;

        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    /// All documents of a collection as `(id, raw JSON)` pairs, ordered by id.
    ///
    /// The payload is left unparsed so callers can decide what to do with documents that no
    /// longer match their schema.
    pub async fn list(&self, collection: &str) -> Result<Vec<(String, String)>> {
        let collection = collection.to_string();
        let docs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id",
                )?;
                let docs = stmt
                    .query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
                Ok(docs)
            })
            .await?;
        Ok(docs)
    }

    /// Documents whose `tags` array contains `tag` (every document when `tag` is empty), ordered
    /// by `likes` descending then id, at most `limit` of them.
    ///
    /// Filtering, ordering and the limit all run in SQLite. Rows whose payload is not valid JSON
    /// never match.
    pub async fn query_tagged(
        &self,
        collection: &str,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>> {
        let collection = collection.to_string();
        let tag = tag.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let docs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, data FROM documents
                       WHERE collection = ?1
                         AND json_valid(data)
                         AND (?2 = '' OR EXISTS (
                             SELECT 1 FROM json_each(
                                 CASE WHEN json_valid(documents.data) THEN documents.data ELSE '{}' END,
                                 '$.tags'
                             )
                             WHERE json_each.value = ?2
                         ))
                       ORDER BY CASE WHEN json_valid(data) THEN json_extract(data, '$.likes') END DESC,
                                id
                       LIMIT ?3"#,
                )?;
                let docs = stmt
                    .query_map(params![collection, tag, limit], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
                Ok(docs)
            })
            .await?;
        Ok(docs)
    }

    /// Merge `patch` into one document, creating it if absent. Returns the stored document.
    pub async fn merge(&self, collection: &str, id: &str, patch: Value) -> Result<Value> {
        let collection = collection.to_string();
        let id = id.to_string();
        let merged = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let merged = merge_in_tx(&tx, &collection, &id, patch)?;
                tx.commit()?;
                Ok(merged)
            })
            .await?;
        Ok(merged)
    }

    /// Merge a batch of documents in one transaction: either every write lands or none does.
    /// Returns the number of distinct documents written; repeated ids merge into one.
    pub async fn merge_many(&self, collection: &str, docs: Vec<(String, Value)>) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let collection = collection.to_string();
        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut written = HashSet::new();
                for (id, patch) in docs {
                    merge_in_tx(&tx, &collection, &id, patch)?;
                    written.insert(id);
                }
                tx.commit()?;
                Ok(written.len())
            })
            .await?;
        Ok(written)
    }
}

fn merge_in_tx(
    tx: &Transaction<'_>,
    collection: &str,
    id: &str,
    patch: Value,
) -> std::result::Result<Value, tokio_rusqlite::Error> {
    let existing: Option<String> = tx
        .query_row(
            "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    let merged = match existing.map(|s| serde_json::from_str::<Value>(&s)) {
        Some(Ok(mut current)) => {
            merge_fields(&mut current, patch);
            current
        }
        Some(Err(e)) => {
            tracing::warn!("Replacing unreadable document {}/{}: {}", collection, id, e);
            patch
        }
        None => patch,
    };

    let data = serde_json::to_string(&merged)
        .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

    tx.execute(
        r#"INSERT INTO documents (collection, id, data)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(collection, id) DO UPDATE SET
               data = excluded.data,
               updated_at = datetime('now')"#,
        params![collection, id, data],
    )?;

    Ok(merged)
}

/// Recursively merge object fields of `patch` into `target`; anything else replaces.
fn merge_fields(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(slot) => merge_fields(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
