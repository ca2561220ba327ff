//! Partition and entry operations.
//!
//! A partition is a named map from request identity to the most recently
//! stored response. Partitions are created lazily on first open and only
//! ever removed whole, by [`CacheDb::sweep`].

use super::connection::CacheDb;
use crate::{Error, Request};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response snapshot as captured at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Snapshot a response now.
    pub fn new(
        url: impl Into<String>, status: u16, content_type: Option<String>, headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self { url: url.into(), status, content_type, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }

    /// Body decoded as UTF-8 text.
    pub fn text(&self) -> Result<&str, Error> {
        std::str::from_utf8(&self.body).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))
    }
}

/// Summary row for partition listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

/// Handle to one named partition.
#[derive(Clone, Debug)]
pub struct Partition {
    db: CacheDb,
    name: String,
}

struct EntryRow {
    url: String,
    status: u16,
    content_type: Option<String>,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    const COLUMNS: &'static str = "e.url, e.status, e.content_type, e.headers_json, e.body, e.stored_at";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            status: row.get(1)?,
            content_type: row.get(2)?,
            headers_json: row.get(3)?,
            body: row.get(4)?,
            stored_at: row.get(5)?,
        })
    }

    fn decode(self) -> Result<StoredResponse, Error> {
        let headers = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{}: headers: {e}", self.url)))?;
        Ok(StoredResponse {
            url: self.url,
            status: self.status,
            content_type: self.content_type,
            headers,
            body: self.body,
            stored_at: self.stored_at,
        })
    }
}

fn query_entry(
    conn: &rusqlite::Connection, sql: &str, params: &[&dyn rusqlite::ToSql],
) -> Result<Option<StoredResponse>, Error> {
    let mut stmt = conn.prepare(sql)?;
    match stmt.query_row(params, EntryRow::from_row) {
        Ok(row) => row.decode().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response for the request, replacing any previous entry.
    ///
    /// Only GET requests have a cache identity.
    pub async fn put(&self, request: &Request, response: &StoredResponse) -> Result<(), Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot cache {} request", request.method())));
        }

        let partition = self.name.clone();
        let key = request.identity();
        let method = request.method().to_string();
        let url = request.cache_url();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, chrono::Utc::now().to_rfc3339()],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                    partition, key, method, url, status, content_type, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(partition, key) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    content_type = excluded.content_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &partition,
                        &key,
                        &method,
                        &url,
                        response.status,
                        &response.content_type,
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(partition = %self.name, url = %request.cache_url(), "stored cache entry");
        Ok(())
    }

    /// Look the request up in this partition only.
    pub async fn match_request(&self, request: &Request) -> Result<Option<StoredResponse>, Error> {
        self.db.match_request(request, Some(&[self.name.as_str()][..])).await
    }
}

impl CacheDb {
    /// Open a partition, creating it if absent. Idempotent.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }

        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), name: name.to_string() })
    }

    /// All partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Partitions with their entry counts, in creation order.
    pub async fn partition_info(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.created_at, COUNT(e.key)
                FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                GROUP BY p.name
                ORDER BY MIN(p.rowid)",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Find the stored response for a request.
    ///
    /// With `search = None` every partition is searched in creation order;
    /// otherwise only the named partitions, in the order given. Non-GET
    /// requests never match.
    pub async fn match_request(
        &self, request: &Request, search: Option<&[&str]>,
    ) -> Result<Option<StoredResponse>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let key = request.identity();
        let search: Option<Vec<String>> = search.map(|names| names.iter().map(|n| n.to_string()).collect());

        let found = self
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                match search {
                    None => query_entry(
                        conn,
                        &format!(
                            "SELECT {} FROM entries e JOIN partitions p ON p.name = e.partition
                            WHERE e.key = ?1 ORDER BY p.rowid LIMIT 1",
                            EntryRow::COLUMNS
                        ),
                        &[&key],
                    ),
                    Some(names) => {
                        let sql = format!(
                            "SELECT {} FROM entries e WHERE e.partition = ?1 AND e.key = ?2",
                            EntryRow::COLUMNS
                        );
                        for name in &names {
                            if let Some(hit) = query_entry(conn, &sql, &[name, &key])? {
                                return Ok(Some(hit));
                            }
                        }
                        Ok(None)
                    }
                }
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(url = %request.cache_url(), hit = found.is_some(), "cache lookup");
        Ok(found)
    }

    /// Find the stored response, trying `preferred` partitions first (in the
    /// order given) and then every partition in creation order.
    pub async fn match_preferring(
        &self, request: &Request, preferred: &[&str],
    ) -> Result<Option<StoredResponse>, Error> {
        if let Some(hit) = self.match_request(request, Some(preferred)).await? {
            return Ok(Some(hit));
        }
        self.match_request(request, None).await
    }

    /// Delete every partition whose name is not in `retain`.
    ///
    /// Returns the deleted names. Running it again with the same list
    /// deletes nothing.
    pub async fn sweep(&self, retain: &[&str]) -> Result<Vec<String>, Error> {
        let retain: Vec<String> = retain.iter().map(|n| n.to_string()).collect();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let names = {
                    let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid")?;
                    let names = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<String>, _>>()?;
                    names
                };

                let mut deleted = Vec::new();
                for name in names {
                    if retain.contains(&name) {
                        continue;
                    }
                    conn.execute("DELETE FROM partitions WHERE name = ?1", params![&name])?;
                    deleted.push(name);
                }
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }
}
