// 🏷️ SIC Classification Cache - TTL'd on-disk lookup of industry codes

use crate::store::SubmissionsStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Classification attached to a resolved CIK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SicInfo {
    pub sic: String,
    pub sic_description: String,
}

/// On-disk cache of SIC classifications, keyed by 10-digit CIK.
///
/// Backed by a small SQLite file so entries survive across runs. Each row
/// carries its fetch timestamp; rows older than the TTL are treated as
/// absent and refetched from the store, never served stale.
pub struct SicCache {
    conn: Connection,
    ttl: Duration,
}

impl SicCache {
    /// Open (or create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P, ttl_hours: i64) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open SIC cache: {:?}", path.as_ref()))?;
        Self::with_connection(conn, ttl_hours)
    }

    /// In-memory cache, for tests and one-shot runs.
    pub fn open_in_memory(ttl_hours: i64) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, ttl_hours)
    }

    fn with_connection(conn: Connection, ttl_hours: i64) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sic_cache (
                cik10           TEXT PRIMARY KEY,
                sic             TEXT NOT NULL,
                sic_description TEXT NOT NULL,
                fetched_at      TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create sic_cache table")?;

        Ok(SicCache {
            conn,
            ttl: Duration::hours(ttl_hours),
        })
    }

    /// Look up the classification for a CIK, consulting the cache first.
    ///
    /// A fresh cached row is returned without touching the store. Otherwise
    /// the document is fetched and, when it carries SIC fields, a stamped row
    /// is written (overwriting any expired one). A document without SIC
    /// fields (or no document at all) yields `Ok(None)`, not an error.
    pub fn get_sic(&self, cik10: &str, store: &SubmissionsStore) -> Result<Option<SicInfo>> {
        if let Some(cached) = self.read_fresh(cik10)? {
            debug!(cik10, "sic cache hit");
            return Ok(Some(cached));
        }

        let Some(doc) = store.get(cik10)? else {
            return Ok(None);
        };

        let (Some(sic), Some(desc)) = (doc.sic.clone(), doc.sic_description.clone()) else {
            return Ok(None);
        };

        let info = SicInfo {
            sic,
            sic_description: desc,
        };
        self.write(cik10, &info, Utc::now())?;
        debug!(cik10, sic = %info.sic, "sic cached");
        Ok(Some(info))
    }

    /// Return the cached row iff it has not expired.
    fn read_fresh(&self, cik10: &str) -> Result<Option<SicInfo>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT sic, sic_description, fetched_at FROM sic_cache WHERE cik10 = ?1",
                params![cik10],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("Failed to query sic_cache")?;

        let Some((sic, sic_description, fetched_at)) = row else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .context("Corrupt fetched_at timestamp in sic_cache")?
            .with_timezone(&Utc);

        if Utc::now() - fetched_at < self.ttl {
            Ok(Some(SicInfo {
                sic,
                sic_description,
            }))
        } else {
            Ok(None)
        }
    }

    fn write(&self, cik10: &str, info: &SicInfo, fetched_at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sic_cache (cik10, sic, sic_description, fetched_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![cik10, info.sic, info.sic_description, fetched_at.to_rfc3339()],
            )
            .context("Failed to write sic_cache row")?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
