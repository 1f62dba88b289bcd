// Copyright 2026 Wikisearch Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use fs2::FileExt;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use sha2::Digest;
use sha2::Sha256;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::index::Index;
use crate::model::Scores;
use crate::model::TermCount;

/// Fields drop in order: the connection closes before the lock is released.
pub struct Store {
    pub conn: Connection,
    pub path: PathBuf,
    _lock: StoreLock,
}

/// Holds an flock on a file shared by every opener of the same store. The
/// file is never removed, so waiters and later openers contend on one inode.
struct StoreLock {
    _file: File,
}

const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy)]
pub enum StoreMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub term_count: i64,
    pub doc_count: i64,
    pub row_count: i64,
    pub db_size_bytes: u64,
}

#[derive(Debug)]
pub struct IntegrityReport {
    pub status: String,
    pub stats: StoreStats,
}

impl Store {
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("store already exists at {}", path.display());
        }
        let _lock = Self::acquire_lock(path, StoreMode::ReadWrite)?;
        let conn = Self::open_connection(path, StoreMode::ReadWrite)?;
        Self::apply_pragmas(&conn, StoreMode::ReadWrite)?;
        Self::create_schema(&conn)?;
        Self::set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
        Ok(())
    }

    pub fn open(path: &Path, mode: StoreMode) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("store not found at {}", path.display());
        }
        let lock = Self::acquire_lock(path, mode)?;
        let conn = Self::open_connection(path, mode)?;
        Self::apply_pragmas(&conn, mode)?;
        Self::check_version(&conn, path)?;
        if matches!(mode, StoreMode::ReadWrite) {
            Self::create_schema(&conn)?;
            Self::set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
        }
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    fn open_connection(path: &Path, mode: StoreMode) -> Result<Connection> {
        let flags = match mode {
            StoreMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            StoreMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("open {}", path.display()))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .context("set busy timeout")?;
        Ok(conn)
    }

    fn apply_pragmas(conn: &Connection, mode: StoreMode) -> Result<()> {
        if matches!(mode, StoreMode::ReadWrite) {
            conn.execute_batch("PRAGMA journal_mode=DELETE;\nPRAGMA synchronous=NORMAL;")
                .context("apply pragmas")?;
        }
        Ok(())
    }

    /// `init` locks before the database file exists, so resolve the parent
    /// directory and re-attach the file name to hash the same path `open` sees.
    fn canonical_store_path(path: &Path) -> PathBuf {
        if let Ok(canonical) = path.canonicalize() {
            return canonical;
        }
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        match (parent.canonicalize(), path.file_name()) {
            (Ok(dir), Some(name)) => dir.join(name),
            _ => path.to_path_buf(),
        }
    }

    fn lock_path_for(path: &Path) -> Result<PathBuf> {
        let canonical = Self::canonical_store_path(path);
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize());
        let mut dir = std::env::temp_dir();
        dir.push("wikisearch");
        fs::create_dir_all(&dir).with_context(|| format!("create lock dir {}", dir.display()))?;
        Ok(dir.join(format!("wikisearch-{hash}.lock")))
    }

    fn acquire_lock(path: &Path, mode: StoreMode) -> Result<StoreLock> {
        let lock_path = Self::lock_path_for(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("open lock file {}", lock_path.display()))?;
        let deadline = Instant::now() + Duration::from_millis(5000);
        loop {
            let locked = match mode {
                StoreMode::ReadOnly => file.try_lock_shared().map_err(|err| err.to_string()),
                StoreMode::ReadWrite => file.try_lock_exclusive().map_err(|err| err.to_string()),
            };
            match locked {
                Ok(()) => return Ok(StoreLock { _file: file }),
                Err(_) if Instant::now() >= deadline => {
                    let mode_label = match mode {
                        StoreMode::ReadOnly => "read",
                        StoreMode::ReadWrite => "write",
                    };
                    anyhow::bail!(
                        "store is locked for {mode_label} access; another process may be using {}",
                        path.display()
                    );
                }
                Err(_) => {
                    sleep(Duration::from_millis(50));
                }
            }
        }
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (\n  key TEXT PRIMARY KEY,\n  value TEXT\n);\n\nCREATE TABLE IF NOT EXISTS term_count (\n  term TEXT NOT NULL,\n  doc TEXT NOT NULL,\n  count INTEGER NOT NULL CHECK (count > 0),\n  PRIMARY KEY (term, doc)\n);\n\nCREATE INDEX IF NOT EXISTS idx_term_count_doc ON term_count(doc);",
        )
        .context("create schema")?;
        Ok(())
    }

    fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .context("set meta")?;
        Ok(())
    }

    fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
        if !Self::table_exists(conn, "meta")? {
            return Ok(None);
        }
        conn.query_row(
            "SELECT value FROM meta WHERE key=?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("read meta {key}"))
    }

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![name],
                |row| row.get(0),
            )
            .context("check table")?;
        Ok(count > 0)
    }

    fn check_version(conn: &Connection, path: &Path) -> Result<()> {
        let version = Self::get_meta(conn, "schema_version")?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        if version > SCHEMA_VERSION {
            anyhow::bail!(
                "store schema version {} is newer than supported {}",
                version,
                SCHEMA_VERSION
            );
        }
        if version < SCHEMA_VERSION && !Self::table_exists(conn, "term_count")? {
            anyhow::bail!("{} is not a wikisearch store", path.display());
        }
        Ok(())
    }

    /// Upserts term counts. Zero counts are skipped and reported back.
    pub fn put_counts(&self, rows: &[TermCount]) -> Result<PutReport> {
        let mut report = PutReport::default();
        let mut stmt = self.conn.prepare(
            "INSERT INTO term_count (term, doc, count) VALUES (?1, ?2, ?3)\n             ON CONFLICT(term, doc) DO UPDATE SET count = excluded.count",
        )?;
        for row in rows {
            if row.count == 0 {
                report.skipped += 1;
                continue;
            }
            let count = i64::try_from(row.count)
                .with_context(|| format!("count for {:?}/{:?} out of range", row.term, row.doc))?;
            stmt.execute(params![row.term, row.doc, count])
                .context("insert term count")?;
            report.written += 1;
        }
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format timestamp")?;
        Self::set_meta(&self.conn, "updated_at", &now)?;
        Ok(report)
    }

    /// All rows ordered by term, then document.
    pub fn all_counts(&self) -> Result<Vec<TermCount>> {
        let mut stmt = self
            .conn
            .prepare("SELECT term, doc, count FROM term_count ORDER BY term ASC, doc ASC")?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(2)?;
            Ok(TermCount {
                term: row.get(0)?,
                doc: row.get(1)?,
                count: count.max(0) as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let term_count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT term) FROM term_count", [], |row| {
                row.get(0)
            })
            .context("count terms")?;
        let doc_count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT doc) FROM term_count", [], |row| {
                row.get(0)
            })
            .context("count docs")?;
        let row_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM term_count", [], |row| row.get(0))
            .context("count rows")?;
        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        Ok(StoreStats {
            term_count,
            doc_count,
            row_count,
            db_size_bytes,
        })
    }

    pub fn snapshot_token(&self) -> Result<String> {
        Ok(Self::get_meta(&self.conn, "updated_at")?.unwrap_or_default())
    }

    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let status: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .context("integrity_check")?;
        let stats = self.stats()?;
        Ok(IntegrityReport { status, stats })
    }
}

impl Index for Store {
    fn counts(&self, term: &str) -> Result<Scores> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT doc, count FROM term_count WHERE term = ?1")?;
        let rows = stmt.query_map(params![term], |row| {
            let doc: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((doc, count.max(0) as u64))
        })?;
        let mut scores = Scores::new();
        for row in rows {
            let (doc, count) = row?;
            scores.insert(doc, count);
        }
        Ok(scores)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PutReport {
    pub written: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;

    use rusqlite::Connection as SqlConnection;
    use tempfile::tempdir;

    use super::*;

    fn row(term: &str, doc: &str, count: u64) -> TermCount {
        TermCount {
            term: term.to_string(),
            doc: doc.to_string(),
            count,
        }
    }

    #[test]
    fn shared_lock_allows_multiple_readers() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("wikisearch.db");
        Store::init(&db_path)?;

        let store_a = Store::open(&db_path, StoreMode::ReadOnly)?;
        let store_b = Store::open(&db_path, StoreMode::ReadOnly)?;

        store_a.stats()?;
        store_b.stats()?;
        Ok(())
    }

    #[test]
    fn writer_waiting_on_release_still_excludes_later_writers() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("wikisearch.db");
        Store::init(&db_path)?;

        let first = Store::open(&db_path, StoreMode::ReadWrite)?;
        let (acquired_tx, acquired_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let waiter_path = db_path.clone();
        let waiter = thread::spawn(move || -> Result<()> {
            let second = Store::open(&waiter_path, StoreMode::ReadWrite)?;
            acquired_tx.send(()).ok();
            release_rx.recv().ok();
            drop(second);
            Ok(())
        });

        thread::sleep(Duration::from_millis(200));
        drop(first);
        acquired_rx
            .recv_timeout(Duration::from_secs(5))
            .context("waiting writer never acquired the lock")?;

        let third = Store::open(&db_path, StoreMode::ReadWrite);
        let locked = match third {
            Ok(_) => false,
            Err(err) => err.to_string().contains("store is locked"),
        };
        release_tx.send(()).ok();
        waiter.join().expect("waiter thread")?;
        assert!(locked, "a second writer opened while another held the lock");

        Store::open(&db_path, StoreMode::ReadWrite)?;
        Ok(())
    }

    #[test]
    fn lock_path_is_stable_across_init() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("wikisearch.db");
        let before = Store::lock_path_for(&db_path)?;
        Store::init(&db_path)?;
        let after = Store::lock_path_for(&db_path)?;
        assert_eq!(before, after);

        let nested = dir.path().join("sub").join("..").join("wikisearch.db");
        std::fs::create_dir_all(dir.path().join("sub"))?;
        assert_eq!(Store::lock_path_for(&nested)?, after);
        Ok(())
    }

    #[test]
    fn init_refuses_existing_store() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("wikisearch.db");
        Store::init(&db_path)?;
        let err = Store::init(&db_path).unwrap_err();
        assert!(err.to_string().contains("store already exists"));
        Ok(())
    }

    #[test]
    fn counts_roundtrip_through_sqlite() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("wikisearch.db");
        Store::init(&db_path)?;
        {
            let store = Store::open(&db_path, StoreMode::ReadWrite)?;
            let report = store.put_counts(&[
                row("java", "u1", 3),
                row("java", "u2", 1),
                row("java", "u3", 0),
                row("rust", "u2", 7),
            ])?;
            assert_eq!(report.written, 3);
            assert_eq!(report.skipped, 1);
            store.put_counts(&[row("java", "u2", 4)])?;
        }

        let store = Store::open(&db_path, StoreMode::ReadOnly)?;
        let java = store.counts("java")?;
        assert_eq!(java.get("u1"), Some(&3));
        assert_eq!(java.get("u2"), Some(&4));
        assert!(!java.contains_key("u3"));
        assert!(store.counts("python")?.is_empty());

        let stats = store.stats()?;
        assert_eq!(stats.term_count, 2);
        assert_eq!(stats.doc_count, 2);
        assert_eq!(stats.row_count, 3);
        assert!(!store.snapshot_token()?.is_empty());

        let all = store.all_counts()?;
        let keys: Vec<(&str, &str)> = all
            .iter()
            .map(|r| (r.term.as_str(), r.doc.as_str()))
            .collect();
        assert_eq!(keys, vec![("java", "u1"), ("java", "u2"), ("rust", "u2")]);
        Ok(())
    }

    #[test]
    fn rejects_newer_schema() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("wikisearch.db");
        Store::init(&db_path)?;
        let conn = SqlConnection::open(&db_path)?;
        conn.execute(
            "UPDATE meta SET value='99' WHERE key='schema_version'",
            [],
        )?;
        drop(conn);

        let err = match Store::open(&db_path, StoreMode::ReadOnly) {
            Ok(_) => panic!("expected version error"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("newer than supported"));
        Ok(())
    }

    #[test]
    fn rejects_foreign_database() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("other.db");
        let conn = SqlConnection::open(&db_path)?;
        conn.execute_batch("CREATE TABLE notes (body TEXT);")?;
        drop(conn);

        assert!(Store::open(&db_path, StoreMode::ReadOnly).is_err());
        Ok(())
    }
}
