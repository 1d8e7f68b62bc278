//! Append-only photo cache backed by SQLite.
//!
//! Writes go through a single connection behind a mutex; reads round-robin
//! over a small pool of read-only connections. WAL keeps readers consistent
//! while an append is in flight, so concurrent `latest` calls never block
//! each other.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags};

use crate::Result;

const READ_POOL_SIZE: usize = 2;

/// One cached capture. Immutable once written, retained indefinitely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Photo {
    pub user_name: String,
    pub file_id: String,
    pub caption: String,
    pub captured_at: NaiveDateTime,
}

pub struct PhotoStore {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl PhotoStore {
    /// Opens (creating if needed) the photo database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;
        writer.pragma_update(None, "journal_mode", "wal")?;
        writer.execute_batch(
            "create table if not exists photos(
                id integer primary key autoincrement,
                user_name text not null,
                file_id text not null,
                caption text default null,
                captured_at datetime default current_timestamp
            );
            create index if not exists idx_photos on photos(user_name, captured_at);",
        )?;

        let mut readers = Vec::with_capacity(READ_POOL_SIZE);
        for _ in 0..READ_POOL_SIZE {
            let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            readers.push(Mutex::new(conn));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Records one delivered capture. Callers treat failures as best-effort:
    /// losing a cache entry only costs a recapture later.
    pub fn append(&self, user_name: &str, file_id: &str, caption: &str) -> Result<()> {
        let conn = lock(&self.writer);
        conn.execute(
            "insert into photos(user_name, file_id, caption) values(?1, ?2, ?3)",
            params![user_name, file_id, caption],
        )?;
        Ok(())
    }

    /// Up to `n` of `user_name`'s photos, most recent first.
    pub fn latest(&self, user_name: &str, n: usize) -> Result<Vec<Photo>> {
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = lock(&self.readers[idx]);

        let mut stmt = conn.prepare(
            "select user_name, file_id, caption, captured_at from photos
             where user_name = ?1 order by id desc limit ?2",
        )?;
        let rows = stmt.query_map(params![user_name, n as i64], |row| {
            Ok(Photo {
                user_name: row.get(0)?,
                file_id: row.get(1)?,
                caption: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                captured_at: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// Poisoning only happens if a panic escaped mid-statement; the connection
// itself is still usable.
fn lock(m: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, PhotoStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::open(&dir.path().join("photos.sqlite")).unwrap();
        (dir, store)
    }

    #[test]
    fn latest_returns_most_recent_first() {
        let (_dir, store) = open_store();

        store.append("alice", "file-1", "first").unwrap();
        store.append("alice", "file-2", "second").unwrap();
        store.append("alice", "file-3", "third").unwrap();

        let photos = store.latest("alice", 10).unwrap();
        let file_ids: Vec<&str> = photos.iter().map(|p| p.file_id.as_str()).collect();
        assert_eq!(file_ids, vec!["file-3", "file-2", "file-1"]);
    }

    #[test]
    fn latest_is_scoped_to_one_user() {
        let (_dir, store) = open_store();

        store.append("alice", "file-a", "alice's").unwrap();
        store.append("bob", "file-b", "bob's").unwrap();

        let photos = store.latest("alice", 10).unwrap();
        assert_eq!(photos.len(), 1);
        assert!(photos.iter().all(|p| p.user_name == "alice"));
    }

    #[test]
    fn latest_respects_the_limit() {
        let (_dir, store) = open_store();

        for i in 0..5 {
            store
                .append("alice", &format!("file-{i}"), "caption")
                .unwrap();
        }

        assert_eq!(store.latest("alice", 3).unwrap().len(), 3);
        assert!(store.latest("carol", 3).unwrap().is_empty());
    }

    #[test]
    fn captured_at_is_populated() {
        let (_dir, store) = open_store();

        store.append("alice", "file-1", "caption").unwrap();
        let photos = store.latest("alice", 1).unwrap();
        assert_eq!(photos.len(), 1);
        // Sanity: the DB default stamped a plausible timestamp.
        assert!(photos[0].captured_at.and_utc().timestamp() > 0);
    }
}
