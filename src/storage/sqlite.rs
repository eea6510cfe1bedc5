//! SQLite-backed storage.
//!
//! Each file's rows go into one explicit transaction that is opened lazily on
//! the first statement and closed by `commit` or `rollback`.

use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use super::schema::{create_tables, drop_tables};
use super::{LookupRow, SongQuery, Storage};
use crate::error::StorageError;
use crate::models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

const INSERT_SONG: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (song_id) DO NOTHING";

const INSERT_ARTIST: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (artist_id) DO NOTHING";

const INSERT_TIME: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT (start_time) DO NOTHING";

const INSERT_USER: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (user_id) DO UPDATE SET level = excluded.level";

const INSERT_SONGPLAY: &str = "INSERT INTO songplays
         (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const LOOKUP_SONG: &str = "SELECT s.song_id, a.artist_id
     FROM songs s
     JOIN artists a ON s.artist_id = a.artist_id
     WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
     LIMIT 2";

/// Row counts per table, for run summaries and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

pub struct SqliteStorage {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteStorage {
    /// Open (or create) a database file and make sure the tables exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        create_tables(&conn)?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    /// Drop and recreate all five tables.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.rollback()?;
        info!("Dropping and recreating tables");
        drop_tables(&self.conn)?;
        create_tables(&self.conn)?;
        Ok(())
    }

    pub fn counts(&self) -> Result<TableCounts, StorageError> {
        let count = |table: &str| -> Result<usize, StorageError> {
            let n: usize = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n)
        };
        Ok(TableCounts {
            songs: count("songs")?,
            artists: count("artists")?,
            users: count("users")?,
            time: count("time")?,
            songplays: count("songplays")?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin_if_needed(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn insert_song(&mut self, row: &SongRow) -> Result<(), StorageError> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(INSERT_SONG)?;
        stmt.execute(params![row.song_id, row.title, row.artist_id, row.year, row.duration])?;
        Ok(())
    }

    fn insert_artist(&mut self, row: &ArtistRow) -> Result<(), StorageError> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(INSERT_ARTIST)?;
        stmt.execute(params![
            row.artist_id,
            row.name,
            row.location,
            row.latitude,
            row.longitude,
        ])?;
        Ok(())
    }

    fn insert_time(&mut self, row: &TimeRow) -> Result<(), StorageError> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(INSERT_TIME)?;
        stmt.execute(params![
            row.start_time,
            row.hour,
            row.day,
            row.week,
            row.month,
            row.year,
            row.weekday,
        ])?;
        Ok(())
    }

    fn insert_user(&mut self, row: &UserRow) -> Result<(), StorageError> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(INSERT_USER)?;
        stmt.execute(params![
            row.user_id,
            row.first_name,
            row.last_name,
            row.gender.as_db(),
            row.level.as_db(),
        ])?;
        Ok(())
    }

    fn insert_songplay(&mut self, row: &SongplayRow) -> Result<(), StorageError> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(INSERT_SONGPLAY)?;
        stmt.execute(params![
            row.start_time,
            row.user_id,
            row.level.as_db(),
            row.song_id,
            row.artist_id,
            row.session_id,
            row.location,
            row.user_agent,
        ])?;
        Ok(())
    }

    fn lookup_song(&mut self, query: &SongQuery) -> Result<Vec<LookupRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(LOOKUP_SONG)?;
        let width = stmt.column_count();
        let found = stmt
            .query_map(params![query.title, query.artist, query.duration], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(LookupRow)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(found)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
            debug!("Committed transaction");
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        if self.in_transaction {
            self.conn.execute_batch("ROLLBACK")?;
            self.in_transaction = false;
            debug!("Rolled back transaction");
        }
        Ok(())
    }
}
