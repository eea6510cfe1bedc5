//! In-memory storage that records every row it receives.
//!
//! Rows are kept in insertion order with no conflict handling, which makes it
//! easy to assert exactly what a loader emitted. Lookups join the recorded
//! songs and artists the same way the SQLite backend does.

use super::{LookupRow, SongQuery, Storage};
use crate::error::StorageError;
use crate::models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

/// Which table a recorded insert went to, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Songs,
    Artists,
    Time,
    Users,
    Songplays,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub songs: Vec<SongRow>,
    pub artists: Vec<ArtistRow>,
    pub time: Vec<TimeRow>,
    pub users: Vec<UserRow>,
    pub songplays: Vec<SongplayRow>,
    pub inserts: Vec<Table>,
    pub commits: usize,
    pub rollbacks: usize,

    /// Returned verbatim from `lookup_song` when set.
    pub lookup_override: Option<Vec<LookupRow>>,
    /// Reject any insert into this table.
    pub reject_table: Option<Table>,

    committed_len: [usize; 5],
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one reference song/artist pair, already committed.
    pub fn with_reference(mut self, song: SongRow, artist: ArtistRow) -> Self {
        self.songs.push(song);
        self.artists.push(artist);
        self.mark_committed();
        self
    }

    /// Answer every lookup with `rows`, whatever the query.
    pub fn with_lookup_override(mut self, rows: Vec<LookupRow>) -> Self {
        self.lookup_override = Some(rows);
        self
    }

    pub fn rejecting(mut self, table: Table) -> Self {
        self.reject_table = Some(table);
        self
    }

    fn record(&mut self, table: Table) -> Result<(), StorageError> {
        if self.reject_table == Some(table) {
            return Err(StorageError::Rejected(format!("insert into {:?} refused", table)));
        }
        self.inserts.push(table);
        Ok(())
    }

    fn mark_committed(&mut self) {
        self.committed_len = [
            self.songs.len(),
            self.artists.len(),
            self.time.len(),
            self.users.len(),
            self.songplays.len(),
        ];
    }
}

impl Storage for MemoryStorage {
    fn insert_song(&mut self, row: &SongRow) -> Result<(), StorageError> {
        self.record(Table::Songs)?;
        self.songs.push(row.clone());
        Ok(())
    }

    fn insert_artist(&mut self, row: &ArtistRow) -> Result<(), StorageError> {
        self.record(Table::Artists)?;
        self.artists.push(row.clone());
        Ok(())
    }

    fn insert_time(&mut self, row: &TimeRow) -> Result<(), StorageError> {
        self.record(Table::Time)?;
        self.time.push(row.clone());
        Ok(())
    }

    fn insert_user(&mut self, row: &UserRow) -> Result<(), StorageError> {
        self.record(Table::Users)?;
        self.users.push(row.clone());
        Ok(())
    }

    fn insert_songplay(&mut self, row: &SongplayRow) -> Result<(), StorageError> {
        self.record(Table::Songplays)?;
        self.songplays.push(row.clone());
        Ok(())
    }

    fn lookup_song(&mut self, query: &SongQuery) -> Result<Vec<LookupRow>, StorageError> {
        if let Some(rows) = &self.lookup_override {
            return Ok(rows.clone());
        }
        let found = self
            .songs
            .iter()
            .filter(|s| s.title == query.title && s.duration == query.duration)
            .filter_map(|s| {
                self.artists
                    .iter()
                    .find(|a| a.artist_id == s.artist_id && a.name == query.artist)
                    .map(|a| LookupRow(vec![Some(s.song_id.clone()), Some(a.artist_id.clone())]))
            })
            .take(2)
            .collect();
        Ok(found)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.commits += 1;
        self.mark_committed();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.rollbacks += 1;
        let [songs, artists, time, users, songplays] = self.committed_len;
        self.songs.truncate(songs);
        self.artists.truncate(artists);
        self.time.truncate(time);
        self.users.truncate(users);
        self.songplays.truncate(songplays);
        Ok(())
    }
}
