//! Storage collaborator for the loaders.
//!
//! Loaders never talk to a database directly: they receive an explicit
//! `&mut impl Storage` and hand it one row per call, then the batch driver
//! commits once per file.

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteStorage, TableCounts};

use crate::error::StorageError;
use crate::models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

/// Exact-match key for looking up a song from an activity event.
#[derive(Clone, Debug, PartialEq)]
pub struct SongQuery {
    pub title: String,
    pub artist: String,
    pub duration: f64,
}

/// One raw result row of a song lookup, as nullable text columns.
///
/// Kept untyped so the resolver can check the shape itself instead of trusting
/// the backend to return exactly `(song_id, artist_id)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupRow(pub Vec<Option<String>>);

pub trait Storage {
    fn insert_song(&mut self, row: &SongRow) -> Result<(), StorageError>;

    fn insert_artist(&mut self, row: &ArtistRow) -> Result<(), StorageError>;

    /// Duplicate start times are ignored.
    fn insert_time(&mut self, row: &TimeRow) -> Result<(), StorageError>;

    fn insert_user(&mut self, row: &UserRow) -> Result<(), StorageError>;

    fn insert_songplay(&mut self, row: &SongplayRow) -> Result<(), StorageError>;

    /// Songs whose title, artist name and duration all equal the query.
    /// Backends may stop after two rows; callers only need to tell one from many.
    fn lookup_song(&mut self, query: &SongQuery) -> Result<Vec<LookupRow>, StorageError>;

    /// Make everything inserted since the last commit durable.
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Discard everything inserted since the last commit.
    fn rollback(&mut self) -> Result<(), StorageError>;
}
