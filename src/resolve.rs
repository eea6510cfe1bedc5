//! Song/artist resolution for activity events.
//!
//! Exact match on (title, artist name, duration) against the reference
//! tables. A miss is not an error: the songplay is still written, with NULL
//! song and artist ids.

use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::SongplayEvent;
use crate::storage::{LookupRow, SongQuery, Storage};

/// Resolved ids for one event; both `None` when nothing (or too much) matched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
}

impl Resolution {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.song_id.is_some() && self.artist_id.is_some()
    }
}

impl From<&SongplayEvent> for SongQuery {
    fn from(event: &SongplayEvent) -> Self {
        SongQuery {
            title: event.song.clone(),
            artist: event.artist.clone(),
            duration: event.length,
        }
    }
}

/// Look up the (song_id, artist_id) pair for a query.
///
/// Only a single, well-formed result row resolves. Zero rows and several rows
/// both degrade to an unresolved pair. A single row of the wrong shape is
/// logged and also degrades. Only storage failures are returned as errors.
pub fn resolve_song<S: Storage + ?Sized>(
    storage: &mut S,
    query: &SongQuery,
) -> Result<Resolution, StorageError> {
    let rows = storage.lookup_song(query)?;

    match rows.as_slice() {
        [] => {
            debug!(title = %query.title, artist = %query.artist, "No matching song");
            Ok(Resolution::unresolved())
        }
        [row] => Ok(unpack_pair(row, query)),
        _ => {
            debug!(
                title = %query.title,
                artist = %query.artist,
                matches = rows.len(),
                "Ambiguous song match"
            );
            Ok(Resolution::unresolved())
        }
    }
}

fn unpack_pair(row: &LookupRow, query: &SongQuery) -> Resolution {
    match row.0.as_slice() {
        [Some(song_id), Some(artist_id)] => Resolution {
            song_id: Some(song_id.clone()),
            artist_id: Some(artist_id.clone()),
        },
        columns => {
            warn!(
                title = %query.title,
                artist = %query.artist,
                "Corrupted song_id/artist_id pair: got {} column(s), {} null",
                columns.len(),
                columns.iter().filter(|c| c.is_none()).count()
            );
            Resolution::unresolved()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtistRow, SongRow};
    use crate::storage::MemoryStorage;

    fn reference() -> MemoryStorage {
        MemoryStorage::new().with_reference(
            SongRow {
                song_id: "SOTEST12345678".to_string(),
                title: "Test Song".to_string(),
                artist_id: "ARTEST12345678".to_string(),
                year: 1999,
                duration: 210.5,
            },
            ArtistRow {
                artist_id: "ARTEST12345678".to_string(),
                name: "Test Artist".to_string(),
                location: None,
                latitude: None,
                longitude: None,
            },
        )
    }

    fn query(title: &str, artist: &str, duration: f64) -> SongQuery {
        SongQuery {
            title: title.to_string(),
            artist: artist.to_string(),
            duration,
        }
    }

    #[test]
    fn test_resolves_single_match() {
        let mut storage = reference();
        let resolution = resolve_song(&mut storage, &query("Test Song", "Test Artist", 210.5)).unwrap();
        assert_eq!(resolution.song_id.as_deref(), Some("SOTEST12345678"));
        assert_eq!(resolution.artist_id.as_deref(), Some("ARTEST12345678"));
        assert!(resolution.is_resolved());
    }

    #[test]
    fn test_unknown_is_unresolved() {
        let mut storage = reference();
        let resolution = resolve_song(&mut storage, &query("Unknown", "Unknown", 0.0)).unwrap();
        assert_eq!(resolution, Resolution::unresolved());
    }

    #[test]
    fn test_duration_must_match_exactly() {
        let mut storage = reference();
        let resolution = resolve_song(&mut storage, &query("Test Song", "Test Artist", 210.50001)).unwrap();
        assert!(!resolution.is_resolved());
    }

    #[test]
    fn test_ambiguous_is_unresolved() {
        let mut storage = MemoryStorage::new().with_lookup_override(vec![
            LookupRow(vec![Some("S1".into()), Some("A1".into())]),
            LookupRow(vec![Some("S2".into()), Some("A2".into())]),
        ]);
        let resolution = resolve_song(&mut storage, &query("x", "y", 1.0)).unwrap();
        assert!(!resolution.is_resolved());
    }

    #[test]
    fn test_wrong_shape_degrades_to_null() {
        for columns in [
            vec![Some("S1".to_string())],
            vec![Some("S1".to_string()), Some("A1".to_string()), Some("extra".to_string())],
            vec![Some("S1".to_string()), None],
            vec![],
        ] {
            let mut storage = MemoryStorage::new().with_lookup_override(vec![LookupRow(columns)]);
            let resolution = resolve_song(&mut storage, &query("x", "y", 1.0)).unwrap();
            assert_eq!(resolution, Resolution::unresolved());
        }
    }
}
