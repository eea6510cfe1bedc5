//! Song metadata files: one JSON object, one song, one artist.

use std::path::Path;
use tracing::debug;

use crate::error::{LoadError, RecordError};
use crate::models::{ArtistRow, LoadStats, SongDocument, SongRow};
use crate::storage::Storage;

/// Parse a song document. Missing or mistyped fields are `Malformed`.
pub fn parse_song_document(text: &str) -> Result<SongDocument, RecordError> {
    let doc: SongDocument = serde_json::from_str(text)?;
    if !doc.duration.is_finite() || doc.duration <= 0.0 {
        return Err(RecordError::Malformed(format!(
            "song {} has non-positive duration {}",
            doc.song_id, doc.duration
        )));
    }
    Ok(doc)
}

/// Project a song document onto its song and artist rows.
pub fn song_rows(doc: &SongDocument) -> (SongRow, ArtistRow) {
    let song = SongRow {
        song_id: doc.song_id.clone(),
        title: doc.title.clone(),
        artist_id: doc.artist_id.clone(),
        year: doc.year,
        duration: doc.duration,
    };
    let artist = ArtistRow {
        artist_id: doc.artist_id.clone(),
        name: doc.artist_name.clone(),
        location: doc.artist_location.clone(),
        latitude: doc.artist_latitude,
        longitude: doc.artist_longitude,
    };
    (song, artist)
}

/// Load one song file into storage. Does not commit.
pub fn load_song_file<S: Storage + ?Sized>(storage: &mut S, path: &Path) -> Result<LoadStats, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = parse_song_document(&text).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let (song, artist) = song_rows(&doc);
    let storage_err = |source| LoadError::Storage {
        path: path.to_path_buf(),
        source,
    };
    storage.insert_song(&song).map_err(storage_err)?;
    storage.insert_artist(&artist).map_err(storage_err)?;

    debug!(song_id = %song.song_id, artist_id = %artist.artist_id, "Loaded song file");

    Ok(LoadStats {
        files: 1,
        songs: 1,
        artists: 1,
        ..Default::default()
    })
}
