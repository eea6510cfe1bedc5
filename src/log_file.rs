//! Activity log files: newline-delimited JSON, one event per line.
//!
//! Only `page == "NextSong"` events become rows. Within a file the inserts go
//! time rows first, then users, then one songplay per event, so every songplay
//! has its time row (and, for known users, its user row) already written.

use chrono::NaiveDateTime;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LoadError, RecordError, StorageError};
use crate::models::{LoadStats, SongplayEvent, SongplayRow, TimeRow, NEXT_SONG_PAGE};
use crate::resolve::{resolve_song, Resolution};
use crate::storage::{SongQuery, Storage};
use crate::time::{derive_time_row, distinct_time_rows};
use crate::users::dedupe_users;

/// A line that looked like a song play but could not be used.
#[derive(Debug)]
pub struct SkippedLine {
    pub line: usize, // 1-based
    pub reason: RecordError,
}

/// Typed NextSong events of one log, with what was left out.
#[derive(Debug, Default)]
pub struct ParsedLog {
    pub events: Vec<SongplayEvent>,
    /// `times[i]` is the time row of `events[i]`.
    pub times: Vec<TimeRow>,
    pub discarded: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Parse and filter a log's text. Never fails as a whole: bad lines are
/// collected in `skipped`, other pages are counted in `discarded`.
pub fn parse_log_events(text: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(Some((event, time))) => {
                parsed.events.push(event);
                parsed.times.push(time);
            }
            Ok(None) => parsed.discarded += 1,
            Err(reason) => parsed.skipped.push(SkippedLine {
                line: idx + 1,
                reason,
            }),
        }
    }

    parsed
}

fn parse_line(line: &str) -> Result<Option<(SongplayEvent, TimeRow)>, RecordError> {
    let value: Value = serde_json::from_str(line)?;
    let page = value
        .get("page")
        .and_then(Value::as_str)
        .ok_or_else(|| RecordError::Malformed("missing or non-string `page`".to_string()))?;
    if page != NEXT_SONG_PAGE {
        return Ok(None);
    }
    let event: SongplayEvent = serde_json::from_value(value)?;
    let time = derive_time_row(event.ts)?;
    Ok(Some((event, time)))
}

pub fn songplay_row(event: &SongplayEvent, start_time: NaiveDateTime, resolution: Resolution) -> SongplayRow {
    SongplayRow {
        start_time,
        user_id: event.user_id.clone(),
        level: event.level,
        song_id: resolution.song_id,
        artist_id: resolution.artist_id,
        session_id: event.session_id,
        location: event.location.clone(),
        user_agent: event.user_agent.clone(),
    }
}

/// Load one activity log into storage. Does not commit.
///
/// Malformed lines are skipped with a warning; only I/O and storage errors
/// fail the file.
pub fn load_log_file<S: Storage + ?Sized>(storage: &mut S, path: &Path) -> Result<LoadStats, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_log_events(&text);

    for skipped in &parsed.skipped {
        warn!(
            "Skipping malformed event at {}:{}: {}",
            path.display(),
            skipped.line,
            skipped.reason
        );
    }

    insert_parsed(storage, &parsed).map_err(|source| LoadError::Storage {
        path: path.to_path_buf(),
        source,
    })
}

fn insert_parsed<S: Storage + ?Sized>(storage: &mut S, parsed: &ParsedLog) -> Result<LoadStats, StorageError> {
    let mut stats = LoadStats {
        files: 1,
        events: parsed.events.len() + parsed.discarded + parsed.skipped.len(),
        discarded_events: parsed.discarded,
        skipped_events: parsed.skipped.len(),
        ..Default::default()
    };

    for row in distinct_time_rows(&parsed.times) {
        storage.insert_time(&row)?;
        stats.time_rows += 1;
    }

    for user in dedupe_users(&parsed.events) {
        storage.insert_user(&user)?;
        stats.users += 1;
    }

    for (event, time) in parsed.events.iter().zip(&parsed.times) {
        let resolution = resolve_song(storage, &SongQuery::from(event))?;
        if !resolution.is_resolved() {
            stats.unresolved_songplays += 1;
        }
        storage.insert_songplay(&songplay_row(event, time.start_time, resolution))?;
        stats.songplays += 1;
    }

    debug!(
        songplays = stats.songplays,
        unresolved = stats.unresolved_songplays,
        "Loaded log file"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtistRow, Level, SongRow};
    use crate::storage::memory::Table;
    use crate::storage::MemoryStorage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn next_song(ts: i64, user_id: &str, level: &str, song: &str, artist: &str, length: f64) -> String {
        serde_json::json!({
            "artist": artist, "auth": "Logged In", "firstName": "Walter", "gender": "M",
            "itemInSession": 0, "lastName": "Frye", "length": length, "level": level,
            "location": "San Francisco-Oakland-Hayward, CA", "method": "PUT",
            "page": "NextSong", "registration": 1540919166796.0_f64, "sessionId": 38,
            "song": song, "status": 200, "ts": ts,
            "userAgent": "Mozilla/5.0 (Macintosh)", "userId": user_id
        })
        .to_string()
    }

    fn home_page(ts: i64) -> String {
        serde_json::json!({
            "artist": null, "auth": "Logged In", "firstName": "Walter", "gender": "M",
            "itemInSession": 1, "lastName": "Frye", "length": null, "level": "free",
            "location": "San Francisco-Oakland-Hayward, CA", "method": "GET",
            "page": "Home", "sessionId": 38, "song": null, "status": 200, "ts": ts,
            "userAgent": "Mozilla/5.0 (Macintosh)", "userId": "39"
        })
        .to_string()
    }

    fn reference_storage() -> MemoryStorage {
        MemoryStorage::new().with_reference(
            SongRow {
                song_id: "SOZCTXZ12AB0182364".to_string(),
                title: "Setanta matins".to_string(),
                artist_id: "AR5KOSW1187FB35FF4".to_string(),
                year: 0,
                duration: 269.58322,
            },
            ArtistRow {
                artist_id: "AR5KOSW1187FB35FF4".to_string(),
                name: "Elena".to_string(),
                location: Some("Dubai UAE".to_string()),
                latitude: Some(49.80388),
                longitude: Some(15.47491),
            },
        )
    }

    fn write_temp(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_only_next_song_survives() {
        let text = [
            next_song(1_000, "39", "free", "A", "B", 1.0),
            home_page(2_000),
            next_song(3_000, "8", "paid", "C", "D", 2.0),
        ]
        .join("\n");
        let parsed = parse_log_events(&text);
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.times.len(), 2);
        assert_eq!(parsed.discarded, 1);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped_with_line_numbers() {
        let mut broken = serde_json::from_str::<Value>(&next_song(5, "1", "free", "a", "b", 1.0)).unwrap();
        broken.as_object_mut().unwrap().remove("sessionId");
        let text = [
            next_song(1_000, "39", "free", "A", "B", 1.0),
            "{truncated".to_string(),
            String::new(),
            broken.to_string(),
            r#"{"ts": 1, "userId": "1"}"#.to_string(),
            next_song(-5, "39", "free", "A", "B", 1.0),
        ]
        .join("\n");
        let parsed = parse_log_events(&text);
        assert_eq!(parsed.events.len(), 1);
        let lines: Vec<usize> = parsed.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 4, 5, 6]);
        assert!(matches!(
            parsed.skipped[3].reason,
            RecordError::InvalidTimestamp(-5)
        ));
    }

    #[test]
    fn test_emission_order_time_users_songplays() {
        let file = write_temp(&[
            next_song(1_000, "39", "free", "Setanta matins", "Elena", 269.58322),
            next_song(1_000, "39", "free", "Other", "Nobody", 100.0),
            next_song(2_000, "8", "paid", "Other", "Nobody", 100.0),
        ]);
        let mut storage = reference_storage();
        let stats = load_log_file(&mut storage, file.path()).unwrap();

        assert_eq!(
            storage.inserts,
            vec![
                Table::Time,
                Table::Time,
                Table::Users,
                Table::Users,
                Table::Songplays,
                Table::Songplays,
                Table::Songplays,
            ]
        );
        assert_eq!(stats.time_rows, 2);
        assert_eq!(stats.users, 2);
        assert_eq!(stats.songplays, 3);
        assert_eq!(stats.unresolved_songplays, 2);
    }

    #[test]
    fn test_songplay_fields_and_resolution() {
        let file = write_temp(&[
            next_song(1_541_106_106_796, "39", "free", "Setanta matins", "Elena", 269.58322),
            next_song(1_541_106_106_797, "39", "paid", "Unknown", "Unknown", 0.0),
        ]);
        let mut storage = reference_storage();
        load_log_file(&mut storage, file.path()).unwrap();

        let hit = &storage.songplays[0];
        assert_eq!(hit.song_id.as_deref(), Some("SOZCTXZ12AB0182364"));
        assert_eq!(hit.artist_id.as_deref(), Some("AR5KOSW1187FB35FF4"));
        assert_eq!(hit.user_id, "39");
        assert_eq!(hit.level, Level::Free);
        assert_eq!(hit.session_id, 38);
        assert_eq!(hit.location, "San Francisco-Oakland-Hayward, CA");
        assert_eq!(hit.start_time, storage.time[0].start_time);

        let miss = &storage.songplays[1];
        assert_eq!(miss.song_id, None);
        assert_eq!(miss.artist_id, None);
        assert_eq!(miss.level, Level::Paid);
    }

    #[test]
    fn test_blank_user_gets_songplay_but_no_user_row() {
        let file = write_temp(&[next_song(1_000, "", "free", "A", "B", 1.0)]);
        let mut storage = MemoryStorage::new();
        load_log_file(&mut storage, file.path()).unwrap();
        assert!(storage.users.is_empty());
        assert_eq!(storage.songplays.len(), 1);
        assert_eq!(storage.time.len(), 1);
    }

    #[test]
    fn test_reprocessing_duplicates_songplays() {
        let file = write_temp(&[next_song(1_000, "39", "free", "A", "B", 1.0)]);
        let mut storage = MemoryStorage::new();
        load_log_file(&mut storage, file.path()).unwrap();
        load_log_file(&mut storage, file.path()).unwrap();
        assert_eq!(storage.songplays.len(), 2);
    }

    #[test]
    fn test_storage_failure_fails_file() {
        let file = write_temp(&[next_song(1_000, "39", "free", "A", "B", 1.0)]);
        let mut storage = MemoryStorage::new().rejecting(Table::Songplays);
        let err = load_log_file(&mut storage, file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Storage { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut storage = MemoryStorage::new();
        let err = load_log_file(&mut storage, Path::new("/nonexistent/events.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
