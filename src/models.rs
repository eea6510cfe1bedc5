//! Core data models for the Sparkify load.
//!
//! Source documents (what the JSON files contain) and the five row shapes
//! handed to storage. Rows are named-field structs; each storage backend maps
//! them to statement parameters explicitly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Source Documents
// ============================================================================

/// One song metadata file. Unknown fields (e.g. `num_songs`) are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct SongDocument {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: u32, // 0 = unknown
    pub duration: f64,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

/// One "NextSong" line of an activity log.
///
/// Only NextSong events are deserialized into this shape; other pages carry
/// null song/artist/length and are filtered out before typing.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongplayEvent {
    pub ts: i64, // epoch milliseconds
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_gender")]
    pub gender: Gender,
    pub level: Level,
    pub song: String,
    pub artist: String,
    pub length: f64, // seconds
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

/// Page value that marks a song-play event.
pub const NEXT_SONG_PAGE: &str = "NextSong";

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_db(self) -> Option<&'static str> {
        match self {
            Gender::Male => Some("M"),
            Gender::Female => Some("F"),
            Gender::Unknown => None,
        }
    }
}

impl From<Option<&str>> for Gender {
    fn from(s: Option<&str>) -> Self {
        match s {
            Some("M") => Gender::Male,
            Some("F") => Gender::Female,
            _ => Gender::Unknown,
        }
    }
}

fn deserialize_gender<'de, D>(deserializer: D) -> Result<Gender, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(Gender::from(raw.as_deref()))
}

/// Subscription level. Anything other than "free"/"paid" is a malformed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Free,
    Paid,
}

impl Level {
    pub fn as_db(self) -> &'static str {
        match self {
            Level::Free => "free",
            Level::Paid => "paid",
        }
    }
}

// ============================================================================
// Output Rows
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: u32,
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Calendar decomposition of one event timestamp (UTC).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeRow {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    pub week: u32, // ISO week-of-year
    pub month: u32,
    pub year: i32,
    pub weekday: u32, // Monday = 0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Gender,
    pub level: Level,
}

/// Songplay fact row. `song_id`/`artist_id` are NULL when resolution fails.
#[derive(Clone, Debug, PartialEq)]
pub struct SongplayRow {
    pub start_time: NaiveDateTime,
    pub user_id: String,
    pub level: Level,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Row and event counters for one file or a whole run.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files: usize,
    pub failed_files: usize,

    // Song data
    pub songs: usize,
    pub artists: usize,

    // Log data
    pub events: usize,
    pub discarded_events: usize, // page != NextSong
    pub skipped_events: usize,   // malformed NextSong lines
    pub time_rows: usize,
    pub users: usize,
    pub songplays: usize,
    pub unresolved_songplays: usize,
}

impl LoadStats {
    /// Add another file's (or batch's) counters to this one.
    pub fn absorb(&mut self, other: &LoadStats) {
        self.files += other.files;
        self.failed_files += other.failed_files;
        self.songs += other.songs;
        self.artists += other.artists;
        self.events += other.events;
        self.discarded_events += other.discarded_events;
        self.skipped_events += other.skipped_events;
        self.time_rows += other.time_rows;
        self.users += other.users;
        self.songplays += other.songplays;
        self.unresolved_songplays += other.unresolved_songplays;
    }

    /// Percentage of songplays that resolved to a song/artist pair
    pub fn resolve_rate(&self) -> f64 {
        if self.songplays == 0 {
            0.0
        } else {
            100.0 * (self.songplays - self.unresolved_songplays) as f64 / self.songplays as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
