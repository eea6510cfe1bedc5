//! Star schema DDL for the SQLite backend.

use rusqlite::Connection;

pub const TABLES: [&str; 5] = ["songplays", "users", "songs", "artists", "time"];

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS songplays (
        songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time  TEXT NOT NULL,
        user_id     TEXT NOT NULL,
        level       TEXT NOT NULL,
        song_id     TEXT,
        artist_id   TEXT,
        session_id  INTEGER NOT NULL,
        location    TEXT,
        user_agent  TEXT
    );

    CREATE TABLE IF NOT EXISTS users (
        user_id    TEXT PRIMARY KEY,
        first_name TEXT,
        last_name  TEXT,
        gender     TEXT,
        level      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS songs (
        song_id   TEXT PRIMARY KEY,
        title     TEXT NOT NULL,
        artist_id TEXT NOT NULL,
        year      INTEGER NOT NULL,
        duration  REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS artists (
        artist_id TEXT PRIMARY KEY,
        name      TEXT NOT NULL,
        location  TEXT,
        latitude  REAL,
        longitude REAL
    );

    CREATE TABLE IF NOT EXISTS time (
        start_time TEXT PRIMARY KEY,
        hour       INTEGER NOT NULL,
        day        INTEGER NOT NULL,
        week       INTEGER NOT NULL,
        month      INTEGER NOT NULL,
        year       INTEGER NOT NULL,
        weekday    INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_songs_lookup ON songs (title, duration);
    CREATE INDEX IF NOT EXISTS idx_artists_name ON artists (name);
";

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_TABLES)
}

pub fn drop_tables(conn: &Connection) -> rusqlite::Result<()> {
    for table in TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_create_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(
            table_names(&conn),
            vec!["artists", "songplays", "songs", "time", "users"]
        );
    }

    #[test]
    fn test_drop_removes_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        drop_tables(&conn).unwrap();
        assert!(table_names(&conn).is_empty());
    }
}
