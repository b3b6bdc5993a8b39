//! SQL for the star schema.
//!
//! Placeholders are positional and follow the field order of the matching
//! record in `crate::records`.

/// Fact and dimension tables, in creation order.
pub const TABLES: [&str; 5] = ["songplays", "users", "songs", "artists", "time"];

pub const SONGPLAY_TABLE_CREATE: &str = "
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time  TIMESTAMP NOT NULL,
    user_id     BIGINT NOT NULL,
    level       TEXT,
    song_id     TEXT,
    artist_id   TEXT,
    session_id  BIGINT,
    location    TEXT,
    user_agent  TEXT
)";

pub const USER_TABLE_CREATE: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id    BIGINT NOT NULL PRIMARY KEY,
    first_name TEXT,
    last_name  TEXT,
    gender     TEXT,
    level      TEXT
)";

pub const SONG_TABLE_CREATE: &str = "
CREATE TABLE IF NOT EXISTS songs (
    song_id   TEXT NOT NULL PRIMARY KEY,
    title     TEXT NOT NULL,
    artist_id TEXT NOT NULL,
    year      INT,
    duration  REAL NOT NULL
)";

pub const ARTIST_TABLE_CREATE: &str = "
CREATE TABLE IF NOT EXISTS artists (
    artist_id TEXT NOT NULL PRIMARY KEY,
    name      TEXT,
    location  TEXT,
    latitude  REAL,
    longitude REAL
)";

pub const TIME_TABLE_CREATE: &str = "
CREATE TABLE IF NOT EXISTS time (
    start_time TIMESTAMP NOT NULL PRIMARY KEY,
    hour       INT NOT NULL,
    day        INT NOT NULL,
    week       INT NOT NULL,
    month      INT NOT NULL,
    year       INT NOT NULL,
    weekday    INT NOT NULL
)";

pub const CREATE_TABLE_QUERIES: [&str; 5] = [
    SONGPLAY_TABLE_CREATE,
    USER_TABLE_CREATE,
    SONG_TABLE_CREATE,
    ARTIST_TABLE_CREATE,
    TIME_TABLE_CREATE,
];

pub const SONGPLAY_TABLE_INSERT: &str = "
INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// A user can move between free and paid, the latest event wins.
pub const USER_TABLE_INSERT: &str = "
INSERT INTO users (user_id, first_name, last_name, gender, level)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (user_id) DO UPDATE SET level = excluded.level";

pub const SONG_TABLE_INSERT: &str = "
INSERT INTO songs (song_id, title, artist_id, year, duration)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (song_id) DO NOTHING";

pub const ARTIST_TABLE_INSERT: &str = "
INSERT INTO artists (artist_id, name, location, latitude, longitude)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (artist_id) DO NOTHING";

pub const TIME_TABLE_INSERT: &str = "
INSERT INTO time (start_time, hour, day, week, month, year, weekday)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (start_time) DO NOTHING";

pub const SONG_SELECT: &str = "
SELECT s.song_id, a.artist_id
FROM songs s
JOIN artists a ON s.artist_id = a.artist_id
WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
LIMIT 1";
