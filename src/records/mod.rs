//! Typed rows flowing through the pipeline.
//!
//! Input rows (`SongFile`, `LogEvent`) mirror the JSON files. Output rows
//! mirror the star schema columns in insert order. Every nullable column is
//! an `Option`; blank strings, JSON nulls and non-finite numbers are folded
//! into `None` while deserializing.

use chrono::NaiveDateTime;
use serde::Deserialize;

mod nullable;

pub use nullable::{blank_as_none, finite_or_none, flexible_id};

/// Event type whose rows feed the time, user and songplay tables.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// One song metadata file.
#[derive(Debug, Clone, Deserialize)]
pub struct SongFile {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub duration: f64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub artist_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub artist_location: Option<String>,
    #[serde(default, deserialize_with = "finite_or_none")]
    pub artist_latitude: Option<f64>,
    #[serde(default, deserialize_with = "finite_or_none")]
    pub artist_longitude: Option<f64>,
}

/// One line of an activity log.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub song: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "finite_or_none")]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub session_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_agent: Option<String>,
}

impl LogEvent {
    pub fn is_next_song(&self) -> bool {
        self.page == NEXT_SONG_PAGE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    /// Never `Some(0)`.
    pub year: Option<i32>,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRecord {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week of year.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 0 = Monday.
    pub weekday: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// Dimension keys resolved for one playback event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRecord {
    pub start_time: NaiveDateTime,
    pub user_id: Option<i64>,
    pub level: Option<String>,
    /// Both keys come from the same lookup row.
    pub song: Option<SongMatch>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl SongplayRecord {
    pub fn song_id(&self) -> Option<&str> {
        self.song.as_ref().map(|m| m.song_id.as_str())
    }

    pub fn artist_id(&self) -> Option<&str> {
        self.song.as_ref().map(|m| m.artist_id.as_str())
    }
}

