use rusqlite::{params, Connection, OptionalExtension};

use super::sql;
use crate::error::EtlResult;
use crate::records::{
    ArtistRecord, SongMatch, SongRecord, SongplayRecord, TimeRecord, UserRecord,
};

/// Rows inserted while processing one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RowCounts {
    pub songs: usize,
    pub artists: usize,
    pub time: usize,
    pub users: usize,
    pub songplays: usize,
}

impl RowCounts {
    pub fn add(&mut self, other: &RowCounts) {
        self.songs += other.songs;
        self.artists += other.artists;
        self.time += other.time;
        self.users += other.users;
        self.songplays += other.songplays;
    }

    pub fn total(&self) -> usize {
        self.songs + self.artists + self.time + self.users + self.songplays
    }
}

/// Executes inserts and lookups against an open connection or transaction.
///
/// The loader never commits; rows become durable when the caller commits the
/// transaction it was built on. Counts track statements executed, not rows
/// that survived conflict handling.
pub struct Loader<'c> {
    conn: &'c Connection,
    counts: RowCounts,
}

impl<'c> Loader<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            counts: RowCounts::default(),
        }
    }

    pub fn counts(&self) -> RowCounts {
        self.counts
    }

    pub fn insert_song(&mut self, song: &SongRecord) -> EtlResult<()> {
        self.conn.prepare_cached(sql::SONG_TABLE_INSERT)?.execute(params![
            song.song_id,
            song.title,
            song.artist_id,
            song.year,
            song.duration,
        ])?;
        self.counts.songs += 1;
        Ok(())
    }

    pub fn insert_artist(&mut self, artist: &ArtistRecord) -> EtlResult<()> {
        self.conn.prepare_cached(sql::ARTIST_TABLE_INSERT)?.execute(params![
            artist.artist_id,
            artist.name,
            artist.location,
            artist.latitude,
            artist.longitude,
        ])?;
        self.counts.artists += 1;
        Ok(())
    }

    pub fn insert_time(&mut self, time: &TimeRecord) -> EtlResult<()> {
        self.conn.prepare_cached(sql::TIME_TABLE_INSERT)?.execute(params![
            time.start_time,
            time.hour,
            time.day,
            time.week,
            time.month,
            time.year,
            time.weekday,
        ])?;
        self.counts.time += 1;
        Ok(())
    }

    pub fn insert_user(&mut self, user: &UserRecord) -> EtlResult<()> {
        self.conn.prepare_cached(sql::USER_TABLE_INSERT)?.execute(params![
            user.user_id,
            user.first_name,
            user.last_name,
            user.gender,
            user.level,
        ])?;
        self.counts.users += 1;
        Ok(())
    }

    pub fn insert_songplay(&mut self, songplay: &SongplayRecord) -> EtlResult<()> {
        self.conn
            .prepare_cached(sql::SONGPLAY_TABLE_INSERT)?
            .execute(params![
                songplay.start_time,
                songplay.user_id,
                songplay.level,
                songplay.song_id(),
                songplay.artist_id(),
                songplay.session_id,
                songplay.location,
                songplay.user_agent,
            ])?;
        self.counts.songplays += 1;
        Ok(())
    }

    /// Resolves a playback event to dimension keys. No match is `Ok(None)`.
    pub fn find_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> EtlResult<Option<SongMatch>> {
        let found = self
            .conn
            .prepare_cached(sql::SONG_SELECT)?
            .query_row(params![title, artist_name, duration], |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })
            .optional()?;
        Ok(found)
    }
}
