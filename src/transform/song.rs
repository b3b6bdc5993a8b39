use std::path::Path;
use tracing::{debug, warn};

use super::FileProcessor;
use crate::db::Loader;
use crate::error::{EtlError, EtlResult};
use crate::io::JsonlReader;
use crate::records::{ArtistRecord, SongFile, SongRecord};

/// Loads the `songs` and `artists` dimensions from song metadata files.
pub struct SongFileProcessor;

impl FileProcessor for SongFileProcessor {
    fn name(&self) -> &str {
        "song"
    }

    fn process(&self, loader: &mut Loader<'_>, path: &Path) -> EtlResult<()> {
        let record = read_song_file(path)?;
        let (song, artist) = transform(record);

        loader.insert_song(&song)?;
        loader.insert_artist(&artist)?;

        debug!("Loaded song {} by artist {}", song.song_id, artist.artist_id);
        Ok(())
    }
}

/// Reads the single record a song file holds. Trailing records are ignored.
pub fn read_song_file(path: &Path) -> EtlResult<SongFile> {
    let mut reader = JsonlReader::<SongFile>::open(path)?;
    let (_, record) = reader.next().ok_or_else(|| EtlError::EmptyFile {
        path: path.to_path_buf(),
    })??;

    if let Some(extra) = reader.next() {
        let (line, _) = extra?;
        warn!(
            "{} holds more than one song record, ignoring line {} onwards",
            path.display(),
            line
        );
    }
    Ok(record)
}

/// Splits a song file into its song and artist rows.
pub fn transform(record: SongFile) -> (SongRecord, ArtistRecord) {
    let song = SongRecord {
        song_id: record.song_id,
        title: record.title,
        artist_id: record.artist_id.clone(),
        year: record.year.filter(|year| *year != 0),
        duration: record.duration,
    };

    let artist = ArtistRecord {
        artist_id: record.artist_id,
        name: record.artist_name,
        location: record.artist_location,
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    };

    (song, artist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::fs;
    use tempfile::tempdir;

    const SONG_JSON: &str = r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#;

    fn parse(json: &str) -> SongFile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_zero_year_becomes_none() {
        let (song, _) = transform(parse(SONG_JSON));
        assert_eq!(song.year, None);
        assert_eq!(song.duration, 218.93179);
    }

    #[test]
    fn test_real_year_is_kept() {
        let json = SONG_JSON.replace(r#""year": 0"#, r#""year": 1994"#);
        let (song, _) = transform(parse(&json));
        assert_eq!(song.year, Some(1994));
    }

    #[test]
    fn test_artist_blanks_and_nulls_become_none() {
        let json = SONG_JSON.replace(
            r#""artist_location": "California - LA""#,
            r#""artist_location": """#,
        );
        let (_, artist) = transform(parse(&json));
        assert_eq!(
            artist,
            ArtistRecord {
                artist_id: "ARD7TVE1187B99BFB1".to_string(),
                name: Some("Casual".to_string()),
                location: None,
                latitude: None,
                longitude: None,
            }
        );
    }

    #[test]
    fn test_artist_coordinates_are_kept() {
        let json = SONG_JSON
            .replace(r#""artist_latitude": null"#, r#""artist_latitude": 35.14968"#)
            .replace(r#""artist_longitude": null"#, r#""artist_longitude": -90.04892"#);
        let (_, artist) = transform(parse(&json));
        assert_eq!(artist.latitude, Some(35.14968));
        assert_eq!(artist.longitude, Some(-90.04892));
    }

    #[test]
    fn test_missing_required_column_fails() {
        let json = SONG_JSON.replace(r#""song_id": "SOMZWCG12A8C13C480", "#, "");
        assert!(serde_json::from_str::<SongFile>(&json).is_err());
    }

    #[test]
    fn test_process_inserts_song_then_artist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("TRAAAAW128F429D538.json");
        fs::write(&path, SONG_JSON).unwrap();

        let db = Database::open_in_memory().unwrap();
        let mut loader = Loader::new(db.connection());
        SongFileProcessor.process(&mut loader, &path).unwrap();

        assert_eq!(loader.counts().songs, 1);
        assert_eq!(loader.counts().artists, 1);
        let location: Option<String> = db
            .connection()
            .query_row("SELECT location FROM artists", [], |row| row.get(0))
            .unwrap();
        assert_eq!(location.as_deref(), Some("California - LA"));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "\n").unwrap();

        let err = read_song_file(&path).unwrap_err();
        assert!(matches!(err, EtlError::EmptyFile { .. }));
    }
}
