use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::FileProcessor;
use crate::db::Loader;
use crate::error::{EtlError, EtlResult};
use crate::io::read_all;
use crate::records::{LogEvent, SongMatch, SongplayRecord, TimeRecord, UserRecord};

/// Loads the `time`, `users` and `songplays` tables from activity logs.
pub struct LogFileProcessor;

impl FileProcessor for LogFileProcessor {
    fn name(&self) -> &str {
        "log"
    }

    fn process(&self, loader: &mut Loader<'_>, path: &Path) -> EtlResult<()> {
        let events: Vec<(usize, LogEvent)> = read_all(path)?;
        let total = events.len();
        let plays = next_song_events(path, events)?;
        debug!(
            "{}: {} of {} events are song plays",
            path.display(),
            plays.len(),
            total
        );

        for play in &plays {
            loader.insert_time(&play.time)?;
        }

        for play in &plays {
            loader.insert_user(&user_record(&play.event))?;
        }

        for play in &plays {
            let song = match (&play.event.song, &play.event.artist, play.event.length) {
                (Some(title), Some(artist), Some(length)) => {
                    loader.find_song(title, artist, length)?
                }
                _ => None,
            };
            loader.insert_songplay(&songplay_record(&play.event, play.time.start_time, song))?;
        }

        Ok(())
    }
}

/// A retained event with its derived time row.
#[derive(Debug, Clone)]
pub struct SongPlay {
    pub event: LogEvent,
    pub time: TimeRecord,
}

/// Keeps `NextSong` events, in file order, and derives their time rows.
/// A retained event without a timestamp fails the file.
pub fn next_song_events(path: &Path, events: Vec<(usize, LogEvent)>) -> EtlResult<Vec<SongPlay>> {
    events
        .into_iter()
        .filter(|(_, event)| event.is_next_song())
        .map(|(line, event)| {
            let ts = event.ts.ok_or_else(|| missing_ts(path, line))?;
            Ok(SongPlay {
                time: time_record(ts)?,
                event,
            })
        })
        .collect()
}

fn missing_ts(path: &Path, line: usize) -> EtlError {
    EtlError::MissingField {
        path: PathBuf::from(path),
        line,
        field: "ts",
    }
}

/// Calendar breakdown of an epoch-millisecond timestamp, in UTC.
/// Week is the ISO week; weekday counts from Monday = 0.
pub fn time_record(ts: i64) -> EtlResult<TimeRecord> {
    let start_time: NaiveDateTime = DateTime::from_timestamp_millis(ts)
        .ok_or(EtlError::InvalidTimestamp { ts })?
        .naive_utc();

    Ok(TimeRecord {
        start_time,
        hour: start_time.hour(),
        day: start_time.day(),
        week: start_time.iso_week().week(),
        month: start_time.month(),
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_monday(),
    })
}

pub fn user_record(event: &LogEvent) -> UserRecord {
    UserRecord {
        user_id: event.user_id,
        first_name: event.first_name.clone(),
        last_name: event.last_name.clone(),
        gender: event.gender.clone(),
        level: event.level.clone(),
    }
}

pub fn songplay_record(
    event: &LogEvent,
    start_time: NaiveDateTime,
    song: Option<SongMatch>,
) -> SongplayRecord {
    SongplayRecord {
        start_time,
        user_id: event.user_id,
        level: event.level.clone(),
        song,
        session_id: event.session_id,
        location: event.location.clone(),
        user_agent: event.user_agent.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::records::{ArtistRecord, SongRecord};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn event_json(page: &str, ts: i64, user_id: &str, song: &str) -> String {
        format!(
            r#"{{"artist":"Casual","auth":"Logged In","firstName":"Ryan","gender":"M","itemInSession":0,"lastName":"Smith","length":218.93179,"level":"free","location":"San Jose-Sunnyvale-Santa Clara, CA","method":"PUT","page":"{page}","registration":1541016707796.0,"sessionId":583,"song":"{song}","status":200,"ts":{ts},"userAgent":"Mozilla\/5.0","userId":"{user_id}"}}"#
        )
    }

    fn parse(json: &str) -> LogEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_time_record_golden_value() {
        let time = time_record(1541990258796).unwrap();
        assert_eq!(
            time,
            TimeRecord {
                start_time: NaiveDate::from_ymd_opt(2018, 11, 12)
                    .unwrap()
                    .and_hms_milli_opt(2, 37, 38, 796)
                    .unwrap(),
                hour: 2,
                day: 12,
                week: 46,
                month: 11,
                year: 2018,
                weekday: 0,
            }
        );
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        // 2018-12-31 is a Monday in ISO week 1 of 2019.
        let time = time_record(1546214400000).unwrap();
        assert_eq!((time.year, time.month, time.day), (2018, 12, 31));
        assert_eq!(time.week, 1);
        assert_eq!(time.weekday, 0);
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert!(matches!(
            time_record(i64::MAX),
            Err(EtlError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_only_next_song_events_are_kept() {
        let path = Path::new("events.json");
        let events = vec![
            (1, parse(&event_json("NextSong", 1541990258796, "26", "A"))),
            (2, parse(&event_json("Home", 1541990258797, "26", "B"))),
            (3, parse(&event_json("NextSong", 1541990258798, "27", "C"))),
        ];

        let plays = next_song_events(path, events).unwrap();
        let songs: Vec<_> = plays
            .iter()
            .map(|p| p.event.song.clone().unwrap())
            .collect();
        assert_eq!(songs, vec!["A", "C"]);
    }

    #[test]
    fn test_retained_event_without_ts_fails() {
        let path = Path::new("events.json");
        let mut event = parse(&event_json("NextSong", 1, "26", "A"));
        event.ts = None;
        let mut ignored = parse(&event_json("Home", 1, "26", "A"));
        ignored.ts = None;

        let err = next_song_events(path, vec![(1, ignored.clone()), (2, event)]).unwrap_err();
        assert!(matches!(err, EtlError::MissingField { line: 2, field: "ts", .. }));
        assert!(next_song_events(path, vec![(1, ignored)]).unwrap().is_empty());
    }

    #[test]
    fn test_logged_out_event_has_no_user_id() {
        let event = parse(&event_json("Home", 1541990258796, "", ""));
        let user = user_record(&event);
        assert_eq!(user.user_id, None);
        assert_eq!(event.song, None);
    }

    #[test]
    fn test_songplay_keys_are_both_or_neither() {
        let event = parse(&event_json("NextSong", 1541990258796, "26", "A"));
        let start_time = time_record(1541990258796).unwrap().start_time;

        let unmatched = songplay_record(&event, start_time, None);
        assert_eq!((unmatched.song_id(), unmatched.artist_id()), (None, None));

        let matched = songplay_record(
            &event,
            start_time,
            Some(SongMatch {
                song_id: "S1".to_string(),
                artist_id: "A1".to_string(),
            }),
        );
        assert_eq!((matched.song_id(), matched.artist_id()), (Some("S1"), Some("A1")));
        assert_eq!(matched.user_id, Some(26));
        assert_eq!(matched.session_id, Some(583));
    }

    #[test]
    fn test_process_resolves_known_songs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2018-11-12-events.json");
        let lines = [
            event_json("NextSong", 1541990258796, "26", "I Didn't Mean To"),
            event_json("Logout", 1541990258797, "26", ""),
            event_json("NextSong", 1541990258798, "26", "Unknown Song"),
        ];
        fs::write(&path, lines.join("\n")).unwrap();

        let db = Database::open_in_memory().unwrap();
        let mut loader = Loader::new(db.connection());
        loader
            .insert_song(&SongRecord {
                song_id: "SOMZWCG12A8C13C480".to_string(),
                title: "I Didn't Mean To".to_string(),
                artist_id: "ARD7TVE1187B99BFB1".to_string(),
                year: None,
                duration: 218.93179,
            })
            .unwrap();
        loader
            .insert_artist(&ArtistRecord {
                artist_id: "ARD7TVE1187B99BFB1".to_string(),
                name: Some("Casual".to_string()),
                location: None,
                latitude: None,
                longitude: None,
            })
            .unwrap();

        LogFileProcessor.process(&mut loader, &path).unwrap();

        let counts = loader.counts();
        assert_eq!((counts.time, counts.users, counts.songplays), (2, 2, 2));

        let mut stmt = db
            .connection()
            .prepare("SELECT song_id, artist_id FROM songplays ORDER BY songplay_id")
            .unwrap();
        let rows: Vec<(Option<String>, Option<String>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                (
                    Some("SOMZWCG12A8C13C480".to_string()),
                    Some("ARD7TVE1187B99BFB1".to_string())
                ),
                (None, None),
            ]
        );
    }

    #[test]
    fn test_malformed_line_fails_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let good = event_json("NextSong", 1541990258796, "26", "A");
        fs::write(&path, format!("{good}\n{{not json\n")).unwrap();

        let db = Database::open_in_memory().unwrap();
        let mut loader = Loader::new(db.connection());
        let err = LogFileProcessor.process(&mut loader, &path).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 2, .. }));
        assert_eq!(loader.counts().total(), 0);
    }
}
