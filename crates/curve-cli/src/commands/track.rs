//! Track command: the host event loop.
//!
//! Editor integrations pipe focus notifications into `curve track` as JSON
//! Lines. Each line is converted into a [`TrackerEvent`] and applied in
//! arrival order. End of input is the shutdown hook and triggers the final
//! flush.
//!
//! ```text
//! {"type":"focus_changed","file":"/src/main.rs"}
//! {"type":"window_activation","focused":false}
//! {"type":"window_activation","focused":true,"active_file":"/src/main.rs"}
//! {"type":"checkpoint"}
//! {"type":"teardown"}
//! ```
//!
//! Every line may carry `"at"` (epoch milliseconds) to replay recorded events;
//! otherwise the system clock is used.

use std::fs::File;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use curve_core::{
    AccumulatedTime, Clock, DurableStore, FileId, SystemClock, Timestamp, Tracker, TrackerEvent,
};
use fs2::FileExt;
use serde::Deserialize;

use crate::Config;

/// A line of host input.
///
/// Paths are kept as raw strings so an empty path means "no file" instead of
/// failing the whole line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostEvent {
    FocusChanged {
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        at: Option<i64>,
    },
    WindowActivation {
        focused: bool,
        #[serde(default)]
        active_file: Option<String>,
        #[serde(default)]
        at: Option<i64>,
    },
    Checkpoint {
        #[serde(default)]
        at: Option<i64>,
    },
    Teardown {
        #[serde(default)]
        at: Option<i64>,
    },
}

impl HostEvent {
    fn into_tracker_event(self) -> (TrackerEvent, Option<Timestamp>) {
        let (event, at) = match self {
            Self::FocusChanged { file, at } => (
                TrackerEvent::FocusChanged {
                    file: FileId::from_host(file.as_deref()),
                },
                at,
            ),
            Self::WindowActivation {
                focused,
                active_file,
                at,
            } => (
                TrackerEvent::WindowActivation {
                    focused,
                    active_file: FileId::from_host(active_file.as_deref()),
                },
                at,
            ),
            Self::Checkpoint { at } => (TrackerEvent::Checkpoint, at),
            Self::Teardown { at } => (TrackerEvent::Teardown, at),
        };
        (event, at.map(Timestamp::from_millis))
    }
}

/// What a tracking run did.
#[derive(Debug)]
pub struct TrackSummary {
    pub applied: usize,
    pub skipped: usize,
    pub totals: AccumulatedTime,
}

/// Runs the track command against the configured database, reading stdin.
pub fn run(config: &Config, active: Option<&str>) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    // One tracker per store: a second writer would overwrite with its own totals.
    let lock_path = config.lock_path();
    let lock_file = File::create(&lock_path)
        .with_context(|| format!("failed to create lock file {}", lock_path.display()))?;
    lock_file
        .try_lock_exclusive()
        .context("another `curve track` is already running for this database")?;

    let db = curve_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let stdin = std::io::stdin();
    let summary = track_events(stdin.lock(), Box::new(db), Box::new(SystemClock), active)?;

    let mut stderr = std::io::stderr();
    writeln!(
        stderr,
        "Tracked {} events ({} skipped), {} files recorded",
        summary.applied,
        summary.skipped,
        summary.totals.len()
    )?;

    Ok(())
}

/// Feeds host events from `reader` through a tracker until teardown or end of input.
///
/// Unreadable or malformed lines are skipped, and a read error ends the input
/// early; the teardown flush runs on every path. Once a line carries `"at"`
/// the run is a replay: lines without `"at"` and the final teardown are
/// applied at the last replayed time, never at the wall clock.
pub fn track_events<R: BufRead>(
    mut reader: R,
    store: Box<dyn DurableStore>,
    clock: Box<dyn Clock>,
    active: Option<&str>,
) -> Result<TrackSummary> {
    let mut tracker = Tracker::start(store, clock, FileId::from_host(active));
    let mut applied = 0;
    let mut skipped = 0;
    let mut replay_at: Option<Timestamp> = None;
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => line_no += 1,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read event input, stopping");
                break;
            }
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            tracing::warn!(line = line_no, "skipping event line that is not valid UTF-8");
            skipped += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let host_event: HostEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(line = line_no, error = %err, "skipping malformed event");
                skipped += 1;
                continue;
            }
        };

        let (event, at) = host_event.into_tracker_event();
        if at.is_some() {
            replay_at = at;
        }
        tracing::debug!(?event, at = ?replay_at, "applying event");
        match replay_at {
            Some(at) => tracker.apply_at(event, at),
            None => tracker.apply(event),
        };
        applied += 1;

        if tracker.is_torn_down() {
            break;
        }
    }

    if !tracker.is_torn_down() {
        tracing::debug!(at = ?replay_at, "input closed, tearing down");
        match replay_at {
            Some(at) => tracker.apply_at(TrackerEvent::Teardown, at),
            None => tracker.apply(TrackerEvent::Teardown),
        };
    }

    Ok(TrackSummary {
        applied,
        skipped,
        totals: tracker.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use curve_core::{MemoryStore, RECORD_KEY, StoreError};
    use curve_db::Database;

    use super::*;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0)
        }
    }

    fn file(name: &str) -> FileId {
        FileId::new(name).unwrap()
    }

    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl DurableStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<AccumulatedTime>, StoreError> {
            self.0.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &AccumulatedTime) -> Result<(), StoreError> {
            self.0.borrow_mut().set(key, value)
        }
    }

    #[test]
    fn replays_timestamped_events() {
        let input = r#"
{"type":"focus_changed","file":"/p/x.ts","at":0}
{"type":"window_activation","focused":false,"at":1000}
{"type":"window_activation","focused":true,"active_file":"/p/x.ts","at":5000}
{"type":"focus_changed","file":"/p/y.ts","at":6000}
{"type":"teardown","at":6500}
"#;
        let summary = track_events(
            Cursor::new(input),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(0)),
            None,
        )
        .unwrap();

        assert_eq!(summary.applied, 5);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.totals.get(&file("/p/x.ts")), Some(2_000));
        assert_eq!(summary.totals.get(&file("/p/y.ts")), Some(500));
    }

    #[test]
    fn end_of_input_flushes_active_file() {
        let summary = track_events(
            Cursor::new(""),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(0)),
            Some("/p/a.ts"),
        )
        .unwrap();

        assert_eq!(summary.applied, 0);
        assert_eq!(summary.totals.get(&file("/p/a.ts")), Some(0));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let input = "not json\n{\"type\":\"bogus\"}\n{\"type\":\"focus_changed\",\"file\":\"a.ts\",\"at\":10}\n";
        let summary = track_events(
            Cursor::new(input),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(40)),
            None,
        )
        .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.totals.get(&file("a.ts")), Some(0));
    }

    #[test]
    fn empty_path_means_no_file() {
        let input = r#"
{"type":"focus_changed","file":"a.ts","at":0}
{"type":"focus_changed","file":"","at":100}
{"type":"teardown","at":900}
"#;
        let summary = track_events(
            Cursor::new(input),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(0)),
            None,
        )
        .unwrap();

        assert_eq!(summary.totals.get(&file("a.ts")), Some(100));
        assert_eq!(summary.totals.len(), 1);
    }

    #[test]
    fn events_after_teardown_are_not_read() {
        let input = r#"
{"type":"focus_changed","file":"a.ts","at":0}
{"type":"teardown","at":100}
{"type":"focus_changed","file":"b.ts","at":200}
"#;
        let summary = track_events(
            Cursor::new(input),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(0)),
            None,
        )
        .unwrap();

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.totals.get(&file("b.ts")), None);
    }

    #[test]
    fn successive_runs_accumulate_in_database() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("curve.db");

        for _ in 0..2 {
            let db = Database::open(&path).unwrap();
            track_events(
                Cursor::new(
                    "{\"type\":\"focus_changed\",\"file\":\"a.ts\",\"at\":0}\n{\"type\":\"teardown\",\"at\":1500}\n",
                ),
                Box::new(db),
                Box::new(FixedClock(1_500)),
                None,
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let stored = db.get(RECORD_KEY).unwrap().unwrap();
        assert_eq!(stored.get(&file("a.ts")), Some(3_000));
    }

    #[test]
    fn invalid_utf8_line_is_skipped_and_session_still_flushed() {
        let mut input = br#"{"type":"focus_changed","file":"a.ts","at":0}"#.to_vec();
        input.push(b'\n');
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"type":"teardown","at":5000}"#);
        input.push(b'\n');

        let store = SharedStore::default();
        let summary = track_events(
            Cursor::new(input),
            Box::new(store.clone()),
            Box::new(FixedClock(0)),
            None,
        )
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.totals.get(&file("a.ts")), Some(5_000));
        let stored = store.get(RECORD_KEY).unwrap().unwrap();
        assert_eq!(stored.get(&file("a.ts")), Some(5_000));
    }

    #[test]
    fn read_error_still_tears_down() {
        struct FailingReader {
            inner: Cursor<&'static [u8]>,
        }

        impl std::io::Read for FailingReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                std::io::Read::read(&mut self.inner, buf)
            }
        }

        impl BufRead for FailingReader {
            fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
                let available = self.inner.fill_buf()?;
                if available.is_empty() {
                    return Err(std::io::Error::other("pipe closed"));
                }
                Ok(available)
            }

            fn consume(&mut self, amt: usize) {
                self.inner.consume(amt);
            }
        }

        let reader = FailingReader {
            inner: Cursor::new(
                &b"{\"type\":\"focus_changed\",\"file\":\"a.ts\",\"at\":100}\n{\"type\":\"checkpoint\",\"at\":400}\n"[..],
            ),
        };
        let summary = track_events(
            reader,
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(0)),
            None,
        )
        .unwrap();

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.totals.get(&file("a.ts")), Some(300));
    }

    #[test]
    fn end_of_replay_tears_down_at_last_replayed_time() {
        let input = r#"
{"type":"focus_changed","file":"a.ts","at":1000}
{"type":"focus_changed","file":"b.ts","at":2000}
"#;
        let summary = track_events(
            Cursor::new(input),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(1_700_000_000_000)),
            None,
        )
        .unwrap();

        assert_eq!(summary.totals.get(&file("a.ts")), Some(1_000));
        assert_eq!(summary.totals.get(&file("b.ts")), Some(0));
    }

    #[test]
    fn untimed_lines_in_replay_use_last_replayed_time() {
        let input = r#"
{"type":"focus_changed","file":"a.ts","at":1000}
{"type":"checkpoint"}
{"type":"focus_changed","file":"b.ts","at":1500}
{"type":"focus_changed","file":"c.ts"}
"#;
        let summary = track_events(
            Cursor::new(input),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock(1_700_000_000_000)),
            None,
        )
        .unwrap();

        assert_eq!(summary.totals.get(&file("a.ts")), Some(500));
        assert_eq!(summary.totals.get(&file("b.ts")), Some(0));
        assert_eq!(summary.totals.get(&file("c.ts")), Some(0));
        assert_eq!(summary.totals.total_ms(), 500);
    }
}
