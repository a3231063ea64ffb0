//! Unit tests for the directory-backed event store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use logtail_types::{Event, Query, Severity};
use tempfile::TempDir;

use crate::{EventStore, LogRepository};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn event(uuid: &str, service: &str, minute: i64) -> Event {
    let mut event = Event::new(service, Severity::Info, format!("event {uuid}"))
        .with_timestamp(base_time() + Duration::minutes(minute));
    event.uuid = uuid.to_string();
    event
}

/// Creates a repository pre-loaded with `u1..u5` for `lighting`.
fn seeded() -> (TempDir, LogRepository) {
    let dir = TempDir::new().expect("should create temp dir");
    let repo = LogRepository::new(dir.path());
    for i in 1..=5 {
        repo.append(&event(&format!("u{i}"), "lighting", i))
            .expect("append should succeed");
    }
    (dir, repo)
}

fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .collect();
    files.sort();
    files
}

fn uuids(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.uuid.as_str()).collect()
}

// ── find ─────────────────────────────────────────────────────────────

#[test]
fn find_returns_oldest_first_by_default() {
    let (_dir, repo) = seeded();
    let events = repo.find(&Query::default()).unwrap();
    assert_eq!(uuids(&events), ["u1", "u2", "u3", "u4", "u5"]);
}

#[test]
fn find_reverse_returns_newest_first() {
    let (_dir, repo) = seeded();
    let query = Query {
        reverse: true,
        ..Default::default()
    };
    let events = repo.find(&query).unwrap();
    assert_eq!(uuids(&events), ["u5", "u4", "u3", "u2", "u1"]);
}

#[test]
fn find_returns_events_strictly_after_cursor() {
    let (_dir, repo) = seeded();
    let query = Query {
        since_uuid: Some("u3".to_string()),
        ..Default::default()
    };
    assert_eq!(uuids(&repo.find(&query).unwrap()), ["u4", "u5"]);

    let query = Query {
        since_uuid: Some("u5".to_string()),
        ..Default::default()
    };
    assert!(repo.find(&query).unwrap().is_empty());
}

#[test]
fn find_ignores_unknown_cursor() {
    let (_dir, repo) = seeded();
    let query = Query {
        since_uuid: Some("rotated-away".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.find(&query).unwrap().len(), 5);
}

#[test]
fn find_is_idempotent() {
    let (_dir, repo) = seeded();
    let query = Query {
        since_uuid: Some("u2".to_string()),
        ..Default::default()
    };
    let first = repo.find(&query).unwrap();
    let second = repo.find(&query).unwrap();
    assert_eq!(first, second);
}

#[test]
fn find_applies_filters_after_cursor() {
    let (_dir, repo) = seeded();
    repo.append(&event("u6", "heating", 6)).unwrap();
    repo.append(&event("u7", "lighting", 7)).unwrap();

    let query = Query {
        services: vec!["lighting".to_string()],
        since_uuid: Some("u5".to_string()),
        ..Default::default()
    };
    assert_eq!(uuids(&repo.find(&query).unwrap()), ["u7"]);
}

#[test]
fn find_applies_time_bounds() {
    let (_dir, repo) = seeded();
    let query = Query {
        since_time: Some(base_time() + Duration::minutes(2)),
        until_time: Some(base_time() + Duration::minutes(4)),
        ..Default::default()
    };
    assert_eq!(uuids(&repo.find(&query).unwrap()), ["u2", "u3"]);
}

#[test]
fn find_reads_files_in_name_order() {
    let dir = TempDir::new().unwrap();
    let repo = LogRepository::new(dir.path());

    let line = |e: &Event| format!("{}\n", serde_json::to_string(e).unwrap());
    fs::write(dir.path().join("2024-03-02.log"), line(&event("b", "lighting", 0))).unwrap();
    fs::write(dir.path().join("2024-03-01.log"), line(&event("a", "lighting", 0))).unwrap();

    assert_eq!(uuids(&repo.find(&Query::default()).unwrap()), ["a", "b"]);
}

#[test]
fn backdated_append_is_still_after_cursor() {
    let dir = TempDir::new().unwrap();
    let repo = LogRepository::new(dir.path());

    let first = Event::new("lighting", Severity::Info, "first");
    repo.append(&first).unwrap();
    let late = Event::new("lighting", Severity::Info, "late")
        .with_timestamp(Utc::now() - Duration::days(2));
    repo.append(&late).unwrap();

    let query = Query {
        since_uuid: Some(first.uuid.clone()),
        ..Default::default()
    };
    assert_eq!(uuids(&repo.find(&query).unwrap()), [late.uuid.as_str()]);
    assert_eq!(repo.last_uuid().unwrap(), Some(late.uuid));
}

#[test]
fn find_skips_unparseable_lines_and_other_files() {
    let (dir, repo) = seeded();
    let path = log_files(dir.path()).pop().expect("seeding writes a log file");
    let mut contents = fs::read_to_string(&path).unwrap();
    contents.push_str("{\"uuid\": \"torn");
    fs::write(&path, contents).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a log file\n").unwrap();

    assert_eq!(repo.find(&Query::default()).unwrap().len(), 5);
}

#[test]
fn find_on_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let repo = LogRepository::new(dir.path().join("does-not-exist"));
    assert!(repo.find(&Query::default()).unwrap().is_empty());
    assert_eq!(repo.last_uuid().unwrap(), None);
}

// ── last_uuid / append ───────────────────────────────────────────────

#[test]
fn last_uuid_ignores_filters() {
    let (_dir, repo) = seeded();
    repo.append(&event("u6", "heating", 6)).unwrap();
    assert_eq!(repo.last_uuid().unwrap().as_deref(), Some("u6"));
}

#[test]
fn append_creates_directory_and_dated_file() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("logs");
    let repo = LogRepository::new(&nested);

    let before = Utc::now().format("%Y-%m-%d.log").to_string();
    repo.append(&event("u1", "lighting", 0)).unwrap();
    let after = Utc::now().format("%Y-%m-%d.log").to_string();

    // Dated by the write, not by the event's 2024 timestamp.
    let files = log_files(&nested);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name == before || name == after, "unexpected file {name}");

    let written = fs::read_to_string(&files[0]).unwrap();
    assert_eq!(written.lines().count(), 1);
    assert!(written.ends_with('\n'));
}
