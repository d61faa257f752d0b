use std::io::Write;

use pitwall::kernel::snapshot::TelemetrySnapshot;
use pitwall::source::{ReplaySource, SessionInfo, TelemetrySource};
use pitwall::PitwallError;

const RECORDING: &str = r#"
# recorded at Sebring
{"track": "Sebring International Raceway", "car": "Mazda MX-5 Cup"}
{"lap": 1, "position": 7, "fuel_level": 10.5, "is_on_track": true}

{"lap": 1, "position": 6, "fuel_level": 10.2, "is_on_track": true, "gap_behind_sec": 0.9}
{"lap": 2, "position": 6, "fuel_level": 9.4, "is_on_track": true, "tire_wear": {"lf": 3.0, "rf": 4.0, "lr": 2.0, "rr": 2.5}}
"#;

#[test]
fn test_parse_recording_with_header() {
    let mut replay = ReplaySource::parse(RECORDING).unwrap();

    assert_eq!(replay.remaining(), 3);
    assert_eq!(
        replay.session_info(),
        SessionInfo {
            track: "Sebring International Raceway".to_string(),
            car: "Mazda MX-5 Cup".to_string(),
        }
    );

    assert!(replay.connect());
    let first = replay.snapshot().unwrap();
    assert_eq!(first.position, 7);
    assert_eq!(first.gap_behind_sec, None);
    let second = replay.snapshot().unwrap();
    assert_eq!(second.gap_behind_sec, Some(0.9));
    let third = replay.snapshot().unwrap();
    assert_eq!(third.tire_wear.rf, 4.0);
    assert_eq!(third.session_flags, 0);

    // Exhausted: looks like a lost source and refuses to reconnect.
    assert!(replay.snapshot().is_none());
    assert!(!replay.is_connected());
    assert!(!replay.connect());
}

#[test]
fn test_no_snapshots_before_connect() {
    let mut replay = ReplaySource::from_snapshots(vec![TelemetrySnapshot::default()]);
    assert!(replay.snapshot().is_none());
    assert_eq!(replay.session_info(), SessionInfo::default());

    assert!(replay.connect());
    assert!(replay.snapshot().is_some());
}

#[test]
fn test_bad_line_reports_line_number() {
    let text = "{\"lap\": 1}\n{\"lap\": \"two\"}\n";
    match ReplaySource::parse(text) {
        Err(PitwallError::ReplayParse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {:?}", other.map(|r| r.remaining())),
    }
}

#[test]
fn test_open_file_and_missing_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RECORDING.as_bytes()).unwrap();

    let replay = ReplaySource::open(file.path()).unwrap();
    assert_eq!(replay.remaining(), 3);
    assert_eq!(replay.origin(), Some(file.path()));

    let missing = file.path().with_extension("gone");
    assert!(matches!(ReplaySource::open(&missing), Err(PitwallError::Replay { .. })));
}
