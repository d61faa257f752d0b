use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;

use pitwall::kernel::event::{EventDetail, RaceEvent};
use pitwall::kernel::snapshot::TelemetrySnapshot;
use pitwall::kernel::strategy::StrategyState;
use pitwall::services::session_log::SessionLogger;

fn snapshot(lap: u32) -> TelemetrySnapshot {
    TelemetrySnapshot {
        lap,
        position: 6,
        fuel_level: 40.0,
        is_on_track: true,
        ..Default::default()
    }
}

#[test]
fn test_nothing_logged_outside_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = SessionLogger::new(dir.path());

    logger.log_telemetry(&snapshot(1), &StrategyState::default());
    logger.log_advisory("prompt", "response", 120.0, false);

    assert_eq!(logger.entry_count(), 0);
    assert_eq!(logger.end_session().unwrap(), None);
}

#[test]
fn test_session_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = SessionLogger::new(dir.path().join("sessions"));

    let id = logger.start_session("Spa-Francorchamps", "Porsche 911 GT3 R");
    assert_eq!(id.len(), 8);
    assert_eq!(logger.session_id(), Some(id.as_str()));

    logger.log_telemetry(&snapshot(3), &StrategyState::default());
    logger.log_events(&[RaceEvent::new(EventDetail::PitEntry, 12.0)]);
    logger.log_events(&[]);
    logger.log_advisory("Lap 3, P6", "Box box.", 0.0, true);
    assert_eq!(logger.entry_count(), 3);

    let path = logger.end_session().unwrap().expect("file written");
    assert!(path.starts_with(dir.path().join("sessions")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
    assert_eq!(logger.session_id(), None);

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["metadata"]["session_id"], id.as_str());
    assert_eq!(doc["metadata"]["track"], "Spa-Francorchamps");
    assert_eq!(doc["metadata"]["car"], "Porsche 911 GT3 R");

    let events = doc["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);

    assert_eq!(events[0]["event_type"], "telemetry");
    assert_eq!(events[0]["lap"], 3);
    assert_eq!(events[0]["data"]["snapshot"]["position"], 6);
    // Unmeasured fuel has no JSON number.
    assert!(events[0]["data"]["strategy"]["laps_of_fuel"].is_null());

    assert_eq!(events[1]["event_type"], "events");
    assert_eq!(events[1]["data"]["events"][0]["kind"], "PIT_ENTRY");

    assert_eq!(events[2]["event_type"], "advisory");
    assert_eq!(events[2]["lap"], 3);
    assert_eq!(events[2]["data"]["response"], "Box box.");
    assert_eq!(events[2]["data"]["fallback"], true);
}

#[test]
fn test_sessions_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = SessionLogger::new(dir.path());

    let first = logger.start_session("Monza", "Ferrari 296 GT3");
    let second = logger.start_session("Monza", "Ferrari 296 GT3");
    assert_ne!(first, second);
    assert_eq!(logger.session_id(), Some(second.as_str()));
}

#[test]
fn test_compressed_session_is_gzipped_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = SessionLogger::new(dir.path()).with_compression(true);

    logger.start_session("Monza", "BMW M4 GT3");
    logger.log_telemetry(&snapshot(7), &StrategyState::default());
    logger.log_advisory("Lap 7, P6", "Push now.", 640.0, false);

    let path = logger.end_session().unwrap().expect("file written");
    let name = path.file_name().and_then(|n| n.to_str()).unwrap();
    assert!(name.ends_with(".json.gz"), "unexpected file name {}", name);

    let mut text = String::new();
    GzDecoder::new(std::fs::File::open(&path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let doc: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["metadata"]["track"], "Monza");
    assert_eq!(doc["events"].as_array().unwrap().len(), 2);
    assert_eq!(doc["events"][1]["data"]["latency_ms"], 640.0);
}
