use chrono::{Datelike, TimeZone, Timelike};

use super::*;

#[test]
fn parses_dump_and_database_timestamp_forms() {
    let dump = parse_timestamp("2025-03-27T23:27:48.858300").unwrap();
    assert_eq!(dump.hour(), 23);
    assert_eq!(dump.nanosecond(), 858_300_000);

    let tsv = parse_timestamp("2025-03-27 23:27:48.858300").unwrap();
    assert_eq!(tsv, dump);

    let with_offset = parse_timestamp("2025-03-27T23:27:48.858300+03:00").unwrap();
    assert_eq!(with_offset.hour(), 20);
    assert_eq!(with_offset.day(), 27);

    assert!(parse_timestamp("yesterday").is_err());
}

#[test]
fn new_lowercases_texture_and_exposes_cell() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let ev = PlacementEvent::new(ts, 3, -2, " RED_CONCRETE ");
    assert_eq!(ev.texture, "red_concrete");
    assert_eq!(ev.cell(), Cell { x: 3, y: -2 });
}

#[test]
fn serde_uses_short_field_names() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let ev = PlacementEvent::new(ts, 1, 2, "stone");
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["c"], "stone");
    assert!(json.get("timestamp").is_some());
    let back: PlacementEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, ev);
}
