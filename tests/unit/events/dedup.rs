use chrono::TimeZone;
use proptest::prelude::*;

use super::*;

fn ev(t: i64, x: i64, y: i64, c: &str) -> PlacementEvent {
    PlacementEvent::new(Utc.timestamp_opt(t, 0).unwrap(), x, y, c)
}

#[test]
fn keeps_latest_event_per_cell() {
    let events = vec![ev(1, 0, 0, "a"), ev(3, 0, 0, "b"), ev(2, 1, 0, "c")];
    let out = latest_per_cell(&events);
    assert_eq!(out, vec![ev(3, 0, 0, "b"), ev(2, 1, 0, "c")]);
}

#[test]
fn ties_keep_first_in_input_order() {
    let mut events = vec![ev(5, 2, 2, "first"), ev(5, 2, 2, "second"), ev(4, 2, 2, "old")];
    retain_latest_per_cell(&mut events);
    assert_eq!(events, vec![ev(5, 2, 2, "first")]);
}

#[test]
fn survivors_keep_relative_order() {
    let mut events = vec![
        ev(1, 9, 9, "x"),
        ev(2, 0, 0, "y"),
        ev(3, 9, 9, "z"),
        ev(1, 5, 5, "w"),
    ];
    retain_latest_per_cell(&mut events);
    let textures: Vec<_> = events.iter().map(|e| e.texture.as_str()).collect();
    assert_eq!(textures, vec!["y", "z", "w"]);
}

#[test]
fn empty_input_is_untouched() {
    let mut events = Vec::new();
    retain_latest_per_cell(&mut events);
    assert!(events.is_empty());
}

proptest! {
    #[test]
    fn dedup_is_idempotent_and_one_per_cell(
        raw in prop::collection::vec((0i64..20, 0i64..4, 0i64..4, 0u8..3), 0..64)
    ) {
        let events: Vec<_> = raw
            .iter()
            .map(|(t, x, y, c)| ev(*t, *x, *y, &format!("t{c}")))
            .collect();

        let once = latest_per_cell(&events);
        let twice = latest_per_cell(&once);
        prop_assert_eq!(&once, &twice);

        let cells: HashSet<_> = events.iter().map(PlacementEvent::cell).collect();
        prop_assert_eq!(once.len(), cells.len());

        for survivor in &once {
            let max = events
                .iter()
                .filter(|e| e.cell() == survivor.cell())
                .map(|e| e.timestamp)
                .max()
                .unwrap();
            prop_assert_eq!(survivor.timestamp, max);
        }
    }
}
