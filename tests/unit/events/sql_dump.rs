use std::io::Cursor;

use super::*;

const DUMP: &str = "\
-- exported from clickhouse
CREATE TABLE default.PB (timestamp DateTime64(6), x Int64, y Int64, c String) ENGINE = MergeTree;
INSERT INTO default.PB (timestamp, x, y, c) VALUES ('2025-03-27T23:27:48.858300', 382, 149, 'RED_CONCRETE');
INSERT INTO default.PB (timestamp, x, y, c) VALUES ('2025-03-27T23:27:47.000000', 1, 2, 'Stone');

insert into default.PB (timestamp, x, y, c) values ('2025-03-27T23:27:49.5', -4, 0, 'lime_wool'), ('2025-03-27T23:27:50', 5, 6, 'dirt');
INSERT INTO default.PB (timestamp, x, y, c) VALUES ('not a time', 1, 1, 'dirt');
INSERT INTO default.PB (timestamp, x, y, c) VALUES ('2025-03-27T23:27:51', 1, 'stone');
";

#[test]
fn parses_single_and_multi_tuple_inserts() {
    let src = SqlDumpSource::from_reader(Cursor::new(DUMP)).unwrap();
    let textures: Vec<_> = src.events().iter().map(|e| e.texture.as_str()).collect();
    // Sorted by timestamp, ids lower-cased.
    assert_eq!(textures, vec!["stone", "red_concrete", "lime_wool", "dirt"]);

    let red = &src.events()[1];
    assert_eq!((red.x, red.y), (382, 149));
    let lime = &src.events()[2];
    assert_eq!((lime.x, lime.y), (-4, 0));
}

#[test]
fn malformed_rows_are_skipped_and_counted() {
    let src = SqlDumpSource::from_reader(Cursor::new(DUMP)).unwrap();
    assert_eq!(src.skipped(), 2);
    assert_eq!(src.events().len(), 4);
}

#[test]
fn quoted_commas_and_parens_stay_inside_fields() {
    let tuples = split_tuples(" ('a,b', 1), ('(c)', 2);");
    assert_eq!(tuples, vec!["'a,b', 1", "'(c)', 2"]);
    assert_eq!(split_fields("'a,b', 1"), vec!["a,b".to_string(), "1".to_string()]);
}

#[test]
fn non_insert_lines_are_ignored() {
    assert!(insert_values("SELECT 1").is_none());
    assert!(insert_values("ins").is_none());
    assert_eq!(insert_values("INSERT INTO t VALUES (1)"), Some(" (1)"));
}

#[test]
fn open_reports_missing_file() {
    let err = SqlDumpSource::open("definitely/not/here.sql").unwrap_err();
    assert!(err.to_string().contains("open sql dump"));
}
