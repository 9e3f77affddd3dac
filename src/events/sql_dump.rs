use std::io::BufRead;
use std::path::Path;

use anyhow::Context as _;

use crate::events::model::{PlacementEvent, parse_timestamp};
use crate::events::source::{EventSource, MemorySource};
use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Event source loaded from a local SQL dump.
///
/// Each relevant line is an `INSERT INTO <table> (timestamp, x, y, c) VALUES (...)` statement
/// with one or more value tuples. Other lines (DDL, comments, blanks) are ignored. Tuples that
/// do not parse are logged and skipped.
#[derive(Clone, Debug)]
pub struct SqlDumpSource {
    inner: MemorySource,
    skipped: usize,
}

impl SqlDumpSource {
    /// Read and parse the dump at `path`.
    pub fn open(path: impl AsRef<Path>) -> TimelapseResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("open sql dump '{}'", path.display()))?;
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "loading {} ({:.2} MB)",
            path.display(),
            len as f64 / (1024.0 * 1024.0)
        );
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse a dump from any buffered reader.
    pub fn from_reader(reader: impl BufRead) -> TimelapseResult<Self> {
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.context("read sql dump line")?;
            let Some(values) = insert_values(&line) else {
                continue;
            };
            for tuple in split_tuples(values) {
                match parse_tuple(tuple) {
                    Ok(ev) => events.push(ev),
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!("skipping row on line {}: {e}", line_no + 1);
                    }
                }
            }
        }

        tracing::info!(
            loaded = events.len(),
            skipped,
            "parsed placement events from sql dump"
        );
        Ok(Self {
            inner: MemorySource::new(events),
            skipped,
        })
    }

    /// Number of malformed tuples that were dropped.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Borrow the parsed events in timestamp order.
    pub fn events(&self) -> &[PlacementEvent] {
        self.inner.events()
    }
}

impl EventSource for SqlDumpSource {
    fn total(&mut self) -> TimelapseResult<u64> {
        self.inner.total()
    }

    fn page(&mut self, offset: u64, limit: usize) -> TimelapseResult<Vec<PlacementEvent>> {
        self.inner.page(offset, limit)
    }
}

/// Return the text after `VALUES` for `INSERT` statements.
fn insert_values(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if !trimmed
        .get(..6)
        .is_some_and(|p| p.eq_ignore_ascii_case("insert"))
    {
        return None;
    }
    let upper = trimmed.to_ascii_uppercase();
    let at = upper.find("VALUES")?;
    Some(&trimmed[at + "VALUES".len()..])
}

/// Split `(a, b), (c, d);` into the inner text of each parenthesized tuple.
fn split_tuples(values: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0usize;

    for (i, ch) in values.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' if !in_quote && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(&values[start..i]);
                }
            }
            _ => {}
        }
    }
    out
}

fn split_fields(tuple: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quote = false;
    for ch in tuple.chars() {
        match ch {
            '\'' => in_quote = !in_quote,
            ',' if !in_quote => fields.push(std::mem::take(&mut cur).trim().to_string()),
            _ => cur.push(ch),
        }
    }
    fields.push(cur.trim().to_string());
    fields
}

fn parse_tuple(tuple: &str) -> TimelapseResult<PlacementEvent> {
    let fields = split_fields(tuple);
    let [ts, x, y, c] = fields.as_slice() else {
        return Err(TimelapseError::data_source(format!(
            "expected 4 values (timestamp, x, y, c), got {}",
            fields.len()
        )));
    };

    let timestamp = parse_timestamp(ts)?;
    let x: i64 = x
        .parse()
        .map_err(|e| TimelapseError::data_source(format!("invalid x '{x}': {e}")))?;
    let y: i64 = y
        .parse()
        .map_err(|e| TimelapseError::data_source(format!("invalid y '{y}': {e}")))?;
    if c.is_empty() {
        return Err(TimelapseError::data_source("empty texture identifier"));
    }

    Ok(PlacementEvent::new(timestamp, x, y, c))
}

#[cfg(test)]
#[path = "../../tests/unit/events/sql_dump.rs"]
mod tests;
