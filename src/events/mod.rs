//! Placement events and the sources that produce them.

/// ClickHouse-backed source (HTTP interface).
#[cfg(feature = "clickhouse")]
pub mod clickhouse;
/// Latest-per-cell deduplication for still images.
pub mod dedup;
/// Event and cell types.
pub mod model;
/// Paging source trait, collection loop and in-memory source.
pub mod source;
/// Local SQL dump source.
pub mod sql_dump;
