use std::time::Duration;

use crate::events::model::{PlacementEvent, parse_timestamp};
use crate::events::source::EventSource;
use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Table the placement plugin writes to.
pub const PLACEMENT_TABLE: &str = "PB";

/// Connection settings for [`ClickHouseSource`].
#[derive(Clone, Debug)]
pub struct ClickHouseConfig {
    /// `host:port` of the ClickHouse HTTP interface, or a full `http(s)://` URL.
    pub address: String,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClickHouseConfig {
    fn base_url(&self) -> String {
        let addr = self.address.trim_end_matches('/');
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }
}

/// Event source reading the placement table over the ClickHouse HTTP interface.
pub struct ClickHouseSource {
    cfg: ClickHouseConfig,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ClickHouseSource {
    /// Build a client and check connectivity with a trivial query.
    pub fn connect(cfg: ClickHouseConfig) -> TimelapseResult<Self> {
        if cfg.address.trim().is_empty() {
            return Err(TimelapseError::validation(
                "database address must be non-empty",
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| TimelapseError::data_source(format!("build http client: {e}")))?;
        let base_url = cfg.base_url();
        let source = Self {
            cfg,
            base_url,
            client,
        };
        source.query("SELECT 1 FORMAT TabSeparated")?;
        tracing::info!(url = %source.base_url, database = %source.cfg.database, "connected to clickhouse");
        Ok(source)
    }

    fn query(&self, sql: &str) -> TimelapseResult<String> {
        let resp = self
            .client
            .post(&self.base_url)
            .header("X-ClickHouse-User", &self.cfg.user)
            .header("X-ClickHouse-Key", &self.cfg.password)
            .header("X-ClickHouse-Database", &self.cfg.database)
            .body(sql.to_string())
            .send()
            .map_err(|e| TimelapseError::data_source(format!("clickhouse request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| TimelapseError::data_source(format!("read clickhouse response: {e}")))?;
        if !status.is_success() {
            return Err(TimelapseError::data_source(format!(
                "clickhouse returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        Ok(body)
    }
}

impl EventSource for ClickHouseSource {
    fn total(&mut self) -> TimelapseResult<u64> {
        let body = self.query(&format!(
            "SELECT count() FROM {PLACEMENT_TABLE} FORMAT TabSeparated"
        ))?;
        body.trim().parse().map_err(|e| {
            TimelapseError::data_source(format!("invalid row count '{}': {e}", body.trim()))
        })
    }

    fn page(&mut self, offset: u64, limit: usize) -> TimelapseResult<Vec<PlacementEvent>> {
        let body = self.query(&format!(
            "SELECT timestamp, x, y, c FROM {PLACEMENT_TABLE} ORDER BY timestamp \
             LIMIT {limit} OFFSET {offset} FORMAT TabSeparated"
        ))?;
        parse_tsv_rows(&body)
    }
}

fn parse_tsv_rows(body: &str) -> TimelapseResult<Vec<PlacementEvent>> {
    body.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            let [ts, x, y, c] = cols.as_slice() else {
                return Err(TimelapseError::data_source(format!(
                    "expected 4 columns, got {}: '{line}'",
                    cols.len()
                )));
            };
            let x = x
                .parse()
                .map_err(|e| TimelapseError::data_source(format!("invalid x '{x}': {e}")))?;
            let y = y
                .parse()
                .map_err(|e| TimelapseError::data_source(format!("invalid y '{y}': {e}")))?;
            Ok(PlacementEvent::new(parse_timestamp(ts)?, x, y, c))
        })
        .collect()
}
