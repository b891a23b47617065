use crate::error::Result;
use crate::schema::RawSalesLine;
use once_cell::sync::OnceCell;

#[cfg(feature = "remote")]
use crate::config::DashboardConfig;
#[cfg(feature = "remote")]
use crate::ingestion::{normalize_records, RawSalesRecord};
#[cfg(feature = "remote")]
use log::debug;

/// Where a snapshot of raw sales lines comes from. Report builders take the
/// lines themselves, so anything that can produce a snapshot (an HTTP API, a
/// fixture, a cache) plugs in here.
pub trait SnapshotSource {
    fn fetch_snapshot(&self) -> Result<Vec<RawSalesLine>>;
}

/// A source that serves a snapshot it was handed at construction.
#[derive(Debug, Clone)]
pub struct StaticSource {
    lines: Vec<RawSalesLine>,
}

impl StaticSource {
    pub fn new(lines: Vec<RawSalesLine>) -> Self {
        Self { lines }
    }
}

impl SnapshotSource for StaticSource {
    fn fetch_snapshot(&self) -> Result<Vec<RawSalesLine>> {
        Ok(self.lines.clone())
    }
}

/// Decorator that memoizes the first successful fetch of the inner source
/// for its own lifetime. Failed fetches are not cached, so a transient error
/// does not poison later attempts.
pub struct CachedSource<S> {
    inner: S,
    cache: OnceCell<Vec<RawSalesLine>>,
}

impl<S: SnapshotSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: OnceCell::new(),
        }
    }
}

impl<S: SnapshotSource> SnapshotSource for CachedSource<S> {
    fn fetch_snapshot(&self) -> Result<Vec<RawSalesLine>> {
        self.cache
            .get_or_try_init(|| self.inner.fetch_snapshot())
            .cloned()
    }
}

/// Fetches the snapshot from the sales API over HTTP.
#[cfg(feature = "remote")]
pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[cfg(feature = "remote")]
impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(config.resolved_base_url()?))
    }
}

#[cfg(feature = "remote")]
impl SnapshotSource for HttpSource {
    fn fetch_snapshot(&self) -> Result<Vec<RawSalesLine>> {
        let url = format!("{}/sales/details", self.base_url);
        debug!("Fetching snapshot from {}", url);

        let records: Vec<RawSalesRecord> = self
            .client
            .get(&url)
            .send()?
            .error_for_status()?
            .json()?;
        normalize_records(records)
    }
}
