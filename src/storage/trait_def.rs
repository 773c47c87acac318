use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::analytics::{Dimension, LinkTotals, Scope};
use crate::models::{ClickEvent, Link, LinkFilter, LinkUpdate, NewClick, NewLink};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes).
    async fn init(&self) -> Result<()>;

    /// Insert a new link. The code must already be generated or validated;
    /// a concurrent claim of the same code surfaces as `Conflict`.
    async fn create_link(&self, link: &NewLink) -> StorageResult<Link>;

    /// Owner-agnostic lookup by code (the redirect path).
    async fn get_link_by_code(&self, code: &str) -> Result<Option<Link>>;

    /// Whether a code is currently assigned to any link.
    async fn code_exists(&self, code: &str) -> Result<bool>;

    /// Owner-scoped listing with filtering and substring search over the
    /// target URL and code. `now` evaluates the expired filter.
    async fn list_links(
        &self,
        owner: &str,
        filter: LinkFilter,
        search: Option<&str>,
        now: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>>;

    /// Owner-scoped mutation of target/active/expiry/visibility. Returns
    /// `None` when no link matches the code and owner. The code and the
    /// counters are never touched here.
    async fn update_link(
        &self,
        code: &str,
        owner: &str,
        changes: &LinkUpdate,
        now: i64,
    ) -> Result<Option<Link>>;

    /// Owner-scoped deletion, cascading to the link's click history.
    async fn delete_link(&self, code: &str, owner: &str) -> Result<bool>;

    /// Append a click and update the link counters in one transaction.
    ///
    /// Uniqueness: no earlier click from the same IP on the same link with
    /// `clicked_at` inside the trailing dedup window. The dedup check, the
    /// insert, and the counter update form a single serialization point per
    /// link so concurrent clicks can neither lose an increment nor both
    /// count as unique.
    async fn record_click(
        &self,
        link_id: i64,
        click: &NewClick,
        dedup_window_secs: i64,
    ) -> Result<(ClickEvent, bool)>;

    /// Most recent clicks for a scope, newest first.
    async fn recent_clicks(&self, scope: &Scope, limit: i64) -> Result<Vec<ClickEvent>>;

    /// Number of clicks in `[start, end)` for a scope.
    async fn count_clicks(&self, scope: &Scope, start: i64, end: i64) -> Result<i64>;

    /// Click counts grouped by UTC day number (`clicked_at / 86400`),
    /// ascending. Days without clicks are absent; the aggregator zero-fills.
    async fn clicks_by_day(&self, scope: &Scope, start: i64, end: i64) -> Result<Vec<(i64, i64)>>;

    /// Click counts grouped by hour-of-day (0-23), ascending.
    async fn clicks_by_hour(&self, scope: &Scope, start: i64, end: i64) -> Result<Vec<(i64, i64)>>;

    /// Click counts grouped by one dimension, descending, excluding
    /// empty and "Unknown" labels.
    async fn clicks_by_dimension(
        &self,
        scope: &Scope,
        dimension: Dimension,
        start: i64,
        end: i64,
        limit: i64,
    ) -> Result<Vec<(String, i64)>>;

    /// Click counts grouped by the exact referrer string, descending,
    /// excluding missing and empty referrers. Domain merging happens in the
    /// aggregator.
    async fn referrer_counts(&self, scope: &Scope, start: i64, end: i64)
        -> Result<Vec<(String, i64)>>;

    /// Corpus totals for the performance summary, optionally owner-scoped.
    async fn link_totals(&self, owner: Option<&str>) -> Result<LinkTotals>;

    /// An owner's links ordered by click count, descending.
    async fn top_links(&self, owner: &str, limit: i64) -> Result<Vec<Link>>;
}
