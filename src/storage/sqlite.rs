use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

use crate::analytics::{Dimension, LinkTotals, Scope};
use crate::models::{ClickEvent, Link, LinkFilter, LinkUpdate, NewClick, NewLink};
use crate::storage::{Storage, StorageError, StorageResult};

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Run a windowed, scope-filtered query. The SQL must bind `start` and
    /// `end` first, then the scope value (when the scope has one), then
    /// `limit` (when given).
    async fn fetch_scoped<O>(
        &self,
        sql: &str,
        scope: &Scope,
        start: i64,
        end: i64,
        limit: Option<i64>,
    ) -> Result<Vec<O>>
    where
        O: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, O>(sql).bind(start).bind(end);
        query = match scope {
            Scope::Link(id) => query.bind(*id),
            Scope::Owner(owner) => query.bind(owner.clone()),
            Scope::All => query,
        };
        if let Some(limit) = limit {
            query = query.bind(limit);
        }
        Ok(query.fetch_all(self.pool.as_ref()).await?)
    }
}

/// Extra predicate narrowing a click query to its scope. Queries join
/// `links l` so owner scoping can filter on the link row.
fn scope_predicate(scope: &Scope) -> &'static str {
    match scope {
        Scope::Link(_) => "AND c.link_id = ?",
        Scope::Owner(_) => "AND l.owner = ?",
        Scope::All => "",
    }
}

const LINK_COLUMNS: &str = "id, owner, target_url, code, is_active, is_public, expires_at, \
     click_count, unique_click_count, created_at, updated_at";

const CLICK_COLUMNS: &str = "c.id, c.link_id, c.ip_address, c.user_agent, c.referrer, \
     c.browser, c.device, c.operating_system, c.country, c.city, c.clicked_at";

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                target_url TEXT NOT NULL,
                code TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_public INTEGER NOT NULL DEFAULT 1,
                expires_at INTEGER,
                click_count INTEGER NOT NULL DEFAULT 0,
                unique_click_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner ON links(owner)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                ip_address TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                referrer TEXT,
                browser TEXT NOT NULL DEFAULT '',
                device TEXT NOT NULL DEFAULT '',
                operating_system TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT '',
                clicked_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        // Covers both the dedup probe and the windowed aggregations
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_clicks_dedup ON clicks(link_id, ip_address, clicked_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_time ON clicks(clicked_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_link(&self, link: &NewLink) -> StorageResult<Link> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (owner, target_url, code, is_active, is_public, expires_at,
                               created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?, ?)
            ON CONFLICT(code) DO NOTHING
            "#,
        )
        .bind(&link.owner)
        .bind(&link.target_url)
        .bind(&link.code)
        .bind(link.is_public)
        .bind(link.expires_at)
        .bind(link.created_at)
        .bind(link.created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE code = ?");
        let created = sqlx::query_as::<_, Link>(&sql)
            .bind(&link.code)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        Ok(created)
    }

    async fn get_link_by_code(&self, code: &str) -> Result<Option<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE code = ?");
        let link = sqlx::query_as::<_, Link>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(link)
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM links WHERE code = ?)")
                .bind(code)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(exists != 0)
    }

    async fn list_links(
        &self,
        owner: &str,
        filter: LinkFilter,
        search: Option<&str>,
        now: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>> {
        let filter_clause = match filter {
            LinkFilter::All => "",
            LinkFilter::Active => "AND is_active = 1",
            LinkFilter::Inactive => "AND is_active = 0",
            LinkFilter::Expired => "AND expires_at IS NOT NULL AND expires_at < ?",
        };
        let search_clause = if search.is_some() {
            "AND (target_url LIKE ? OR code LIKE ?)"
        } else {
            ""
        };

        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE owner = ? {filter_clause} {search_clause} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );

        let mut query = sqlx::query_as::<_, Link>(&sql).bind(owner);
        if filter == LinkFilter::Expired {
            query = query.bind(now);
        }
        if let Some(term) = search {
            let pattern = format!("%{term}%");
            query = query.bind(pattern.clone()).bind(pattern);
        }
        let links = query
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(links)
    }

    async fn update_link(
        &self,
        code: &str,
        owner: &str,
        changes: &LinkUpdate,
        now: i64,
    ) -> Result<Option<Link>> {
        let mut sets: Vec<&str> = Vec::new();
        if changes.target_url.is_some() {
            sets.push("target_url = ?");
        }
        if changes.is_active.is_some() {
            sets.push("is_active = ?");
        }
        if changes.is_public.is_some() {
            sets.push("is_public = ?");
        }
        if changes.expires_at.is_some() {
            sets.push("expires_at = ?");
        }
        sets.push("updated_at = ?");

        let sql = format!(
            "UPDATE links SET {} WHERE code = ? AND owner = ?",
            sets.join(", ")
        );

        let mut query = sqlx::query(&sql);
        if let Some(ref target_url) = changes.target_url {
            query = query.bind(target_url.as_str());
        }
        if let Some(is_active) = changes.is_active {
            query = query.bind(is_active);
        }
        if let Some(is_public) = changes.is_public {
            query = query.bind(is_public);
        }
        if let Some(expires_at) = changes.expires_at {
            query = query.bind(expires_at);
        }
        let result = query
            .bind(now)
            .bind(code)
            .bind(owner)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_link_by_code(code).await
    }

    async fn delete_link(&self, code: &str, owner: &str) -> Result<bool> {
        // Explicit cascade: the click history goes with the link, and the
        // code becomes available for reuse.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM clicks WHERE link_id IN (SELECT id FROM links WHERE code = ? AND owner = ?)",
        )
        .bind(code)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM links WHERE code = ? AND owner = ?")
            .bind(code)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_click(
        &self,
        link_id: i64,
        click: &NewClick,
        dedup_window_secs: i64,
    ) -> Result<(ClickEvent, bool)> {
        let mut tx = self.pool.begin().await?;

        // The insert is the first statement, so the transaction takes the
        // write lock before the dedup probe runs. Two near-simultaneous
        // clicks from the same IP therefore serialize here and the second
        // sees the first's row.
        let inserted = sqlx::query(
            r#"
            INSERT INTO clicks (link_id, ip_address, user_agent, referrer, browser, device,
                                operating_system, country, city, clicked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link_id)
        .bind(&click.ip_address)
        .bind(&click.user_agent)
        .bind(&click.referrer)
        .bind(&click.browser)
        .bind(&click.device)
        .bind(&click.operating_system)
        .bind(&click.country)
        .bind(&click.city)
        .bind(click.clicked_at)
        .execute(&mut *tx)
        .await?;

        let click_id = inserted.last_insert_rowid();
        let cutoff = click.clicked_at - dedup_window_secs;

        let earlier: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM clicks
            WHERE link_id = ? AND ip_address = ? AND clicked_at >= ? AND id != ?
            "#,
        )
        .bind(link_id)
        .bind(&click.ip_address)
        .bind(cutoff)
        .bind(click_id)
        .fetch_one(&mut *tx)
        .await?;

        let is_unique = earlier == 0;

        sqlx::query(
            r#"
            UPDATE links
            SET click_count = click_count + 1,
                unique_click_count = unique_click_count + ?
            WHERE id = ?
            "#,
        )
        .bind(if is_unique { 1i64 } else { 0 })
        .bind(link_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let event = ClickEvent {
            id: click_id,
            link_id,
            ip_address: click.ip_address.clone(),
            user_agent: click.user_agent.clone(),
            referrer: click.referrer.clone(),
            browser: click.browser.clone(),
            device: click.device.clone(),
            operating_system: click.operating_system.clone(),
            country: click.country.clone(),
            city: click.city.clone(),
            clicked_at: click.clicked_at,
        };

        Ok((event, is_unique))
    }

    async fn recent_clicks(&self, scope: &Scope, limit: i64) -> Result<Vec<ClickEvent>> {
        let sql = format!(
            "SELECT {CLICK_COLUMNS} FROM clicks c JOIN links l ON l.id = c.link_id \
             WHERE 1 = 1 {} ORDER BY c.clicked_at DESC, c.id DESC LIMIT ?",
            scope_predicate(scope)
        );

        let mut query = sqlx::query_as::<_, ClickEvent>(&sql);
        query = match scope {
            Scope::Link(id) => query.bind(*id),
            Scope::Owner(owner) => query.bind(owner.clone()),
            Scope::All => query,
        };
        Ok(query.bind(limit).fetch_all(self.pool.as_ref()).await?)
    }

    async fn count_clicks(&self, scope: &Scope, start: i64, end: i64) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM clicks c JOIN links l ON l.id = c.link_id \
             WHERE c.clicked_at >= ? AND c.clicked_at < ? {}",
            scope_predicate(scope)
        );
        let rows: Vec<(i64,)> = self.fetch_scoped(&sql, scope, start, end, None).await?;
        Ok(rows.first().map(|r| r.0).unwrap_or(0))
    }

    async fn clicks_by_day(&self, scope: &Scope, start: i64, end: i64) -> Result<Vec<(i64, i64)>> {
        let sql = format!(
            "SELECT c.clicked_at / 86400 AS day, COUNT(*) AS clicks \
             FROM clicks c JOIN links l ON l.id = c.link_id \
             WHERE c.clicked_at >= ? AND c.clicked_at < ? {} \
             GROUP BY day ORDER BY day",
            scope_predicate(scope)
        );
        self.fetch_scoped(&sql, scope, start, end, None).await
    }

    async fn clicks_by_hour(&self, scope: &Scope, start: i64, end: i64) -> Result<Vec<(i64, i64)>> {
        let sql = format!(
            "SELECT (c.clicked_at % 86400) / 3600 AS hour, COUNT(*) AS clicks \
             FROM clicks c JOIN links l ON l.id = c.link_id \
             WHERE c.clicked_at >= ? AND c.clicked_at < ? {} \
             GROUP BY hour ORDER BY hour",
            scope_predicate(scope)
        );
        self.fetch_scoped(&sql, scope, start, end, None).await
    }

    async fn clicks_by_dimension(
        &self,
        scope: &Scope,
        dimension: Dimension,
        start: i64,
        end: i64,
        limit: i64,
    ) -> Result<Vec<(String, i64)>> {
        let column = dimension.column();
        let sql = format!(
            "SELECT c.{column} AS label, COUNT(*) AS clicks \
             FROM clicks c JOIN links l ON l.id = c.link_id \
             WHERE c.clicked_at >= ? AND c.clicked_at < ? {} \
             AND c.{column} != '' AND c.{column} != 'Unknown' \
             GROUP BY label ORDER BY clicks DESC, label ASC LIMIT ?",
            scope_predicate(scope)
        );
        self.fetch_scoped(&sql, scope, start, end, Some(limit)).await
    }

    async fn referrer_counts(
        &self,
        scope: &Scope,
        start: i64,
        end: i64,
    ) -> Result<Vec<(String, i64)>> {
        let sql = format!(
            "SELECT c.referrer AS label, COUNT(*) AS clicks \
             FROM clicks c JOIN links l ON l.id = c.link_id \
             WHERE c.clicked_at >= ? AND c.clicked_at < ? {} \
             AND c.referrer IS NOT NULL AND c.referrer != '' \
             GROUP BY label ORDER BY clicks DESC",
            scope_predicate(scope)
        );
        self.fetch_scoped(&sql, scope, start, end, None).await
    }

    async fn link_totals(&self, owner: Option<&str>) -> Result<LinkTotals> {
        let owner_clause = if owner.is_some() { "WHERE owner = ?" } else { "" };
        let sql = format!(
            "SELECT COUNT(*) AS total_links, \
             COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) AS active_links, \
             COALESCE(SUM(click_count), 0) AS total_clicks, \
             COALESCE(SUM(CASE WHEN click_count > 0 THEN 1 ELSE 0 END), 0) AS links_with_clicks \
             FROM links {owner_clause}"
        );

        let mut query = sqlx::query_as::<_, LinkTotals>(&sql);
        if let Some(owner) = owner {
            query = query.bind(owner.to_string());
        }
        Ok(query.fetch_one(self.pool.as_ref()).await?)
    }

    async fn top_links(&self, owner: &str, limit: i64) -> Result<Vec<Link>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE owner = ? \
             ORDER BY click_count DESC, id ASC LIMIT ?"
        );
        let links = sqlx::query_as::<_, Link>(&sql)
            .bind(owner)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(links)
    }
}
