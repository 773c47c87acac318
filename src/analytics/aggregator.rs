//! Read-time aggregation over click history and link counters

use anyhow::Result;
use chrono::{Duration, NaiveTime};
use std::collections::HashMap;
use std::sync::Arc;

use crate::analytics::models::{
    BreakdownEntry, DailyCount, Dashboard, Dimension, HourlyCount, LinkReport, LinkStats,
    PerformanceSummary, Scope, TechnologyBreakdown,
};
use crate::clock::Clock;
use crate::models::Link;
use crate::storage::Storage;

const SECS_PER_DAY: i64 = 86_400;

pub struct AnalyticsService {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Rolling window covering the last `days` days up to and including
    /// now. `days = None` means all history.
    fn rolling_window(&self, days: Option<u32>) -> (i64, i64) {
        let end = self.clock.now_ts() + 1;
        let start = match days {
            Some(days) => end - i64::from(days) * SECS_PER_DAY,
            None => 0,
        };
        (start, end)
    }

    /// Click count per UTC calendar day over the last `days` days,
    /// zero-filled, oldest first.
    pub async fn daily_series(&self, scope: &Scope, days: u32) -> Result<Vec<DailyCount>> {
        let today = self.clock.now().date_naive();
        let start_day = today - Duration::days(i64::from(days) - 1);
        let start_ts = start_day.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = (today + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let counts: HashMap<i64, i64> = self
            .storage
            .clicks_by_day(scope, start_ts, end_ts)
            .await?
            .into_iter()
            .collect();

        let series = (0..i64::from(days))
            .map(|offset| {
                let day = start_day + Duration::days(offset);
                let bucket = day.and_time(NaiveTime::MIN).and_utc().timestamp() / SECS_PER_DAY;
                DailyCount {
                    date: day.format("%Y-%m-%d").to_string(),
                    clicks: counts.get(&bucket).copied().unwrap_or(0),
                }
            })
            .collect();

        Ok(series)
    }

    /// Click count per hour-of-day (0-23) across the window, zero-filled.
    pub async fn hourly_distribution(
        &self,
        scope: &Scope,
        days: Option<u32>,
    ) -> Result<Vec<HourlyCount>> {
        let (start, end) = self.rolling_window(days);
        let counts: HashMap<i64, i64> = self
            .storage
            .clicks_by_hour(scope, start, end)
            .await?
            .into_iter()
            .collect();

        let distribution = (0..24)
            .map(|hour| HourlyCount {
                hour: hour as u8,
                clicks: counts.get(&hour).copied().unwrap_or(0),
            })
            .collect();

        Ok(distribution)
    }

    /// Top countries by click count, excluding unknowns.
    pub async fn country_breakdown(
        &self,
        scope: &Scope,
        days: Option<u32>,
        limit: i64,
    ) -> Result<Vec<BreakdownEntry>> {
        self.dimension_breakdown(scope, Dimension::Country, days, limit)
            .await
    }

    /// Top browsers, devices, and operating systems, excluding unknowns.
    pub async fn technology_breakdown(
        &self,
        scope: &Scope,
        days: Option<u32>,
        limit: i64,
    ) -> Result<TechnologyBreakdown> {
        Ok(TechnologyBreakdown {
            browsers: self
                .dimension_breakdown(scope, Dimension::Browser, days, limit)
                .await?,
            devices: self
                .dimension_breakdown(scope, Dimension::Device, days, limit)
                .await?,
            operating_systems: self
                .dimension_breakdown(scope, Dimension::OperatingSystem, days, limit)
                .await?,
        })
    }

    async fn dimension_breakdown(
        &self,
        scope: &Scope,
        dimension: Dimension,
        days: Option<u32>,
        limit: i64,
    ) -> Result<Vec<BreakdownEntry>> {
        let (start, end) = self.rolling_window(days);
        let entries = self
            .storage
            .clicks_by_dimension(scope, dimension, start, end, limit)
            .await?
            .into_iter()
            .map(|(label, clicks)| BreakdownEntry { label, clicks })
            .collect();

        Ok(entries)
    }

    /// Top referrers grouped by the host of the referrer URL. Referrers
    /// sharing a host merge into one entry; unparsable referrers are
    /// skipped.
    pub async fn referrer_breakdown(
        &self,
        scope: &Scope,
        days: Option<u32>,
        limit: i64,
    ) -> Result<Vec<BreakdownEntry>> {
        let (start, end) = self.rolling_window(days);
        let raw = self.storage.referrer_counts(scope, start, end).await?;

        let mut by_host: HashMap<String, i64> = HashMap::new();
        for (referrer, count) in raw {
            if let Some(host) = referrer_host(&referrer) {
                *by_host.entry(host).or_insert(0) += count;
            }
        }

        let mut entries: Vec<BreakdownEntry> = by_host
            .into_iter()
            .map(|(label, clicks)| BreakdownEntry { label, clicks })
            .collect();
        entries.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.label.cmp(&b.label)));
        entries.truncate(limit as usize);

        Ok(entries)
    }

    /// Corpus metrics for an owner, or system-wide when `owner` is `None`.
    pub async fn performance_summary(&self, owner: Option<&str>) -> Result<PerformanceSummary> {
        let totals = self.storage.link_totals(owner).await?;

        let (avg_clicks_per_link, click_through_rate) = if totals.total_links > 0 {
            (
                round2(totals.total_clicks as f64 / totals.total_links as f64),
                round2(totals.links_with_clicks as f64 / totals.total_links as f64 * 100.0),
            )
        } else {
            (0.0, 0.0)
        };

        Ok(PerformanceSummary {
            total_links: totals.total_links,
            active_links: totals.active_links,
            total_clicks: totals.total_clicks,
            avg_clicks_per_link,
            click_through_rate,
        })
    }

    /// Counter snapshot plus short-window counts for one link.
    pub async fn link_stats(&self, link: &Link) -> Result<LinkStats> {
        let scope = Scope::Link(link.id);
        let now = self.clock.now();
        let end = now.timestamp() + 1;
        let today_start = now
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let week_start = end - 7 * SECS_PER_DAY;

        Ok(LinkStats {
            total_clicks: link.click_count,
            unique_clicks: link.unique_click_count,
            clicks_today: self.storage.count_clicks(&scope, today_start, end).await?,
            clicks_this_week: self.storage.count_clicks(&scope, week_start, end).await?,
        })
    }

    /// Full windowed report for one link.
    pub async fn link_report(&self, link: &Link, days: u32, limit: i64) -> Result<LinkReport> {
        let scope = Scope::Link(link.id);

        Ok(LinkReport {
            stats: self.link_stats(link).await?,
            daily: self.daily_series(&scope, days).await?,
            hourly: self.hourly_distribution(&scope, Some(days)).await?,
            countries: self.country_breakdown(&scope, Some(days), limit).await?,
            technology: self.technology_breakdown(&scope, Some(days), limit).await?,
            referrers: self.referrer_breakdown(&scope, Some(days), limit).await?,
        })
    }

    /// Account dashboard: summary plus recent activity.
    pub async fn dashboard(&self, owner: &str) -> Result<Dashboard> {
        let scope = Scope::Owner(owner.to_string());
        let now = self.clock.now();
        let end = now.timestamp() + 1;
        let today_start = now
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        Ok(Dashboard {
            summary: self.performance_summary(Some(owner)).await?,
            clicks_today: self.storage.count_clicks(&scope, today_start, end).await?,
            clicks_this_week: self
                .storage
                .count_clicks(&scope, end - 7 * SECS_PER_DAY, end)
                .await?,
            clicks_this_month: self
                .storage
                .count_clicks(&scope, end - 30 * SECS_PER_DAY, end)
                .await?,
            top_links: self.storage.top_links(owner, 5).await?,
            recent_clicks: self.storage.recent_clicks(&scope, 10).await?,
        })
    }
}

/// Percentage of a subtotal over a total, one decimal; 0 when the total
/// is 0.
pub fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

/// Growth rate between two periods, one decimal. A prior period of 0 is
/// 100% growth when the current period is nonzero and 0% otherwise.
pub fn growth_rate(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    round1((current - previous) as f64 / previous as f64 * 100.0)
}

/// Host of a referrer URL, lowercased. `None` for unparsable input or
/// URLs without a host.
pub fn referrer_host(referrer: &str) -> Option<String> {
    let parsed = url::Url::parse(referrer).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
