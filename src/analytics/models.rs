//! Data models for analytics queries

use serde::Serialize;
use sqlx::FromRow;

use crate::models::{ClickEvent, Link};

/// What slice of click history a query runs over.
#[derive(Debug, Clone)]
pub enum Scope {
    /// One specific link.
    Link(i64),
    /// Every link owned by an account.
    Owner(String),
    /// System-wide.
    All,
}

/// Group-by dimension for breakdown queries. Kept as an enum so column
/// names never come from caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Country,
    Browser,
    Device,
    OperatingSystem,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Country => "country",
            Dimension::Browser => "browser",
            Dimension::Device => "device",
            Dimension::OperatingSystem => "operating_system",
        }
    }
}

/// Clicks on one UTC calendar day.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub clicks: i64,
}

/// Clicks during one hour-of-day (0-23) across the window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HourlyCount {
    pub hour: u8,
    pub clicks: i64,
}

/// One row of a breakdown (country, browser, device, OS, or referrer
/// domain), ordered by descending click count.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BreakdownEntry {
    pub label: String,
    pub clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnologyBreakdown {
    pub browsers: Vec<BreakdownEntry>,
    pub devices: Vec<BreakdownEntry>,
    pub operating_systems: Vec<BreakdownEntry>,
}

/// Corpus-level metrics for a scope (an owner or the whole system).
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub total_links: i64,
    pub active_links: i64,
    pub total_clicks: i64,
    pub avg_clicks_per_link: f64,
    /// Percentage of links with at least one click.
    pub click_through_rate: f64,
}

/// Raw link totals as read from storage; shaped into a
/// [`PerformanceSummary`] by the aggregator.
#[derive(Debug, Clone, Default, FromRow)]
pub struct LinkTotals {
    pub total_links: i64,
    pub active_links: i64,
    pub total_clicks: i64,
    pub links_with_clicks: i64,
}

/// Counter snapshot for a single link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkStats {
    pub total_clicks: i64,
    pub unique_clicks: i64,
    pub clicks_today: i64,
    pub clicks_this_week: i64,
}

/// Account-wide dashboard numbers.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summary: PerformanceSummary,
    pub clicks_today: i64,
    pub clicks_this_week: i64,
    pub clicks_this_month: i64,
    pub top_links: Vec<Link>,
    pub recent_clicks: Vec<ClickEvent>,
}

/// Full windowed report for one link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub stats: LinkStats,
    pub daily: Vec<DailyCount>,
    pub hourly: Vec<HourlyCount>,
    pub countries: Vec<BreakdownEntry>,
    pub technology: TechnologyBreakdown,
    pub referrers: Vec<BreakdownEntry>,
}
