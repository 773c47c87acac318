//! Windowed and grouped queries over click history
//!
//! All aggregations are read-only and tolerate an empty history: they
//! return zero-filled or empty structures, never errors.

mod aggregator;
mod models;

pub use aggregator::{growth_rate, percentage, referrer_host, AnalyticsService};
pub use models::{
    BreakdownEntry, DailyCount, Dashboard, Dimension, HourlyCount, LinkReport, LinkStats,
    LinkTotals, PerformanceSummary, Scope, TechnologyBreakdown,
};
