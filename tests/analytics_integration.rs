//! Integration tests for the analytics aggregator: zero-filled windows,
//! breakdowns, referrer grouping, summaries, and cascade deletion.

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use linkpulse::analytics::{AnalyticsService, Scope};
use linkpulse::clock::{Clock, ManualClock};
use linkpulse::models::{Link, NewClick, NewLink};
use linkpulse::storage::{SqliteStorage, Storage};

// All tests pin the clock here: 2024-06-10 12:00:00 UTC.
fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

fn ts(day: u32, hour: u32, minute: u32) -> i64 {
    Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0)
        .unwrap()
        .timestamp()
}

async fn setup() -> (Arc<dyn Storage>, Arc<ManualClock>, AnalyticsService) {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    let storage: Arc<dyn Storage> = Arc::new(storage);

    let clock = Arc::new(ManualClock::new(fixed_now()));
    let analytics = AnalyticsService::new(Arc::clone(&storage), Arc::clone(&clock) as Arc<dyn Clock>);

    (storage, clock, analytics)
}

async fn seed_link(storage: &Arc<dyn Storage>, owner: &str, code: &str) -> Link {
    storage
        .create_link(&NewLink {
            owner: owner.to_string(),
            target_url: "https://example.com".to_string(),
            code: code.to_string(),
            is_public: true,
            expires_at: None,
            created_at: ts(1, 0, 0),
        })
        .await
        .unwrap()
}

fn base_click(ip: &str, clicked_at: i64) -> NewClick {
    NewClick {
        ip_address: ip.to_string(),
        user_agent: "Mozilla/5.0 test".to_string(),
        referrer: None,
        browser: "Chrome 120".to_string(),
        device: "Desktop".to_string(),
        operating_system: "Linux".to_string(),
        country: "United States".to_string(),
        city: "Portland".to_string(),
        clicked_at,
    }
}

async fn seed_click(storage: &Arc<dyn Storage>, link_id: i64, click: NewClick) {
    storage.record_click(link_id, &click, 86_400).await.unwrap();
}

#[tokio::test]
async fn daily_series_zero_fills_and_orders_oldest_first() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "daily").await;

    // Clicks only on June 6 (twice) and June 8, inside a 7-day window
    seed_click(&storage, link.id, base_click("1.1.1.1", ts(6, 9, 30))).await;
    seed_click(&storage, link.id, base_click("1.1.1.2", ts(6, 15, 0))).await;
    seed_click(&storage, link.id, base_click("1.1.1.3", ts(8, 20, 0))).await;

    let series = analytics
        .daily_series(&Scope::Link(link.id), 7)
        .await
        .unwrap();

    assert_eq!(series.len(), 7);
    assert_eq!(series[0].date, "2024-06-04");
    assert_eq!(series[6].date, "2024-06-10");

    let clicks: Vec<i64> = series.iter().map(|d| d.clicks).collect();
    assert_eq!(clicks, vec![0, 0, 2, 0, 1, 0, 0]);
    assert_eq!(series.iter().filter(|d| d.clicks == 0).count(), 5);
}

#[tokio::test]
async fn daily_series_on_empty_history_is_all_zeroes() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "empty").await;

    let series = analytics
        .daily_series(&Scope::Link(link.id), 7)
        .await
        .unwrap();

    assert_eq!(series.len(), 7);
    assert!(series.iter().all(|d| d.clicks == 0));
}

#[tokio::test]
async fn daily_series_excludes_clicks_before_the_window() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "window").await;

    // June 2 is outside a 7-day window ending June 10
    seed_click(&storage, link.id, base_click("1.1.1.1", ts(2, 10, 0))).await;
    seed_click(&storage, link.id, base_click("1.1.1.2", ts(9, 10, 0))).await;

    let series = analytics
        .daily_series(&Scope::Link(link.id), 7)
        .await
        .unwrap();

    let total: i64 = series.iter().map(|d| d.clicks).sum();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn hourly_distribution_zero_fills_all_24_buckets() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "hourly").await;

    seed_click(&storage, link.id, base_click("1.1.1.1", ts(6, 9, 30))).await;
    seed_click(&storage, link.id, base_click("1.1.1.2", ts(9, 9, 5))).await;
    seed_click(&storage, link.id, base_click("1.1.1.3", ts(8, 20, 0))).await;

    let distribution = analytics
        .hourly_distribution(&Scope::Link(link.id), Some(7))
        .await
        .unwrap();

    assert_eq!(distribution.len(), 24);
    assert_eq!(distribution[9].hour, 9);
    assert_eq!(distribution[9].clicks, 2);
    assert_eq!(distribution[20].clicks, 1);

    let total: i64 = distribution.iter().map(|h| h.clicks).sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn country_breakdown_excludes_unknown_and_sorts_descending() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "geo").await;

    let countries = [
        "United States",
        "United States",
        "United States",
        "Germany",
        "Germany",
        "Unknown",
        "",
    ];
    for (i, country) in countries.iter().enumerate() {
        let mut click = base_click(&format!("2.2.2.{i}"), ts(9, 10, 0));
        click.country = country.to_string();
        seed_click(&storage, link.id, click).await;
    }

    let breakdown = analytics
        .country_breakdown(&Scope::Link(link.id), Some(30), 10)
        .await
        .unwrap();

    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0].label, "United States");
    assert_eq!(breakdown[0].clicks, 3);
    assert_eq!(breakdown[1].label, "Germany");
    assert_eq!(breakdown[1].clicks, 2);
}

#[tokio::test]
async fn technology_breakdown_covers_browser_device_and_os() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "tech").await;

    let specs = [
        ("Chrome 120", "Desktop", "Linux"),
        ("Chrome 120", "Desktop", "Windows 10"),
        ("Firefox 126", "Mobile", "Android"),
        ("Unknown", "Unknown", "Unknown"),
    ];
    for (i, (browser, device, os)) in specs.iter().enumerate() {
        let mut click = base_click(&format!("3.3.3.{i}"), ts(9, 10, 0));
        click.browser = browser.to_string();
        click.device = device.to_string();
        click.operating_system = os.to_string();
        seed_click(&storage, link.id, click).await;
    }

    let tech = analytics
        .technology_breakdown(&Scope::Link(link.id), Some(30), 10)
        .await
        .unwrap();

    assert_eq!(tech.browsers.len(), 2);
    assert_eq!(tech.browsers[0].label, "Chrome 120");
    assert_eq!(tech.browsers[0].clicks, 2);

    assert_eq!(tech.devices.len(), 2);
    assert_eq!(tech.devices[0].label, "Desktop");
    assert_eq!(tech.devices[0].clicks, 2);

    assert_eq!(tech.operating_systems.len(), 3);
    let os_labels: Vec<&str> = tech
        .operating_systems
        .iter()
        .map(|e| e.label.as_str())
        .collect();
    assert!(!os_labels.contains(&"Unknown"));
}

#[tokio::test]
async fn referrers_sharing_a_host_merge() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "refs").await;

    let referrers = [
        Some("https://a.com/x"),
        Some("https://a.com/y"),
        Some("https://a.com/x"),
        Some("https://b.com/z"),
        Some("not a parseable url"),
        None,
    ];
    for (i, referrer) in referrers.iter().enumerate() {
        let mut click = base_click(&format!("4.4.4.{i}"), ts(9, 10, 0));
        click.referrer = referrer.map(String::from);
        seed_click(&storage, link.id, click).await;
    }

    let breakdown = analytics
        .referrer_breakdown(&Scope::Link(link.id), Some(30), 10)
        .await
        .unwrap();

    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0].label, "a.com");
    assert_eq!(breakdown[0].clicks, 3);
    assert_eq!(breakdown[1].label, "b.com");
    assert_eq!(breakdown[1].clicks, 1);
}

#[tokio::test]
async fn performance_summary_shapes_corpus_totals() {
    let (storage, _, analytics) = setup().await;
    let busy = seed_link(&storage, "alice", "busy").await;
    seed_link(&storage, "alice", "idle").await;
    let third = seed_link(&storage, "alice", "off").await;
    storage
        .update_link(
            &third.code,
            "alice",
            &linkpulse::models::LinkUpdate {
                is_active: Some(false),
                ..Default::default()
            },
            ts(10, 0, 0),
        )
        .await
        .unwrap();

    for i in 0..4 {
        seed_click(&storage, busy.id, base_click(&format!("5.5.5.{i}"), ts(9, 10, i))).await;
    }

    let summary = analytics.performance_summary(Some("alice")).await.unwrap();
    assert_eq!(summary.total_links, 3);
    assert_eq!(summary.active_links, 2);
    assert_eq!(summary.total_clicks, 4);
    assert_eq!(summary.avg_clicks_per_link, 1.33);
    assert_eq!(summary.click_through_rate, 33.33);
}

#[tokio::test]
async fn performance_summary_on_empty_corpus_is_zero() {
    let (_, _, analytics) = setup().await;

    let summary = analytics.performance_summary(None).await.unwrap();
    assert_eq!(summary.total_links, 0);
    assert_eq!(summary.total_clicks, 0);
    assert_eq!(summary.avg_clicks_per_link, 0.0);
    assert_eq!(summary.click_through_rate, 0.0);
}

#[tokio::test]
async fn owner_scope_excludes_other_accounts() {
    let (storage, _, analytics) = setup().await;
    let mine = seed_link(&storage, "alice", "mine").await;
    let theirs = seed_link(&storage, "bob", "theirs").await;

    seed_click(&storage, mine.id, base_click("6.6.6.1", ts(9, 10, 0))).await;
    seed_click(&storage, theirs.id, base_click("6.6.6.2", ts(9, 10, 0))).await;
    seed_click(&storage, theirs.id, base_click("6.6.6.3", ts(9, 11, 0))).await;

    let alice_scope = Scope::Owner("alice".to_string());
    let count = storage.count_clicks(&alice_scope, 0, ts(10, 23, 59)).await.unwrap();
    assert_eq!(count, 1);

    let all = storage.count_clicks(&Scope::All, 0, ts(10, 23, 59)).await.unwrap();
    assert_eq!(all, 3);

    let series = analytics.daily_series(&alice_scope, 7).await.unwrap();
    let total: i64 = series.iter().map(|d| d.clicks).sum();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn link_stats_counts_today_and_week() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "stats").await;

    // Two clicks today (June 10), one three days ago, one outside the week
    seed_click(&storage, link.id, base_click("7.7.7.1", ts(10, 1, 0))).await;
    seed_click(&storage, link.id, base_click("7.7.7.2", ts(10, 11, 0))).await;
    seed_click(&storage, link.id, base_click("7.7.7.3", ts(7, 9, 0))).await;
    seed_click(&storage, link.id, base_click("7.7.7.4", ts(1, 9, 0))).await;

    let link = storage.get_link_by_code("stats").await.unwrap().unwrap();
    let stats = analytics.link_stats(&link).await.unwrap();

    assert_eq!(stats.total_clicks, 4);
    assert_eq!(stats.unique_clicks, 4);
    assert_eq!(stats.clicks_today, 2);
    assert_eq!(stats.clicks_this_week, 3);
}

#[tokio::test]
async fn dashboard_aggregates_an_owners_activity() {
    let (storage, _, analytics) = setup().await;
    let first = seed_link(&storage, "alice", "first").await;
    let second = seed_link(&storage, "alice", "second").await;
    let other = seed_link(&storage, "bob", "other").await;

    // Today, this week, this month; bob's click must not leak in
    seed_click(&storage, first.id, base_click("8.8.8.1", ts(10, 9, 0))).await;
    seed_click(&storage, first.id, base_click("8.8.8.2", ts(5, 9, 0))).await;
    seed_click(
        &storage,
        second.id,
        base_click("8.8.8.3", Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap().timestamp()),
    )
    .await;
    seed_click(&storage, other.id, base_click("8.8.8.4", ts(10, 9, 30))).await;

    let dashboard = analytics.dashboard("alice").await.unwrap();

    assert_eq!(dashboard.clicks_today, 1);
    assert_eq!(dashboard.clicks_this_week, 2);
    assert_eq!(dashboard.clicks_this_month, 3);
    assert_eq!(dashboard.summary.total_links, 2);
    assert_eq!(dashboard.summary.total_clicks, 3);

    assert_eq!(dashboard.top_links.len(), 2);
    assert_eq!(dashboard.top_links[0].code, "first");

    assert_eq!(dashboard.recent_clicks.len(), 3);
    assert_eq!(dashboard.recent_clicks[0].ip_address, "8.8.8.1");
}

#[tokio::test]
async fn link_report_composes_all_sections() {
    let (storage, _, analytics) = setup().await;
    let link = seed_link(&storage, "alice", "report").await;

    let mut click = base_click("9.9.9.1", ts(9, 14, 0));
    click.referrer = Some("https://news.example.com/item".to_string());
    seed_click(&storage, link.id, click).await;

    let link = storage.get_link_by_code("report").await.unwrap().unwrap();
    let report = analytics.link_report(&link, 7, 10).await.unwrap();

    assert_eq!(report.daily.len(), 7);
    assert_eq!(report.hourly.len(), 24);
    assert_eq!(report.stats.total_clicks, 1);
    assert_eq!(report.countries[0].label, "United States");
    assert_eq!(report.technology.browsers[0].label, "Chrome 120");
    assert_eq!(report.referrers[0].label, "news.example.com");
}

#[tokio::test]
async fn deleting_a_link_removes_its_click_history() {
    let (storage, _, _) = setup().await;
    let link = seed_link(&storage, "alice", "doomed").await;
    let survivor = seed_link(&storage, "alice", "kept").await;

    seed_click(&storage, link.id, base_click("10.0.0.1", ts(9, 10, 0))).await;
    seed_click(&storage, link.id, base_click("10.0.0.2", ts(9, 11, 0))).await;
    seed_click(&storage, survivor.id, base_click("10.0.0.3", ts(9, 12, 0))).await;

    assert!(storage.delete_link("doomed", "alice").await.unwrap());

    assert!(!storage.code_exists("doomed").await.unwrap());
    let remaining = storage
        .count_clicks(&Scope::All, 0, ts(10, 23, 59))
        .await
        .unwrap();
    assert_eq!(remaining, 1);

    let orphaned = storage
        .count_clicks(&Scope::Link(link.id), 0, ts(10, 23, 59))
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
}
