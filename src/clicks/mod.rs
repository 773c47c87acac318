//! Click recording
//!
//! Appends click events and maintains the per-link counters. Geography
//! resolution happens before the storage transaction so the contended
//! critical section stays short and never waits on the network.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::ServiceResult;
use crate::fingerprint::ClientInfo;
use crate::geo::{resolve_or_unknown, GeoLookup};
use crate::models::{ClickEvent, Link, NewClick};
use crate::storage::Storage;

/// A click from the same IP on the same link inside this trailing window
/// counts as non-unique.
pub const DEFAULT_DEDUP_WINDOW_SECS: i64 = 24 * 3600;

pub struct ClickRecorder {
    storage: Arc<dyn Storage>,
    geo: Arc<dyn GeoLookup>,
    clock: Arc<dyn Clock>,
    dedup_window_secs: i64,
}

impl ClickRecorder {
    pub fn new(
        storage: Arc<dyn Storage>,
        geo: Arc<dyn GeoLookup>,
        clock: Arc<dyn Clock>,
        dedup_window_secs: i64,
    ) -> Self {
        Self {
            storage,
            geo,
            clock,
            dedup_window_secs,
        }
    }

    /// Record one visit: resolve geography (fail-open), append the event,
    /// and bump the link counters. Returns the event and whether it was
    /// unique within the dedup window.
    pub async fn record(&self, link: &Link, client: ClientInfo) -> ServiceResult<(ClickEvent, bool)> {
        let geo = resolve_or_unknown(self.geo.as_ref(), &client.ip_address).await;

        let click = NewClick {
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            referrer: client.referrer,
            browser: client.browser,
            device: client.device,
            operating_system: client.operating_system,
            country: geo.country,
            city: geo.city,
            clicked_at: self.clock.now_ts(),
        };

        let recorded = self
            .storage
            .record_click(link.id, &click, self.dedup_window_secs)
            .await?;

        Ok(recorded)
    }
}
