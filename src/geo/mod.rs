//! Geography resolution via an external IP lookup collaborator
//!
//! The lookup is best-effort: it runs with a bounded timeout and every
//! failure mode (timeout, non-success status, malformed body) degrades to
//! `Unknown`/`Unknown` instead of propagating. Click recording must never
//! block on or fail because of geography.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::fingerprint::UNKNOWN;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Geography fields attached to a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
}

impl GeoInfo {
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
        }
    }
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolve an IP address to country and city. Errors are expected and
    /// handled by the caller via [`resolve_or_unknown`].
    async fn lookup(&self, ip: &str) -> Result<GeoInfo>;
}

/// Run a lookup and fail open: any error becomes `Unknown`/`Unknown`.
pub async fn resolve_or_unknown(geo: &dyn GeoLookup, ip: &str) -> GeoInfo {
    match geo.lookup(ip).await {
        Ok(info) => info,
        Err(err) => {
            debug!(%ip, error = %err, "geo lookup failed, degrading to Unknown");
            GeoInfo::unknown()
        }
    }
}

/// HTTP collaborator speaking the ip-api.com JSON dialect:
/// `GET {endpoint}/{ip}?fields=status,country,city`.
pub struct HttpGeoService {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    status: Option<String>,
    country: Option<String>,
    city: Option<String>,
}

impl HttpGeoService {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build geo lookup HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoService {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!("{}/{}?fields=status,country,city", self.endpoint, ip);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("geo lookup request failed")?
            .error_for_status()
            .context("geo lookup returned an error status")?;

        let body: LookupResponse = response
            .json()
            .await
            .context("geo lookup returned a malformed body")?;

        if body.status.as_deref() != Some("success") {
            anyhow::bail!("geo lookup reported failure for {ip}");
        }

        Ok(GeoInfo {
            country: non_empty_or_unknown(body.country),
            city: non_empty_or_unknown(body.city),
        })
    }
}

/// Lookup used when no geo endpoint is configured.
pub struct DisabledGeoLookup;

#[async_trait]
impl GeoLookup for DisabledGeoLookup {
    async fn lookup(&self, _ip: &str) -> Result<GeoInfo> {
        Ok(GeoInfo::unknown())
    }
}

fn non_empty_or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => UNKNOWN.to_string(),
    }
}
