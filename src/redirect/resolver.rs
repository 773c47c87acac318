use anyhow::Result;
use std::sync::Arc;

use crate::clock::Clock;
use crate::models::Link;
use crate::storage::Storage;

/// Outcome of a code lookup. `Disabled` and `Expired` are terminal states
/// of the state machine, not errors; no click is recorded for them.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Active, unexpired link: redirect to its target.
    Redirect(Link),
    NotFound,
    Disabled,
    Expired,
}

pub struct RedirectResolver {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl RedirectResolver {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Decide what a code resolves to. Read-only; click recording is the
    /// caller's detached side effect. `is_public` never gates redirect
    /// eligibility.
    pub async fn resolve(&self, code: &str) -> Result<Resolution> {
        let Some(link) = self.storage.get_link_by_code(code).await? else {
            return Ok(Resolution::NotFound);
        };

        if !link.is_active {
            return Ok(Resolution::Disabled);
        }

        if link.is_expired(self.clock.now_ts()) {
            return Ok(Resolution::Expired);
        }

        Ok(Resolution::Redirect(link))
    }
}
