use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A shortening mapping: code -> target URL plus settings and counters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: i64,
    pub owner: String,
    pub target_url: String,
    pub code: String,
    pub is_active: bool,
    pub is_public: bool,
    pub expires_at: Option<i64>,
    pub click_count: i64,
    pub unique_click_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Link {
    /// Expiry is derived, never stored: set and in the past relative to the
    /// evaluation time.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(t) if t < now)
    }
}

/// Fields for inserting a new link. The code has already been generated or
/// validated by the time this is constructed.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub owner: String,
    pub target_url: String,
    pub code: String,
    pub is_public: bool,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

/// Owner-scoped mutation. The code itself is immutable after creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkUpdate {
    pub target_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub expires_at: Option<i64>,
}

impl LinkUpdate {
    pub fn is_empty(&self) -> bool {
        self.target_url.is_none()
            && self.is_active.is_none()
            && self.is_public.is_none()
            && self.expires_at.is_none()
    }
}

/// Listing filter for the dashboard surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFilter {
    #[default]
    All,
    Active,
    Inactive,
    Expired,
}

/// Opaque account reference. The core never enforces the daily limit
/// itself; the rate-limiting layer consults these fields before calling
/// create and reports a precondition failure as a `Validation` error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub is_premium: bool,
    pub daily_url_limit: i64,
}

impl Account {
    /// Hook for the rate-limiting layer: whether this account may create
    /// another link given how many it created today. Premium accounts are
    /// unlimited.
    pub fn can_create(&self, links_created_today: i64) -> bool {
        self.is_premium || links_created_today < self.daily_url_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(is_premium: bool, daily_url_limit: i64) -> Account {
        Account {
            id: "acct-1".to_string(),
            is_premium,
            daily_url_limit,
        }
    }

    #[test]
    fn expiry_is_relative_to_the_evaluation_time() {
        let link = Link {
            id: 1,
            owner: "alice".to_string(),
            target_url: "https://example.com".to_string(),
            code: "abc".to_string(),
            is_active: true,
            is_public: true,
            expires_at: Some(1_000),
            click_count: 0,
            unique_click_count: 0,
            created_at: 0,
            updated_at: 0,
        };

        assert!(!link.is_expired(999));
        assert!(!link.is_expired(1_000));
        assert!(link.is_expired(1_001));
    }

    #[test]
    fn free_accounts_hit_the_daily_limit() {
        let acct = account(false, 20);
        assert!(acct.can_create(0));
        assert!(acct.can_create(19));
        assert!(!acct.can_create(20));
    }

    #[test]
    fn premium_accounts_are_unlimited() {
        let acct = account(true, 20);
        assert!(acct.can_create(10_000));
    }
}
