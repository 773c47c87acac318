use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded visit. Append-only: never mutated after creation and
/// destroyed only when its owning link is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub browser: String,
    pub device: String,
    pub operating_system: String,
    pub country: String,
    pub city: String,
    pub clicked_at: i64,
}

/// Fields for appending a click. Technology fields come from the client
/// fingerprinter, geography from the geo lookup (or "Unknown" when it
/// failed), the timestamp from the injected clock.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub browser: String,
    pub device: String,
    pub operating_system: String,
    pub country: String,
    pub city: String,
    pub clicked_at: i64,
}
