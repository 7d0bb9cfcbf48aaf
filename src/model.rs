use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored short URL. Every field is fixed at creation time; records are
/// never updated or deleted afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub shortcode: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub validity_minutes: u32,
}

/// One recorded redirect. The timestamp is assigned by the store at append
/// time, never taken from the request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub source_address: String,
    pub approximate_location: String,
}

/// Request-derived click context, merged into a [`ClickEvent`] by the store.
#[derive(Clone, Debug, Default)]
pub struct ClickInfo {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub source_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlRequest {
    pub url: String,
    pub validity: Option<u32>,
    pub shortcode: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlResponse {
    pub short_link: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub shortcode: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub total_clicks: usize,
    pub click_history: Vec<ClickView>,
}

/// Presentation form of a click event: absent fields are replaced with the
/// "Direct"/"Unknown" sentinels expected by stats consumers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickView {
    pub timestamp: DateTime<Utc>,
    pub referrer: String,
    pub user_agent: String,
    pub ip_address: String,
    pub location: String,
}

impl From<ClickEvent> for ClickView {
    fn from(event: ClickEvent) -> Self {
        ClickView {
            timestamp: event.timestamp,
            referrer: event.referrer.unwrap_or_else(|| "Direct".into()),
            user_agent: event.user_agent.unwrap_or_else(|| "Unknown".into()),
            ip_address: event.source_address,
            location: event.approximate_location,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub total_urls: usize,
}
