use std::env;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::errors::ApiError;

pub fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().to_string())
}

pub fn parse_url(text: &str) -> Result<String, ApiError> {
    Url::parse(text)
        .map(|url| url.to_string())
        .map_err(|_| ApiError::InvalidUrlFormat)
}

pub fn expiry_date(created_at: DateTime<Utc>, validity_minutes: u32) -> DateTime<Utc> {
    created_at + Duration::minutes(i64::from(validity_minutes))
}

/// Strictly after the deadline; a record is still live at the exact instant
/// of its expiry timestamp.
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    Utc::now() > expires_at
}

/// Best-effort origin address: first hop of `X-Forwarded-For` when present,
/// otherwise the peer socket address, otherwise "unknown".
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = get_header("x-forwarded-for", headers) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Coarse location without a geolocation backend: loopback and private
/// ranges are classified, everything else is unknown.
pub fn approximate_location(address: &str) -> String {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_loopback() || ip.is_private() => "Local Network".to_string(),
        Ok(IpAddr::V6(ip)) if ip.is_loopback() => "Local Network".to_string(),
        _ => "Unknown Location".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parse_url_accepts_absolute_urls() {
        assert!(parse_url("https://example.com/page?q=1").is_ok());
        assert!(parse_url("not a url").is_err());
        assert!(parse_url("/relative/path").is_err());
    }

    #[test]
    fn expiry_is_strictly_after_the_deadline() {
        assert!(is_expired(Utc::now() - Duration::seconds(1)));
        assert!(!is_expired(Utc::now() + Duration::seconds(60)));
    }

    #[test]
    fn expiry_date_adds_whole_minutes() {
        let created = Utc::now();
        assert_eq!(expiry_date(created, 30) - created, Duration::minutes(30));
    }

    #[test]
    fn forwarded_header_wins_over_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let peer = Some("192.168.1.5:4000".parse().unwrap());
        assert_eq!(client_address(&headers, peer), "203.0.113.9");
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let headers = HeaderMap::new();
        let peer = Some("192.168.1.5:4000".parse().unwrap());
        assert_eq!(client_address(&headers, peer), "192.168.1.5");
        assert_eq!(client_address(&headers, None), "unknown");
    }

    #[test]
    fn local_ranges_classify_as_local_network() {
        assert_eq!(approximate_location("127.0.0.1"), "Local Network");
        assert_eq!(approximate_location("::1"), "Local Network");
        assert_eq!(approximate_location("192.168.1.10"), "Local Network");
        assert_eq!(approximate_location("10.0.3.4"), "Local Network");
        assert_eq!(approximate_location("203.0.113.9"), "Unknown Location");
        assert_eq!(approximate_location("unknown"), "Unknown Location");
    }
}
