use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::audit::{AuditLevel, AuditLogger, Component};
use crate::errors::StoreError;
use crate::model::{ClickEvent, ClickInfo, UrlRecord};

struct StoredUrl {
    record: UrlRecord,
    clicks: Vec<ClickEvent>,
}

/// In-memory authority of record: shortcode -> URL record plus its
/// append-only click log. The concurrency unit is the shortcode; operations
/// on different keys do not contend. Nothing is ever evicted.
pub struct UrlStore {
    entries: DashMap<String, StoredUrl>,
    audit: AuditLogger,
}

impl UrlStore {
    pub fn new(audit: AuditLogger) -> Self {
        audit.emit(
            AuditLevel::Info,
            Component::Db,
            "URL storage initialized successfully",
        );
        UrlStore {
            entries: DashMap::new(),
            audit,
        }
    }

    /// Presence check only; an expired record still exists for collision
    /// detection purposes.
    pub fn exists(&self, shortcode: &str) -> bool {
        self.entries.contains_key(shortcode)
    }

    /// Atomic insert-if-absent. The empty click log is created in the same
    /// step, and an occupied key is never overwritten: of two concurrent
    /// puts for one shortcode exactly one succeeds.
    pub fn put(&self, record: UrlRecord) -> Result<(), StoreError> {
        match self.entries.entry(record.shortcode.clone()) {
            Entry::Occupied(_) => {
                self.audit.emit(
                    AuditLevel::Warn,
                    Component::Db,
                    format!("Rejected duplicate shortcode: {}", record.shortcode),
                );
                Err(StoreError::AlreadyExists)
            }
            Entry::Vacant(vacant) => {
                self.audit.emit(
                    AuditLevel::Info,
                    Component::Db,
                    format!("URL stored with shortcode: {}", record.shortcode),
                );
                vacant.insert(StoredUrl {
                    record,
                    clicks: Vec::new(),
                });
                Ok(())
            }
        }
    }

    /// Returns the stored record verbatim; expiry judgment is left to the
    /// caller so that lookups can serve both existence and liveness checks.
    pub fn get(&self, shortcode: &str) -> Option<UrlRecord> {
        self.entries
            .get(shortcode)
            .map(|entry| entry.record.clone())
    }

    /// Appends a click with a store-assigned timestamp. Appends for one key
    /// are serialized, so the log order is the order in which calls acquired
    /// the key. The store does not check expiry here; that policy belongs to
    /// the redirect path.
    pub fn record_click(&self, shortcode: &str, info: ClickInfo) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .get_mut(shortcode)
            .ok_or(StoreError::NotFound)?;
        let source_address = info
            .source_address
            .unwrap_or_else(|| "unknown".to_string());
        let approximate_location = crate::utils::approximate_location(&source_address);
        entry.clicks.push(ClickEvent {
            timestamp: Utc::now(),
            referrer: info.referrer,
            user_agent: info.user_agent,
            source_address,
            approximate_location,
        });
        self.audit.emit(
            AuditLevel::Info,
            Component::Db,
            format!("Click recorded for shortcode: {}", shortcode),
        );
        Ok(())
    }

    /// All clicks for a key in insertion order; empty for a clickless key
    /// and for keys that never existed.
    pub fn analytics(&self, shortcode: &str) -> Vec<ClickEvent> {
        self.entries
            .get(shortcode)
            .map(|entry| entry.clicks.clone())
            .unwrap_or_default()
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::expiry_date;
    use chrono::Duration;
    use std::sync::{Arc, Barrier};

    fn record(shortcode: &str, validity_minutes: u32) -> UrlRecord {
        let created_at = Utc::now();
        UrlRecord {
            shortcode: shortcode.to_string(),
            original_url: "https://example.com/page".to_string(),
            created_at,
            expires_at: expiry_date(created_at, validity_minutes),
            validity_minutes,
        }
    }

    fn store() -> UrlStore {
        UrlStore::new(AuditLogger::disabled())
    }

    #[test]
    fn put_then_get_returns_the_record() {
        let store = store();
        store.put(record("abc123", 30)).unwrap();
        let found = store.get("abc123").unwrap();
        assert_eq!(found.original_url, "https://example.com/page");
        assert_eq!(found.validity_minutes, 30);
        assert!(store.exists("abc123"));
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn duplicate_put_is_rejected_without_overwrite() {
        let store = store();
        store.put(record("abc123", 30)).unwrap();
        let mut second = record("abc123", 30);
        second.original_url = "https://example.com/other".to_string();
        assert_eq!(store.put(second), Err(StoreError::AlreadyExists));
        assert_eq!(
            store.get("abc123").unwrap().original_url,
            "https://example.com/page"
        );
    }

    #[test]
    fn expired_records_still_exist() {
        let store = store();
        let mut expired = record("old123", 1);
        expired.expires_at = Utc::now() - Duration::minutes(5);
        store.put(expired).unwrap();
        assert!(store.exists("old123"));
        assert!(store.get("old123").is_some());
    }

    #[test]
    fn clicks_append_in_order_with_store_timestamps() {
        let store = store();
        store.put(record("abc123", 30)).unwrap();
        assert!(store.analytics("abc123").is_empty());

        for referrer in ["first", "second", "third"] {
            store
                .record_click(
                    "abc123",
                    ClickInfo {
                        referrer: Some(referrer.to_string()),
                        ..ClickInfo::default()
                    },
                )
                .unwrap();
        }

        let clicks = store.analytics("abc123");
        assert_eq!(clicks.len(), 3);
        let referrers: Vec<_> = clicks
            .iter()
            .map(|c| c.referrer.clone().unwrap())
            .collect();
        assert_eq!(referrers, ["first", "second", "third"]);
        assert!(clicks.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn click_against_unknown_code_fails() {
        let store = store();
        assert_eq!(
            store.record_click("missing", ClickInfo::default()),
            Err(StoreError::NotFound)
        );
        assert!(store.analytics("missing").is_empty());
    }

    #[test]
    fn click_fills_in_origin_defaults() {
        let store = store();
        store.put(record("abc123", 30)).unwrap();
        store.record_click("abc123", ClickInfo::default()).unwrap();
        store
            .record_click(
                "abc123",
                ClickInfo {
                    source_address: Some("127.0.0.1".to_string()),
                    ..ClickInfo::default()
                },
            )
            .unwrap();

        let clicks = store.analytics("abc123");
        assert_eq!(clicks[0].source_address, "unknown");
        assert_eq!(clicks[0].approximate_location, "Unknown Location");
        assert_eq!(clicks[1].approximate_location, "Local Network");
    }

    #[test]
    fn concurrent_puts_for_one_code_have_a_single_winner() {
        let store = Arc::new(store());
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store.put(record("race01", 30)).is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn concurrent_clicks_lose_nothing() {
        let store = Arc::new(store());
        store.put(record("busy01", 30)).unwrap();
        let threads = 4;
        let per_thread = 50;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..per_thread {
                        store.record_click("busy01", ClickInfo::default()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.analytics("busy01").len(), threads * per_thread);
    }

    #[test]
    fn callers_get_copies_not_references() {
        let store = store();
        store.put(record("abc123", 30)).unwrap();
        let mut copy = store.get("abc123").unwrap();
        copy.original_url = "https://evil.example".to_string();
        assert_eq!(
            store.get("abc123").unwrap().original_url,
            "https://example.com/page"
        );
    }
}
