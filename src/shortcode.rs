use chrono::Utc;
use rand::Rng;

use crate::errors::{AllocationError, StoreError};
use crate::model::UrlRecord;
use crate::store::UrlStore;
use crate::utils::expiry_date;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const GENERATED_LENGTH: usize = 6;
const MAX_GENERATION_ATTEMPTS: usize = 10;

pub const DEFAULT_VALIDITY_MINUTES: u32 = 30;

/// Caller-supplied codes must be alphanumeric, 3-20 characters.
pub fn is_valid_shortcode(shortcode: &str) -> bool {
    (3..=20).contains(&shortcode.len())
        && shortcode.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Draws 6 characters uniformly from the 62-symbol alphanumeric alphabet.
pub fn generate_shortcode() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Produces the final record for a creation request and commits it.
///
/// A supplied code is validated and collision-checked; a missing one is
/// generated with a bounded retry budget. The existence pre-checks only
/// avoid wasted draws: the atomic `put` is what actually guarantees
/// uniqueness, and a duplicate detected there surfaces as a collision with
/// no further retries.
pub fn allocate(
    store: &UrlStore,
    url: &str,
    validity_minutes: u32,
    requested: Option<&str>,
) -> Result<UrlRecord, AllocationError> {
    let shortcode = match requested {
        Some(code) => {
            if !is_valid_shortcode(code) {
                return Err(AllocationError::InvalidFormat);
            }
            if store.exists(code) {
                return Err(AllocationError::Collision);
            }
            code.to_string()
        }
        None => pick_unused(store, generate_shortcode)?,
    };

    let created_at = Utc::now();
    let record = UrlRecord {
        shortcode,
        original_url: url.to_string(),
        created_at,
        expires_at: expiry_date(created_at, validity_minutes),
        validity_minutes,
    };
    // A race lost between the existence check and the insert is still a
    // collision; generated codes are not retried past the budget and
    // supplied codes are never retried.
    match store.put(record.clone()) {
        Ok(()) => Ok(record),
        Err(StoreError::AlreadyExists | StoreError::NotFound) => Err(AllocationError::Collision),
    }
}

/// Bounded-retry candidate search: attempt, check, retry up to the cap,
/// fail on exhaustion rather than looping forever.
fn pick_unused(
    store: &UrlStore,
    mut generate: impl FnMut() -> String,
) -> Result<String, AllocationError> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = generate();
        if !store.exists(&candidate) {
            return Ok(candidate);
        }
    }
    Err(AllocationError::GenerationExhausted)
}
