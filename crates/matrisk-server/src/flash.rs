//! One-shot flash messages carried across a redirect.
//!
//! Messages live server-side keyed by a random id stored in a cookie; the
//! next page render takes them out of the store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;
use uuid::Uuid;

pub const FLASH_COOKIE: &str = "matrisk_flash";

/// A message queued for the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// `"error"`, `"success"` or `"info"`.
    pub category: &'static str,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self { category: "error", message: message.into() }
    }
}

/// How long an unread message is kept.
const FLASH_TTL: Duration = Duration::from_secs(600);

/// Most clients with unread messages at once; the oldest is dropped first.
const FLASH_CAPACITY: usize = 1024;

#[derive(Debug)]
struct Pending {
    queued_at: Instant,
    /// Push order, to pick the oldest entry when timestamps tie.
    seq: u64,
    messages: Vec<Flash>,
}

#[derive(Debug, Default)]
struct Pendings {
    entries: HashMap<Uuid, Pending>,
    next_seq: u64,
}

/// Pending flash messages keyed by client cookie.
///
/// Clients that never come back for their messages are pruned on the next
/// push once their entry outlives the TTL or the store is full.
#[derive(Debug)]
pub struct FlashStore {
    pending: Mutex<Pendings>,
    ttl: Duration,
    capacity: usize,
}

impl Default for FlashStore {
    fn default() -> Self {
        Self::with_limits(FLASH_TTL, FLASH_CAPACITY)
    }
}

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            pending: Mutex::new(Pendings::default()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Queues a message, reusing the client's id if it has one.
    pub fn push(&self, id: Option<Uuid>, flash: Flash) -> Uuid {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let now = Instant::now();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = pending.next_seq;
        pending.next_seq += 1;

        let entries = &mut pending.entries;
        entries.retain(|_, p| now.duration_since(p.queued_at) < self.ttl);
        while !entries.contains_key(&id) && entries.len() >= self.capacity {
            let Some(oldest) = entries.iter().min_by_key(|(_, p)| p.seq).map(|(k, _)| *k) else {
                break;
            };
            entries.remove(&oldest);
        }

        let entry = entries.entry(id).or_insert_with(|| Pending {
            queued_at: now,
            seq,
            messages: Vec::new(),
        });
        entry.queued_at = now;
        entry.seq = seq;
        entry.messages.push(flash);
        id
    }

    /// Removes and returns every message queued for `id`.
    pub fn take(&self, id: Uuid) -> Vec<Flash> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(&id)
            .map(|p| p.messages)
            .unwrap_or_default()
    }

    /// Number of clients with unread messages.
    pub fn pending_clients(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

/// Reads the flash id from the request's `Cookie` headers.
pub fn cookie_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

fn cookie_header(id: Uuid, max_age: Option<u32>) -> HeaderValue {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, id);
    if let Some(age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", age));
    }
    // Built only from ASCII: the cookie name, a hyphenated uuid and fixed attributes.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Queues `flash` and redirects to the input form.
pub fn redirect_with(store: &FlashStore, headers: &HeaderMap, flash: Flash) -> Response {
    let id = store.push(cookie_id(headers), flash);
    debug!("{} clients with pending flash messages", store.pending_clients());
    (
        StatusCode::FOUND,
        [(LOCATION, HeaderValue::from_static("/")), (SET_COOKIE, cookie_header(id, None))],
    )
        .into_response()
}

/// `Set-Cookie` value that expires the flash cookie once it has been consumed.
pub fn expire_cookie(id: Uuid) -> HeaderValue {
    cookie_header(id, Some(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_shown_once() {
        let store = FlashStore::new();
        let id = store.push(None, Flash::error("first"));
        assert_eq!(store.push(Some(id), Flash::error("second")), id);

        let taken = store.take(id);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].message, "first");
        assert!(store.take(id).is_empty());
    }

    #[test]
    fn full_store_drops_oldest_client() {
        let store = FlashStore::with_limits(Duration::from_secs(600), 3);
        let first = store.push(None, Flash::error("first"));
        for _ in 0..10 {
            store.push(None, Flash::error("again"));
        }
        assert_eq!(store.pending_clients(), 3);
        assert!(store.take(first).is_empty());
    }

    #[test]
    fn expired_messages_are_pruned() {
        let store = FlashStore::with_limits(Duration::ZERO, 100);
        let stale = store.push(None, Flash::error("stale"));
        store.push(None, Flash::error("fresh"));
        assert_eq!(store.pending_clients(), 1);
        assert!(store.take(stale).is_empty());
    }

    #[test]
    fn reads_id_among_other_cookies() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", FLASH_COOKIE, id)).unwrap(),
        );
        assert_eq!(cookie_id(&headers), Some(id));
        assert_eq!(cookie_id(&HeaderMap::new()), None);
    }
}
