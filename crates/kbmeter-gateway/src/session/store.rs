use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::task::JoinHandle;

use kbmeter_core::error::{KbMeterError, Result};

const MAX_TOKEN_LEN: usize = 128;

#[derive(Debug, Clone)]
struct SessionEntry {
    stores: Vec<String>,
    touched: Instant,
}

/// In-memory session table with TTL and a bounded entry count.
///
/// Tokens are correlation ids, not credentials: they only need to be unique
/// within the process lifetime.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    ttl: Duration,
    max_entries: usize,
    epoch: u64,
    seq: AtomicU64,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self {
            sessions: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            epoch,
            seq: AtomicU64::new(1),
        }
    }

    /// New unique token.
    pub fn issue_token(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("kbs-{:x}-{:x}", self.epoch, seq)
    }

    /// Check a client-supplied token.
    pub fn validate_token(token: &str) -> Result<()> {
        let ok = !token.is_empty()
            && token.len() <= MAX_TOKEN_LEN
            && token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if ok {
            Ok(())
        } else {
            Err(KbMeterError::BadRequest(
                "x-kb-session must be 1-128 chars of [A-Za-z0-9_-]".into(),
            ))
        }
    }

    /// Store (or replace) the store list of `token`.
    pub fn put(&self, token: &str, stores: Vec<String>) {
        if !self.sessions.contains_key(token) && self.sessions.len() >= self.max_entries {
            self.sweep();
            if self.sessions.len() >= self.max_entries {
                self.evict_oldest();
            }
        }
        self.sessions.insert(
            token.to_string(),
            SessionEntry {
                stores,
                touched: Instant::now(),
            },
        );
    }

    /// Store list of a live session. Refreshes its TTL.
    pub fn get(&self, token: &str) -> Option<Vec<String>> {
        let mut entry = self.sessions.get_mut(token)?;
        if entry.touched.elapsed() > self.ttl {
            drop(entry);
            self.sessions.remove(token);
            return None;
        }
        entry.touched = Instant::now();
        Some(entry.stores.clone())
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, e| e.touched.elapsed() <= ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&self) {
        let victim = self
            .sessions
            .iter()
            .min_by_key(|e| e.value().touched)
            .map(|e| e.key().clone());
        if let Some(k) = victim {
            self.sessions.remove(&k);
            tracing::warn!(max_entries = self.max_entries, "session store full, evicted oldest session");
        }
    }
}

/// Periodically sweep expired sessions until the runtime shuts down.
pub fn spawn_sweeper(store: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                tracing::debug!(removed, remaining = store.len(), "expired kb sessions swept");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokens_are_unique() {
        let s = SessionStore::new(Duration::from_secs(60), 10);
        let a = s.issue_token();
        let b = s.issue_token();
        assert_ne!(a, b);
        assert!(SessionStore::validate_token(&a).is_ok());
    }

    #[test]
    fn put_then_get() {
        let s = SessionStore::new(Duration::from_secs(60), 10);
        s.put("t1", stores(&["finance", "hr"]));
        assert_eq!(s.get("t1"), Some(stores(&["finance", "hr"])));
        assert_eq!(s.get("t2"), None);

        s.put("t1", vec![]);
        assert_eq!(s.get("t1"), Some(vec![]));
    }

    #[test]
    fn expired_sessions_are_gone() {
        let s = SessionStore::new(Duration::ZERO, 10);
        s.put("t1", stores(&["a"]));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(s.get("t1"), None);
        assert!(s.is_empty());

        s.put("t2", stores(&["a"]));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(s.sweep(), 1);
    }

    #[test]
    fn full_store_evicts_least_recently_touched() {
        let s = SessionStore::new(Duration::from_secs(60), 2);
        s.put("old", stores(&["a"]));
        std::thread::sleep(Duration::from_millis(2));
        s.put("mid", stores(&["b"]));
        std::thread::sleep(Duration::from_millis(2));
        s.put("new", stores(&["c"]));

        assert_eq!(s.len(), 2);
        assert_eq!(s.get("old"), None);
        assert!(s.get("mid").is_some());
        assert!(s.get("new").is_some());
    }

    #[test]
    fn bad_tokens_are_rejected() {
        assert!(SessionStore::validate_token("").is_err());
        assert!(SessionStore::validate_token("has space").is_err());
        assert!(SessionStore::validate_token(&"x".repeat(129)).is_err());
        assert!(SessionStore::validate_token("kbs-1_A").is_ok());
    }
}
