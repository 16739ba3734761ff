//! Optional reuse of purchased quota tokens.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Identifies a quota token: tokens never cross (account, audience, exchange).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub account_id: u128,
    pub audience: String,
    pub exchange: String,
}

pub trait SessionCache: Send + Sync {
    fn get(&self, key: &SessionKey) -> Option<String>;
    fn put(&self, key: SessionKey, token: String);
}

/// Caches nothing; every purchase goes to the exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessionCache;

impl SessionCache for NoSessionCache {
    fn get(&self, _key: &SessionKey) -> Option<String> {
        None
    }

    fn put(&self, _key: SessionKey, _token: String) {}
}

/// In-process cache with a fixed time to live per entry.
#[derive(Debug)]
pub struct MemorySessionCache {
    ttl: Duration,
    entries: Mutex<HashMap<SessionKey, (String, DateTime<Utc>)>>,
}

impl MemorySessionCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &SessionKey) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        let now = Utc::now();
        match entries.get(key) {
            Some((token, expires)) if *expires > now => Some(token.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: SessionKey, token: String) {
        let expires = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, (token, expires));
        }
    }
}
