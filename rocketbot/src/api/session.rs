use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::redis::RedisClient;

/// Session key holding the state issued with the last authorization link.
pub const OAUTH_STATE_KEY: &str = "slack_oauth_state";

/// Opaque id of a browser session, carried in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Reads the session id from the cookie named `cookie_name`.
    pub fn from_jar(jar: &CookieJar, cookie_name: &str) -> Option<Self> {
        jar.get(cookie_name)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_owned()))
    }

    /// Returns the existing session or starts a new one, adding its cookie to the jar.
    ///
    /// The cookie is marked `Secure` when the request came in over https.
    pub fn get_or_create(jar: CookieJar, cookie_name: &str, secure: bool) -> (CookieJar, Self) {
        if let Some(id) = Self::from_jar(&jar, cookie_name) {
            return (jar, id);
        }

        let id = Self::generate();
        let cookie = Cookie::build((cookie_name.to_owned(), id.0.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .build();

        (jar.add(cookie), id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Server side session storage.
///
/// Values expire after the configured TTL. Reading with [`SessionStore::take`]
/// removes the value, so each stored value can be observed at most once.
#[derive(Clone)]
pub enum SessionStore {
    Memory(Arc<MemorySessions>),
    Redis { client: RedisClient, ttl: Duration },
}

impl SessionStore {
    pub fn memory(ttl: Duration) -> Self {
        Self::Memory(Arc::new(MemorySessions::new(ttl)))
    }

    pub fn redis(client: RedisClient, ttl: Duration) -> Self {
        Self::Redis { client, ttl }
    }

    pub async fn put(&self, session: &SessionId, key: &str, value: &str) -> Result<()> {
        match self {
            Self::Memory(sessions) => {
                sessions.put(session.as_str(), key, value);
                Ok(())
            }
            Self::Redis { client, ttl } => {
                client
                    .put_session_value(session.as_str(), key, value, *ttl)
                    .await
            }
        }
    }

    pub async fn take(&self, session: &SessionId, key: &str) -> Result<Option<String>> {
        match self {
            Self::Memory(sessions) => Ok(sessions.take(session.as_str(), key)),
            Self::Redis { client, .. } => client.take_session_value(session.as_str(), key).await,
        }
    }
}

pub struct MemorySessions {
    ttl: Duration,
    inner: Mutex<MemorySessionsInner>,
}

struct MemorySessionsInner {
    values: HashMap<(String, String), (String, Instant)>,
    next_sweep: Instant,
}

impl MemorySessionsInner {
    /// Drops expired values, at most once per TTL.
    fn sweep(&mut self, now: Instant, ttl: Duration) {
        if now < self.next_sweep {
            return;
        }
        self.values.retain(|_, (_, expires_at)| *expires_at > now);
        self.next_sweep = now + ttl;
    }
}

impl MemorySessions {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(MemorySessionsInner {
                values: HashMap::new(),
                next_sweep: Instant::now() + ttl,
            }),
        }
    }

    fn put(&self, session: &str, key: &str, value: &str) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.sweep(now, self.ttl);
        inner.values.insert(
            (session.to_owned(), key.to_owned()),
            (value.to_owned(), now + self.ttl),
        );
    }

    fn take(&self, session: &str, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.sweep(now, self.ttl);
        let (value, expires_at) = inner.values.remove(&(session.to_owned(), key.to_owned()))?;
        (expires_at > now).then_some(value)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().values.len()
    }
}
