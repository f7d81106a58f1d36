//! Server-side session store.
//!
//! Sessions are addressed by a random UUID carried in a cookie and hold a
//! small set of string values. Idle sessions are evicted lazily when they are
//! next looked up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Keys a session may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Serialized per-session credential override.
    ContentfulOptions,
    /// Locale code requested by the visitor.
    Locale,
    /// Statically supported locale reached through the backend fallback chain.
    FallbackLocale,
    EditorialFeatures,
    /// Validation errors stashed for the next settings render.
    SettingsErrors,
    /// Credentials that produced [`SessionKey::SettingsErrors`].
    SettingsErrorsOptions,
}

impl SessionKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionKey::ContentfulOptions => "ContentfulOptions",
            SessionKey::Locale => "locale",
            SessionKey::FallbackLocale => "fallback-locale",
            SessionKey::EditorialFeatures => "EditorialFeatures",
            SessionKey::SettingsErrors => "SettingsErrors",
            SessionKey::SettingsErrorsOptions => "SettingsErrorsOptions",
        }
    }
}

const EDITORIAL_ENABLED: &str = "Enabled";
const EDITORIAL_DISABLED: &str = "Disabled";

struct SessionData {
    values: RwLock<HashMap<SessionKey, String>>,
    last_access: Mutex<Instant>,
}

impl SessionData {
    fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            last_access: Mutex::new(Instant::now()),
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_access.lock())
    }

    fn touch(&self, now: Instant) {
        *self.last_access.lock() = now;
    }
}

/// Handle to one visitor's session. Clones share the same data.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    is_new: bool,
    data: Arc<SessionData>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True when the session was created for the current request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn get(&self, key: SessionKey) -> Option<String> {
        self.data.values.read().get(&key).cloned()
    }

    pub fn set(&self, key: SessionKey, value: impl Into<String>) {
        self.data.values.write().insert(key, value.into());
    }

    pub fn remove(&self, key: SessionKey) {
        self.data.values.write().remove(&key);
    }

    /// Read and remove a value in one step.
    pub fn take(&self, key: SessionKey) -> Option<String> {
        self.data.values.write().remove(&key)
    }

    /// Deserialize a stored JSON value. Empty or malformed values read as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: SessionKey) -> Option<T> {
        let raw = self.get(key)?;
        parse_json(key, &raw)
    }

    /// Like [`Session::get_json`] but removes the value.
    pub fn take_json<T: DeserializeOwned>(&self, key: SessionKey) -> Option<T> {
        let raw = self.take(key)?;
        parse_json(key, &raw)
    }

    pub fn set_json<T: Serialize>(&self, key: SessionKey, value: &T) -> Result<(), serde_json::Error> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw);
        Ok(())
    }

    pub fn editorial_features_enabled(&self) -> bool {
        self.get(SessionKey::EditorialFeatures).as_deref() == Some(EDITORIAL_ENABLED)
    }

    pub fn set_editorial_features(&self, enabled: bool) {
        let value = if enabled {
            EDITORIAL_ENABLED
        } else {
            EDITORIAL_DISABLED
        };
        self.set(SessionKey::EditorialFeatures, value);
    }
}

fn parse_json<T: DeserializeOwned>(key: SessionKey, raw: &str) -> Option<T> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Ignoring malformed session value");
            None
        }
    }
}

/// In-process session store keyed by session id.
pub struct SessionStore {
    sessions: DashMap<Uuid, Arc<SessionData>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Return the live session for `id`, or a fresh one when the id is
    /// missing, unparseable, unknown or idle-expired.
    pub fn load_or_create(&self, id: Option<&str>) -> Session {
        let now = Instant::now();

        if let Some(id) = id.and_then(|raw| Uuid::parse_str(raw.trim()).ok()) {
            if let Some(data) = self.live(id, now) {
                data.touch(now);
                return Session {
                    id,
                    is_new: false,
                    data,
                };
            }
        }

        let id = Uuid::new_v4();
        let data = Arc::new(SessionData::new());
        self.sessions.insert(id, data.clone());
        debug!(session_id = %id, "Created session");
        Session {
            id,
            is_new: true,
            data,
        }
    }

    fn live(&self, id: Uuid, now: Instant) -> Option<Arc<SessionData>> {
        let data = self.sessions.get(&id)?.value().clone();
        if data.idle_for(now) > self.idle_timeout {
            self.sessions.remove(&id);
            debug!(session_id = %id, "Evicted idle session");
            return None;
        }
        Some(data)
    }

    /// Drop every idle-expired session; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, data| data.idle_for(now) <= self.idle_timeout);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
