use axum::http::header::{InvalidHeaderValue, COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};

pub const VISITED_COOKIE: &str = "ContentfulVisitedLessons";
const MAX_AGE_DAYS: i64 = 7;

/// Ids of courses and lessons the visitor has opened, kept in a client cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    ids: Vec<String>,
}

impl VisitedSet {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut set = Self::default();
        if let Some(raw) = cookie_value(headers, VISITED_COOKIE) {
            let decoded = urlencoding::decode(&raw)
                .map(|s| s.into_owned())
                .unwrap_or(raw);
            for id in decoded.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                set.add(id);
            }
        }
        set
    }

    /// Append `id` unless already present.
    pub fn add(&mut self, id: &str) {
        if !self.contains(id) {
            self.ids.push(id.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// `Set-Cookie` value with a fresh seven day expiry.
    pub fn to_set_cookie(&self, now: DateTime<Utc>) -> Result<HeaderValue, InvalidHeaderValue> {
        let expires = now + Duration::days(MAX_AGE_DAYS);
        let value = format!(
            "{VISITED_COOKIE}={}; Path=/; HttpOnly; Max-Age={}; Expires={}",
            urlencoding::encode(&self.ids.join(";")),
            MAX_AGE_DAYS * 24 * 60 * 60,
            expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        );
        HeaderValue::from_str(&value)
    }
}

/// Value of the named cookie across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_string())
}
