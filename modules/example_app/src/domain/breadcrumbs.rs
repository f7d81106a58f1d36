use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::localizer::Localizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Breadcrumb {
    pub label: String,
    pub path: String,
}

/// Trail derived from the request path. Shared between the middleware that
/// builds it and the handler that may relabel entries.
#[derive(Debug, Clone, Default)]
pub struct Breadcrumbs(Arc<Mutex<Vec<Breadcrumb>>>);

impl Breadcrumbs {
    /// Home crumb followed by one crumb per non-empty path segment. Labels come
    /// from percent-decoded segments; paths stay as requested.
    pub fn build(path: &str, localizer: &Localizer, locale: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut crumbs = Vec::with_capacity(segments.len() + 1);
        crumbs.push(Breadcrumb {
            label: localizer.get(locale, "homeLabel"),
            path: "/".to_string(),
        });

        for (i, segment) in segments.iter().enumerate() {
            let decoded = urlencoding::decode(segment).unwrap_or(Cow::Borrowed(*segment));
            let label = decoded.replace('-', " ");
            let key = format!("{}Label", lowercase_first(&label));
            let label = localizer
                .lookup(locale, &key)
                .map(str::to_string)
                .unwrap_or(label);
            crumbs.push(Breadcrumb {
                label,
                path: format!("/{}", segments[..=i].join("/")),
            });
        }

        Self(Arc::new(Mutex::new(crumbs)))
    }

    /// Relabel the first crumb whose label equals `slug`; no-op when none does.
    pub fn replace_label_for_slug(&self, slug: &str, label: &str) {
        let mut crumbs = self.0.lock();
        if let Some(crumb) = crumbs.iter_mut().find(|c| c.label == slug) {
            crumb.label = label.to_string();
        }
    }

    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        self.0.lock().clone()
    }
}

/// Label form of a URL slug, as produced by [`Breadcrumbs::build`] before translation.
pub fn slug_label(slug: &str) -> String {
    slug.to_lowercase().replace('-', " ")
}

// Single-character strings are returned unchanged.
fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match (chars.next(), chars.as_str()) {
        (Some(first), rest) if !rest.is_empty() => {
            first.to_lowercase().chain(rest.chars()).collect()
        }
        _ => s.to_string(),
    }
}
