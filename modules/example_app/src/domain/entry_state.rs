use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::content::{ContentBackend, EntryQuery, SystemProperties};
use crate::domain::options::EffectiveOptions;

/// Publication state of an entry and its modules as seen from the preview API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct EntryState {
    /// Some entry has never been published.
    pub draft: bool,
    /// Some published entry differs from its preview version.
    pub pending_changes: bool,
}

/// Compare `preview` system properties against their published counterparts.
pub async fn entry_state(
    backend: &dyn ContentBackend,
    options: &EffectiveOptions,
    preview: &[SystemProperties],
) -> EntryState {
    if preview.is_empty() {
        return EntryState::default();
    }

    let delivery = options.with_preview(false);
    let query = EntryQuery::new().ids(preview.iter().map(|s| s.id.clone()));
    let published: Vec<SystemProperties> = match backend.get_entries(&delivery, &query).await {
        Ok(items) => items.iter().filter_map(system_properties).collect(),
        Err(e) => {
            debug!(error = %e, "Published entries unavailable, treating as draft");
            Vec::new()
        }
    };

    let by_id: HashMap<&str, &SystemProperties> =
        published.iter().map(|s| (s.id.as_str(), s)).collect();

    let draft = preview.iter().any(|s| !by_id.contains_key(s.id.as_str()));
    let pending_changes = preview.iter().any(|p| {
        by_id
            .get(p.id.as_str())
            .is_some_and(|d| d.updated_at_seconds() != p.updated_at_seconds())
    });

    EntryState {
        draft,
        pending_changes,
    }
}

fn system_properties(item: &Value) -> Option<SystemProperties> {
    serde_json::from_value(item.get("sys")?.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::FakeBackend;
    use crate::content::ContentError;
    use serde_json::json;

    fn sys(id: &str, updated_at: &str) -> SystemProperties {
        serde_json::from_value(json!({ "id": id, "updatedAt": updated_at })).unwrap()
    }

    fn published(id: &str, updated_at: &str) -> Value {
        json!({ "sys": { "id": id, "updatedAt": updated_at }, "fields": {} })
    }

    #[tokio::test]
    async fn published_and_unchanged() {
        let backend = FakeBackend::default().with_entries(vec![
            published("a", "2024-01-01T10:00:00.120Z"),
            published("b", "2024-01-01T10:00:00Z"),
        ]);
        let preview = [
            sys("a", "2024-01-01T10:00:00.999Z"),
            sys("b", "2024-01-01T10:00:00Z"),
        ];

        let state = entry_state(&backend, &EffectiveOptions::default().with_preview(true), &preview).await;

        assert_eq!(state, EntryState::default());
        assert!(!backend.queries.lock()[0].0, "must query the delivery API");
    }

    #[tokio::test]
    async fn missing_entry_is_draft() {
        let backend = FakeBackend::default().with_entries(vec![published("a", "2024-01-01T10:00:00Z")]);
        let preview = [
            sys("a", "2024-01-01T10:00:00Z"),
            sys("module", "2024-01-01T10:00:00Z"),
        ];

        let state = entry_state(&backend, &EffectiveOptions::default(), &preview).await;

        assert!(state.draft);
        assert!(!state.pending_changes);
    }

    #[tokio::test]
    async fn newer_preview_is_pending() {
        let backend = FakeBackend::default().with_entries(vec![published("a", "2024-01-01T10:00:00Z")]);
        let preview = [sys("a", "2024-01-02T08:30:00Z")];

        let state = entry_state(&backend, &EffectiveOptions::default(), &preview).await;

        assert_eq!(
            state,
            EntryState {
                draft: false,
                pending_changes: true
            }
        );
    }

    #[tokio::test]
    async fn failed_lookup_counts_as_draft() {
        let backend = FakeBackend::failing(Some(ContentError::transport("down")), None);
        let preview = [sys("a", "2024-01-01T10:00:00Z")];

        let state = entry_state(&backend, &EffectiveOptions::default(), &preview).await;

        assert!(state.draft);
    }
}
