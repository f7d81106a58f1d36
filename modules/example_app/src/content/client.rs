use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ContentfulConfig;
use crate::content::links::resolve_collection;
use crate::content::{ContentBackend, ContentError, EntryQuery, Locale, Space};
use crate::domain::options::EffectiveOptions;

const USER_AGENT_HEADER: &str = "X-Contentful-User-Agent";

/// Contentful Delivery / Preview API client.
///
/// One instance serves every session: the base URL and bearer token are
/// picked per call from the request's [`EffectiveOptions`].
#[derive(Clone)]
pub struct ContentfulClient {
    http: reqwest::Client,
    delivery_base_url: String,
    preview_base_url: String,
    user_agent: String,
}

#[derive(Deserialize)]
struct SpaceResponse {
    name: String,
    #[serde(default)]
    locales: Option<Vec<Locale>>,
}

#[derive(Deserialize)]
struct LocaleCollection {
    #[serde(default)]
    items: Vec<Locale>,
}

impl ContentfulClient {
    pub fn new(cfg: &ContentfulConfig) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| ContentError::transport(e.to_string()))?;

        Ok(Self {
            http,
            delivery_base_url: cfg.delivery_base_url.trim_end_matches('/').to_string(),
            preview_base_url: cfg.preview_base_url.trim_end_matches('/').to_string(),
            user_agent: format!(
                "app example-app.rust/{}; platform rust",
                env!("CARGO_PKG_VERSION")
            ),
        })
    }

    fn base_url(&self, options: &EffectiveOptions) -> &str {
        if options.use_preview {
            &self.preview_base_url
        } else {
            &self.delivery_base_url
        }
    }

    async fn fetch(
        &self,
        options: &EffectiveOptions,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Value, ContentError> {
        let url = format!(
            "{}/spaces/{}{}",
            self.base_url(options),
            urlencoding::encode(&options.space_id),
            path
        );
        debug!(%url, preview = options.use_preview, "Content API request");

        let response = self
            .http
            .get(&url)
            .bearer_auth(options.access_token())
            .header(USER_AGENT_HEADER, &self.user_agent)
            .query(params)
            .send()
            .await
            .map_err(|e| ContentError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ContentError::transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ContentError::api(status.as_u16(), error_message(status, &body)));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

/// The API's `message` field when the error body has one, else the status reason.
fn error_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}

#[async_trait]
impl ContentBackend for ContentfulClient {
    #[instrument(name = "example_app.content.get_space", skip_all, fields(space_id = %options.space_id, preview = options.use_preview))]
    async fn get_space(&self, options: &EffectiveOptions) -> Result<Space, ContentError> {
        let space: SpaceResponse = serde_json::from_value(self.fetch(options, "", &[]).await?)?;

        let locales = match space.locales {
            Some(locales) => locales,
            None => {
                let collection: LocaleCollection =
                    serde_json::from_value(self.fetch(options, "/locales", &[]).await?)?;
                collection.items
            }
        };

        Ok(Space {
            name: space.name,
            locales,
        })
    }

    #[instrument(name = "example_app.content.get_entries", skip_all, fields(content_type = ?query.content_type_id(), preview = options.use_preview))]
    async fn get_entries(
        &self,
        options: &EffectiveOptions,
        query: &EntryQuery,
    ) -> Result<Vec<Value>, ContentError> {
        let response = self.fetch(options, "/entries", &query.to_params()).await?;
        let items = resolve_collection(&response, query.include_depth());
        debug!(count = items.len(), "Fetched entries");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ContentfulClient {
        ContentfulClient::new(&ContentfulConfig {
            delivery_base_url: server.base_url(),
            preview_base_url: format!("{}/preview", server.base_url()),
            request_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn options(use_preview: bool) -> EffectiveOptions {
        EffectiveOptions {
            space_id: "space1".into(),
            delivery_token: "cda".into(),
            preview_token: "cpa".into(),
            use_preview,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn get_space_uses_delivery_token_and_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/spaces/space1")
                    .header("authorization", "Bearer cda")
                    .header_exists("x-contentful-user-agent");
                then.status(200).json_body(json!({
                    "name": "Demo",
                    "locales": [{ "code": "en-US", "name": "English", "default": true }]
                }));
            })
            .await;

        let space = client_for(&server).get_space(&options(false)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(space.name, "Demo");
        assert_eq!(space.locales.len(), 1);
    }

    #[tokio::test]
    async fn get_space_falls_back_to_locales_endpoint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/preview/spaces/space1");
                then.status(200).json_body(json!({ "name": "Demo" }));
            })
            .await;
        let locales = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/preview/spaces/space1/locales")
                    .header("authorization", "Bearer cpa");
                then.status(200).json_body(json!({
                    "items": [
                        { "code": "en-US", "name": "English", "default": true },
                        { "code": "de-CH", "name": "Swiss German", "fallbackCode": "de-DE" }
                    ]
                }));
            })
            .await;

        let space = client_for(&server).get_space(&options(true)).await.unwrap();

        locales.assert_async().await;
        assert_eq!(space.locales[1].fallback_code.as_deref(), Some("de-DE"));
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/spaces/space1");
                then.status(401)
                    .json_body(json!({ "message": "The access token you sent could not be found or is invalid." }));
            })
            .await;

        let err = client_for(&server).get_space(&options(false)).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(err.detail().contains("access token"));
    }

    #[tokio::test]
    async fn get_entries_sends_query_and_resolves_links() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/spaces/space1/entries")
                    .query_param("content_type", "course")
                    .query_param("fields.slug", "hello")
                    .query_param("include", "2");
                then.status(200).json_body(json!({
                    "items": [{
                        "sys": { "id": "c1" },
                        "fields": { "lessons": [{ "sys": { "type": "Link", "linkType": "Entry", "id": "l1" } }] }
                    }],
                    "includes": { "Entry": [{ "sys": { "id": "l1" }, "fields": { "slug": "intro" } }] }
                }));
            })
            .await;

        let query = EntryQuery::new()
            .content_type("course")
            .field_equals("slug", "hello")
            .include(2);
        let items = client_for(&server)
            .get_entries(&options(false), &query)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(items[0]["fields"]["lessons"][0]["fields"]["slug"], "intro");
    }

    #[tokio::test]
    async fn invalid_json_maps_to_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/spaces/space1/entries");
                then.status(200).body("not json");
            })
            .await;

        let err = client_for(&server)
            .get_entries(&options(false), &EntryQuery::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::Decode { .. }));
    }
}
