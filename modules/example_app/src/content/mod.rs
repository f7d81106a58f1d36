//! Access to the headless CMS.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::options::EffectiveOptions;

pub mod client;
pub mod links;
pub mod models;
pub mod modules;
pub mod query;

pub use client::ContentfulClient;
pub use models::*;
pub use modules::{LayoutModule, LessonModule, ModuleRegistry};
pub use query::EntryQuery;

/// Errors reported by a [`ContentBackend`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContentError {
    #[error("content API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("content API request failed: {message}")]
    Transport { message: String },

    #[error("invalid content API response: {message}")]
    Decode { message: String },
}

impl ContentError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ContentError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable detail without the error-kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            ContentError::Api { message, .. }
            | ContentError::Transport { message }
            | ContentError::Decode { message } => message,
        }
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}

/// Read operations the application needs from the CMS. Every call carries the
/// options in effect for the request, so credentials may differ per session.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Space metadata and its locales.
    async fn get_space(&self, options: &EffectiveOptions) -> Result<Space, ContentError>;

    /// Entries matching `query`, with links resolved up to the include depth.
    async fn get_entries(
        &self,
        options: &EffectiveOptions,
        query: &EntryQuery,
    ) -> Result<Vec<Value>, ContentError>;
}
