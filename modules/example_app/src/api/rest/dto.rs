use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::content::{Category, Course, Layout, Lesson, Locale};
use crate::domain::breadcrumbs::Breadcrumb;
use crate::domain::entry_state::EntryState;
use crate::domain::options::Api;
use crate::domain::validation::{FieldError, SelectedOptions};

/// Request-scoped values every page carries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PageContextDto {
    /// Locale used for static strings.
    pub locale: String,
    /// Locale requested from the content backend.
    pub content_locale: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub editorial_features: bool,
    pub api: Api,
    pub title: String,
}

/// Envelope of every page response.
#[derive(Debug, Clone, Serialize)]
pub struct PageDto<T> {
    pub context: PageContextDto,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomeDto {
    #[schema(value_type = Object)]
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_state: Option<EntryState>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CoursesDto {
    #[schema(value_type = Vec<Object>)]
    pub categories: Vec<Category>,
    #[schema(value_type = Vec<Object>)]
    pub courses: Vec<Course>,
    /// Category the list is narrowed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseDto {
    #[schema(value_type = Object)]
    pub course: Course,
    /// Ids of courses and lessons the visitor has opened.
    pub visited: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_state: Option<EntryState>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LessonDto {
    #[schema(value_type = Object)]
    pub course: Course,
    #[schema(value_type = Object)]
    pub lesson: Lesson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_lesson_slug: Option<String>,
    pub visited: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_state: Option<EntryState>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettingsDto {
    pub options: SelectedOptions,
    /// Name of the configured space; absent when it could not be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
    pub is_using_custom_credentials: bool,
    /// True when `errors` come from a rejected credential change.
    pub invalid: bool,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocalesDto {
    pub locales: Vec<Locale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<Locale>,
}

/// Settings form submission.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SettingsForm {
    pub space_id: String,
    pub delivery_token: String,
    pub preview_token: String,
    /// Checkbox value; `on`, `true` or `enabled` turn editorial features on.
    pub editorial_features: Option<String>,
}

impl SettingsForm {
    pub fn into_selected(self) -> SelectedOptions {
        let editorial_features = self.editorial_features.as_deref().is_some_and(|v| {
            v.eq_ignore_ascii_case("on")
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("enabled")
        });
        SelectedOptions {
            space_id: self.space_id.trim().to_string(),
            delivery_token: self.delivery_token.trim().to_string(),
            preview_token: self.preview_token.trim().to_string(),
            use_preview: false,
            editorial_features,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SwitchApiForm {
    pub api: String,
    #[serde(default)]
    pub prev_page: Option<String>,
}
