//! Typed views of content entries.
//!
//! Entries arrive as `{ "sys": {..}, "fields": {..} }` with links already
//! resolved; each model flattens that shape into a plain struct.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::content::modules::{LayoutModule, LessonModule, ModuleRegistry};

/// Metadata every entry and asset carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProperties {
    pub id: String,
    #[serde(
        default,
        deserialize_with = "link_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
}

impl SystemProperties {
    /// `updatedAt` truncated to whole seconds.
    pub fn updated_at_seconds(&self) -> Option<DateTime<Utc>> {
        self.updated_at.map(|t| t.trunc_subsecs(0))
    }
}

/// Accepts either a link object (`{"sys": {"id": ..}}`) or a bare id string.
fn link_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct LinkSys {
        id: String,
    }
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Link { sys: LinkSys },
        Id(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Link { sys } => sys.id,
        Raw::Id(id) => id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de> + Default"))]
pub(crate) struct RawEntry<F> {
    pub(crate) sys: SystemProperties,
    #[serde(default = "default_fields")]
    pub(crate) fields: F,
}

fn default_fields<F: Default>() -> F {
    F::default()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawEntry<AssetFields>")]
pub struct Asset {
    pub sys: SystemProperties,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file: Option<AssetFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AssetFields {
    title: Option<String>,
    description: Option<String>,
    file: Option<AssetFile>,
}

impl From<RawEntry<AssetFields>> for Asset {
    fn from(raw: RawEntry<AssetFields>) -> Self {
        Self {
            sys: raw.sys,
            title: raw.fields.title,
            description: raw.fields.description,
            file: raw.fields.file,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawEntry<CategoryFields>")]
pub struct Category {
    pub sys: SystemProperties,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CategoryFields {
    title: String,
    slug: String,
    description: Option<String>,
}

impl From<RawEntry<CategoryFields>> for Category {
    fn from(raw: RawEntry<CategoryFields>) -> Self {
        Self {
            sys: raw.sys,
            title: raw.fields.title,
            slug: raw.fields.slug,
            description: raw.fields.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawEntry<CourseFields>")]
pub struct Course {
    pub sys: SystemProperties,
    pub title: String,
    pub slug: String,
    pub image: Option<Asset>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub duration: Option<u32>,
    pub skill_level: Option<String>,
    pub lessons: Vec<Lesson>,
    pub categories: Vec<Category>,
}

impl Course {
    /// Lesson by slug, compared lowercased.
    pub fn lesson(&self, slug: &str) -> Option<&Lesson> {
        let slug = slug.to_lowercase();
        self.lessons.iter().find(|l| l.slug == slug)
    }

    /// Slug of the lesson following `lesson`, if any.
    pub fn next_lesson_slug(&self, lesson: &Lesson) -> Option<&str> {
        self.lessons
            .iter()
            .skip_while(|l| l.sys.id != lesson.sys.id)
            .nth(1)
            .map(|l| l.slug.as_str())
    }

    pub fn in_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c.slug == slug)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct CourseFields {
    title: String,
    slug: String,
    image: Option<Asset>,
    short_description: Option<String>,
    description: Option<String>,
    duration: Option<u32>,
    skill_level: Option<String>,
    lessons: Vec<Lesson>,
    categories: Vec<Category>,
}

impl From<RawEntry<CourseFields>> for Course {
    fn from(raw: RawEntry<CourseFields>) -> Self {
        let f = raw.fields;
        Self {
            sys: raw.sys,
            title: f.title,
            slug: f.slug,
            image: f.image,
            short_description: f.short_description,
            description: f.description,
            duration: f.duration,
            skill_level: f.skill_level,
            lessons: f.lessons,
            categories: f.categories,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawEntry<LessonFields>")]
pub struct Lesson {
    pub sys: SystemProperties,
    pub title: String,
    pub slug: String,
    pub modules: Vec<LessonModule>,
}

impl Lesson {
    /// System properties of the lesson followed by those of its modules.
    pub fn system_properties(&self) -> Vec<SystemProperties> {
        std::iter::once(self.sys.clone())
            .chain(self.modules.iter().map(|m| m.sys().clone()))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LessonFields {
    title: String,
    slug: String,
    modules: Vec<serde_json::Value>,
}

impl From<RawEntry<LessonFields>> for Lesson {
    fn from(raw: RawEntry<LessonFields>) -> Self {
        Self {
            sys: raw.sys,
            title: raw.fields.title,
            slug: raw.fields.slug,
            modules: ModuleRegistry::<LessonModule>::lesson_modules().decode_all(raw.fields.modules),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawEntry<LayoutFields>")]
pub struct Layout {
    pub sys: SystemProperties,
    pub title: String,
    pub slug: String,
    pub content_modules: Vec<LayoutModule>,
}

impl Layout {
    pub fn system_properties(&self) -> Vec<SystemProperties> {
        std::iter::once(self.sys.clone())
            .chain(self.content_modules.iter().map(|m| m.sys().clone()))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct LayoutFields {
    title: String,
    slug: String,
    content_modules: Vec<serde_json::Value>,
}

impl From<RawEntry<LayoutFields>> for Layout {
    fn from(raw: RawEntry<LayoutFields>) -> Self {
        Self {
            sys: raw.sys,
            title: raw.fields.title,
            slug: raw.fields.slug,
            content_modules: ModuleRegistry::<LayoutModule>::layout_modules().decode_all(raw.fields.content_modules),
        }
    }
}

/// A space and the locales it defines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub name: String,
    #[serde(default)]
    pub locales: Vec<Locale>,
}

impl Space {
    pub fn locale(&self, code: &str) -> Option<&Locale> {
        self.locales.iter().find(|l| l.code == code)
    }

    pub fn default_locale(&self) -> Option<&Locale> {
        self.locales.iter().find(|l| l.default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_code: Option<String>,
}
