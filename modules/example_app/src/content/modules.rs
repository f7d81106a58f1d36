//! Polymorphic page modules and the registry that decodes them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::content::models::{Asset, Course, RawEntry, SystemProperties};

/// Decodes one entry into a module variant.
pub type ModuleDecoder<M> = fn(Value) -> Result<M, serde_json::Error>;

/// Maps a content type id (the discriminator found at `sys.contentType`) to
/// the decoder for that module variant.
pub struct ModuleRegistry<M> {
    decoders: HashMap<&'static str, ModuleDecoder<M>>,
}

impl<M> Default for ModuleRegistry<M> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<M> ModuleRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, content_type: &'static str, decoder: ModuleDecoder<M>) -> Self {
        self.decoders.insert(content_type, decoder);
        self
    }

    pub fn discriminator(entry: &Value) -> Option<&str> {
        entry.pointer("/sys/contentType/sys/id")?.as_str()
    }

    /// Decode one entry; unknown discriminators and undecodable entries yield `None`.
    pub fn decode(&self, entry: Value) -> Option<M> {
        let Some(kind) = Self::discriminator(&entry) else {
            debug!("Skipping module without content type");
            return None;
        };
        let Some(decoder) = self.decoders.get(kind) else {
            debug!(content_type = kind, "Skipping module with unknown content type");
            return None;
        };
        let kind = kind.to_string();
        match decoder(entry) {
            Ok(module) => Some(module),
            Err(e) => {
                warn!(content_type = %kind, error = %e, "Failed to decode module");
                None
            }
        }
    }

    pub fn decode_all(&self, entries: Vec<Value>) -> Vec<M> {
        entries.into_iter().filter_map(|e| self.decode(e)).collect()
    }
}

impl ModuleRegistry<LessonModule> {
    pub fn lesson_modules() -> Self {
        Self::new()
            .register("lessonCopy", |v| {
                serde_json::from_value(v).map(LessonModule::Copy)
            })
            .register("lessonImage", |v| {
                serde_json::from_value(v).map(LessonModule::Image)
            })
            .register("lessonCodeSnippets", |v| {
                serde_json::from_value(v).map(LessonModule::CodeSnippets)
            })
    }
}

impl ModuleRegistry<LayoutModule> {
    pub fn layout_modules() -> Self {
        Self::new()
            .register("layoutCopy", |v| {
                serde_json::from_value(v).map(LayoutModule::Copy)
            })
            .register("layoutHeroImage", |v| {
                serde_json::from_value(v).map(LayoutModule::HeroImage)
            })
            .register("layoutHighlightedCourse", |v| {
                serde_json::from_value(v).map(LayoutModule::HighlightedCourse)
            })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum LessonModule {
    #[serde(rename = "lessonCopy")]
    Copy(LessonCopy),
    #[serde(rename = "lessonImage")]
    Image(LessonImage),
    #[serde(rename = "lessonCodeSnippets")]
    CodeSnippets(LessonCodeSnippets),
}

impl LessonModule {
    pub fn sys(&self) -> &SystemProperties {
        match self {
            LessonModule::Copy(m) => &m.sys,
            LessonModule::Image(m) => &m.sys,
            LessonModule::CodeSnippets(m) => &m.sys,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum LayoutModule {
    #[serde(rename = "layoutCopy")]
    Copy(LayoutCopy),
    #[serde(rename = "layoutHeroImage")]
    HeroImage(LayoutHeroImage),
    #[serde(rename = "layoutHighlightedCourse")]
    HighlightedCourse(LayoutHighlightedCourse),
}

impl LayoutModule {
    pub fn sys(&self) -> &SystemProperties {
        match self {
            LayoutModule::Copy(m) => &m.sys,
            LayoutModule::HeroImage(m) => &m.sys,
            LayoutModule::HighlightedCourse(m) => &m.sys,
        }
    }
}

// Every module is an entry whose fields are flattened next to `sys`.
macro_rules! module_entry {
    ($name:ident, $fields:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Debug, Clone, Serialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub sys: SystemProperties,
            $(pub $field: $ty,)*
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawEntry::<$fields>::deserialize(deserializer).map(Self::from)
            }
        }

        #[derive(Debug, Default, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub(crate) struct $fields {
            $($field: $ty,)*
        }

        impl From<RawEntry<$fields>> for $name {
            fn from(raw: RawEntry<$fields>) -> Self {
                Self {
                    sys: raw.sys,
                    $($field: raw.fields.$field,)*
                }
            }
        }
    };
}

module_entry!(LessonCopy, LessonCopyFields {
    title: String,
    copy: String,
});

module_entry!(LessonImage, LessonImageFields {
    title: String,
    image: Option<Asset>,
    caption: Option<String>,
});

module_entry!(LessonCodeSnippets, LessonCodeSnippetsFields {
    title: String,
    curl: Option<String>,
    dot_net: Option<String>,
    javascript: Option<String>,
    java: Option<String>,
    java_android: Option<String>,
    php: Option<String>,
    python: Option<String>,
    ruby: Option<String>,
    swift: Option<String>,
});

module_entry!(LayoutCopy, LayoutCopyFields {
    title: String,
    headline: Option<String>,
    copy: Option<String>,
    cta_title: Option<String>,
    cta_link: Option<String>,
    visual_style: Option<String>,
});

module_entry!(LayoutHeroImage, LayoutHeroImageFields {
    title: String,
    headline: Option<String>,
    background_image: Option<Asset>,
});

module_entry!(LayoutHighlightedCourse, LayoutHighlightedCourseFields {
    title: String,
    course: Option<Course>,
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(content_type: &str, id: &str, fields: Value) -> Value {
        json!({
            "sys": {
                "id": id,
                "contentType": { "sys": { "type": "Link", "linkType": "ContentType", "id": content_type } }
            },
            "fields": fields
        })
    }

    #[test]
    fn registry_decodes_known_and_skips_unknown_modules() {
        let registry = ModuleRegistry::<LessonModule>::lesson_modules();
        let modules = registry.decode_all(vec![
            entry("lessonCopy", "m1", json!({ "title": "Intro", "copy": "Hello" })),
            entry("lessonVideo", "m2", json!({ "title": "Unsupported" })),
            entry("lessonCodeSnippets", "m3", json!({ "title": "Code", "curl": "curl x", "dotNet": "var x;" })),
            json!({ "sys": { "id": "no-type" } }),
        ]);

        assert_eq!(modules.len(), 2);
        match &modules[0] {
            LessonModule::Copy(copy) => assert_eq!(copy.copy, "Hello"),
            other => panic!("unexpected module {other:?}"),
        }
        match &modules[1] {
            LessonModule::CodeSnippets(code) => {
                assert_eq!(code.dot_net.as_deref(), Some("var x;"));
                assert_eq!(code.sys.id, "m3");
            }
            other => panic!("unexpected module {other:?}"),
        }
    }

    #[test]
    fn layout_modules_are_serialized_with_discriminator() {
        let registry = ModuleRegistry::<LayoutModule>::layout_modules();
        let module = registry
            .decode(entry("layoutHeroImage", "h1", json!({ "title": "Hero", "headline": "Welcome" })))
            .unwrap();

        assert_eq!(module.sys().id, "h1");
        let out = serde_json::to_value(&module).unwrap();
        assert_eq!(out["type"], "layoutHeroImage");
        assert_eq!(out["headline"], "Welcome");
    }

    #[test]
    fn registry_is_open_for_new_variants() {
        let registry: ModuleRegistry<String> =
            ModuleRegistry::new().register("note", |v| serde_json::from_value(v["fields"]["text"].clone()));

        let decoded = registry.decode(entry("note", "n1", json!({ "text": "hi" })));
        assert_eq!(decoded.as_deref(), Some("hi"));
    }
}
