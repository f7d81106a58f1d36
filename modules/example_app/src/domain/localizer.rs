use std::collections::HashMap;

/// Translation tables compiled into the binary, one per supported locale.
const EMBEDDED: &[(&str, &str)] = &[
    ("en-US", include_str!("../../resources/locales/en-US.json")),
    ("de-DE", include_str!("../../resources/locales/de-DE.json")),
];

/// Static UI strings per locale. Lookups by locale code are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Localizer {
    tables: HashMap<String, HashMap<String, String>>,
}

impl Localizer {
    /// Tables shipped with the application.
    pub fn embedded() -> Result<Self, serde_json::Error> {
        Self::from_sources(EMBEDDED.iter().copied())
    }

    pub fn from_sources<'a, I>(sources: I) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut tables = HashMap::new();
        for (code, json) in sources {
            let table: HashMap<String, String> = serde_json::from_str(json)?;
            tables.insert(code.to_ascii_lowercase(), table);
        }
        Ok(Self { tables })
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.tables.contains_key(&locale.to_ascii_lowercase())
    }

    pub fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.tables
            .get(&locale.to_ascii_lowercase())?
            .get(key)
            .map(String::as_str)
    }

    /// Translation for `key`, or the key itself when missing.
    pub fn get(&self, locale: &str, key: &str) -> String {
        self.lookup(locale, key).unwrap_or(key).to_string()
    }

    /// `"<title> — <defaultTitle>"`, or just the default title.
    pub fn page_title(&self, locale: &str, title: Option<&str>) -> String {
        let default_title = self.get(locale, "defaultTitle");
        match title.filter(|t| !t.is_empty()) {
            Some(title) => format!("{title} — {default_title}"),
            None => default_title,
        }
    }
}
