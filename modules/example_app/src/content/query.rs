/// Default link depth applied by the API when `include` is not given.
pub const DEFAULT_INCLUDE: u32 = 1;
/// Largest depth the API accepts.
pub const MAX_INCLUDE: u32 = 10;

/// Builder for the query string of an entries request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    content_type: Option<String>,
    field_equals: Vec<(String, String)>,
    include: Option<u32>,
    locale: Option<String>,
    order: Option<String>,
    ids: Vec<String>,
}

impl EntryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Equality filter on `fields.<field>`.
    pub fn field_equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_equals.push((field.into(), value.into()));
        self
    }

    /// Link depth to resolve, clamped to the API maximum.
    pub fn include(mut self, depth: u32) -> Self {
        self.include = Some(depth.min(MAX_INCLUDE));
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Order expression such as `-sys.createdAt`.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Restrict to the given entry ids (`sys.id[in]`).
    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn include_depth(&self) -> u32 {
        self.include.unwrap_or(DEFAULT_INCLUDE)
    }

    pub fn content_type_id(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn field_filters(&self) -> &[(String, String)] {
        &self.field_equals
    }

    pub fn id_filter(&self) -> &[String] {
        &self.ids
    }

    /// Query parameters in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ct) = &self.content_type {
            params.push(("content_type".to_string(), ct.clone()));
        }
        for (field, value) in &self.field_equals {
            params.push((format!("fields.{field}"), value.clone()));
        }
        if let Some(include) = self.include {
            params.push(("include".to_string(), include.to_string()));
        }
        if let Some(locale) = &self.locale {
            params.push(("locale".to_string(), locale.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        if !self.ids.is_empty() {
            params.push(("sys.id[in]".to_string(), self.ids.join(",")));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_params_in_order() {
        let query = EntryQuery::new()
            .content_type("course")
            .field_equals("slug", "hello-world")
            .include(5)
            .locale("de-DE")
            .order("-sys.createdAt");

        let params = query.to_params();
        let as_pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        assert_eq!(
            as_pairs,
            vec![
                ("content_type", "course"),
                ("fields.slug", "hello-world"),
                ("include", "5"),
                ("locale", "de-DE"),
                ("order", "-sys.createdAt"),
            ]
        );
    }

    #[test]
    fn id_filter_joins_with_commas() {
        let params = EntryQuery::new().ids(["a", "b", "c"]).to_params();
        assert_eq!(params, vec![("sys.id[in]".to_string(), "a,b,c".to_string())]);
    }

    #[test]
    fn include_depth_defaults_and_clamps() {
        assert_eq!(EntryQuery::new().include_depth(), DEFAULT_INCLUDE);
        assert_eq!(EntryQuery::new().include(50).include_depth(), MAX_INCLUDE);
    }
}
