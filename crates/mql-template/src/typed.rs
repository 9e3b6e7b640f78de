/*
 * typed.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Templates tied to input and result document types.

use std::fmt;
use std::marker::PhantomData;

use crate::cache::TemplateCache;
use crate::error::TemplateResult;
use crate::output::{ArrayFilter, Document, Pipeline};
use crate::path::{Entity, FieldPath};
use crate::template::Template;

/// A [`Template`] whose rendered stages read `TInput` documents and produce
/// `TResult` documents.
pub struct TypedTemplate<TInput, TResult = TInput> {
    inner: Template,
    _types: PhantomData<fn(TInput) -> TResult>,
}

impl<TInput, TResult> TypedTemplate<TInput, TResult> {
    pub fn new(source: impl Into<String>) -> TemplateResult<Self> {
        Template::new(source).map(Self::from)
    }

    pub fn with_cache(source: impl Into<String>, cache: &TemplateCache) -> TemplateResult<Self> {
        Template::with_cache(source, cache).map(Self::from)
    }

    pub fn collection<E: Entity>(&mut self) -> &mut Self {
        self.inner.collection::<E>();
        self
    }

    pub fn resolve(&mut self, path: &str) -> &mut Self {
        self.inner.resolve(path);
        self
    }

    pub fn property(&mut self, path: &FieldPath) -> &mut Self {
        self.inner.property(path);
        self
    }

    pub fn properties(&mut self, paths: &[FieldPath]) -> TemplateResult<&mut Self> {
        self.inner.properties(paths)?;
        Ok(self)
    }

    pub fn path(&mut self, path: &FieldPath) -> &mut Self {
        self.inner.path(path);
        self
    }

    pub fn paths(&mut self, paths: &[FieldPath]) -> TemplateResult<&mut Self> {
        self.inner.paths(paths)?;
        Ok(self)
    }

    pub fn pos_filtered(&mut self, path: &FieldPath) -> &mut Self {
        self.inner.pos_filtered(path);
        self
    }

    pub fn pos_filtered_at(&mut self, index: usize, path: &FieldPath) -> &mut Self {
        self.inner.pos_filtered_at(index, path);
        self
    }

    pub fn pos_all(&mut self, path: &FieldPath) -> &mut Self {
        self.inner.pos_all(path);
        self
    }

    pub fn pos_first(&mut self, path: &FieldPath) -> &mut Self {
        self.inner.pos_first(path);
        self
    }

    pub fn elements(&mut self, path: &FieldPath) -> &mut Self {
        self.inner.elements(path);
        self
    }

    pub fn elements_at(&mut self, index: usize, path: &FieldPath) -> &mut Self {
        self.inner.elements_at(index, path);
        self
    }

    pub fn tag(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.inner.tag(name, value);
        self
    }

    pub fn append_stage(&mut self, stage: &str) -> TemplateResult<()> {
        self.inner.append_stage(stage)
    }

    pub fn render_text(&mut self) -> TemplateResult<String> {
        self.inner.render_text()
    }

    pub fn render_stages(&mut self) -> TemplateResult<Vec<Document>> {
        self.inner.render_stages()
    }

    /// Render to an aggregation pipeline.
    pub fn to_pipeline(&mut self) -> TemplateResult<Pipeline<TInput, TResult>> {
        self.inner.render_stages().map(Pipeline::new)
    }

    /// Render to array filters over the input type.
    pub fn to_array_filters(&mut self) -> TemplateResult<Vec<ArrayFilter<TInput>>> {
        self.inner.render_array_filters()
    }

    pub fn as_template(&self) -> &Template {
        &self.inner
    }

    pub fn into_template(self) -> Template {
        self.inner
    }
}

impl<TInput, TResult> Clone for TypedTemplate<TInput, TResult> {
    fn clone(&self) -> Self {
        Self::from(self.inner.clone())
    }
}

impl<TInput, TResult> fmt::Debug for TypedTemplate<TInput, TResult> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedTemplate")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<TInput, TResult> From<Template> for TypedTemplate<TInput, TResult> {
    fn from(inner: Template) -> Self {
        Self {
            inner,
            _types: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Author;
    struct AuthorSummary;

    impl Entity for Author {
        fn collection_name() -> String {
            "Author".to_string()
        }
    }

    #[test]
    fn test_typed_pipeline() {
        let cache = TemplateCache::new();
        let mut template: TypedTemplate<Author, AuthorSummary> = TypedTemplate::with_cache(
            r#"[{ "$match": { "<Age>": { "$gt": <age> } } }, { "$project": { "<Name>": 1 } }]"#,
            &cache,
        )
        .unwrap();

        template
            .properties(&[FieldPath::new("Age"), FieldPath::new("Name")])
            .unwrap()
            .tag("age", "30");

        let pipeline = template.to_pipeline().unwrap();
        assert_eq!(
            pipeline.to_json(),
            json!([
                { "$match": { "Age": { "$gt": 30 } } },
                { "$project": { "Name": 1 } }
            ])
        );
    }

    #[test]
    fn test_typed_array_filters() {
        let cache = TemplateCache::new();
        let mut template: TypedTemplate<Author> = TypedTemplate::with_cache(
            r#"[{ "<a.Name>": "<name>" }, { "<b.Age>": { "$gte": <age> } }]"#,
            &cache,
        )
        .unwrap();

        template
            .elements_at(0, &FieldPath::new("Name"))
            .elements_at(1, &FieldPath::new("Age"))
            .tag("name", "Eckhart")
            .tag("age", "40");

        let filters = template.to_array_filters().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].identifiers(), vec!["a".to_string()]);
        assert_eq!(filters[1].identifiers(), vec!["b".to_string()]);
    }

    #[test]
    fn test_clone_and_debug_without_bounds_on_document_types() {
        let cache = TemplateCache::new();
        let mut template: TypedTemplate<Author, AuthorSummary> =
            TypedTemplate::with_cache(r#"{ "<Name>": "<name>" }"#, &cache).unwrap();
        template.property(&FieldPath::new("Name"));

        let mut copy = template.clone();
        copy.tag("name", "Eckhart");
        template.tag("name", "Brian");

        assert_eq!(copy.render_text().unwrap(), r#"{ "Name": "Eckhart" }"#);
        assert_eq!(template.render_text().unwrap(), r#"{ "Name": "Brian" }"#);
        assert!(format!("{template:?}").starts_with("TypedTemplate"));
    }
}
