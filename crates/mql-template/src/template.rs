/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag resolution.
//!
//! A [`Template`] is built from source text containing `<tag>` tokens and
//! tracks which of those tokens have been satisfied. There are two kinds of
//! replacement:
//!
//! - **Structural** replacements ([`Template::collection`],
//!   [`Template::path`], [`Template::pos_filtered`], ...) substitute a tag
//!   with the collection name or field path it names. They are folded into
//!   the working text immediately and the result is cacheable, because it
//!   only depends on the source text and the paths supplied.
//! - **Value** replacements ([`Template::tag`]) substitute a tag with a
//!   caller supplied literal. They are recorded and only applied to a copy
//!   of the text at render time, so they never leak into the cache.
//!
//! When a template is constructed from source text that an earlier template
//! already rendered, the expanded text is taken from the [`TemplateCache`]
//! and structural calls become no-ops.

use hashlink::LinkedHashMap;
use tracing::{debug, trace};

use crate::cache::{TemplateCache, cache_key};
use crate::error::{TemplateError, TemplateResult};
use crate::path::{Entity, FieldPath, PathForm};
use crate::scanner::{TagSet, is_empty_array, scan_into, scan_tags, tag_token};

/// A tagged command template being compiled.
#[derive(Debug, Clone)]
pub struct Template {
    /// The text passed at construction, untouched.
    pub(crate) source: String,
    pub(crate) cache: TemplateCache,
    pub(crate) cache_key: u64,
    pub(crate) cache_hit: bool,

    /// Working text with structural replacements applied.
    pub(crate) base: String,
    /// Stages appended to this instance, joined onto `base` at render time.
    pub(crate) stages: Vec<String>,

    pub(crate) goal_tags: TagSet,
    /// Tags that occur in appended stages.
    pub(crate) stage_tags: TagSet,
    pub(crate) replaced_tags: TagSet,
    pub(crate) missing_tags: TagSet,
    pub(crate) value_tags: LinkedHashMap<String, String>,
}

impl Template {
    /// Create a template backed by the process-wide cache.
    ///
    /// # Errors
    ///
    /// Fails if `source` is blank, or if it contains no `<tag>` tokens and
    /// is not the empty array `[]`.
    pub fn new(source: impl Into<String>) -> TemplateResult<Self> {
        Self::with_cache(source, TemplateCache::global())
    }

    /// Create a template backed by the given cache.
    pub fn with_cache(source: impl Into<String>, cache: &TemplateCache) -> TemplateResult<Self> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(TemplateError::EmptyTemplate);
        }

        let key = cache_key(&source);
        let (base, cache_hit) = match cache.lookup(key, &source) {
            Some(expanded) => (expanded.to_string(), true),
            None => (source.trim().to_string(), false),
        };

        let goal_tags = if is_empty_array(&base) {
            TagSet::new()
        } else {
            let tags = scan_tags(&base);
            if !cache_hit && tags.is_empty() {
                return Err(TemplateError::NoTags);
            }
            tags
        };

        debug!(
            key,
            cache_hit,
            tags = goal_tags.len(),
            "template constructed"
        );

        Ok(Self {
            source,
            cache: cache.clone(),
            cache_key: key,
            cache_hit,
            base,
            stages: Vec::new(),
            goal_tags,
            stage_tags: TagSet::new(),
            replaced_tags: TagSet::new(),
            missing_tags: TagSet::new(),
            value_tags: LinkedHashMap::new(),
        })
    }

    /// Replace `<path>` with `path` everywhere in the template.
    ///
    /// This is the primitive behind every structural replacement. A path
    /// that does not occur as a tag is recorded as missing and reported at
    /// render time.
    pub fn resolve(&mut self, path: &str) -> &mut Self {
        let token = tag_token(path);

        if self.cache_hit {
            // The cached text already has this replaced; only stages added
            // to this instance can still carry the tag.
            if self.stage_tags.contains(&token) {
                self.replace_in_stages(&token, path);
                self.replaced_tags.insert(token);
            }
            return self;
        }

        if !self.goal_tags.contains(&token) {
            trace!(tag = %token, "structural tag not found in template");
            self.missing_tags.insert(token);
            return self;
        }

        self.base = self.base.replace(&token, path);
        self.replace_in_stages(&token, path);
        trace!(tag = %token, "structural tag replaced");
        self.replaced_tags.insert(token);
        self
    }

    fn replace_in_stages(&mut self, token: &str, path: &str) {
        for stage in &mut self.stages {
            if stage.contains(token) {
                *stage = stage.replace(token, path);
            }
        }
    }

    /// Replace `<path>` with the path rendered in the given form.
    pub fn resolve_path(&mut self, path: &FieldPath, form: PathForm) -> &mut Self {
        if self.cache_hit && self.stage_tags.is_empty() {
            return self;
        }
        let rendered = path.render(form);
        self.resolve(&rendered)
    }

    /// Replace a tag such as `<Book>` with the collection name of `E`.
    pub fn collection<E: Entity>(&mut self) -> &mut Self {
        if self.cache_hit && self.stage_tags.is_empty() {
            return self;
        }
        self.resolve(&E::collection_name())
    }

    /// Replace a tag such as `<Name>` with the last field of the path.
    pub fn property(&mut self, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::Property)
    }

    /// Replace the property name tags of several paths at once.
    ///
    /// # Errors
    ///
    /// Fails with [`TemplateError::NoPaths`] if `paths` is empty.
    pub fn properties(&mut self, paths: &[FieldPath]) -> TemplateResult<&mut Self> {
        self.resolve_all(paths, PathForm::Property, "property names")
    }

    /// Replace a tag such as `<Authors.Name>` with the dotted path.
    pub fn path(&mut self, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::Dotted)
    }

    /// Replace the dotted path tags of several paths at once.
    ///
    /// # Errors
    ///
    /// Fails with [`TemplateError::NoPaths`] if `paths` is empty.
    pub fn paths(&mut self, paths: &[FieldPath]) -> TemplateResult<&mut Self> {
        self.resolve_all(paths, PathForm::Dotted, "property paths")
    }

    /// Replace a tag such as `<Authors.$[a].Name>`. Index 0 becomes `$[a]`.
    pub fn pos_filtered(&mut self, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::Filtered)
    }

    /// Like [`Template::pos_filtered`], with `index` in place of the
    /// indices written in the path.
    pub fn pos_filtered_at(&mut self, index: usize, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::FilteredAt(index))
    }

    /// Replace a tag such as `<Authors.$[].Name>`.
    pub fn pos_all(&mut self, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::All)
    }

    /// Replace a tag such as `<Authors.$.Name>`.
    pub fn pos_first(&mut self, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::First)
    }

    /// Replace a tag with the part of the path below its last list index,
    /// e.g. `<Name>` for `Authors[0].Name`.
    pub fn elements(&mut self, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::Elements)
    }

    /// Replace a tag such as `<a.Name>`, the form used inside array filters.
    pub fn elements_at(&mut self, index: usize, path: &FieldPath) -> &mut Self {
        self.resolve_path(path, PathForm::ElementsAt(index))
    }

    fn resolve_all(
        &mut self,
        paths: &[FieldPath],
        form: PathForm,
        what: &'static str,
    ) -> TemplateResult<&mut Self> {
        if paths.is_empty() {
            return Err(TemplateError::NoPaths { what });
        }
        for path in paths {
            self.resolve_path(path, form);
        }
        Ok(self)
    }

    /// Set the literal value for a tag such as `<search_term>`.
    ///
    /// `name` is given without brackets. Values can be reassigned until the
    /// template is rendered, and again between renders.
    pub fn tag(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let token = tag_token(name);
        if self.goal_tags.contains(&token) {
            self.value_tags.insert(token, value.into());
        } else {
            trace!(tag = %token, "value tag not found in template");
            self.missing_tags.insert(token);
        }
        self
    }

    /// Append a pipeline stage to an array template.
    ///
    /// To start a pipeline from scratch, construct the template from `"[]"`.
    /// A template with appended stages is never written to or read from the
    /// cache again.
    ///
    /// # Errors
    ///
    /// Fails with [`TemplateError::NotAnArray`] if the template is not an
    /// array, and with [`TemplateError::InvalidStage`] if `stage` is not
    /// wrapped in `{` and `}`.
    pub fn append_stage(&mut self, stage: &str) -> TemplateResult<()> {
        if !(self.base.starts_with('[') && self.base.ends_with(']')) {
            return Err(TemplateError::NotAnArray);
        }

        let stage = stage.trim();
        if !(stage.starts_with('{') && stage.ends_with('}')) {
            return Err(TemplateError::InvalidStage {
                stage: stage.to_string(),
            });
        }

        scan_into(stage, &mut self.stage_tags);
        scan_into(stage, &mut self.goal_tags);
        self.stages.push(stage.to_string());

        debug!(
            key = self.cache_key,
            stages = self.stages.len(),
            "pipeline stage appended"
        );
        Ok(())
    }

    /// Every tag found in the template and its appended stages.
    pub fn goal_tags(&self) -> &TagSet {
        &self.goal_tags
    }

    /// Tags satisfied so far. Value tags are counted once rendered.
    pub fn replaced_tags(&self) -> &TagSet {
        &self.replaced_tags
    }

    /// Tags that were resolved or assigned but do not occur in the template.
    pub fn missing_tags(&self) -> &TagSet {
        &self.missing_tags
    }

    /// Whether the working text came from, or has been written to, the cache.
    pub fn is_cache_hit(&self) -> bool {
        self.cache_hit
    }

    pub fn has_appended_stages(&self) -> bool {
        !self.stages.is_empty()
    }

    pub fn cache_key(&self) -> u64 {
        self.cache_key
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
