/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template rendering.
//!
//! Rendering joins appended stages onto the working text, applies value
//! tags to a scratch copy and checks that every tag was accounted for.
//! The first successful render of a template without appended stages
//! publishes its working text to the cache.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::output::{ArrayFilter, Document, parse_documents};
use crate::scanner::{TagSet, substitute};
use crate::template::Template;

impl Template {
    /// Render the template to text.
    ///
    /// Can be called repeatedly; value tags may be reassigned in between.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::MissingTags`] if a tag was resolved or assigned
    ///   that does not occur in the template.
    /// - [`TemplateError::UnresolvedTags`] if a tag in the template was
    ///   never resolved or assigned.
    pub fn render_text(&mut self) -> TemplateResult<String> {
        let text = {
            let composed = self.compose();
            substitute(&composed, |token| self.value_tags.get(token).cloned()).into_owned()
        };

        for token in self.value_tags.keys() {
            if !self.replaced_tags.contains(token) {
                self.replaced_tags.insert(token.clone());
            }
        }

        if !self.missing_tags.is_empty() {
            return Err(TemplateError::MissingTags {
                tags: self.missing_tags.clone(),
            });
        }

        let unresolved: TagSet = self
            .goal_tags
            .iter()
            .filter(|tag| !self.replaced_tags.contains(*tag))
            .cloned()
            .collect();
        if !unresolved.is_empty() {
            return Err(TemplateError::UnresolvedTags { tags: unresolved });
        }

        if !self.cache_hit && self.stages.is_empty() {
            self.cache.store(self.cache_key, &self.source, &self.base);
            self.cache_hit = true;
        }

        Ok(text)
    }

    /// Render the template and parse it as an array of pipeline stages.
    ///
    /// # Errors
    ///
    /// Everything [`Template::render_text`] reports, plus
    /// [`TemplateError::Parse`] or [`TemplateError::Format`] when the text
    /// is not an array of objects in JSON or shell syntax.
    pub fn render_stages(&mut self) -> TemplateResult<Vec<Document>> {
        let text = self.render_text()?;
        let stages = parse_documents(&text)?;
        debug!(key = self.cache_key, stages = stages.len(), "rendered stages");
        Ok(stages)
    }

    /// Render the template and parse it as array filters over `T`.
    pub fn render_array_filters<T>(&mut self) -> TemplateResult<Vec<ArrayFilter<T>>> {
        let text = self.render_text()?;
        Ok(parse_documents(&text)?
            .into_iter()
            .map(ArrayFilter::new)
            .collect())
    }

    /// Working text with appended stages joined in.
    pub(crate) fn compose(&self) -> Cow<'_, str> {
        if self.stages.is_empty() {
            return Cow::Borrowed(&self.base);
        }

        // append_stage guarantees base is `[...]`
        let head = &self.base[..self.base.len() - 1];
        let mut text = String::with_capacity(
            self.base.len() + self.stages.iter().map(|s| s.len() + 1).sum::<usize>(),
        );
        text.push_str(head);
        if !head[1..].trim().is_empty() {
            text.push(',');
        }
        text.push_str(&self.stages.join(","));
        text.push(']');
        Cow::Owned(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::TemplateCache;
    use crate::error::TemplateError;
    use crate::template::Template;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_values() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("<A> and <B>", &cache).unwrap();
        template.tag("A", "x").tag("B", "y");
        assert_eq!(template.render_text().unwrap(), "x and y");
    }

    #[test]
    fn test_render_reports_unresolved() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("<A>", &cache).unwrap();
        let err = template.render_text().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Replacements for the following tags are required: [<A>]"
        );
    }

    #[test]
    fn test_render_reports_missing_before_unresolved() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("<A>", &cache).unwrap();
        template.tag("A", "a").tag("Z", "z");
        let err = template.render_text().unwrap_err();
        assert!(matches!(err, TemplateError::MissingTags { .. }));
        assert_eq!(
            err.to_string(),
            "The following tags were missing from the template: [<Z>]"
        );
    }

    #[test]
    fn test_render_is_repeatable() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("{ \"n\": <n> }", &cache).unwrap();
        template.tag("n", "1");
        let first = template.render_text().unwrap();
        assert_eq!(first, template.render_text().unwrap());

        template.tag("n", "2");
        assert_eq!(template.render_text().unwrap(), "{ \"n\": 2 }");
    }

    #[test]
    fn test_value_containing_tag_is_not_rescanned() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("<A> <B>", &cache).unwrap();
        template.tag("A", "<B>").tag("B", "b");
        assert_eq!(template.render_text().unwrap(), "<B> b");
    }

    #[test]
    fn test_failed_render_is_not_cached() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("<A>", &cache).unwrap();
        assert!(template.render_text().is_err());
        assert!(cache.is_empty());
        assert!(!template.is_cache_hit());
    }

    #[test]
    fn test_append_stages_to_empty_array() {
        let cache = TemplateCache::new();
        let mut template = Template::with_cache("[]", &cache).unwrap();
        template.append_stage("{\"$match\":{}}").unwrap();
        template.append_stage("{\"$limit\":1}").unwrap();
        assert_eq!(
            template.render_text().unwrap(),
            "[{\"$match\":{}},{\"$limit\":1}]"
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_append_stage_to_populated_array() {
        let cache = TemplateCache::new();
        let mut template =
            Template::with_cache("[{\"$match\":{\"<Title>\":\"<title>\"}}]", &cache).unwrap();
        template.append_stage("{\"$limit\":<limit>}").unwrap();
        template.resolve("Title").tag("title", "Dune").tag("limit", "5");

        let stages = template.render_stages().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(
            template.render_text().unwrap(),
            "[{\"$match\":{\"Title\":\"Dune\"}},{\"$limit\":5}]"
        );
    }
}
