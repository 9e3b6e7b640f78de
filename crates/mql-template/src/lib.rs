/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tagged command templates for document databases.
//!
//! A template is JSON-like command text with `<tag>` placeholders. Tags are
//! filled in two ways:
//!
//! - Structurally, with a collection name or a field path derived from a
//!   [`FieldPath`], including the positional update forms `$[a]`, `$[]`
//!   and `$`.
//! - By value, with a literal supplied per render via [`Template::tag`].
//!
//! Rendering checks that every tag was filled and that no fill targeted a
//! tag the template does not contain, then yields plain text, a list of
//! pipeline stages, or a list of array filters.
//!
//! # Caching
//!
//! Structural replacements only depend on the template text and the paths
//! supplied, so the expanded text is stored in a [`TemplateCache`] on the
//! first successful render. Later templates built from the same text start
//! from the expanded version and skip the structural work. Templates that
//! had stages appended with [`Template::append_stage`] are never cached.
//!
//! # Example
//!
//! ```ignore
//! use mql_template::{FieldPath, Template};
//!
//! let mut template = Template::new(
//!     r#"[{ "$match": { "<Authors.$[].Name>": "<name>" } }]"#,
//! )?;
//!
//! template
//!     .pos_all(&FieldPath::parse("Authors[0].Name")?)
//!     .tag("name", "\"Eckhart\"");
//!
//! let stages = template.render_stages()?;
//! assert_eq!(stages.len(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod output;
pub mod path;
pub mod render;
pub mod scanner;
pub mod template;
pub mod typed;

// Re-export main types at crate root
pub use cache::{CacheConfig, TemplateCache, cache_key};
pub use error::{ErrorKind, TemplateError, TemplateResult};
pub use output::{ArrayFilter, Document, Pipeline, parse_documents};
pub use path::{Entity, FieldPath, PathForm, Segment, filtered_identifier};
pub use scanner::{TagSet, scan_tags};
pub use template::Template;
pub use typed::TypedTemplate;
