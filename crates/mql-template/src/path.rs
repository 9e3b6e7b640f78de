/*
 * path.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Field paths and positional operator forms.
//!
//! A [`FieldPath`] describes an access into a document such as
//! `Authors[2].Name`: an ordered list of field names, each optionally
//! carrying a list index. The path can be rendered in the forms used by
//! update and aggregation commands:
//!
//! | form | `Authors[2].Name` |
//! |---|---|
//! | [`PathForm::Property`] | `Name` |
//! | [`PathForm::Dotted`] | `Authors.Name` |
//! | [`PathForm::Filtered`] | `Authors.$[c].Name` |
//! | [`PathForm::FilteredAt(0)`](PathForm::FilteredAt) | `Authors.$[a].Name` |
//! | [`PathForm::All`] | `Authors.$[].Name` |
//! | [`PathForm::First`] | `Authors.$.Name` |
//! | [`PathForm::Elements`] | `Name` |
//! | [`PathForm::ElementsAt(1)`](PathForm::ElementsAt) | `b.Authors.Name` |
//!
//! How a type maps to its collection name is left to the [`Entity`] trait.

use std::fmt;
use std::str::FromStr;

use crate::error::{TemplateError, TemplateResult};

/// A type stored in a named collection.
pub trait Entity {
    /// The collection documents of this type live in.
    fn collection_name() -> String;
}

/// One field access, optionally indexing into a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: String,
    pub index: Option<usize>,
}

/// The positional form a [`FieldPath`] is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathForm {
    /// The last field name only.
    Property,
    /// Field names joined with `.`, indices dropped.
    Dotted,
    /// Each index becomes a filtered identifier: `$[a]`, `$[b]`, ...
    Filtered,
    /// Like `Filtered`, but every index is replaced by the given one.
    FilteredAt(usize),
    /// Each index becomes the all-elements operator `$[]`.
    All,
    /// Each index becomes the first-match operator `$`.
    First,
    /// Everything up to and including the last indexed field is dropped.
    Elements,
    /// The dotted path prefixed with the given filtered identifier.
    ElementsAt(usize),
}

/// A field access path such as `Authors[2].Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Start a path at the given field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment {
                name: name.into(),
                index: None,
            }],
        }
    }

    /// Append a plain field access.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment {
            name: name.into(),
            index: None,
        });
        self
    }

    /// Index into the most recently added field.
    pub fn indexed(mut self, index: usize) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.index = Some(index);
        }
        self
    }

    /// Parse an access expression like `Authors[2].Name`.
    pub fn parse(expr: &str) -> TemplateResult<Self> {
        let invalid = |message: &str| TemplateError::InvalidPath {
            path: expr.to_string(),
            message: message.to_string(),
        };

        let expr_trimmed = expr.trim();
        if expr_trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for part in expr_trimmed.split('.') {
            let (name, index) = match part.find('[') {
                Some(open) => {
                    let rest = &part[open + 1..];
                    let digits = rest
                        .strip_suffix(']')
                        .ok_or_else(|| invalid("unbalanced '[' in field access"))?;
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| invalid("list index must be a non-negative integer"))?;
                    (&part[..open], Some(index))
                }
                None if part.contains(']') => {
                    return Err(invalid("unbalanced ']' in field access"));
                }
                None => (part, None),
            };

            let name = name.trim();
            if name.is_empty() {
                return Err(invalid("empty field name"));
            }
            segments.push(Segment {
                name: name.to_string(),
                index,
            });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether any field in the path is indexed.
    pub fn has_index(&self) -> bool {
        self.segments.iter().any(|s| s.index.is_some())
    }

    /// Render the path in the requested form.
    pub fn render(&self, form: PathForm) -> String {
        match form {
            PathForm::Property => self.property(),
            PathForm::Dotted => self.dotted(),
            PathForm::Filtered => self.positional(|i| format!("$[{}]", filtered_identifier(i))),
            PathForm::FilteredAt(at) => {
                let ident = filtered_identifier(at);
                self.positional(|_| format!("$[{ident}]"))
            }
            PathForm::All => self.positional(|_| "$[]".to_string()),
            PathForm::First => self.positional(|_| "$".to_string()),
            PathForm::Elements => self.elements(),
            PathForm::ElementsAt(at) => format!("{}.{}", filtered_identifier(at), self.dotted()),
        }
    }

    /// `Authors[2].Name` → `Name`
    pub fn property(&self) -> String {
        self.segments
            .last()
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    /// `Authors[2].Name` → `Authors.Name`
    pub fn dotted(&self) -> String {
        join_names(&self.segments)
    }

    /// `Authors[2].Name` → `Authors.$[c].Name`
    pub fn pos_filtered(&self) -> String {
        self.render(PathForm::Filtered)
    }

    /// `Authors[2].Name` with index 0 → `Authors.$[a].Name`
    pub fn pos_filtered_at(&self, index: usize) -> String {
        self.render(PathForm::FilteredAt(index))
    }

    /// `Authors[2].Name` → `Authors.$[].Name`
    pub fn pos_all(&self) -> String {
        self.render(PathForm::All)
    }

    /// `Authors[2].Name` → `Authors.$.Name`
    pub fn pos_first(&self) -> String {
        self.render(PathForm::First)
    }

    /// `Authors[2].Name` → `Name`; a path without an index stays dotted.
    pub fn elements(&self) -> String {
        match self.segments.iter().rposition(|s| s.index.is_some()) {
            Some(last_indexed) => join_names(&self.segments[last_indexed + 1..]),
            None => self.dotted(),
        }
    }

    /// `Name` with index 0 → `a.Name`
    pub fn elements_at(&self, index: usize) -> String {
        self.render(PathForm::ElementsAt(index))
    }

    fn positional(&self, operator: impl Fn(usize) -> String) -> String {
        let mut parts = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            parts.push(segment.name.clone());
            if let Some(index) = segment.index {
                parts.push(operator(index));
            }
        }
        parts.join(".")
    }
}

fn join_names(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

impl FromStr for FieldPath {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if let Some(index) = segment.index {
                write!(f, "[{index}]")?;
            }
        }
        Ok(())
    }
}

/// Letter code for a zero-based list index, used as a filtered identifier.
///
/// Bijective base 26: `0 → a`, `25 → z`, `26 → aa`, `27 → ab`, `701 → zz`,
/// `702 → aaa`.
pub fn filtered_identifier(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index;
    loop {
        letters.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
