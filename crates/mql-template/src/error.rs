/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and rendering.

use thiserror::Error;

use crate::scanner::TagSet;

/// Broad category of a [`TemplateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed an argument that can never be valid.
    InvalidArgument,
    /// The operation is not valid in the template's current state.
    InvalidOperation,
    /// Rendered text could not be read back as structured documents.
    Parse,
}

/// Errors that can occur while compiling or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The source text was empty or only whitespace.
    #[error("Unable to instantiate a template from an empty string")]
    EmptyTemplate,

    /// The source text contained no `<tag>` tokens.
    #[error("No replacement tags such as '<tagname>' were found in the supplied template string")]
    NoTags,

    /// A stage was appended to a template that is not an array.
    #[error(
        "Stages can only be appended to a template initialized with an array of stages. \
         Initialize the template with an empty array \"[]\" if this is the first stage"
    )]
    NotAnArray,

    /// An appended stage was not delimited by `{` and `}`.
    #[error("A pipeline stage string must begin with a {{ and end with a }}: {stage}")]
    InvalidStage { stage: String },

    /// A multi-path call supplied nothing to resolve.
    #[error("Unable to resolve any {what} from the supplied field paths")]
    NoPaths { what: &'static str },

    /// A field access expression could not be parsed.
    #[error("Invalid field path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Tags were resolved or assigned that do not occur in the template.
    #[error("The following tags were missing from the template: [{}]", join(.tags))]
    MissingTags { tags: TagSet },

    /// Tags in the template were never resolved or assigned.
    #[error("Replacements for the following tags are required: [{}]", join(.tags))]
    UnresolvedTags { tags: TagSet },

    /// The rendered text is not a well-formed array of documents.
    #[error("Unable to parse the rendered template: {0}")]
    Parse(#[from] serde_json::Error),

    /// The rendered text parsed, but was not shaped as expected.
    #[error("Unable to parse the rendered template: {message}")]
    Format { message: String },
}

impl TemplateError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::EmptyTemplate
            | TemplateError::NoTags
            | TemplateError::InvalidStage { .. }
            | TemplateError::NoPaths { .. }
            | TemplateError::InvalidPath { .. } => ErrorKind::InvalidArgument,
            TemplateError::NotAnArray
            | TemplateError::MissingTags { .. }
            | TemplateError::UnresolvedTags { .. } => ErrorKind::InvalidOperation,
            TemplateError::Parse(_) | TemplateError::Format { .. } => ErrorKind::Parse,
        }
    }
}

fn join(tags: &TagSet) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tags_message_lists_tokens_in_order() {
        let mut tags = TagSet::new();
        tags.insert("<Z>".to_string());
        tags.insert("<A>".to_string());

        let err = TemplateError::MissingTags { tags };
        assert_eq!(
            err.to_string(),
            "The following tags were missing from the template: [<Z>,<A>]"
        );
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(TemplateError::EmptyTemplate.kind(), ErrorKind::InvalidArgument);
        assert_eq!(TemplateError::NotAnArray.kind(), ErrorKind::InvalidOperation);
        assert_eq!(
            TemplateError::Format {
                message: "x".to_string()
            }
            .kind(),
            ErrorKind::Parse
        );
    }
}
