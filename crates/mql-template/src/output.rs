/*
 * output.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Structured views of a rendered template.

use std::fmt;
use std::marker::PhantomData;

use hashlink::LinkedHashSet;
use serde_json::Value;
use tracing::trace;

use crate::error::{TemplateError, TemplateResult};

/// A single structured document, keys in source order.
pub type Document = serde_json::Map<String, Value>;

/// Parse rendered text as an array of documents.
///
/// Strict JSON is tried first. Text that is not strict JSON is read again
/// as JSON5, which covers shell syntax such as unquoted `$match` keys and
/// single-quoted strings. When both readers fail the JSON error is
/// returned.
pub fn parse_documents(text: &str) -> TemplateResult<Vec<Document>> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(strict) => match json5::from_str::<Value>(text) {
            Ok(value) => {
                trace!("parsed rendered text as shell syntax");
                value
            }
            Err(relaxed) => {
                trace!(error = %relaxed, "shell syntax reader failed too");
                return Err(strict.into());
            }
        },
    };

    let Value::Array(items) = value else {
        return Err(TemplateError::Format {
            message: "expected an array of documents".to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(document) => Ok(document),
            other => Err(TemplateError::Format {
                message: format!("element {index} is not a document: {other}"),
            }),
        })
        .collect()
}

/// An ordered aggregation pipeline reading `TInput` documents and producing
/// `TOutput` documents.
pub struct Pipeline<TInput, TOutput> {
    stages: Vec<Document>,
    _types: PhantomData<fn(TInput) -> TOutput>,
}

impl<TInput, TOutput> Pipeline<TInput, TOutput> {
    pub fn new(stages: Vec<Document>) -> Self {
        Self {
            stages,
            _types: PhantomData,
        }
    }

    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<Document> {
        self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The pipeline as a JSON array.
    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().cloned().map(Value::Object).collect())
    }
}

impl<TInput, TOutput> Clone for Pipeline<TInput, TOutput> {
    fn clone(&self) -> Self {
        Self::new(self.stages.clone())
    }
}

impl<TInput, TOutput> fmt::Debug for Pipeline<TInput, TOutput> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish()
    }
}

/// A filter selecting which elements of an array field of `T` an update
/// applies to, e.g. `{ "a.Name": "Frank" }` for the identifier `$[a]`.
pub struct ArrayFilter<T> {
    document: Document,
    _type: PhantomData<fn() -> T>,
}

impl<T> ArrayFilter<T> {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            _type: PhantomData,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Distinct identifiers the filter binds, in key order.
    ///
    /// `{ "a.Name": "x", "a.Age": { "$gt": 1 } }` binds `a`. Operator keys
    /// such as `$or` are looked through.
    pub fn identifiers(&self) -> Vec<String> {
        let mut found = LinkedHashSet::new();
        collect_identifiers(&self.document, &mut found);
        found.into_iter().collect()
    }
}

fn collect_identifiers(document: &Document, found: &mut LinkedHashSet<String>) {
    for (key, value) in document {
        if key.starts_with('$') {
            let nested = match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            };
            for item in nested {
                if let Value::Object(inner) = item {
                    collect_identifiers(inner, found);
                }
            }
            continue;
        }
        let ident = key.split('.').next().unwrap_or(key);
        if !found.contains(ident) {
            found.insert(ident.to_string());
        }
    }
}

impl<T> Clone for ArrayFilter<T> {
    fn clone(&self) -> Self {
        Self::new(self.document.clone())
    }
}

impl<T> fmt::Debug for ArrayFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArrayFilter").field(&self.document).finish()
    }
}

impl<T> PartialEq for ArrayFilter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_documents() {
        let docs = parse_documents(r#"[{"$match":{}},{"$limit":1}]"#).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].get("$limit"), Some(&json!(1)));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_documents(r#"{"$match":{}}"#),
            Err(TemplateError::Format { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_document_element() {
        let err = parse_documents(r#"[{"$match":{}}, 3]"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to parse the rendered template: element 1 is not a document: 3"
        );
    }

    #[test]
    fn test_parse_shell_syntax() {
        let docs =
            parse_documents("[{ $match: { 'Title': 'Dune' } }, { $sort: { Published: -1 } }]")
                .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["$match"], json!({ "Title": "Dune" }));
        assert_eq!(docs[1]["$sort"]["Published"].as_f64(), Some(-1.0));
    }

    #[test]
    fn test_parse_keeps_key_order_in_shell_syntax() {
        let docs = parse_documents("[{ $project: { z: 1, a: 1, m: 1 } }]").unwrap();
        let keys: Vec<_> = docs[0]["$project"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        assert!(matches!(
            parse_documents("[{ $match: {} ]"),
            Err(TemplateError::Parse(_))
        ));
        assert!(matches!(
            parse_documents("[{ \"Title\": }]"),
            Err(TemplateError::Parse(_))
        ));
    }

    #[test]
    fn test_array_filter_identifiers() {
        let Value::Object(document) = json!({
            "a.Name": "Eckhart",
            "$or": [{ "b.Age": { "$gt": 40 } }, { "a.Age": 1 }]
        }) else {
            unreachable!()
        };
        let filter: ArrayFilter<()> = ArrayFilter::new(document);
        assert_eq!(filter.identifiers(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_pipeline_to_json() {
        let docs = parse_documents(r#"[{"$limit":1}]"#).unwrap();
        let pipeline: Pipeline<(), ()> = Pipeline::new(docs);
        assert_eq!(pipeline.to_json(), json!([{ "$limit": 1 }]));
        assert_eq!(pipeline.len(), 1);
    }
}
