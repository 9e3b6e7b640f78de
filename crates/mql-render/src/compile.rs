/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Applies command line replacements to a template and renders it.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use mql_template::{FieldPath, PathForm, Template, TemplateCache};
use serde_json::Value;
use tracing::{debug, info};

/// Which view of the rendered template to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputView {
    /// The substituted text as-is
    Text,
    /// Pipeline stages as a JSON array
    Stages,
    /// Array filters as a JSON array
    Filters,
}

/// A `FORM:EXPR` structural replacement, e.g. `filtered:Authors[0].Name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathArg {
    pub form: PathForm,
    pub path: FieldPath,
}

impl FromStr for PathArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (form, expr) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected FORM:PATH, got '{s}'"))?;
        Ok(Self {
            form: parse_form(form)?,
            path: FieldPath::parse(expr)?,
        })
    }
}

fn parse_form(form: &str) -> Result<PathForm> {
    let (name, index) = match form.split_once('@') {
        Some((name, index)) => {
            let index = index
                .parse::<usize>()
                .with_context(|| format!("invalid index in path form '{form}'"))?;
            (name, Some(index))
        }
        None => (form, None),
    };

    Ok(match (name, index) {
        ("property", None) => PathForm::Property,
        ("path", None) => PathForm::Dotted,
        ("filtered", None) => PathForm::Filtered,
        ("filtered", Some(i)) => PathForm::FilteredAt(i),
        ("all", None) => PathForm::All,
        ("first", None) => PathForm::First,
        ("elements", None) => PathForm::Elements,
        ("elements", Some(i)) => PathForm::ElementsAt(i),
        _ => bail!(
            "unknown path form '{form}' (expected property, path, filtered[@N], all, first or elements[@N])"
        ),
    })
}

/// A `NAME=VALUE` value tag.
pub fn parse_tag_arg(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{s}'"))?;
    if name.is_empty() {
        bail!("tag name is empty in '{s}'");
    }
    Ok((name.to_string(), value.to_string()))
}

/// Everything to apply to a template before rendering.
#[derive(Debug, Default)]
pub struct CompileRequest {
    pub collections: Vec<String>,
    pub paths: Vec<PathArg>,
    pub stages: Vec<String>,
    /// Only applied to tags the template contains.
    pub default_tags: Vec<(String, String)>,
    /// Applied in order, so later entries win.
    pub tags: Vec<(String, String)>,
}

/// Build, fill and render a template.
pub fn compile(
    source: &str,
    cache: &TemplateCache,
    request: &CompileRequest,
    view: OutputView,
) -> Result<String> {
    let mut template = Template::with_cache(source, cache)?;
    debug!(cache_hit = template.is_cache_hit(), "template loaded");

    for stage in &request.stages {
        template
            .append_stage(stage)
            .with_context(|| format!("Failed to append stage {stage}"))?;
    }
    for collection in &request.collections {
        template.resolve(collection);
    }
    for arg in &request.paths {
        template.resolve_path(&arg.path, arg.form);
    }
    for (name, value) in &request.default_tags {
        if template.goal_tags().contains(&format!("<{name}>")) {
            template.tag(name, value.as_str());
        }
    }
    for (name, value) in &request.tags {
        template.tag(name, value.as_str());
    }

    let output = match view {
        OutputView::Text => template.render_text()?,
        OutputView::Stages => {
            let stages = template.render_stages()?;
            info!(stages = stages.len(), "rendered pipeline");
            to_pretty_array(stages.into_iter().map(Value::Object))?
        }
        OutputView::Filters => {
            let filters = template.render_array_filters::<Value>()?;
            info!(filters = filters.len(), "rendered array filters");
            to_pretty_array(filters.into_iter().map(|f| Value::Object(f.into_document())))?
        }
    };
    Ok(output)
}

fn to_pretty_array(items: impl Iterator<Item = Value>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Value::Array(items.collect()))?)
}
