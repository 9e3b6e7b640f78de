//! mql-render - compile a tagged command template from the command line

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mql_template::TemplateCache;

mod compile;
mod config;

use compile::{CompileRequest, OutputView, PathArg, parse_tag_arg};
use config::RenderConfig;

#[derive(Parser)]
#[command(name = "mql-render")]
#[command(version)]
#[command(about = "Fill in a tagged command template and print the result", long_about = None)]
struct Cli {
    /// Template file ('-' for stdin)
    template: String,

    /// Replace <NAME> with a collection name
    #[arg(short = 'c', long = "collection", value_name = "NAME")]
    collections: Vec<String>,

    /// Replace a field path tag (FORM:PATH, e.g. filtered:Authors[0].Name).
    /// Forms: property, path, filtered, filtered@N, all, first, elements, elements@N
    #[arg(short = 'p', long = "path", value_name = "FORM:PATH")]
    paths: Vec<PathArg>,

    /// Set a value tag (NAME=VALUE)
    #[arg(short = 't', long = "tag", value_name = "NAME=VALUE", value_parser = parse_tag_arg)]
    tags: Vec<(String, String)>,

    /// Append a pipeline stage (JSON object)
    #[arg(short = 's', long = "stage", value_name = "JSON")]
    stages: Vec<String>,

    /// What to print
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputView,

    /// TOML config file with a [tags] section of default values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mql_render=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    let source = read_source(&cli.template)?;

    debug!(
        collections = cli.collections.len(),
        paths = cli.paths.len(),
        tags = cli.tags.len(),
        "compiling template"
    );

    let request = CompileRequest {
        collections: cli.collections,
        paths: cli.paths,
        stages: cli.stages,
        default_tags: config.tags,
        tags: cli.tags,
    };

    let output = compile::compile(&source, TemplateCache::global(), &request, cli.output)
        .with_context(|| format!("Failed to render template {}", cli.template))?;
    println!("{output}");
    Ok(())
}

fn read_source(template: &str) -> Result<String> {
    if template == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read template from stdin")?;
        Ok(source)
    } else {
        std::fs::read_to_string(template)
            .with_context(|| format!("Failed to read template file {template}"))
    }
}
