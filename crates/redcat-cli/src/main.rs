//! # redcat
//!
//! Category embedding tool: serves single-text embeddings over HTTP, builds
//! category catalogs from tabular rows, and sanity-checks a catalog with
//! cosine top-k search.

#![deny(unsafe_code)]

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redcat_embeddings::{EmbeddingConfig, TextEmbedder};
use redcat_settings::RedcatSettings;

/// redcat embedder.
#[derive(Parser, Debug)]
#[command(name = "redcat", about = "Category embeddings: server, catalog builder, validator")]
struct Cli {
    /// Settings file (default `$REDCAT_SETTINGS` or `~/.redcat/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level (overrides settings; `RUST_LOG` overrides both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `POST /embed` and `GET /health`.
    Serve {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Embed source rows into a catalog file.
    BuildCatalog {
        /// JSON array or JSON Lines rows.
        #[arg(long)]
        input: PathBuf,
        /// Catalog JSON to write.
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the top-k catalog matches for a query.
    Validate {
        /// Catalog JSON.
        #[arg(long)]
        catalog: PathBuf,
        /// Query text, embedded as given.
        #[arg(long)]
        query: String,
        /// Number of matches (default from settings).
        #[arg(long)]
        k: Option<usize>,
        /// Source rows; prints an id coverage report first.
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Compare source ids with catalog ids.
    Coverage {
        /// Source rows.
        #[arg(long)]
        source: PathBuf,
        /// Catalog JSON.
        #[arg(long)]
        catalog: PathBuf,
    },
}

/// Load the ONNX embedder on the blocking pool (model download and parsing block).
async fn load_embedder(settings: &RedcatSettings) -> Result<TextEmbedder> {
    let config = EmbeddingConfig::from_settings(&settings.embedder);
    tracing::info!(
        model = %config.model_path,
        tokenizer = %config.tokenizer_path,
        max_length = config.max_length,
        "loading embedder"
    );
    let embedder = tokio::task::spawn_blocking(move || redcat_embeddings::load_onnx_embedder(&config))
        .await
        .context("Embedder loading task failed")?
        .context("Failed to load embedder")?;
    Ok(embedder)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(redcat_settings::settings_path);
    let mut settings = redcat_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    logging::init_subscriber(&settings.logging.level, settings.logging.json);
    tracing::debug!(path = %settings_path.display(), "settings loaded");

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            let embedder = load_embedder(&settings).await?;
            commands::serve(&settings, embedder).await?;
        }
        Command::BuildCatalog { input, output } => {
            let embedder = load_embedder(&settings).await?;
            let path = output.clone();
            let catalog = tokio::task::spawn_blocking(move || {
                commands::build_catalog(&settings, &embedder, &input, &output)
            })
            .await
            .context("Catalog build task failed")??;
            tracing::info!(records = catalog.len(), path = %path.display(), "catalog written");
        }
        Command::Validate {
            catalog,
            query,
            k,
            source,
        } => {
            if let Some(source) = &source {
                let report = commands::coverage_report(source, &catalog)?;
                commands::print_coverage(&report, &mut std::io::stdout().lock())?;
                println!();
            }
            let embedder = load_embedder(&settings).await?;
            let k = k.unwrap_or(settings.validation.top_k);
            tokio::task::spawn_blocking(move || {
                commands::validate(&settings, &embedder, &catalog, &query, k, &mut std::io::stdout().lock())
            })
            .await
            .context("Validation task failed")??;
        }
        Command::Coverage { source, catalog } => {
            let report = commands::coverage_report(&source, &catalog)?;
            commands::print_coverage(&report, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_validate_with_globals() {
        let cli = Cli::try_parse_from([
            "redcat",
            "validate",
            "--catalog",
            "c.json",
            "--query",
            "irish pub",
            "--k",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Validate { k, query, source, .. } => {
                assert_eq!(k, Some(5));
                assert_eq!(query, "irish pub");
                assert!(source.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_build_catalog() {
        let cli = Cli::try_parse_from([
            "redcat",
            "--settings",
            "s.json",
            "build-catalog",
            "--input",
            "rows.jsonl",
            "--output",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.settings, Some(PathBuf::from("s.json")));
        assert!(matches!(cli.command, Command::BuildCatalog { .. }));
    }

    #[test]
    fn serve_overrides_are_optional() {
        let cli = Cli::try_parse_from(["redcat", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Command::Serve { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn missing_required_args_rejected() {
        assert!(Cli::try_parse_from(["redcat", "coverage", "--source", "rows.json"]).is_err());
    }
}
