//! Subcommand bodies, parameterized over the embedder so they run with any adapters.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use redcat_embeddings::{
    BlockingEmbeddingService, Catalog, CatalogBuilder, CoverageReport, EmbeddingConfig,
    SimilarityValidator, TextEmbedder, coverage, read_rows,
};
use redcat_server::{EmbedServer, ServerConfig};
use redcat_settings::RedcatSettings;
use tracing::info;

/// Embed every source row and write the catalog.
pub fn build_catalog(
    settings: &RedcatSettings,
    embedder: &TextEmbedder,
    input: &Path,
    output: &Path,
) -> Result<Catalog> {
    let rows = read_rows(input).with_context(|| format!("Failed to read rows from {}", input.display()))?;
    let builder = CatalogBuilder::from_settings(&settings.catalog)?;
    let catalog = builder.build(embedder, rows)?;
    catalog
        .save_json(output)
        .with_context(|| format!("Failed to write catalog to {}", output.display()))?;
    Ok(catalog)
}

/// Compare source ids with catalog ids.
pub fn coverage_report(source: &Path, catalog: &Path) -> Result<CoverageReport> {
    let rows = read_rows(source).with_context(|| format!("Failed to read rows from {}", source.display()))?;
    let catalog = load_catalog(catalog)?;
    Ok(coverage(&rows, &catalog))
}

/// Print the coverage report.
pub fn print_coverage(report: &CoverageReport, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{report}")?;
    if report.is_consistent() {
        writeln!(out, "ids match")?;
    } else {
        writeln!(out, "id mismatch detected")?;
    }
    Ok(())
}

/// Embed `query` and print the top `k` catalog matches.
pub fn validate(
    settings: &RedcatSettings,
    embedder: &TextEmbedder,
    catalog_path: &Path,
    query: &str,
    k: usize,
    out: &mut impl Write,
) -> Result<()> {
    let mut catalog = load_catalog(catalog_path)?;
    let vector = embedder.embed(query)?;
    if vector.is_empty() {
        bail!("query is empty");
    }

    writeln!(out, "query: {query}")?;
    let matches = SimilarityValidator::from_settings(&settings.validation).top_k(&mut catalog, &vector, k)?;
    for m in &matches {
        writeln!(out, "{m}")?;
    }
    Ok(())
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::load_json(path).with_context(|| format!("Failed to load catalog from {}", path.display()))
}

/// Run the HTTP server until Ctrl-C / SIGTERM.
pub async fn serve(settings: &RedcatSettings, embedder: TextEmbedder) -> Result<()> {
    let timeout = EmbeddingConfig::from_settings(&settings.embedder).request_timeout();
    let service = Arc::new(BlockingEmbeddingService::new(embedder, timeout));
    let server = EmbedServer::new(ServerConfig::from(&settings.server), service);
    let listener = server
        .bind()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().addr()))?;
    info!(timeout_ms = settings.embedder.request_timeout_ms, "starting embedding server");
    server
        .serve(listener, redcat_server::shutdown::shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
