pub mod grep;
pub mod input;
pub mod show;
pub mod stats;
pub mod think;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

use embd::config::{expand_tilde, EmbdConfig, EmbeddingConfig};
use embd::db::Database;
use embd::embedding::models::{list_models, ModelSpec, HASH_FAMILY};
use embd::embedding::create_embedder;
use embd::Space;

/// Build the configured embedder and a space over the configured database.
pub fn open_space(config: &EmbdConfig) -> Result<Arc<Space>> {
    let embedder = create_embedder(&config.embedding)?;
    let db = Database::open(config.resolved_db_path())?;
    let store = Arc::new(db.scoped(embedder.namespace()));
    let space = Space::with_memo_capacity(embedder, store, config.cache.memo_capacity)?;
    Ok(Arc::new(space))
}

/// Print the model catalog, marking the configured model.
pub fn models(config: &EmbeddingConfig) -> Result<()> {
    let cache_dir = expand_tilde(&config.cache_dir);
    println!("{:<3}{:<8} {:<6} {:>5}  {}", "", "FAMILY", "SIZE", "DIM", "SOURCE");
    for m in list_models() {
        let current = m.family == config.family && (m.family == HASH_FAMILY || m.size == config.size);
        let downloaded = ModelSpec::lookup(m.family, m.size, config.normalized)
            .map(|spec| spec.model_dir(&cache_dir).join("model.onnx").exists())
            .unwrap_or(false);
        let dimension = m
            .dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| config.dimension.to_string());
        println!(
            "{:<3}{:<8} {:<6} {:>5}  {}{}",
            if current { "*" } else { "" },
            m.family,
            m.size,
            dimension,
            m.repo,
            if downloaded { " (downloaded)" } else { "" },
        );
    }
    Ok(())
}

/// Download the configured model's ONNX export and tokenizer.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    if config.family == HASH_FAMILY {
        println!("The hash family needs no model files.");
        return Ok(());
    }
    let spec = ModelSpec::lookup(&config.family, &config.size, config.normalized)?;
    let model_dir = spec.model_dir(&expand_tilde(&config.cache_dir));
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("failed to create model dir: {}", model_dir.display()))?;

    let model_path = model_dir.join("model.onnx");
    let tokenizer_path = model_dir.join("tokenizer.json");

    if model_path.exists() {
        println!("Model already exists at {}", model_path.display());
    } else {
        println!("Downloading {} model.onnx...", spec.repo);
        download_file(&spec.onnx_url(), &model_path).await?;
        println!("Model saved to {}", model_path.display());
    }

    if tokenizer_path.exists() {
        println!("Tokenizer already exists at {}", tokenizer_path.display());
    } else {
        println!("Downloading tokenizer.json...");
        download_file(&spec.tokenizer_url(), &tokenizer_path).await?;
        println!("Tokenizer saved to {}", tokenizer_path.display());
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download of {url} failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
