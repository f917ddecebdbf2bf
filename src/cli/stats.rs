use anyhow::Result;

use embd::config::EmbdConfig;
use embd::db::{namespace_stats, Database};
use embd::embedding::create_embedder;

/// Display per-namespace cache statistics in the terminal.
pub fn stats(config: &EmbdConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let db = Database::open(&db_path)?;
    let namespaces = namespace_stats(&db)?;
    let current = create_embedder(&config.embedding).ok().map(|e| e.namespace());

    println!("Cache Statistics");
    println!("{}", "=".repeat(40));
    println!("  Database:            {}", db_path.display());
    if let Some(ref ns) = current {
        println!("  Configured space:    {ns}");
    }
    let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    println!("  Database size:       {size} bytes");
    println!();

    if namespaces.is_empty() {
        println!("No cached vectors yet.");
        return Ok(());
    }

    println!(
        "  {:<32} {:>9} {:>7} {:>6}",
        "NAMESPACE", "CONTENTS", "NAMES", "DIM"
    );
    for s in &namespaces {
        let marker = if current.as_ref().is_some_and(|ns| ns.as_str() == s.namespace) {
            "*"
        } else {
            " "
        };
        let dim = s.dimension.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{marker} {:<32} {:>9} {:>7} {:>6}",
            s.namespace, s.contents, s.names, dim
        );
    }

    if let Some(newest) = namespaces.iter().filter_map(|s| s.newest.as_deref()).max() {
        println!();
        println!("Newest entry:          {newest}");
    }

    Ok(())
}
