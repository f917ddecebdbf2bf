//! Reading and shaping command-line input.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use embd::Blob;

/// Read a file, or stdin when no path is given.
pub fn read_source(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(p) => std::fs::read(p).with_context(|| format!("failed to read {}", p.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Every line without its terminator, blank lines included.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect()
}

/// Lines with blank ones dropped, for key and query lists.
pub fn nonblank_lines(text: &str) -> Vec<String> {
    split_lines(text)
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect()
}

/// One entry per line: the line plus up to `before` lines above it and
/// `after` lines below it, joined by newlines.
pub fn windows(lines: &[String], before: usize, after: usize) -> Vec<String> {
    (0..lines.len())
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(lines.len());
            lines[start..end].join("\n")
        })
        .collect()
}

/// Treat each entry as a path and read its contents.
pub fn cat(entries: &[String]) -> Result<Vec<Blob>> {
    entries
        .iter()
        .map(|p| {
            std::fs::read(p)
                .map(Blob::from)
                .with_context(|| format!("failed to read {p}"))
        })
        .collect()
}
