use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use embd::config::EmbdConfig;
use embd::{Convention, Input, Ranking};

use super::input;

#[derive(Args, Debug, Clone)]
pub struct GrepArgs {
    /// File with one key per line
    pub keys: PathBuf,
    /// File with one query per line (stdin when omitted)
    pub queries: Option<PathBuf>,
    /// Similarity convention, e.g. "a @ b" or "a(b) @ b(b)"
    #[arg(long, default_value = "a @ b")]
    pub convention: Convention,
    /// Keys to print per query
    #[arg(short, default_value_t = 1)]
    pub n: usize,
    /// Print one block per convention
    #[arg(long)]
    pub all: bool,
}

/// Print rankings, one block per convention when there are several.
pub fn format_rankings(rankings: &[Ranking], n: usize) -> String {
    match rankings {
        [single] => single.format(n),
        many => many
            .iter()
            .map(|r| format!("# {}\n{}", r.convention, r.format(n)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

pub async fn grep(config: &EmbdConfig, args: GrepArgs) -> Result<()> {
    let keys = input::nonblank_lines(&String::from_utf8_lossy(&input::read_source(Some(
        &args.keys,
    ))?));
    let queries = input::nonblank_lines(&String::from_utf8_lossy(&input::read_source(
        args.queries.as_deref(),
    )?));
    let space = super::open_space(config)?;

    let (all, convention, n) = (args.all, args.convention, args.n);
    let rankings = tokio::task::spawn_blocking(move || -> Result<Vec<Ranking>> {
        let queries = Input::from(queries);
        let keys = Input::from(keys);
        if all {
            Ok(space.greps(queries, keys)?)
        } else {
            Ok(vec![space.grep(queries, keys, convention, Some(n))?])
        }
    })
    .await??;

    println!("{}", format_rankings(&rankings, args.n));
    Ok(())
}
