use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ndarray::ArrayView1;

use embd::config::EmbdConfig;
use embd::{Blob, Input, Thought};

use super::input;

#[derive(Args, Debug, Clone, Default)]
pub struct ThinkArgs {
    /// Input file (stdin when omitted)
    pub file: Option<PathBuf>,
    /// Embed each line separately
    #[arg(short, long)]
    pub lines: bool,
    /// Lines of context before each line (implies --lines)
    #[arg(short = 'B', long, default_value_t = 0)]
    pub before: usize,
    /// Lines of context after each line (implies --lines)
    #[arg(short = 'A', long, default_value_t = 0)]
    pub after: usize,
    /// Treat each line as a path and embed the file it names
    #[arg(short, long)]
    pub cat: bool,
    /// Bind the input under NAME; later runs reuse the first binding
    #[arg(long)]
    pub name: Option<String>,
}

impl ThinkArgs {
    fn per_line(&self) -> bool {
        self.lines || self.before > 0 || self.after > 0
    }
}

/// Shape raw input bytes into an [`Input`] according to the flags.
pub fn build_input(args: &ThinkArgs, raw: Vec<u8>) -> Result<Input> {
    if !args.per_line() && !args.cat {
        return Ok(Input::Item(Blob::from(raw)));
    }
    let text = String::from_utf8_lossy(&raw);
    let mut entries = input::split_lines(&text);
    if args.cat {
        entries.retain(|p| !p.is_empty());
    }
    if args.per_line() {
        entries = input::windows(&entries, args.before, args.after);
    }
    let blobs = if args.cat {
        input::cat(&entries)?
    } else {
        entries.into_iter().map(Blob::from).collect()
    };
    Ok(match (args.per_line(), blobs.len()) {
        (false, 1) => blobs.into_iter().next().map_or(Input::Sequence(Vec::new()), Input::Item),
        _ => Input::Sequence(blobs),
    })
}

pub async fn think(config: &EmbdConfig, args: ThinkArgs) -> Result<()> {
    let raw = input::read_source(args.file.as_deref())?;
    let input = build_input(&args, raw)?;
    let space = super::open_space(config)?;

    let thought = tokio::task::spawn_blocking(move || -> Result<Thought> {
        match (args.name.as_deref(), input) {
            (Some(name), Input::Item(blob)) => {
                Ok(Thought::Vector(space.get_or_compute_by_name(name, &blob)?))
            }
            (Some(_), other) => anyhow::bail!("--name needs a single input, got {}", other.describe()),
            (None, input) => Ok(space.think(input)?),
        }
    })
    .await??;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if stdout.is_terminal() {
        out.write_all(render(&thought).as_bytes())?;
    } else {
        out.write_all(&thought.to_bytes())
            .context("failed to write tensor bytes")?;
    }
    out.flush()?;
    Ok(())
}

/// Number of leading and trailing elements shown per vector.
const EDGE: usize = 3;

fn join(xs: impl Iterator<Item = f32>) -> String {
    xs.map(|x| format!("{x:+.4}")).collect::<Vec<_>>().join(" ")
}

pub(crate) fn render_vector(v: ArrayView1<'_, f32>) -> String {
    if v.len() <= 2 * EDGE {
        format!("[{}]", join(v.iter().copied()))
    } else {
        format!(
            "[{} ... {}]",
            join(v.iter().copied().take(EDGE)),
            join(v.iter().copied().skip(v.len() - EDGE))
        )
    }
}

/// Human-readable view of a thought for terminals.
pub fn render(thought: &Thought) -> String {
    let mut out = String::new();
    match thought {
        Thought::Vector(v) => {
            out.push_str(&format!("dim {}\n", v.len()));
            out.push_str(&render_vector(ArrayView1::from(v.as_slice())));
            out.push('\n');
        }
        Thought::Batch(m) => {
            out.push_str(&format!("{} x {}\n", m.nrows(), m.ncols()));
            for (i, row) in m.rows().into_iter().enumerate() {
                out.push_str(&format!("{i:>4}  {}\n", render_vector(row)));
            }
        }
        Thought::Mapping(map) => {
            let width = map.keys().map(|k| k.chars().count()).max().unwrap_or(0);
            for (label, v) in map {
                out.push_str(&format!(
                    "{label:<width$}  {}\n",
                    render_vector(ArrayView1::from(v.as_slice()))
                ));
            }
        }
    }
    out
}
