use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use embd::{tensor, Thought};

use super::input;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Width of each vector in the stream
    #[arg(short, long, value_parser = parse_dimension)]
    pub dimension: usize,
    /// File of raw tensor bytes (stdin when omitted)
    pub file: Option<PathBuf>,
}

fn parse_dimension(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("dimension must be at least 1".into()),
        Ok(d) => Ok(d),
        Err(e) => Err(e.to_string()),
    }
}

/// Decode raw tensor bytes into one row per vector.
pub fn decode(bytes: &[u8], dimension: usize) -> Result<Thought> {
    let matrix = tensor::decode_matrix(bytes, dimension)
        .with_context(|| format!("input is not a stream of {dimension}-wide f32 vectors"))?;
    Ok(Thought::Batch(matrix))
}

pub fn show(args: ShowArgs) -> Result<()> {
    let bytes = input::read_source(args.file.as_deref())?;
    print!("{}", super::think::render(&decode(&bytes, args.dimension)?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rows_of_given_width() {
        let bytes = tensor::encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let Thought::Batch(m) = decode(&bytes, 3).unwrap() else {
            panic!("expected batch")
        };
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m[[1, 0]], 4.0);
    }

    #[test]
    fn zero_dimension_is_refused() {
        assert!(parse_dimension("0").is_err());
        assert!(parse_dimension("x").is_err());
        assert_eq!(parse_dimension("384"), Ok(384));
    }

    #[test]
    fn partial_rows_are_rejected() {
        let bytes = tensor::encode(&[1.0, 2.0, 3.0, 4.0]);
        let err = decode(&bytes, 3).unwrap_err();
        assert!(err.to_string().contains("3-wide"));
    }
}
