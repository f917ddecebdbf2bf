//! Similarity conventions and ranking.
//!
//! Each side of a comparison can be used raw, centered at the query set's
//! centroid, or centered at the key set's centroid, giving nine conventions.
//! The textual form names the query side `a` and the key side `b`, so
//! `a(b) @ b(b)` means both sides centered at the keys' centroid.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::Serialize;

use super::Frame;
use crate::error::{Error, Result};

/// What one side of a comparison is centered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Centering {
    #[default]
    Raw,
    AtQuery,
    AtKey,
}

impl Centering {
    const ALL: [Centering; 3] = [Centering::Raw, Centering::AtQuery, Centering::AtKey];

    fn apply<'a>(self, side: &'a Frame, query: &Frame, key: &Frame) -> Result<Cow<'a, Frame>> {
        Ok(match self {
            Centering::Raw => Cow::Borrowed(side),
            Centering::AtQuery => Cow::Owned(side.center_at(query)?),
            Centering::AtKey => Cow::Owned(side.center_at(key)?),
        })
    }

    fn render(self, side: char) -> String {
        match self {
            Centering::Raw => side.to_string(),
            Centering::AtQuery => format!("{side}(a)"),
            Centering::AtKey => format!("{side}(b)"),
        }
    }

    fn parse(text: &str, side: char) -> Option<Self> {
        let rest = text.strip_prefix(side)?;
        match rest {
            "" => Some(Centering::Raw),
            "(a)" => Some(Centering::AtQuery),
            "(b)" => Some(Centering::AtKey),
            _ => None,
        }
    }
}

/// How the query and key sides are centered before the dot product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Convention {
    pub query: Centering,
    pub key: Centering,
}

impl Convention {
    /// The raw dot product, `a @ b`.
    pub const RAW: Convention = Convention {
        query: Centering::Raw,
        key: Centering::Raw,
    };

    /// All nine conventions, query side varying slowest.
    pub const ALL: [Convention; 9] = {
        let c = Centering::ALL;
        [
            Convention { query: c[0], key: c[0] },
            Convention { query: c[0], key: c[1] },
            Convention { query: c[0], key: c[2] },
            Convention { query: c[1], key: c[0] },
            Convention { query: c[1], key: c[1] },
            Convention { query: c[1], key: c[2] },
            Convention { query: c[2], key: c[0] },
            Convention { query: c[2], key: c[1] },
            Convention { query: c[2], key: c[2] },
        ]
    };
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.query.render('a'), self.key.render('b'))
    }
}

impl FromStr for Convention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let parsed = compact.split_once('@').and_then(|(q, k)| {
            Some(Convention {
                query: Centering::parse(q, 'a')?,
                key: Centering::parse(k, 'b')?,
            })
        });
        parsed.ok_or_else(|| Error::UnknownConvention(s.to_string()))
    }
}

/// Pairwise scores with query labels as rows and key labels as columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    pub(super) queries: Vec<String>,
    pub(super) keys: Vec<String>,
    pub(super) scores: Array2<f64>,
}

impl Similarity {
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    pub fn get(&self, query: &str, key: &str) -> Option<f64> {
        let i = self.queries.iter().position(|q| q == query)?;
        let j = self.keys.iter().position(|k| k == key)?;
        Some(self.scores[[i, j]])
    }
}

/// Key labels per query, best match first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub convention: Convention,
    pub queries: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Ranking {
    /// Keep at most `k` labels per query.
    pub fn truncate(&mut self, k: usize) {
        for row in &mut self.rows {
            row.truncate(k);
        }
    }

    /// Best key label per query; `None` only when there are no keys.
    pub fn best(&self) -> Vec<Option<&str>> {
        self.rows
            .iter()
            .map(|row| row.first().map(String::as_str))
            .collect()
    }

    /// One `key1,key2,...:query` line per query using the first `n` keys.
    pub fn format(&self, n: usize) -> String {
        self.queries
            .iter()
            .zip(&self.rows)
            .map(|(query, row)| {
                let keys: Vec<&str> = row.iter().take(n).map(String::as_str).collect();
                format!("{}:{query}", keys.join(","))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sort score for one cell. Signed zeros tie and NaN sorts last.
fn sort_score(x: f64) -> f64 {
    if x.is_nan() {
        f64::NEG_INFINITY
    } else if x == 0.0 {
        0.0
    } else {
        x
    }
}

/// Rank every key against every query under `convention`.
///
/// Exact score ties keep the keys' original column order.
pub fn rank(query: &Frame, key: &Frame, convention: Convention) -> Result<Ranking> {
    if key.is_empty() {
        return Err(Error::EmptyKeySet);
    }
    if query.is_empty() {
        return Ok(Ranking {
            convention,
            queries: Vec::new(),
            rows: Vec::new(),
        });
    }

    let a = convention.query.apply(query, query, key)?;
    let b = convention.key.apply(key, query, key)?;
    let similarity = a.similarity(&b)?;

    let rows = similarity
        .scores
        .rows()
        .into_iter()
        .map(|scores| {
            let mut order: Vec<usize> = (0..key.len()).collect();
            // sort_by is stable
            order.sort_by(|&x, &y| sort_score(scores[y]).total_cmp(&sort_score(scores[x])));
            order.into_iter().map(|j| key.labels[j].clone()).collect()
        })
        .collect();

    Ok(Ranking {
        convention,
        queries: query.labels.clone(),
        rows,
    })
}

/// The first `k` keys for each query.
pub fn top_k(query: &Frame, key: &Frame, convention: Convention, k: usize) -> Result<Ranking> {
    let mut ranking = rank(query, key, convention)?;
    ranking.truncate(k);
    Ok(ranking)
}

/// The single best key for each query, in query order.
pub fn top(query: &Frame, key: &Frame, convention: Convention) -> Result<Vec<String>> {
    let ranking = top_k(query, key, convention, 1)?;
    Ok(ranking.rows.into_iter().flatten().collect())
}

/// Rank under every convention, in [`Convention::ALL`] order.
pub fn greps(query: &Frame, key: &Frame) -> Result<Vec<Ranking>> {
    Convention::ALL
        .iter()
        .map(|&convention| rank(query, key, convention))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn frame(names: &[&str], data: Array2<f64>) -> Frame {
        Frame::new(names.iter().map(|s| s.to_string()).collect(), data).unwrap()
    }

    #[test]
    fn textual_forms_round_trip() {
        let rendered: Vec<String> = Convention::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "a @ b", "a @ b(a)", "a @ b(b)", "a(a) @ b", "a(a) @ b(a)", "a(a) @ b(b)",
                "a(b) @ b", "a(b) @ b(a)", "a(b) @ b(b)",
            ]
        );
        for c in Convention::ALL {
            assert_eq!(c.to_string().parse::<Convention>().unwrap(), c);
        }
        assert_eq!("a(b)@b".parse::<Convention>().unwrap().query, Centering::AtKey);
        assert_eq!(Convention::default(), Convention::RAW);
    }

    #[test]
    fn unknown_forms_are_rejected() {
        for bad in ["", "a", "b @ a", "a(c) @ b", "a @ b(b", "a @ b @ b"] {
            assert!(
                matches!(bad.parse::<Convention>(), Err(Error::UnknownConvention(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn ranks_by_descending_score() {
        let q = frame(&["q"], array![[1.0], [0.0]]);
        let k = frame(&["lo", "hi", "mid"], array![[0.1, 0.9, 0.5], [0.0, 0.0, 0.0]]);
        let ranking = rank(&q, &k, Convention::RAW).unwrap();
        assert_eq!(ranking.rows, vec![vec!["hi", "mid", "lo"]]);
    }

    #[test]
    fn exact_ties_keep_column_order() {
        let q = frame(&["q"], array![[1.0], [1.0]]);
        let k = frame(&["b", "a", "c"], array![[1.0, 0.0, 2.0], [0.0, 1.0, 0.0]]);
        let ranking = rank(&q, &k, Convention::RAW).unwrap();
        assert_eq!(ranking.rows, vec![vec!["c", "b", "a"]]);
        assert_eq!(rank(&q, &k, Convention::RAW).unwrap(), ranking);
    }

    #[test]
    fn signed_zero_scores_tie() {
        let q = frame(&["q"], array![[1.0]]);
        let k = frame(&["neg", "pos"], array![[-0.0, 0.0]]);
        assert_eq!(rank(&q, &k, Convention::RAW).unwrap().rows, vec![vec!["neg", "pos"]]);
    }

    #[test]
    fn centering_query_at_keys_changes_the_winner() {
        let q = frame(&["q"], array![[0.0], [1.0]]);
        let k = frame(&["far", "near"], array![[10.0, 0.0], [1.0, 0.5]]);
        assert_eq!(top(&q, &k, Convention::RAW).unwrap(), vec!["far"]);
        let centered = Convention {
            query: Centering::AtKey,
            key: Centering::Raw,
        };
        assert_eq!(top(&q, &k, centered).unwrap(), vec!["near"]);
    }

    #[test]
    fn centering_keys_alone_keeps_the_order() {
        // Subtracting the key centroid shifts every score of a query equally.
        let q = frame(&["q"], array![[0.3], [1.0]]);
        let k = frame(&["x", "y", "z"], array![[10.0, 0.0, 4.0], [1.0, 0.5, -2.0]]);
        let raw = rank(&q, &k, Convention::RAW).unwrap();
        let centered = Convention {
            query: Centering::Raw,
            key: Centering::AtKey,
        };
        assert_eq!(rank(&q, &k, centered).unwrap().rows, raw.rows);
    }

    #[test]
    fn empty_keys_fail() {
        let q = frame(&["q"], array![[1.0]]);
        let k = Frame::new(Vec::new(), Array2::zeros((1, 0))).unwrap();
        assert!(matches!(rank(&q, &k, Convention::RAW), Err(Error::EmptyKeySet)));
        assert!(matches!(top_k(&q, &k, Convention::RAW, 3), Err(Error::EmptyKeySet)));
    }

    #[test]
    fn empty_queries_give_empty_ranking() {
        let q = Frame::new(Vec::new(), Array2::zeros((0, 0))).unwrap();
        let k = frame(&["k"], array![[1.0]]);
        assert!(rank(&q, &k, Convention::RAW).unwrap().rows.is_empty());
    }

    #[test]
    fn top_k_truncates_each_row() {
        let q = frame(&["q1", "q2"], array![[1.0, -1.0]]);
        let k = frame(&["x", "y", "z"], array![[1.0, 2.0, 3.0]]);
        let ranking = top_k(&q, &k, Convention::RAW, 2).unwrap();
        assert_eq!(ranking.rows, vec![vec!["z", "y"], vec!["x", "y"]]);
        assert_eq!(ranking.best(), vec![Some("z"), Some("x")]);
        assert_eq!(ranking.format(2), "z,y:q1\nx,y:q2");
        assert_eq!(ranking.format(1), "z:q1\nx:q2");
    }

    #[test]
    fn greps_cover_every_convention() {
        let q = frame(&["q"], array![[1.0], [0.0]]);
        let k = frame(&["x", "y"], array![[1.0, 0.0], [0.0, 1.0]]);
        let all = greps(&q, &k).unwrap();
        assert_eq!(all.len(), 9);
        assert!(all.iter().zip(Convention::ALL).all(|(r, c)| r.convention == c));
    }
}
