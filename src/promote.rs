//! Input classification and promotion into frames.
//!
//! Callers build an [`Input`] once at the boundary; the cache and the ranking
//! engine match on its tag. Labels and ordering are preserved exactly, since
//! rankings are reported in terms of them.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::frame::{self, Convention, Frame, Ranking};
use crate::space::{Blob, Space};

/// Everything the cache and ranking layers accept.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// One text or byte item, labelled by its own text.
    Item(Blob),
    /// Ordered items, each labelled by its own text. Repeats get a `#n` suffix.
    Sequence(Vec<Blob>),
    /// Items labelled by key, in insertion order.
    Mapping(IndexMap<String, Blob>),
    /// Precomputed vectors, labelled `0..n`.
    Vectors(Vec<Vec<f32>>),
    Frame(Frame),
}

impl Input {
    /// Classify a JSON value by shape.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Input::Item(s.into())),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(Input::Sequence(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(Blob::from(s)),
                        _ => None,
                    })
                    .collect(),
            )),
            Value::Array(items) if items.iter().all(is_number_array) => {
                let vectors = items.iter().map(number_array).collect::<Option<Vec<_>>>();
                vectors
                    .map(Input::Vectors)
                    .ok_or_else(|| Error::UnpromotableType(describe_json(&Value::Array(items))))
            }
            Value::Object(map) if map.values().all(Value::is_string) => Ok(Input::Mapping(
                map.into_iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k, Blob::from(s))),
                        _ => None,
                    })
                    .collect(),
            )),
            other => Err(Error::UnpromotableType(describe_json(&other))),
        }
    }

    /// Parse JSON text and classify it.
    pub fn parse_json(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Short description of the input's shape, for error messages.
    pub fn describe(&self) -> String {
        match self {
            Input::Item(_) => "a single item".into(),
            Input::Sequence(items) => format!("a sequence of {} items", items.len()),
            Input::Mapping(map) => format!("a mapping of {} items", map.len()),
            Input::Vectors(vs) => format!("{} precomputed vectors", vs.len()),
            Input::Frame(f) => format!("a frame of {} columns", f.len()),
        }
    }
}

fn is_number_array(v: &Value) -> bool {
    v.as_array()
        .is_some_and(|xs| xs.iter().all(Value::is_number))
}

fn number_array(v: &Value) -> Option<Vec<f32>> {
    v.as_array()?
        .iter()
        .map(|x| x.as_f64().map(|f| f as f32))
        .collect()
}

fn describe_json(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a mixed array",
        Value::Object(_) => "an object with non-string values",
    };
    let mut text = value.to_string();
    if text.len() > 60 {
        let cut = (0..=57).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
        text.truncate(cut);
        text.push_str("...");
    }
    format!("{kind} ({text})")
}

/// Labels from item text, suffixing repeats as `text#1`, `text#2`, ... so
/// every column stays addressable.
fn unique_labels(texts: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for text in texts {
        let mut label = text.clone();
        let mut n = 1;
        while seen.contains(&label) {
            label = format!("{text}#{n}");
            n += 1;
        }
        seen.insert(label.clone());
        labels.push(label);
    }
    labels
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Item(s.into())
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::Item(s.into())
    }
}

impl From<Blob> for Input {
    fn from(blob: Blob) -> Self {
        Input::Item(blob)
    }
}

impl<T: Into<Blob>> From<Vec<T>> for Input {
    fn from(items: Vec<T>) -> Self {
        Input::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Blob>> From<IndexMap<String, T>> for Input {
    fn from(map: IndexMap<String, T>) -> Self {
        Input::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<Frame> for Input {
    fn from(frame: Frame) -> Self {
        Input::Frame(frame)
    }
}

impl Space {
    /// Turn any [`Input`] into a frame, embedding text through the cache.
    pub fn promote(&self, input: Input) -> Result<Frame> {
        match input {
            Input::Item(blob) => {
                let vector = self.get_or_compute_by_content(&blob)?;
                Frame::from_columns(vec![blob.as_text().into_owned()], &[vector])
            }
            Input::Sequence(blobs) => {
                let labels = unique_labels(blobs.iter().map(|b| b.as_text().into_owned()));
                let vectors = blobs
                    .iter()
                    .map(|b| self.get_or_compute_by_content(b))
                    .collect::<Result<Vec<_>>>()?;
                Frame::from_columns(labels, &vectors)
            }
            Input::Mapping(map) => {
                let mut labels = Vec::with_capacity(map.len());
                let mut vectors = Vec::with_capacity(map.len());
                for (label, blob) in map {
                    vectors.push(self.get_or_compute_by_content(&blob)?);
                    labels.push(label);
                }
                Frame::from_columns(labels, &vectors)
            }
            Input::Vectors(vectors) => {
                let labels = (0..vectors.len()).map(|i| i.to_string()).collect();
                Frame::from_columns(labels, &vectors)
            }
            Input::Frame(frame) => Ok(frame),
        }
    }

    /// Promote both sides and rank every key against every query, keeping at
    /// most `n` keys per query when given.
    pub fn grep(
        &self,
        queries: impl Into<Input>,
        keys: impl Into<Input>,
        convention: Convention,
        n: Option<usize>,
    ) -> Result<Ranking> {
        let queries = self.promote(queries.into())?;
        let keys = self.promote(keys.into())?;
        let mut ranking = frame::rank(&queries, &keys, convention)?;
        if let Some(n) = n {
            ranking.truncate(n);
        }
        Ok(ranking)
    }

    /// Promote both sides and rank under all nine conventions.
    pub fn greps(&self, queries: impl Into<Input>, keys: impl Into<Input>) -> Result<Vec<Ranking>> {
        let queries = self.promote(queries.into())?;
        let keys = self.promote(keys.into())?;
        frame::greps(&queries, &keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_json_shapes() {
        assert_eq!(Input::from_json(json!("red")).unwrap(), Input::from("red"));
        assert_eq!(
            Input::from_json(json!(["a", "b"])).unwrap(),
            Input::from(vec!["a", "b"])
        );
        assert_eq!(
            Input::from_json(json!([[1.0, 2.0], [3, 4]])).unwrap(),
            Input::Vectors(vec![vec![1.0, 2.0], vec![3.0, 4.0]])
        );
    }

    #[test]
    fn json_object_keeps_key_order() {
        let value: Value = serde_json::from_str(r#"{"zeta": "z", "alpha": "a"}"#).unwrap();
        let Input::Mapping(map) = Input::from_json(value).unwrap() else {
            panic!("expected mapping")
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn rejects_unpromotable_json() {
        for value in [json!(null), json!(3), json!(["a", 1]), json!({"k": 1})] {
            assert!(
                matches!(Input::from_json(value.clone()), Err(Error::UnpromotableType(_))),
                "{value}"
            );
        }
    }

    #[test]
    fn invalid_json_text_is_a_json_error() {
        assert!(matches!(Input::parse_json("[\"a\","), Err(Error::Json(_))));
        assert_eq!(Input::parse_json(r#""red""#).unwrap(), Input::from("red"));
    }

    #[test]
    fn repeated_texts_get_suffixed_labels() {
        let texts = ["red", "blue", "red", "red#1", "red"].map(String::from);
        assert_eq!(
            unique_labels(texts.into_iter()),
            vec!["red", "blue", "red#1", "red#1#1", "red#2"]
        );
    }

    #[test]
    fn empty_array_is_an_empty_sequence() {
        assert_eq!(Input::from_json(json!([])).unwrap(), Input::Sequence(vec![]));
    }

    #[test]
    fn long_values_are_abbreviated() {
        let long = json!({ "k": "x".repeat(200) , "n": 1});
        let Err(Error::UnpromotableType(msg)) = Input::from_json(long) else {
            panic!("expected error")
        };
        assert!(msg.len() < 100, "{msg}");
        assert!(msg.ends_with("...)"));
    }
}
