//! Path navigation over raw `serde_json` documents.
//!
//! Every accessor reports the path it was asked for, so a degraded field
//! can be logged with the exact spot where the document diverged.

use serde_json::Value;

use crate::error::{FieldError, FieldResult};

/// One step of a path: an object key or an array index.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for Step<'a> {
    fn from(key: &'a str) -> Self {
        Step::Key(key)
    }
}

impl From<usize> for Step<'_> {
    fn from(index: usize) -> Self {
        Step::Index(index)
    }
}

// Integer literals in `path!` fall back to i32.
impl From<i32> for Step<'_> {
    fn from(index: i32) -> Self {
        Step::Index(index.max(0) as usize)
    }
}

fn render(path: &[Step<'_>]) -> String {
    path.iter()
        .map(|step| match step {
            Step::Key(k) => k.to_string(),
            Step::Index(i) => format!("[{i}]"),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Follow `path` from `value`.
pub fn at<'v>(value: &'v Value, path: &[Step<'_>]) -> FieldResult<&'v Value> {
    let mut current = value;
    for (depth, step) in path.iter().enumerate() {
        let next = match step {
            Step::Key(k) => current.get(*k),
            Step::Index(i) => current.get(*i),
        };
        current = next.ok_or_else(|| FieldError::Missing(render(&path[..=depth])))?;
    }
    Ok(current)
}

/// Build a path from keys and indices: `path!["claims", "P31", 0]`.
#[macro_export]
macro_rules! path {
    ($($step:expr),* $(,)?) => {
        &[$($crate::extract::json::Step::from($step)),*]
    };
}

pub fn str_at<'v>(value: &'v Value, path: &[Step<'_>]) -> FieldResult<&'v str> {
    at(value, path)?
        .as_str()
        .ok_or_else(|| FieldError::WrongShape {
            path: render(path),
            expected: "string",
        })
}

pub fn array_at<'v>(value: &'v Value, path: &[Step<'_>]) -> FieldResult<&'v Vec<Value>> {
    at(value, path)?
        .as_array()
        .ok_or_else(|| FieldError::WrongShape {
            path: render(path),
            expected: "array",
        })
}

pub fn i64_at(value: &Value, path: &[Step<'_>]) -> FieldResult<i64> {
    at(value, path)?
        .as_i64()
        .ok_or_else(|| FieldError::WrongShape {
            path: render(path),
            expected: "integer",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_navigates_keys_and_indices() {
        let doc = json!({"claims": {"P31": [{"id": "a"}, {"id": "b"}]}});
        assert_eq!(str_at(&doc, path!["claims", "P31", 1, "id"]).unwrap(), "b");
    }

    #[test]
    fn test_missing_key_reports_prefix() {
        let doc = json!({"claims": {}});
        let err = at(&doc, path!["claims", "P31", 0]).unwrap_err();
        assert_eq!(err, FieldError::Missing("claims.P31".into()));
    }

    #[test]
    fn test_wrong_shape() {
        let doc = json!({"precision": "11"});
        let err = i64_at(&doc, path!["precision"]).unwrap_err();
        assert!(matches!(err, FieldError::WrongShape { expected: "integer", .. }));
    }
}
