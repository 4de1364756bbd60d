//! Rule paths over the format-agnostic document model.
//!
//! A path is a `/`-separated list of object keys, where `*` matches every key of
//! an object (or every item of an array). Arrays are traversed transparently: a
//! key step applied to an array applies to each of its items, so `/book/id`
//! selects the `id` of every book whether the document has one book or many.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePath {
    segments: Vec<Segment>,
}

/// A value selected by a path, with its JSON pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected<'v> {
    pub pointer: String,
    pub value: &'v Value,
}

/// Escape a key for use in a JSON pointer (RFC 6901).
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

impl RulePath {
    /// Parse a path; an empty path (or `/`) selects the document root.
    ///
    /// # Errors
    ///
    /// Returns a message if the path contains an empty segment such as `a//b`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.is_empty() {
            return Ok(Self {
                segments: Vec::new(),
            });
        }
        let segments = body
            .split('/')
            .map(|segment| match segment {
                "" => Err(format!("empty segment in path '{text}'")),
                "*" => Ok(Segment::Wildcard),
                key => Ok(Segment::Key(key.to_owned())),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { segments })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment, and that segment's key (`None` for `*`).
    pub(crate) fn split_last(&self) -> Option<(Self, Option<&str>)> {
        let (last, parent) = self.segments.split_last()?;
        let key = match last {
            Segment::Key(key) => Some(key.as_str()),
            Segment::Wildcard => None,
        };
        Some((
            Self {
                segments: parent.to_vec(),
            },
            key,
        ))
    }

    /// Select every value at this path, flattening arrays found at the end.
    #[must_use]
    pub fn select<'v>(&self, root: &'v Value) -> Vec<Selected<'v>> {
        let mut selected = Vec::new();
        for node in self.select_nodes(root) {
            flatten(node, &mut selected);
        }
        selected
    }

    /// Select the values at this path without flattening the final arrays.
    pub(crate) fn select_nodes<'v>(&self, root: &'v Value) -> Vec<Selected<'v>> {
        let mut current = vec![Selected {
            pointer: String::new(),
            value: root,
        }];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                step(&node, segment, &mut next);
            }
            current = next;
        }
        current
    }
}

fn flatten<'v>(node: Selected<'v>, out: &mut Vec<Selected<'v>>) {
    match node.value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(
                    Selected {
                        pointer: format!("{}/{index}", node.pointer),
                        value: item,
                    },
                    out,
                );
            }
        }
        _ => out.push(node),
    }
}

fn step<'v>(node: &Selected<'v>, segment: &Segment, out: &mut Vec<Selected<'v>>) {
    match (node.value, segment) {
        (Value::Array(items), _) => {
            for (index, item) in items.iter().enumerate() {
                step(
                    &Selected {
                        pointer: format!("{}/{index}", node.pointer),
                        value: item,
                    },
                    segment,
                    out,
                );
            }
        }
        (Value::Object(map), Segment::Key(key)) => {
            if let Some(value) = map.get(key) {
                out.push(Selected {
                    pointer: format!("{}/{}", node.pointer, escape(key)),
                    value,
                });
            }
        }
        (Value::Object(map), Segment::Wildcard) => {
            out.extend(map.iter().map(|(key, value)| Selected {
                pointer: format!("{}/{}", node.pointer, escape(key)),
                value,
            }));
        }
        _ => {}
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => write!(f, "/{key}")?,
                Segment::Wildcard => f.write_str("/*")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pointers(path: &str, document: &Value) -> Vec<String> {
        RulePath::parse(path)
            .unwrap()
            .select(document)
            .into_iter()
            .map(|s| s.pointer)
            .collect()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(RulePath::parse("book/id").unwrap().to_string(), "/book/id");
        assert_eq!(RulePath::parse("/a/*/b").unwrap().to_string(), "/a/*/b");
        assert!(RulePath::parse("/").unwrap().is_root());
        assert!(RulePath::parse("/a//b").is_err());
    }

    #[test]
    fn test_arrays_traversed_transparently() {
        let many = json!({"book": [{"id": "b1"}, {"id": "b2"}, {"title": "x"}]});
        assert_eq!(pointers("/book/id", &many), vec!["/book/0/id", "/book/1/id"]);

        let one = json!({"book": {"id": "b1"}});
        assert_eq!(pointers("/book/id", &one), vec!["/book/id"]);
    }

    #[test]
    fn test_final_arrays_are_flattened() {
        let document = json!({"tags": ["a", ["b"]]});
        assert_eq!(pointers("/tags", &document), vec!["/tags/0", "/tags/1/0"]);
        assert_eq!(
            RulePath::parse("/tags").unwrap().select_nodes(&document).len(),
            1
        );
    }

    #[test]
    fn test_wildcard_and_escaping() {
        let document = json!({"limits": {"a/b": 1, "c~d": 2}});
        assert_eq!(
            pointers("/limits/*", &document),
            vec!["/limits/a~1b", "/limits/c~0d"]
        );
    }

    #[test]
    fn test_missing_path_selects_nothing() {
        assert!(pointers("/nope/deeper", &json!({"a": 1})).is_empty());
        assert!(pointers("/a/b", &json!({"a": "scalar"})).is_empty());
    }

    #[test]
    fn test_split_last() {
        let path = RulePath::parse("/a/*/b").unwrap();
        let (parent, key) = path.split_last().unwrap();
        assert_eq!(parent.to_string(), "/a/*");
        assert_eq!(key, Some("b"));
        assert!(RulePath::parse("").unwrap().split_last().is_none());
    }
}
