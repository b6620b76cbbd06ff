//! yaml
//!
//! Deep-path mutation of YAML mapping documents.
//!
//! # Design
//!
//! A document is parsed into a [`YamlNode`] (a top-level mapping), a single
//! dotted [`PropertyPath`] is resolved against a deep copy of it, and the
//! terminal key is overwritten with a [`ScalarValue`]. The caller's tree is
//! never mutated.
//!
//! Resolution rules for the segments before the last one:
//! - a missing key is created as an empty mapping
//! - an existing key must hold a mapping, otherwise the path is rejected
//!
//! The terminal segment is always overwritten, whatever it held before.
//!
//! Segments are matched against existing keys by their plain rendering, so
//! `ports.80` reaches an integer key `80` and `flags.true` a boolean key.
//! Missing keys are created as strings.
//!
//! # Example
//!
//! ```
//! use yaml_update::yaml::{self, PropertyPath, ScalarValue};
//!
//! let tree = yaml::parse("image:\n  tag: '1.0'\n").unwrap();
//! let path: PropertyPath = "image.tag".parse().unwrap();
//!
//! let updated = yaml::replace(&ScalarValue::from("2.0"), &path, &tree).unwrap();
//! assert_eq!(yaml::serialize(&updated).unwrap(), "image:\n  tag: '2.0'\n");
//! ```

mod emit;
mod scalar;

pub use scalar::ScalarValue;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Errors from parsing or mutating YAML documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YamlError {
    /// The file is missing, unreadable, or its content is not a mapping.
    #[error("{message}")]
    Parse { message: String },

    /// A non-terminal path segment names a value that is not a mapping.
    #[error("invalid property path - {segment} is not an object")]
    InvalidPath { segment: String },

    /// The property path string was empty.
    #[error("invalid property path - path is empty")]
    EmptyPath,

    /// The tree could not be rendered back to YAML.
    #[error("could not serialize YAML: {message}")]
    Emit { message: String },
}

/// A YAML document whose top level is a mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YamlNode(Mapping);

impl YamlNode {
    /// Create an empty mapping document.
    pub fn new() -> Self {
        Self(Mapping::new())
    }

    /// Borrow the underlying mapping.
    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.0, key)
    }

    /// Look up a nested value by dotted path.
    ///
    /// Returns `None` if any segment is missing or an intermediate value
    /// is not a mapping.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = lookup(&self.0, segments.next()?)?;
        for segment in segments {
            current = lookup(current.as_mapping()?, segment)?;
        }
        Some(current)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Mapping> for YamlNode {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

/// The key in `mapping` that `segment` names.
///
/// A string key equal to the segment wins. Otherwise an integer, float or
/// boolean key whose rendering equals the segment is used. Falls back to a
/// new string key.
fn resolve_key(mapping: &Mapping, segment: &str) -> Value {
    let exact = Value::String(segment.to_string());
    if mapping.contains_key(&exact) {
        return exact;
    }

    mapping
        .keys()
        .find(|key| match key {
            Value::Number(n) => n.to_string() == segment,
            Value::Bool(b) => b.to_string() == segment,
            _ => false,
        })
        .cloned()
        .unwrap_or(exact)
}

fn lookup<'a>(mapping: &'a Mapping, segment: &str) -> Option<&'a Value> {
    mapping.get(resolve_key(mapping, segment))
}

/// A non-empty, dot-separated sequence of mapping keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Split a dotted path into segments.
    ///
    /// # Errors
    ///
    /// Returns `YamlError::EmptyPath` for an empty string.
    pub fn new(path: &str) -> Result<Self, YamlError> {
        if path.is_empty() {
            return Err(YamlError::EmptyPath);
        }
        Ok(Self {
            segments: path.split('.').map(str::to_string).collect(),
        })
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments leading to the parent mapping, and the terminal key.
    fn split_last(&self) -> (&[String], &str) {
        match self.segments.split_last() {
            Some((last, parents)) => (parents, last.as_str()),
            None => (&[], ""),
        }
    }
}

impl FromStr for PropertyPath {
    type Err = YamlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Parse YAML text into a mapping document.
///
/// # Errors
///
/// Returns `YamlError::Parse` if the text is not valid YAML or the
/// document is not a mapping (scalar, sequence or empty).
pub fn parse(text: &str) -> Result<YamlNode, YamlError> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| YamlError::Parse {
        message: format!("could not parse content as YAML: {}", e),
    })?;

    match value {
        Value::Mapping(mapping) => Ok(YamlNode(mapping)),
        _ => Err(YamlError::Parse {
            message: "could not parse content as YAML".into(),
        }),
    }
}

/// Read and parse a YAML file.
///
/// # Errors
///
/// Returns `YamlError::Parse` if the file does not exist, cannot be read,
/// or does not hold a mapping document.
pub fn load(path: &Path) -> Result<YamlNode, YamlError> {
    if !path.exists() {
        return Err(YamlError::Parse {
            message: format!("could not parse file with path: {}", path.display()),
        });
    }

    let text = fs::read_to_string(path).map_err(|e| YamlError::Parse {
        message: format!("could not read file with path: {}: {}", path.display(), e),
    })?;

    parse(&text)
}

/// Set `path` to `value` in a copy of `tree`.
///
/// Missing intermediate keys are created as empty mappings. The terminal
/// key is overwritten regardless of its current value.
///
/// # Errors
///
/// Returns `YamlError::InvalidPath` if an intermediate key exists but does
/// not hold a mapping.
pub fn replace(
    value: &ScalarValue,
    path: &PropertyPath,
    tree: &YamlNode,
) -> Result<YamlNode, YamlError> {
    let mut copy = tree.clone();
    let (parents, last) = path.split_last();

    let mut scope: &mut Mapping = &mut copy.0;
    for segment in parents {
        let key = resolve_key(scope, segment);
        let entry = scope
            .entry(key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));

        scope = match entry {
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(YamlError::InvalidPath {
                    segment: segment.clone(),
                })
            }
        };
    }

    let key = resolve_key(scope, last);
    scope.insert(key, value.to_yaml());
    Ok(copy)
}

/// Render a document as YAML text.
///
/// Lines are never wrapped, so long values stay on one line. Strings that
/// a YAML 1.1 reader would take as booleans (`yes`, `no`, `on`, `off` and
/// their variants) are single-quoted.
pub fn serialize(tree: &YamlNode) -> Result<String, YamlError> {
    let text = serde_yaml::to_string(&tree.0).map_err(|e| YamlError::Emit {
        message: e.to_string(),
    })?;
    Ok(emit::quote_keywords(&text))
}

/// Parse `text`, set `path` to `value`, and render the result.
///
/// Returns both the updated tree and its YAML text. Useful for previewing
/// a change without touching the filesystem or the remote.
pub fn convert(
    value: &ScalarValue,
    path: &str,
    text: &str,
) -> Result<(YamlNode, String), YamlError> {
    let tree = parse(text)?;
    let path = PropertyPath::new(path)?;
    let updated = replace(value, &path, &tree)?;
    let rendered = serialize(&updated)?;
    Ok((updated, rendered))
}
