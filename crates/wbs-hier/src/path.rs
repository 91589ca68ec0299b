//! Slash-addressed paths into the plan hierarchy.
//!
//! Provides [`HierPath`] for addressing nodes of the local store.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Location of a node in the plan hierarchy.
///
/// Segments are human-readable node names; the root is the empty path and
/// displays as `/`.
///
/// # Examples
/// - `["Project", "Component A", "Task 1"]` → `/Project/Component A/Task 1`
/// - `[]` → `/`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HierPath(Vec<String>);

impl HierPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// The root of the hierarchy (empty path)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get the node's own name (if not root)
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning the child path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Extend with multiple segments
    #[inline]
    #[must_use]
    pub fn extend(&self, segments: &[impl AsRef<str>]) -> Self {
        let mut new = self.clone();
        for seg in segments {
            new.0.push(seg.as_ref().to_string());
        }
        new
    }

    /// Check if this path is a prefix of another (any path is a prefix of
    /// itself; the root is a prefix of everything)
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this path is an ancestor of another (strict prefix)
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Get relative segments below an ancestor
    ///
    /// # Errors
    /// Returns an error if `self` is not at or below `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Vec<String>, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(self.0[ancestor.0.len()..].to_vec())
    }

    /// Rewrite this path by replacing the `old_prefix` with `new_prefix`.
    ///
    /// Returns `None` when `old_prefix` is not a prefix of this path. Used
    /// to track nodes across renames and moves.
    #[must_use]
    pub fn reroot(&self, old_prefix: &Self, new_prefix: &Self) -> Option<Self> {
        if !old_prefix.is_prefix_of(self) {
            return None;
        }
        let mut segments = new_prefix.0.clone();
        segments.extend_from_slice(&self.0[old_prefix.0.len()..]);
        Some(Self(segments))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for HierPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for HierPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PathError::NoLeadingSlash(s.to_string()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = rest
            .split('/')
            .map(|seg| {
                if seg.trim().is_empty() {
                    Err(PathError::EmptySegment)
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self(segments))
    }
}

impl TryFrom<String> for HierPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HierPath> for String {
    fn from(path: HierPath) -> Self {
        path.to_string()
    }
}

impl From<Vec<String>> for HierPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl Default for HierPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to hierarchy paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Paths are absolute and must begin with a slash
    #[error("path '{0}' does not begin with '/'")]
    NoLeadingSlash(String),

    /// Empty segment in path
    #[error("path contains an empty segment")]
    EmptySegment,

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_new_and_segments() {
        let path = HierPath::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(path.segments(), &["a", "b"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_root_is_empty() {
        let path = HierPath::root();
        assert!(path.is_root());
        assert_eq!(path.len(), 0);
        assert_eq!(path.to_string(), "/");
    }

    #[test]
    fn path_parent() {
        let path = HierPath::new(vec!["a".into(), "b".into(), "c".into()]);
        let parent = path.parent().unwrap();
        assert_eq!(parent.segments(), &["a", "b"]);
        assert!(HierPath::root().parent().is_none());
    }

    #[test]
    fn path_name_is_last_segment() {
        let path = HierPath::new(vec!["Project".into(), "Task 1".into()]);
        assert_eq!(path.name(), Some("Task 1"));
        assert_eq!(HierPath::root().name(), None);
    }

    #[test]
    fn path_child_and_extend() {
        let base = HierPath::single("Project");
        assert_eq!(base.child("Task").segments(), &["Project", "Task"]);
        assert_eq!(base.extend(&["a", "b"]).segments(), &["Project", "a", "b"]);
    }

    #[test]
    fn path_prefix_and_ancestor() {
        let a: HierPath = "/a/b".parse().unwrap();
        let b: HierPath = "/a/b/c".parse().unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(a.is_prefix_of(&a));
        assert!(a.is_ancestor_of(&b));
        assert!(!a.is_ancestor_of(&a));
        assert!(!b.is_prefix_of(&a));
        assert!(HierPath::root().is_prefix_of(&a));
    }

    #[test]
    fn path_relative_to() {
        let full: HierPath = "/a/b/c/d".parse().unwrap();
        let ancestor: HierPath = "/a/b".parse().unwrap();
        assert_eq!(full.relative_to(&ancestor).unwrap(), vec!["c", "d"]);

        let other: HierPath = "/x".parse().unwrap();
        assert!(matches!(
            full.relative_to(&other),
            Err(PathError::NotDescendant { .. })
        ));
    }

    #[test]
    fn path_reroot_replaces_prefix() {
        let path: HierPath = "/a/b/c".parse().unwrap();
        let from: HierPath = "/a/b".parse().unwrap();
        let to: HierPath = "/x".parse().unwrap();
        assert_eq!(path.reroot(&from, &to).unwrap().to_string(), "/x/c");

        let unrelated: HierPath = "/q".parse().unwrap();
        assert!(path.reroot(&unrelated, &to).is_none());
    }

    #[test]
    fn path_display_with_spaces() {
        let path = HierPath::new(vec!["My Project".into(), "Task One".into()]);
        assert_eq!(path.to_string(), "/My Project/Task One");
    }

    #[test]
    fn path_from_str_valid() {
        let path: HierPath = "/a/b c/d".parse().unwrap();
        assert_eq!(path.segments(), &["a", "b c", "d"]);
    }

    #[test]
    fn path_from_str_requires_leading_slash() {
        let result: Result<HierPath, _> = "a/b".parse();
        assert!(matches!(result, Err(PathError::NoLeadingSlash(_))));
    }

    #[test]
    fn path_from_str_rejects_empty_segment() {
        let result: Result<HierPath, _> = "/a//b".parse();
        assert!(matches!(result, Err(PathError::EmptySegment)));
    }

    #[test]
    fn path_ordering_puts_parents_first() {
        let mut paths: Vec<HierPath> = vec![
            "/a/b/c".parse().unwrap(),
            "/a".parse().unwrap(),
            "/a/b".parse().unwrap(),
        ];
        paths.sort();
        let display: Vec<String> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(display, vec!["/a", "/a/b", "/a/b/c"]);
    }

    #[test]
    fn path_serde_uses_display_form() {
        let path: HierPath = "/a/b".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: HierPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
