use crate::error::{Error, Result};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

/// The global wildcard granting every permission.
pub const GLOBAL_WILDCARD: &str = "*";

/// Flattened set of permission codes held by a subject.
pub type PermissionSet = HashSet<Permission>;

/// Permission code wrapper (`resource:action`, or the global wildcard `*`).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Permission(String);

impl Permission {
    /// Parses and validates a permission code.
    ///
    /// Accepted forms are `resource:action`, `resource:*`, and the bare
    /// global wildcard `*`. Each non-wildcard segment must match
    /// `[a-zA-Z][a-zA-Z0-9_]*`. Codes are case-sensitive.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPermission(
                "permission must not be empty".to_string(),
            ));
        }
        if trimmed == GLOBAL_WILDCARD {
            return Ok(Self(trimmed.to_string()));
        }
        let (resource, action) = split_permission(trimmed).ok_or_else(|| {
            Error::InvalidPermission("permission must be in resource:action format".to_string())
        })?;
        if !is_valid_segment(resource) {
            return Err(Error::InvalidPermission(format!(
                "invalid resource segment {resource:?}"
            )));
        }
        if !is_valid_segment(action) {
            return Err(Error::InvalidPermission(format!(
                "invalid action segment {action:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Builds a permission from separate resource and action segments.
    pub fn from_parts(resource: impl AsRef<str>, action: impl AsRef<str>) -> Result<Self> {
        Self::new(format!("{}:{}", resource.as_ref(), action.as_ref()))
    }

    /// Creates a permission from a trusted string without validation.
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the resource segment, or `None` for the global wildcard.
    pub fn resource(&self) -> Option<&str> {
        split_permission(&self.0).map(|(resource, _)| resource)
    }

    /// Returns the action segment, or `None` for the global wildcard.
    pub fn action(&self) -> Option<&str> {
        split_permission(&self.0).map(|(_, action)| action)
    }

    /// Returns true for the bare global wildcard `*`.
    pub fn is_global_wildcard(&self) -> bool {
        self.0 == GLOBAL_WILDCARD
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Permission {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    if segment == GLOBAL_WILDCARD {
        return true;
    }
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

pub(crate) fn split_permission(value: &str) -> Option<(&str, &str)> {
    value.split_once(':')
}

/// How a granted permission satisfied a required one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Matched the global wildcard `*`.
    GlobalWildcard,
    /// Matched a `resource:*` grant.
    ResourceWildcard,
    /// Matched the exact `resource:action` code.
    Exact,
}

/// Finds the strongest grant in `granted` that satisfies `required`.
///
/// Precedence is global wildcard, then resource wildcard, then exact match.
/// Returns `None` when nothing matches.
pub(crate) fn match_permission(granted: &PermissionSet, required: &Permission) -> Option<MatchKind> {
    if granted.contains(GLOBAL_WILDCARD) {
        return Some(MatchKind::GlobalWildcard);
    }
    if let Some(resource) = required.resource() {
        if granted.contains(format!("{resource}:{GLOBAL_WILDCARD}").as_str()) {
            return Some(MatchKind::ResourceWildcard);
        }
    }
    if granted.contains(required.as_str()) {
        return Some(MatchKind::Exact);
    }
    None
}
