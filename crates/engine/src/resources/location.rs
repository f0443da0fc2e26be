use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "base";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceLocationError {
    #[error("resource namespace must not be empty")]
    EmptyNamespace,
    #[error("resource path must not be empty")]
    EmptyPath,
    #[error("resource path must not start with '/'")]
    LeadingSlash,
    #[error("resource location must not contain '\\\\'")]
    Backslash,
    #[error("resource path must not contain '..' segments")]
    ParentTraversal,
    #[error("resource location contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Namespaced path of a resource, written `namespace:path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocation {
    namespace: String,
    path: String,
}

impl ResourceLocation {
    pub fn new(
        namespace: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self, ResourceLocationError> {
        let namespace = namespace.into();
        let path = path.into();
        validate_namespace(&namespace)?;
        validate_path(&path)?;
        Ok(Self { namespace, path })
    }

    /// Parses `namespace:path`; a bare path lands in [`DEFAULT_NAMESPACE`].
    pub fn parse(raw: &str) -> Result<Self, ResourceLocationError> {
        match raw.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, raw),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceLocation {
    type Err = ResourceLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_namespace(namespace: &str) -> Result<(), ResourceLocationError> {
    if namespace.is_empty() {
        return Err(ResourceLocationError::EmptyNamespace);
    }
    for ch in namespace.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-') {
            continue;
        }
        return Err(invalid_character(ch));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), ResourceLocationError> {
    if path.is_empty() {
        return Err(ResourceLocationError::EmptyPath);
    }
    if path.starts_with('/') {
        return Err(ResourceLocationError::LeadingSlash);
    }
    if path.contains('\\') {
        return Err(ResourceLocationError::Backslash);
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(ResourceLocationError::ParentTraversal);
    }
    for ch in path.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-' | '.') {
            continue;
        }
        return Err(invalid_character(ch));
    }
    Ok(())
}

fn invalid_character(character: char) -> ResourceLocationError {
    if character == '\\' {
        ResourceLocationError::Backslash
    } else {
        ResourceLocationError::InvalidCharacter { character }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_locations() {
        for raw in ["base:maps/level1.map", "maps/a_b-c.map", "mod-2:textures/tiles.png"] {
            assert!(ResourceLocation::parse(raw).is_ok(), "raw={raw}");
        }
    }

    #[test]
    fn rejects_invalid_locations() {
        for raw in ["", ":a", "base:", "/a", "a/../b", r"a\b", "A", "base:a b", "BASE:a"] {
            assert!(ResourceLocation::parse(raw).is_err(), "raw={raw}");
        }
    }

    #[test]
    fn bare_path_uses_default_namespace() {
        let location = ResourceLocation::parse("maps/level1.map").expect("location");
        assert_eq!(location.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(location.path(), "maps/level1.map");
        assert_eq!(location.to_string(), "base:maps/level1.map");
    }

    #[test]
    fn parent_traversal_is_reported_specifically() {
        assert_eq!(
            ResourceLocation::parse("base:../secret"),
            Err(ResourceLocationError::ParentTraversal)
        );
    }
}
