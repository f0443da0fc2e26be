use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::ResourceLocation;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource {location} does not exist")]
    Missing { location: ResourceLocation },
    #[error("failed to read resource {location}: {source}")]
    Io {
        location: ResourceLocation,
        #[source]
        source: io::Error,
    },
}

/// Source of raw resource streams.
pub trait ResourceProvider {
    fn open(&self, location: &ResourceLocation) -> Result<Box<dyn BufRead + '_>, ResourceError>;

    fn read_bytes(&self, location: &ResourceLocation) -> Result<Vec<u8>, ResourceError> {
        let mut reader = self.open(location)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ResourceError::Io {
                location: location.clone(),
                source,
            })?;
        Ok(bytes)
    }
}

/// Serves `<root>/<namespace>/<path>` from disk.
#[derive(Debug, Clone)]
pub struct DirectoryResourceProvider {
    root: PathBuf,
}

impl DirectoryResourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, location: &ResourceLocation) -> PathBuf {
        let mut path = self.root.join(location.namespace());
        for segment in location.path().split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

impl ResourceProvider for DirectoryResourceProvider {
    fn open(&self, location: &ResourceLocation) -> Result<Box<dyn BufRead + '_>, ResourceError> {
        let path = self.resolve(location);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(ResourceError::Missing {
                    location: location.clone(),
                })
            }
            Err(source) => Err(ResourceError::Io {
                location: location.clone(),
                source,
            }),
        }
    }
}

/// In-memory resources; contents can be swapped while shared.
#[derive(Debug, Default)]
pub struct MemoryResourceProvider {
    entries: RefCell<HashMap<ResourceLocation, Vec<u8>>>,
}

impl MemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: ResourceLocation, bytes: impl Into<Vec<u8>>) {
        self.entries.borrow_mut().insert(location, bytes.into());
    }

    pub fn remove(&self, location: &ResourceLocation) -> bool {
        self.entries.borrow_mut().remove(location).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl ResourceProvider for MemoryResourceProvider {
    fn open(&self, location: &ResourceLocation) -> Result<Box<dyn BufRead + '_>, ResourceError> {
        let entries = self.entries.borrow();
        let bytes = entries.get(location).ok_or_else(|| ResourceError::Missing {
            location: location.clone(),
        })?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn location(raw: &str) -> ResourceLocation {
        ResourceLocation::parse(raw).expect("location")
    }

    #[test]
    fn directory_provider_resolves_namespace_then_path() {
        let temp = TempDir::new().expect("tempdir");
        let maps = temp.path().join("base").join("maps");
        fs::create_dir_all(&maps).expect("create maps");
        fs::write(maps.join("a.map"), "1\n1\n0\n").expect("write map");

        let provider = DirectoryResourceProvider::new(temp.path());
        let bytes = provider
            .read_bytes(&location("base:maps/a.map"))
            .expect("read");
        assert_eq!(bytes, b"1\n1\n0\n");
    }

    #[test]
    fn directory_provider_reports_missing_files() {
        let temp = TempDir::new().expect("tempdir");
        let provider = DirectoryResourceProvider::new(temp.path());
        let result = provider.open(&location("base:maps/none.map"));
        assert!(matches!(result, Err(ResourceError::Missing { .. })));
    }

    #[test]
    fn memory_provider_serves_latest_contents() {
        let provider = MemoryResourceProvider::new();
        let loc = location("base:maps/a.map");
        assert!(matches!(
            provider.read_bytes(&loc),
            Err(ResourceError::Missing { .. })
        ));

        provider.insert(loc.clone(), "first");
        assert_eq!(provider.read_bytes(&loc).expect("first"), b"first");
        provider.insert(loc.clone(), "second");
        assert_eq!(provider.read_bytes(&loc).expect("second"), b"second");
        assert_eq!(provider.len(), 1);
        assert!(provider.remove(&loc));
        assert!(provider.is_empty());
    }
}
