//! Backing resource providers.
//!
//! A provider maps a resource name, as sent in `TAttach`, to a stable unique
//! identity. Providers are shared by every connection and must be callable
//! concurrently.

use {
    crate::{
        error::{Error, errno::*},
        fcall::WireString,
        utils::Result,
    },
    async_trait::async_trait,
    std::{
        collections::HashMap,
        ffi::OsStr,
        os::unix::{ffi::OsStrExt, fs::MetadataExt},
        path::{Component, Path, PathBuf},
    },
    tokio::fs,
};

#[async_trait]
/// Source of resource identities.
///
/// `identity_of` must return the same value for the same resource for the
/// lifetime of the process, and distinct values for distinct resources.
/// Report an absent resource with `Err(Error::No(ENOENT))` or the
/// `io::Error` of a failed lookup.
pub trait ResourceProvider: Send + Sync {
    async fn identity_of(&self, name: &WireString) -> Result<u64>;
}

/// Resources are paths below an exported directory; the identity is the
/// inode number.
#[derive(Clone, Debug)]
pub struct DirProvider {
    root: PathBuf,
}

impl DirProvider {
    pub fn new(root: impl Into<PathBuf>) -> DirProvider {
        DirProvider { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a resource name to a path below the root.
    ///
    /// Absolute names are taken relative to the root. `..` is refused so a
    /// name can never leave the export.
    pub fn resolve(&self, name: &WireString) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(OsStr::from_bytes(name.as_bytes())).components() {
            match component {
                Component::Normal(c) => path.push(c),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => return Err(Error::No(EACCES)),
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl ResourceProvider for DirProvider {
    async fn identity_of(&self, name: &WireString) -> Result<u64> {
        let path = self.resolve(name)?;
        Ok(fs::symlink_metadata(&path).await?.ino())
    }
}

/// Fixed set of named resources, numbered in the order given starting at 1.
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
    ids: HashMap<Vec<u8>, u64>,
}

impl MemoryProvider {
    pub fn new<I, S>(names: I) -> MemoryProvider
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut ids = HashMap::new();
        for name in names {
            let next = ids.len() as u64 + 1;
            ids.entry(name.as_ref().to_vec()).or_insert(next);
        }
        MemoryProvider { ids }
    }
}

#[async_trait]
impl ResourceProvider for MemoryProvider {
    async fn identity_of(&self, name: &WireString) -> Result<u64> {
        self.ids
            .get(name.as_bytes())
            .copied()
            .ok_or(Error::No(ENOENT))
    }
}
