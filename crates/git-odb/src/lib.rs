//! Unified object database for git.
//!
//! A thin, cached façade over the loose object store. Packs are never
//! persisted in this implementation: a clone or fetch parses its pack
//! stream fully in memory (see `git_pack::ParsedPack`) and writes every
//! resolved object straight into the loose store, so there is no pack
//! search path and no alternates chain to maintain here.

pub mod prefix;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use git_hash::{HashAlgorithm, ObjectId};
use git_loose::LooseObjectStore;
use git_object::cache::ObjectCache;
use git_object::{Object, ObjectType};

pub use error::OdbError;

mod error {
    use git_hash::ObjectId;

    #[derive(Debug, thiserror::Error)]
    pub enum OdbError {
        #[error("object not found: {0}")]
        NotFound(ObjectId),

        #[error("ambiguous object name: {prefix} matches {count} objects")]
        Ambiguous { prefix: String, count: usize },

        #[error(transparent)]
        Loose(#[from] git_loose::LooseError),

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}

/// Lightweight object info (header only, no content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// Unified object database: loose storage plus a read cache.
pub struct ObjectDatabase {
    loose: LooseObjectStore,
    cache: Mutex<ObjectCache>,
    objects_dir: PathBuf,
    hash_algo: HashAlgorithm,
}

/// Default number of parsed objects kept in the read cache.
const DEFAULT_CACHE_CAPACITY: usize = 256;

impl ObjectDatabase {
    /// Open the object database at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self::open_with_algo(objects_dir, HashAlgorithm::Sha1)
    }

    /// Open the object database with a specific hash algorithm.
    pub fn open_with_algo(objects_dir: impl AsRef<Path>, hash_algo: HashAlgorithm) -> Self {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        Self {
            loose: LooseObjectStore::open(&objects_dir, hash_algo),
            cache: Mutex::new(ObjectCache::new(DEFAULT_CACHE_CAPACITY)),
            objects_dir,
            hash_algo,
        }
    }

    /// Read an object by OID.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        Ok(self.loose.read(oid)?)
    }

    /// Read an object, consulting (and populating) the in-memory read cache.
    pub fn read_cached(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(obj) = cache.get(oid) {
                return Ok(Some(obj.clone()));
            }
        }

        let obj = self.read(oid)?;
        if let Some(ref obj) = obj {
            self.cache.lock().unwrap().insert(*oid, obj.clone());
        }
        Ok(obj)
    }

    /// Read just the header (type + size) without decompressing full content.
    pub fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError> {
        Ok(self
            .loose
            .read_header(oid)?
            .map(|(obj_type, size)| ObjectInfo { obj_type, size }))
    }

    /// Check if an object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.loose.contains(oid)
    }

    /// Write a new object. No-op if it already exists.
    pub fn write(&self, obj: &Object) -> Result<ObjectId, OdbError> {
        Ok(self.loose.write(obj)?)
    }

    /// Write raw content with a known type.
    pub fn write_raw(&self, obj_type: ObjectType, content: &[u8]) -> Result<ObjectId, OdbError> {
        Ok(self.loose.write_raw(obj_type, content)?)
    }

    /// Resolve an OID prefix to a full OID. Errors if ambiguous or absent.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId, OdbError> {
        prefix::resolve_prefix(self, prefix)
    }

    /// Iterate over all known object OIDs.
    pub fn iter_all_oids(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<ObjectId, OdbError>> + '_>, OdbError> {
        Ok(Box::new(
            self.loose.iter()?.map(|r| r.map_err(OdbError::from)),
        ))
    }

    /// Get the path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Get the hash algorithm in use.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }
}
