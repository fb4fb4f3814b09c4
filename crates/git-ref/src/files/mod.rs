pub(crate) mod loose;
pub(crate) mod transaction;

use std::path::{Path, PathBuf};

use git_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;
use crate::store::{RefStore, RefTransaction};
use crate::Reference;

/// Maximum depth for following symbolic ref chains.
const MAX_SYMREF_DEPTH: usize = 10;

/// Files-backend ref store.
///
/// This is the default ref backend: loose refs stored as individual files
/// under `.git/refs/` (and special refs like `HEAD` at the git dir root),
/// with lock files for atomic updates.
pub struct FilesRefStore {
    git_dir: PathBuf,
}

impl FilesRefStore {
    /// Create a new files-based ref store.
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the git directory path.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Resolve a ref name, following symbolic ref chains up to MAX_SYMREF_DEPTH.
    fn resolve_inner(&self, name: &RefName, depth: usize) -> Result<Option<ObjectId>, RefError> {
        if depth > MAX_SYMREF_DEPTH {
            return Err(RefError::SymrefLoop(name.to_string()));
        }

        match loose::read_loose_ref(&self.git_dir, name)? {
            Some(Reference::Direct { target, .. }) => Ok(Some(target)),
            Some(Reference::Symbolic { target, .. }) => self.resolve_inner(&target, depth + 1),
            None => Ok(None),
        }
    }

    /// Write a single ref directly (non-transactional).
    pub fn write_ref(&self, name: &RefName, oid: &ObjectId) -> Result<(), RefError> {
        loose::write_loose_ref(&self.git_dir, name, oid)
    }

    /// Write a symbolic ref directly (non-transactional).
    pub fn write_symbolic_ref(&self, name: &RefName, target: &RefName) -> Result<(), RefError> {
        loose::write_symbolic_ref(&self.git_dir, name, target)
    }

    /// Delete a ref directly (non-transactional).
    pub fn delete_ref(&self, name: &RefName) -> Result<(), RefError> {
        loose::delete_loose_ref(&self.git_dir, name)
    }

    /// Commit a transaction atomically.
    pub fn commit_transaction(&self, transaction: RefTransaction) -> Result<(), RefError> {
        transaction::commit_transaction(&self.git_dir, transaction)
    }
}

impl RefStore for FilesRefStore {
    fn resolve(&self, name: &RefName) -> Result<Option<Reference>, RefError> {
        loose::read_loose_ref(&self.git_dir, name)
    }

    fn resolve_to_oid(&self, name: &RefName) -> Result<Option<ObjectId>, RefError> {
        self.resolve_inner(name, 0)
    }

    fn iter(
        &self,
        prefix: Option<&str>,
    ) -> Result<Box<dyn Iterator<Item = Result<Reference, RefError>> + '_>, RefError> {
        let loose_refs = loose::enumerate_loose_refs(&self.git_dir, prefix)?;

        let mut all_refs: Vec<Result<Reference, RefError>> = Vec::new();
        for (name, _path) in &loose_refs {
            match loose::read_loose_ref(&self.git_dir, name) {
                Ok(Some(r)) => all_refs.push(Ok(r)),
                Ok(None) => {} // file may have been deleted between enumerate and read
                Err(e) => all_refs.push(Err(e)),
            }
        }

        all_refs.sort_by(|a, b| {
            let name_a = match a {
                Ok(r) => r.name().clone(),
                Err(_) => RefName::new_unchecked(""),
            };
            let name_b = match b {
                Ok(r) => r.name().clone(),
                Err(_) => RefName::new_unchecked(""),
            };
            name_a.cmp(&name_b)
        });

        Ok(Box::new(all_refs.into_iter()))
    }
}
