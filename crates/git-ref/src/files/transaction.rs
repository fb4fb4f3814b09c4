use std::path::Path;

use git_hash::ObjectId;
use git_utils::lockfile::LockFile;

use crate::error::RefError;
use crate::files::loose;
use crate::name::RefName;
use crate::store::{RefTransaction, RefUpdateAction};
use crate::Reference;

/// Commit a ref transaction atomically against the files backend.
///
/// The protocol:
/// 1. Acquire locks on all refs being updated
/// 2. Verify all CAS (compare-and-swap) conditions
/// 3. Write new values to lock files
/// 4. Commit all lock files (atomic rename)
///
/// If any step fails, all locks are released (rollback via Drop).
pub(crate) fn commit_transaction(
    git_dir: &Path,
    transaction: RefTransaction,
) -> Result<(), RefError> {
    if transaction.is_empty() {
        return Ok(());
    }

    // Phase 1: Acquire all locks and verify CAS conditions.
    let mut locks: Vec<LockFile> = Vec::new();

    for update in transaction.updates() {
        let lock_path = loose::loose_ref_path(git_dir, &update.name);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RefError::IoPath {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let lock = LockFile::acquire(&lock_path)?;

        let current = loose::read_loose_ref(git_dir, &update.name)?;
        let current_oid = match &current {
            Some(Reference::Direct { target, .. }) => Some(*target),
            Some(Reference::Symbolic { target, .. }) => resolve_symref(git_dir, target, 10)?,
            None => None,
        };

        verify_cas(&update.name, &update.action, current_oid.as_ref(), &current)?;

        locks.push(lock);
    }

    // Phase 2: Write new values to lock files
    for (i, update) in transaction.updates().iter().enumerate() {
        match &update.action {
            RefUpdateAction::Create { new_target }
            | RefUpdateAction::Update { new_target, .. } => {
                use std::io::Write;
                let content = format!("{}\n", new_target.to_hex());
                locks[i]
                    .write_all(content.as_bytes())
                    .map_err(|e| RefError::IoPath {
                        path: locks[i].path().to_path_buf(),
                        source: e,
                    })?;
            }
            RefUpdateAction::Delete { .. } => {
                // No content to write; handled in commit phase.
            }
            RefUpdateAction::SetSymbolic { target } => {
                use std::io::Write;
                let content = format!("ref: {}\n", target);
                locks[i]
                    .write_all(content.as_bytes())
                    .map_err(|e| RefError::IoPath {
                        path: locks[i].path().to_path_buf(),
                        source: e,
                    })?;
            }
        }
    }

    // Phase 3: Commit all locks (atomic rename) or delete.
    let updates = transaction.updates;
    let locks_vec: Vec<LockFile> = std::mem::take(&mut locks);

    for (i, lock) in locks_vec.into_iter().enumerate() {
        match &updates[i].action {
            RefUpdateAction::Delete { .. } => {
                lock.rollback()?;
                loose::delete_loose_ref(git_dir, &updates[i].name)?;
            }
            _ => {
                lock.commit()?;
            }
        }
    }

    Ok(())
}

/// Verify the CAS condition for a ref update.
fn verify_cas(
    name: &RefName,
    action: &RefUpdateAction,
    current_oid: Option<&ObjectId>,
    current_ref: &Option<Reference>,
) -> Result<(), RefError> {
    match action {
        RefUpdateAction::Create { .. } => {
            if current_ref.is_some() || current_oid.is_some() {
                return Err(RefError::AlreadyExists(name.to_string()));
            }
        }
        RefUpdateAction::Update {
            old_target,
            new_target: _,
        } => {
            let actual = current_oid.ok_or_else(|| RefError::NotFound(name.to_string()))?;
            if actual != old_target {
                return Err(RefError::CasFailed {
                    name: name.to_string(),
                    expected: *old_target,
                    actual: *actual,
                });
            }
        }
        RefUpdateAction::Delete { old_target } => {
            let actual = current_oid.ok_or_else(|| RefError::NotFound(name.to_string()))?;
            if actual != old_target {
                return Err(RefError::CasFailed {
                    name: name.to_string(),
                    expected: *old_target,
                    actual: *actual,
                });
            }
        }
        RefUpdateAction::SetSymbolic { .. } => {
            // No CAS check for symbolic refs.
        }
    }
    Ok(())
}

/// Resolve a symbolic ref chain to an OID.
fn resolve_symref(
    git_dir: &Path,
    name: &RefName,
    max_depth: usize,
) -> Result<Option<ObjectId>, RefError> {
    if max_depth == 0 {
        return Err(RefError::SymrefLoop(name.to_string()));
    }

    match loose::read_loose_ref(git_dir, name)? {
        Some(Reference::Direct { target, .. }) => Ok(Some(target)),
        Some(Reference::Symbolic { target, .. }) => resolve_symref(git_dir, &target, max_depth - 1),
        None => Ok(None),
    }
}
