//! OID prefix resolution (short hex -> full OID with ambiguity detection).

use git_hash::ObjectId;

use crate::{ObjectDatabase, OdbError};

/// Minimum prefix length (matches C git's MINIMUM_ABBREV).
pub const MINIMUM_ABBREV: usize = 4;

/// Resolve a hex prefix to a full OID against the loose object store.
///
/// Returns an error if the prefix is ambiguous (matches multiple distinct
/// objects) or if no object matches.
pub fn resolve_prefix(odb: &ObjectDatabase, prefix: &str) -> Result<ObjectId, OdbError> {
    if prefix.len() < MINIMUM_ABBREV || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(OdbError::Ambiguous {
            prefix: prefix.to_string(),
            count: 0,
        });
    }

    let algo = odb.hash_algo();
    if prefix.len() == algo.hex_len() {
        let oid = ObjectId::from_hex(prefix).map_err(|_| OdbError::NotFound(ObjectId::NULL_SHA1))?;
        return if odb.contains(&oid) {
            Ok(oid)
        } else {
            Err(OdbError::NotFound(oid))
        };
    }

    let mut matches: Vec<ObjectId> = Vec::new();
    for result in odb.iter_all_oids()? {
        let oid = result?;
        if oid.starts_with_hex(prefix) {
            matches.push(oid);
        }
    }
    matches.sort();
    matches.dedup();

    match matches.len() {
        0 => Err(OdbError::NotFound(ObjectId::NULL_SHA1)),
        1 => Ok(matches[0]),
        n => Err(OdbError::Ambiguous {
            prefix: prefix.to_string(),
            count: n,
        }),
    }
}
