//! In-memory pack stream parsing.
//!
//! Packs in this implementation are never written to disk as `.pack`/`.idx`
//! pairs: a clone or fetch reads the whole pack into memory, this module
//! walks its entries exactly once, and the caller writes each resolved
//! object straight into the loose object store. There is no persisted
//! pack file and no pack index to build.
//!
//! Packfiles do not mark where one compressed record ends and the next
//! begins — only the *declared uncompressed size* is known up front. We
//! therefore inflate with the low-level [`flate2::Decompress`] state
//! machine and read off `total_in()` to learn exactly how many compressed
//! bytes the record consumed, then resume parsing right after it.

use std::collections::HashMap;

use flate2::{Decompress, FlushDecompress, Status};
use git_hash::{HashAlgorithm, ObjectId};
use git_object::ObjectType;

use crate::entry::parse_entry_header;
use crate::{
    PackEntryType, PackError, PACK_HEADER_SIZE, PACK_SIGNATURE, PACK_VERSION,
};

/// An object fully resolved from a pack stream, ready to be stored loose.
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    pub oid: ObjectId,
    pub obj_type: ObjectType,
    pub data: Vec<u8>,
}

struct RawRecord {
    offset: u64,
    entry_type: PackEntryType,
    /// Decompressed payload: the full object for base entries, the delta
    /// instruction stream for OFS_DELTA/REF_DELTA entries.
    payload: Vec<u8>,
}

/// A pack stream parsed into its raw (still possibly deltified) records.
pub struct ParsedPack {
    hash_algo: HashAlgorithm,
    records: Vec<RawRecord>,
    offset_of: HashMap<u64, usize>,
    pub checksum: ObjectId,
}

impl ParsedPack {
    /// Parse a complete pack (header through trailing checksum) from `data`.
    pub fn parse(data: &[u8], hash_algo: HashAlgorithm) -> Result<Self, PackError> {
        if data.len() < PACK_HEADER_SIZE + hash_algo.digest_len() {
            return Err(PackError::InvalidHeader("pack too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let trailer_at = data.len() - hash_algo.digest_len();
        let mut pos = PACK_HEADER_SIZE as u64;
        let mut records = Vec::with_capacity(num_objects as usize);
        let mut offset_of = HashMap::with_capacity(num_objects as usize);

        for _ in 0..num_objects {
            if pos >= trailer_at as u64 {
                return Err(PackError::CorruptEntry(pos));
            }
            let entry = parse_entry_header(&data[pos as usize..], pos)?;
            let compressed = &data[entry.data_offset as usize..trailer_at];
            let (payload, consumed) =
                inflate_one(compressed, entry.uncompressed_size, entry.data_offset)?;

            offset_of.insert(pos, records.len());
            records.push(RawRecord {
                offset: pos,
                entry_type: entry.entry_type,
                payload,
            });
            pos = entry.data_offset + consumed as u64;
        }

        if pos as usize != trailer_at {
            return Err(PackError::CorruptEntry(pos));
        }

        let expected = ObjectId::from_bytes(&data[trailer_at..], hash_algo)?;
        let actual = git_hash::hasher::Hasher::digest(hash_algo, &data[..trailer_at])?;
        if actual != expected {
            return Err(PackError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            hash_algo,
            records,
            offset_of,
            checksum: expected,
        })
    }

    /// Number of entries in the pack, including deltas.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve every record into a final object.
    ///
    /// `external` is consulted when a REF_DELTA's base is not found inside
    /// this pack stream (a "thin pack" base that must already be present in
    /// the repository's loose object store).
    pub fn resolve_all(
        &self,
        external: impl Fn(&ObjectId) -> Option<(ObjectType, Vec<u8>)>,
    ) -> Result<Vec<ResolvedObject>, PackError> {
        let n = self.records.len();
        let mut resolved: Vec<Option<(ObjectType, Vec<u8>, ObjectId)>> = vec![None; n];
        let mut oid_to_idx: HashMap<ObjectId, usize> = HashMap::with_capacity(n);

        // Base (non-delta) records resolve immediately.
        for (idx, rec) in self.records.iter().enumerate() {
            if let Some(obj_type) = rec.entry_type.to_object_type() {
                let oid =
                    git_hash::hasher::Hasher::hash_object(self.hash_algo, &obj_type.to_string(), &rec.payload)?;
                oid_to_idx.insert(oid, idx);
                resolved[idx] = Some((obj_type, rec.payload.clone(), oid));
            }
        }

        // Repeatedly resolve deltas whose base has become known, until a
        // fixed point. Handles both offset and ref deltas regardless of
        // whether their base appears earlier or later in the stream.
        let mut remaining: Vec<usize> = (0..n).filter(|&i| resolved[i].is_none()).collect();
        loop {
            let mut progressed = false;
            let mut still_remaining = Vec::new();

            for idx in remaining {
                let rec = &self.records[idx];
                let base = match rec.entry_type {
                    PackEntryType::OfsDelta { base_offset } => self
                        .offset_of
                        .get(&base_offset)
                        .and_then(|&bi| resolved[bi].clone()),
                    PackEntryType::RefDelta { base_oid } => {
                        if let Some(&bi) = oid_to_idx.get(&base_oid) {
                            resolved[bi].clone()
                        } else {
                            external(&base_oid).map(|(t, d)| (t, d, base_oid))
                        }
                    }
                    _ => unreachable!("non-delta records already resolved"),
                };

                match base {
                    Some((base_type, base_data, _)) => {
                        let data = crate::delta::apply::apply_delta(&base_data, &rec.payload)
                            .map_err(|_| PackError::InvalidDelta {
                                offset: rec.offset,
                                reason: "delta application failed".into(),
                            })?;
                        let oid = git_hash::hasher::Hasher::hash_object(
                            self.hash_algo,
                            &base_type.to_string(),
                            &data,
                        )?;
                        oid_to_idx.insert(oid, idx);
                        resolved[idx] = Some((base_type, data, oid));
                        progressed = true;
                    }
                    None => still_remaining.push(idx),
                }
            }

            remaining = still_remaining;
            if remaining.is_empty() || !progressed {
                break;
            }
        }

        if let Some(&idx) = remaining.first() {
            return match self.records[idx].entry_type {
                PackEntryType::RefDelta { base_oid } => Err(PackError::MissingBase(base_oid)),
                _ => Err(PackError::CorruptEntry(self.records[idx].offset)),
            };
        }

        Ok(resolved
            .into_iter()
            .map(|r| {
                let (obj_type, data, oid) = r.expect("every record resolved or pack rejected above");
                ResolvedObject { oid, obj_type, data }
            })
            .collect())
    }
}

/// Inflate a single zlib stream starting at `compressed[0]`, stopping as
/// soon as the underlying decompressor reports end-of-stream. Returns the
/// decompressed bytes and the number of compressed bytes consumed.
fn inflate_one(
    compressed: &[u8],
    expected_size: usize,
    offset: u64,
) -> Result<(Vec<u8>, usize), PackError> {
    let mut decompress = Decompress::new(true);
    let mut out = vec![0u8; expected_size.max(16)];
    let mut out_pos = 0usize;

    loop {
        let in_pos = decompress.total_in() as usize;
        if in_pos >= compressed.len() {
            return Err(PackError::CorruptEntry(offset));
        }
        if out_pos == out.len() {
            out.resize(out.len() * 2, 0);
        }

        let before_in = decompress.total_in();
        let before_out = decompress.total_out();
        let status = decompress
            .decompress(&compressed[in_pos..], &mut out[out_pos..], FlushDecompress::None)
            .map_err(|_| PackError::CorruptEntry(offset))?;
        out_pos = decompress.total_out() as usize;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if decompress.total_in() == before_in && decompress.total_out() == before_out {
                    return Err(PackError::CorruptEntry(offset));
                }
            }
        }
    }

    out.truncate(out_pos);
    if out.len() != expected_size {
        return Err(PackError::CorruptEntry(offset));
    }
    Ok((out, decompress.total_in() as usize))
}
