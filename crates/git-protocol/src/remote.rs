//! Remote refspec parsing and ref mapping.

use bstr::BString;

use crate::ProtocolError;

/// A refspec for fetch or push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    /// Source pattern (left side of the colon).
    pub source: String,
    /// Destination pattern (right side of the colon).
    pub destination: String,
    /// Force update (prefixed with +).
    pub force: bool,
}

impl RefSpec {
    /// Parse a refspec string like `+refs/heads/*:refs/remotes/origin/*`.
    pub fn parse(spec: &str) -> Result<Self, ProtocolError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ProtocolError::InvalidRefSpec("empty refspec".into()));
        }

        let (force, rest) = if let Some(s) = spec.strip_prefix('+') {
            (true, s)
        } else {
            (false, spec)
        };

        if let Some(colon_pos) = rest.find(':') {
            let source = &rest[..colon_pos];
            let destination = &rest[colon_pos + 1..];
            Ok(RefSpec {
                source: source.to_string(),
                destination: destination.to_string(),
                force,
            })
        } else {
            // No colon, source only (e.g., "refs/heads/main")
            Ok(RefSpec {
                source: rest.to_string(),
                destination: String::new(),
                force,
            })
        }
    }

    /// Check if a ref name matches this refspec's source pattern.
    pub fn matches_source(&self, refname: &str) -> bool {
        pattern_matches(&self.source, refname)
    }

    /// Map a source ref name to its destination using this refspec.
    ///
    /// Returns None if the source doesn't match.
    pub fn map_to_destination(&self, source_ref: &str) -> Option<String> {
        if self.destination.is_empty() {
            return None;
        }

        if let Some(star_pos) = self.source.find('*') {
            let prefix = &self.source[..star_pos];
            let suffix = &self.source[star_pos + 1..];

            if source_ref.starts_with(prefix) && source_ref.ends_with(suffix) {
                let matched = &source_ref[prefix.len()..source_ref.len() - suffix.len()];

                if let Some(dest_star) = self.destination.find('*') {
                    let dest_prefix = &self.destination[..dest_star];
                    let dest_suffix = &self.destination[dest_star + 1..];
                    return Some(format!("{}{}{}", dest_prefix, matched, dest_suffix));
                }
            }
            None
        } else if self.source == source_ref {
            Some(self.destination.clone())
        } else {
            None
        }
    }
}

/// Check if a pattern (with optional `*` wildcard) matches a string.
fn pattern_matches(pattern: &str, value: &str) -> bool {
    if let Some(star_pos) = pattern.find('*') {
        let prefix = &pattern[..star_pos];
        let suffix = &pattern[star_pos + 1..];
        value.starts_with(prefix) && value.ends_with(suffix)
    } else {
        pattern == value
    }
}

/// Apply refspecs to map remote refs to local tracking refs.
pub fn map_refs(
    refs: &[(git_hash::ObjectId, BString)],
    refspecs: &[RefSpec],
) -> Vec<(git_hash::ObjectId, String, String)> {
    let mut result = Vec::new();

    for (oid, remote_ref) in refs {
        let remote_name = String::from_utf8_lossy(remote_ref.as_ref()).to_string();
        for spec in refspecs {
            if let Some(local_ref) = spec.map_to_destination(&remote_name) {
                result.push((*oid, remote_name.clone(), local_ref));
                break;
            }
        }
    }

    result
}
