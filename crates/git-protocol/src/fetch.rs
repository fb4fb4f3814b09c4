//! Fetch protocol implementation.
//!
//! Orchestrates a complete fetch: send the minimal want/flush/done
//! negotiation, receive the pack, and resolve it to loose objects. A
//! received pack is never written to disk. It is parsed fully in memory
//! and every resolved object goes straight into the caller's object
//! database via [`git_pack::ParsedPack`].

use git_hash::ObjectId;
use git_odb::ObjectDatabase;
use git_pack::ParsedPack;
use git_transport::Transport;

use crate::capability::{Capabilities, SidebandMode};
use crate::pktline::{PktLineReader, PktLineWriter};
use crate::sideband::SidebandReader;
use crate::ProtocolError;

/// Fetch operation options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Show progress output.
    pub progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { progress: true }
    }
}

/// Result of a fetch operation.
#[derive(Debug)]
pub struct FetchResult {
    /// Ref updates to apply.
    pub ref_updates: Vec<(String, ObjectId)>,
    /// Number of objects resolved and written to the object database.
    pub new_objects: usize,
}

/// Perform a fetch operation using an already-connected transport.
///
/// Sends a single round of `want` lines followed by a flush and `done`,
/// with no capability negotiation and no `have` lines. This
/// implementation never has local history to negotiate against a
/// from-scratch clone. The response is read, its pack data resolved
/// in memory, and every resolved object written into `odb`.
pub fn fetch(
    transport: &mut dyn Transport,
    advertised_refs: &[(ObjectId, bstr::BString)],
    _server_caps: &Capabilities,
    wanted_refs: &[String],
    odb: &ObjectDatabase,
    options: &FetchOptions,
) -> Result<FetchResult, ProtocolError> {
    let wants: Vec<ObjectId> = determine_wants(advertised_refs, wanted_refs);

    if wants.is_empty() {
        return Ok(FetchResult {
            ref_updates: Vec::new(),
            new_objects: 0,
        });
    }

    {
        let writer = transport.writer();
        let mut pkt_writer = PktLineWriter::new(writer);

        for want in &wants {
            pkt_writer.write_text(&format!("want {}", want))?;
        }
        pkt_writer.write_flush()?;
        pkt_writer.write_text("done")?;
        pkt_writer.flush()?;
    }

    // Read ACK/NAK lines up to the point where pack data begins.
    {
        let reader = transport.reader();
        let mut pkt_reader = PktLineReader::new(reader);

        loop {
            match pkt_reader.read_pkt()? {
                crate::pktline::PktLine::Data(data) => {
                    let line = String::from_utf8_lossy(&data);
                    let line = line.trim_end_matches('\n');
                    if line == "NAK" || line.starts_with("ACK ") {
                        if line == "NAK" {
                            break;
                        }
                        continue;
                    }
                    break;
                }
                crate::pktline::PktLine::Flush => break,
                _ => break,
            }
        }
    }

    let sideband_mode = SidebandMode::None;
    let pack_data = receive_pack_data(transport, sideband_mode)?;

    let mut new_objects = 0;
    if !pack_data.is_empty() {
        let parsed = ParsedPack::parse(&pack_data, odb.hash_algo())?;
        let resolved = parsed.resolve_all(|oid| {
            odb.read(oid)
                .ok()
                .flatten()
                .map(|obj| (obj.object_type(), obj.serialize_content()))
        })?;

        for object in &resolved {
            odb.write_raw(object.obj_type, &object.data)?;
            new_objects += 1;
        }

        if options.progress {
            eprintln!("Resolved {} objects", new_objects);
        }
    }

    let mut ref_updates = Vec::new();
    for (oid, refname) in advertised_refs {
        let name = String::from_utf8_lossy(refname.as_ref()).to_string();
        if wanted_refs.is_empty() || wanted_refs.iter().any(|w| name == *w) {
            ref_updates.push((name, *oid));
        }
    }

    Ok(FetchResult {
        ref_updates,
        new_objects,
    })
}

/// Determine which OIDs to request from the server.
fn determine_wants(
    advertised_refs: &[(ObjectId, bstr::BString)],
    wanted_refs: &[String],
) -> Vec<ObjectId> {
    let mut wants = Vec::new();

    for (oid, refname) in advertised_refs {
        let name = String::from_utf8_lossy(refname.as_ref()).to_string();

        if wanted_refs.is_empty() {
            if !wants.contains(oid) {
                wants.push(*oid);
            }
        } else if wanted_refs.iter().any(|w| name == *w) && !wants.contains(oid) {
            wants.push(*oid);
        }
    }

    wants
}

/// Receive pack data from the transport, demultiplexing sideband framing
/// if the server applied it despite not being asked to.
fn receive_pack_data(
    transport: &mut dyn Transport,
    sideband_mode: SidebandMode,
) -> Result<Vec<u8>, ProtocolError> {
    let reader = transport.reader();

    match sideband_mode {
        SidebandMode::None => {
            let mut data = Vec::new();
            std::io::Read::read_to_end(reader, &mut data)?;

            // A server may apply sideband framing even though it wasn't
            // requested; raw pack data always starts with "PACK", so
            // anything else is treated as pkt-line/sideband framed.
            if looks_like_sideband(&data) {
                let cursor = std::io::Cursor::new(data);
                let pkt_reader = PktLineReader::new(cursor);
                let mut sideband = SidebandReader::new(pkt_reader);
                sideband.read_all_data()
            } else {
                Ok(data)
            }
        }
        SidebandMode::Band | SidebandMode::Band64k => {
            let pkt_reader = PktLineReader::new(reader);
            let mut sideband = SidebandReader::new(pkt_reader);
            sideband.read_all_data()
        }
    }
}

/// Heuristic: raw pack data always starts with the literal `PACK` magic.
/// If it doesn't, the bytes are framed (pkt-line/sideband) rather than raw.
fn looks_like_sideband(data: &[u8]) -> bool {
    !data.is_empty() && !data.starts_with(b"PACK")
}
