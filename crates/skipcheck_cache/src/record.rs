//! Binary encoding of snapshot records.
//!
//! A record is a 4-byte little-endian header length, a bincode-encoded
//! [`RecordHeader`], then the bincode-encoded sorted list of file paths. The
//! header carries magic bytes, a format version, the owning identity and a
//! checksum of the payload, so truncated, foreign or outdated records are
//! rejected deterministically instead of being read as a smaller file set.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::scanner::FileSet;

/// Magic bytes identifying a snapshot record.
const RECORD_MAGIC: [u8; 4] = *b"SKCK";

/// Current record format version. Increment on breaking changes to the
/// header or payload encoding.
pub const RECORD_FORMAT_VERSION: u32 = 1;

/// Upper bound on the encoded header size. The header is decoded before its
/// payload checksum can be verified, so its length claims are untrusted.
const HEADER_LIMIT: usize = 64 * 1024;

/// Header prepended to every snapshot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Magic bytes: must be `b"SKCK"`.
    pub magic: [u8; 4],
    /// Record format version.
    pub format_version: u32,
    /// Identity tag of the project the record belongs to.
    pub identity: String,
    /// Number of paths in the payload.
    pub entry_count: u32,
    /// XXH3-128 checksum of the payload bytes.
    pub checksum: u128,
}

fn payload_checksum(payload: &[u8]) -> u128 {
    xxhash_rust::xxh3::xxh3_128(payload)
}

/// Encodes a file set as a complete record.
pub fn encode_record(identity: &str, files: &FileSet) -> Result<Vec<u8>, CacheError> {
    let config = bincode::config::standard();
    let payload =
        bincode::serde::encode_to_vec(files, config).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    let header = RecordHeader {
        magic: RECORD_MAGIC,
        format_version: RECORD_FORMAT_VERSION,
        identity: identity.to_string(),
        entry_count: u32::try_from(files.len()).map_err(|_| CacheError::Serialization {
            reason: format!("{} entries exceed the record limit", files.len()),
        })?,
        checksum: payload_checksum(&payload),
    };
    let header_bytes =
        bincode::serde::encode_to_vec(&header, config).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
    let header_len = u32::try_from(header_bytes.len()).map_err(|_| CacheError::Serialization {
        reason: "record header too large".to_string(),
    })?;

    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes and validates a record read from `path`.
///
/// `identity` is the tag the caller expects; a record written for any other
/// identity is rejected.
pub fn decode_record(path: &Path, identity: &str, raw: &[u8]) -> Result<FileSet, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid("record shorter than header length"))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if header_len > HEADER_LIMIT {
        return Err(invalid("header length out of range"));
    }
    let header_end = 4usize
        .checked_add(header_len)
        .filter(|end| *end <= raw.len())
        .ok_or_else(|| invalid("truncated header"))?;

    let (header, read): (RecordHeader, usize) = bincode::serde::decode_from_slice(
        &raw[4..header_end],
        bincode::config::standard().with_limit::<HEADER_LIMIT>(),
    )
    .map_err(|e| invalid(&format!("undecodable header: {e}")))?;
    if read != header_len {
        return Err(invalid("header length does not match header contents"));
    }
    if header.magic != RECORD_MAGIC {
        return Err(invalid("missing magic bytes"));
    }
    if header.format_version != RECORD_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: RECORD_FORMAT_VERSION,
            actual: header.format_version,
        });
    }
    if header.identity != identity {
        return Err(CacheError::IdentityMismatch {
            path: path.to_path_buf(),
            expected: identity.to_string(),
            actual: header.identity,
        });
    }

    let payload = &raw[header_end..];
    let actual = payload_checksum(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: format!("{:032x}", header.checksum),
            actual: format!("{actual:032x}"),
        });
    }

    let (files, read): (FileSet, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(|e| {
            CacheError::Serialization {
                reason: format!("{}: {e}", path.display()),
            }
        })?;
    if read != payload.len() || files.len() != header.entry_count as usize {
        return Err(CacheError::Serialization {
            reason: format!("{}: payload does not match header", path.display()),
        });
    }
    Ok(files)
}
