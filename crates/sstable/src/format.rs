//! On-disk entry encoding.
//!
//! A segment file is nothing but a sequence of entries -- no header, no
//! footer, no checksum, and (per the reference design) no persisted block
//! index or bloom filter. Every reader rebuilds those structures by
//! scanning the file with the same block-accounting rule used when it was
//! written.
//!
//! ```text
//! keyLen:u32-BE | key:bytes | valueLen:u32-BE | value:bytes
//! ```
//!
//! A tombstone is written as `valueLen = 0` with no value bytes. This
//! aliases the empty-string value -- a deliberate, documented format
//! choice, not an oversight (see the crate root docs and `DESIGN.md`).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Maximum key size accepted while decoding (64 KiB). Guards against
/// unbounded allocation from a corrupt length prefix.
pub const MAX_KEY_BYTES: u32 = 64 * 1024;
/// Maximum value size accepted while decoding (10 MiB). Guards against
/// unbounded allocation from a corrupt length prefix.
pub const MAX_VALUE_BYTES: u32 = 10 * 1024 * 1024;

/// Encodes one entry (`key`, `value` where `None` means tombstone) into its
/// on-disk byte representation.
pub fn encode_entry(key: &[u8], value: Option<&[u8]>) -> Vec<u8> {
    let value_bytes = value.unwrap_or(&[]);
    let mut buf = Vec::with_capacity(4 + key.len() + 4 + value_bytes.len());
    buf.write_u32::<BigEndian>(key.len() as u32)
        .expect("writing to a Vec never fails");
    buf.extend_from_slice(key);
    buf.write_u32::<BigEndian>(value_bytes.len() as u32)
        .expect("writing to a Vec never fails");
    buf.extend_from_slice(value_bytes);
    buf
}

/// Returns the encoded byte length of an entry without allocating.
pub fn encoded_len(key: &[u8], value: Option<&[u8]>) -> usize {
    4 + key.len() + 4 + value.map_or(0, <[u8]>::len)
}

/// Reads one entry from `r`. Returns `Ok(None)` at a clean end-of-stream
/// (no bytes read before EOF). A tombstone decodes to `(key, None)`;
/// `valueLen = 0` is always read back as a tombstone, never as
/// `Some(vec![])` -- the in-memory distinction between "empty value" and
/// "deleted" does not survive a round trip to disk.
pub fn read_entry<R: Read>(r: &mut R) -> io::Result<Option<(Vec<u8>, Option<Vec<u8>>, usize)>> {
    let key_len = match r.read_u32::<BigEndian>() {
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    if key_len > MAX_KEY_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("key length {key_len} exceeds maximum {MAX_KEY_BYTES}"),
        ));
    }
    let mut key = vec![0u8; key_len as usize];
    r.read_exact(&mut key)?;

    let value_len = r.read_u32::<BigEndian>()?;
    if value_len > MAX_VALUE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("value length {value_len} exceeds maximum {MAX_VALUE_BYTES}"),
        ));
    }
    let value = if value_len == 0 {
        None
    } else {
        let mut v = vec![0u8; value_len as usize];
        r.read_exact(&mut v)?;
        Some(v)
    };

    let total_len = 4 + key.len() + 4 + value.as_ref().map_or(0, Vec::len);
    Ok(Some((key, value, total_len)))
}

/// Writes one encoded entry to `w`.
pub fn write_entry<W: Write>(w: &mut W, key: &[u8], value: Option<&[u8]>) -> io::Result<usize> {
    let encoded = encode_entry(key, value);
    w.write_all(&encoded)?;
    Ok(encoded.len())
}
