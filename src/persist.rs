//! Framed binary artifacts for schemas and trained models.
//!
//! Layout of every artifact:
//!
//! ```text
//! magic (4 bytes) | version (major, minor) | payload length (u64 LE) | crc32 (u32 LE) | payload
//! ```
//!
//! The payload is a `bincode` (serde mode) encoding of the artifact's state.
//! Any disagreement between header and payload is reported as
//! [`ClickbaitError::CorruptState`]; only genuine I/O failures surface as
//! [`ClickbaitError::Io`].

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClickbaitError, Result};

/// Magic bytes of a persisted feature schema.
pub const SCHEMA_MAGIC: &[u8; 4] = b"CBFS";

/// Magic bytes of a persisted trained model.
pub const MODEL_MAGIC: &[u8; 4] = b"CBMD";

const VERSION: [u8; 2] = [1, 0];
const HEADER_LEN: usize = 4 + 2 + 8 + 4;

/// Encode a value with bincode 2.0.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| ClickbaitError::serialization(format!("failed to encode state: {e}")))
}

/// Decode a value written by [`encode`]. Trailing bytes are rejected.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, read): (T, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| ClickbaitError::corrupt_state(format!("failed to decode state: {e}")))?;
    if read != bytes.len() {
        return Err(ClickbaitError::corrupt_state(format!(
            "{} trailing bytes after state",
            bytes.len() - read
        )));
    }
    Ok(value)
}

/// Wrap a payload in the artifact header.
pub fn frame(magic: &[u8; 4], payload: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
    output.write_all(magic)?;
    output.write_u8(VERSION[0])?;
    output.write_u8(VERSION[1])?;
    output.write_u64::<LittleEndian>(payload.len() as u64)?;
    output.write_u32::<LittleEndian>(crc32fast::hash(payload))?;
    output.write_all(payload)?;
    Ok(output)
}

fn truncated(_: io::Error) -> ClickbaitError {
    ClickbaitError::corrupt_state("artifact is shorter than its header")
}

/// Validate the artifact header and return the payload.
pub fn unframe<'a>(magic: &[u8; 4], bytes: &'a [u8]) -> Result<&'a [u8]> {
    let mut cursor = Cursor::new(bytes);

    let mut found = [0u8; 4];
    cursor.read_exact(&mut found).map_err(truncated)?;
    if &found != magic {
        return Err(ClickbaitError::corrupt_state(format!(
            "bad magic: expected {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&found)
        )));
    }

    let major = cursor.read_u8().map_err(truncated)?;
    let minor = cursor.read_u8().map_err(truncated)?;
    if major != VERSION[0] {
        return Err(ClickbaitError::corrupt_state(format!(
            "unsupported artifact version: {major}.{minor}"
        )));
    }

    let payload_len = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
    let checksum = cursor.read_u32::<LittleEndian>().map_err(truncated)?;

    let payload = &bytes[cursor.position() as usize..];
    if payload.len() as u64 != payload_len {
        return Err(ClickbaitError::corrupt_state(format!(
            "payload is {} bytes, header says {payload_len}",
            payload.len()
        )));
    }
    if crc32fast::hash(payload) != checksum {
        return Err(ClickbaitError::corrupt_state("checksum mismatch"));
    }
    Ok(payload)
}

/// Encode `value` and write it to `path` as a framed artifact.
pub fn write_artifact<T: Serialize, P: AsRef<Path>>(
    path: P,
    magic: &[u8; 4],
    value: &T,
) -> Result<()> {
    let payload = encode(value)?;
    fs::write(path, frame(magic, &payload)?)?;
    Ok(())
}

/// Read a framed artifact from `path` and decode its payload.
pub fn read_artifact<T: DeserializeOwned, P: AsRef<Path>>(path: P, magic: &[u8; 4]) -> Result<T> {
    let bytes = fs::read(path)?;
    decode(unframe(magic, &bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_and_unframe() {
        let framed = frame(MODEL_MAGIC, b"payload").unwrap();
        assert_eq!(&framed[0..4], b"CBMD");
        assert_eq!(unframe(MODEL_MAGIC, &framed).unwrap(), b"payload");
    }

    #[test]
    fn test_wrong_magic() {
        let framed = frame(MODEL_MAGIC, b"payload").unwrap();
        assert!(matches!(
            unframe(SCHEMA_MAGIC, &framed),
            Err(ClickbaitError::CorruptState(_))
        ));
    }

    #[test]
    fn test_flipped_payload_byte() {
        let mut framed = frame(SCHEMA_MAGIC, b"payload").unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0xff;
        assert!(matches!(
            unframe(SCHEMA_MAGIC, &framed),
            Err(ClickbaitError::CorruptState(_))
        ));
    }

    #[test]
    fn test_truncated() {
        let framed = frame(SCHEMA_MAGIC, b"payload").unwrap();
        assert!(matches!(
            unframe(SCHEMA_MAGIC, &framed[..framed.len() - 2]),
            Err(ClickbaitError::CorruptState(_))
        ));
        assert!(matches!(
            unframe(SCHEMA_MAGIC, &framed[..3]),
            Err(ClickbaitError::CorruptState(_))
        ));
    }

    #[test]
    fn test_header_layout() {
        let framed = frame(SCHEMA_MAGIC, b"abc").unwrap();
        assert_eq!(framed.len(), HEADER_LEN + 3);
        assert_eq!(&framed[4..6], &VERSION);
        assert_eq!(&framed[6..14], &3u64.to_le_bytes());
        assert_eq!(&framed[14..18], &crc32fast::hash(b"abc").to_le_bytes());
    }

    #[test]
    fn test_short_header_fields() {
        let framed = frame(SCHEMA_MAGIC, b"").unwrap();
        // every cut inside the header is a short read of some field
        for cut in [0, 4, 5, 10, HEADER_LEN - 1] {
            assert!(matches!(
                unframe(SCHEMA_MAGIC, &framed[..cut]),
                Err(ClickbaitError::CorruptState(_))
            ));
        }
        assert_eq!(unframe(SCHEMA_MAGIC, &framed).unwrap(), b"");
    }

    #[test]
    fn test_unsupported_version() {
        let mut framed = frame(MODEL_MAGIC, b"payload").unwrap();
        framed[4] = VERSION[0] + 1;
        assert!(matches!(
            unframe(MODEL_MAGIC, &framed),
            Err(ClickbaitError::CorruptState(_))
        ));
    }

    #[test]
    fn test_artifact_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let value = (vec![1.5f64, -2.0], "ridge".to_string());

        write_artifact(&path, MODEL_MAGIC, &value).unwrap();
        let restored: (Vec<f64>, String) = read_artifact(&path, MODEL_MAGIC).unwrap();
        assert_eq!(restored, value);

        let missing = read_artifact::<(Vec<f64>, String), _>(dir.path().join("nope"), MODEL_MAGIC);
        assert!(matches!(missing, Err(ClickbaitError::Io(_))));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode::<Vec<String>>(&[0xff, 0xff, 0xff]),
            Err(ClickbaitError::CorruptState(_))
        ));
    }
}
