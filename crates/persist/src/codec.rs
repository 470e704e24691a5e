use jsonvc_common::{RawEntry, StorageError, Value};
use std::io::{Read, Write};

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Byte encoding of a history file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Pretty-printed JSON, human readable.
    Plain,
    /// JSON compressed with zstd at the given level.
    Zstd { level: i32 },
}

impl Default for Encoding {
    fn default() -> Self {
        Self::Zstd { level: 3 }
    }
}

/// Guess the encoding from the leading bytes.
pub fn detect_encoding(bytes: &[u8]) -> Encoding {
    if bytes.starts_with(&ZSTD_MAGIC) {
        Encoding::default()
    } else {
        Encoding::Plain
    }
}

/// Serialize a history in the given encoding.
pub fn encode(entries: &[RawEntry], encoding: Encoding) -> Result<Vec<u8>, StorageError> {
    let json = serde_json::to_vec_pretty(entries)?;
    match encoding {
        Encoding::Plain => Ok(json),
        Encoding::Zstd { level } => zstd_compress(&json, level),
    }
}

/// Parse and validate a history stored in the given encoding.
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<Vec<RawEntry>, StorageError> {
    let json = match encoding {
        Encoding::Plain => bytes.to_vec(),
        Encoding::Zstd { .. } => zstd_decompress(bytes)?,
    };
    let text = std::str::from_utf8(&json).map_err(|_| StorageError::NotText)?;
    let value: Value = serde_json::from_str(text)?;
    Ok(RawEntry::parse_list(&value)?)
}

fn zstd_compress(data: &[u8], level: i32) -> Result<Vec<u8>, StorageError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), level)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}
