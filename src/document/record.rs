//! Fully materialised document contents and their wire form
//!
//! Record format:
//! - 4 byte magic `CDOC`
//! - u8 format version
//! - u32 crc32 of payload (little endian)
//! - bincode payload

use std::collections::BTreeMap;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::CuttleError;
use crate::types::{TermCount, TermPos, ValueNo};
use crate::Result;

const MAGIC: &[u8; 4] = b"CDOC";

/// Wire format version. Bump whenever `DocumentRecord` changes shape.
pub const RECORD_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1 + 4;

/// Per-term entry of a document: wdf plus sorted, unique positions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub wdf: TermCount,
    pub positions: Vec<TermPos>,
}

impl TermEntry {
    pub fn new(wdf: TermCount) -> Self {
        Self {
            wdf,
            positions: Vec::new(),
        }
    }

    /// Record a position. Returns false if it was already present.
    pub fn insert_position(&mut self, pos: TermPos) -> bool {
        match self.positions.binary_search(&pos) {
            Ok(_) => false,
            Err(idx) => {
                self.positions.insert(idx, pos);
                true
            }
        }
    }

    /// Forget a position. Returns false if it was never recorded.
    pub fn remove_position(&mut self, pos: TermPos) -> bool {
        match self.positions.binary_search(&pos) {
            Ok(idx) => {
                self.positions.remove(idx);
                true
            }
            Err(_) => false,
        }
    }
}

/// Everything stored for one document
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub data: String,
    pub values: BTreeMap<ValueNo, String>,
    pub terms: BTreeMap<String, TermEntry>,
}

impl DocumentRecord {
    /// Document length: sum of wdf over all terms
    pub fn length(&self) -> u64 {
        self.terms.values().map(|entry| entry.wdf as u64).sum()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc32 = hasher.finalize();

        let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
        output.extend_from_slice(MAGIC);
        output.push(RECORD_VERSION);
        output.extend_from_slice(&crc32.to_le_bytes());
        output.extend_from_slice(&payload);
        Ok(output)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(CuttleError::Corrupt(format!(
                "document record truncated: {} bytes",
                data.len()
            )));
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(CuttleError::Corrupt("bad document record magic".to_string()));
        }

        let version = data[MAGIC.len()];
        if version != RECORD_VERSION {
            return Err(CuttleError::Corrupt(format!(
                "unsupported document record version {}, expected {}",
                version, RECORD_VERSION
            )));
        }

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&data[MAGIC.len() + 1..HEADER_LEN]);
        let expected = u32::from_le_bytes(crc_bytes);

        let payload = &data[HEADER_LEN..];
        let mut hasher = Hasher::new();
        hasher.update(payload);
        let actual = hasher.finalize();
        if actual != expected {
            return Err(CuttleError::Corrupt(format!(
                "document record checksum mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        Ok(bincode::deserialize(payload)?)
    }
}
