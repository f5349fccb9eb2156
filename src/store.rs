use core::fmt;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use ufmt_macros::uDebug;

use crate::Steps;

/// Size of a stored record, in bytes.
pub const RECORD_LEN: usize = 32;

/// First byte of every valid record. Erased storage reads `0xFF`.
const MAGIC: u8 = 0x5A;

/// Bytes before the payload: magic and payload length.
const HEADER_LEN: usize = 2;

/// Bytes after the payload: CRC32, little endian.
const CRC_LEN: usize = 4;

const MAX_PAYLOAD: usize = RECORD_LEN - HEADER_LEN - CRC_LEN;

/// Axis positions and selected tool, as kept across power cycles.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Selector, revolver and feeder positions, in steps.
    pub positions: [i32; 3],
    /// Selected physical tool, or [Snapshot::NO_TOOL].
    pub tool: i8,
}
impl Snapshot {
    pub const NO_TOOL: i8 = -1;

    /// Creates a new `Snapshot`.
    pub fn new(positions: [Steps; 3], tool: Option<u8>) -> Self {
        Self {
            positions: positions.map(|p| p.get_value()),
            tool: tool.map(|t| t as i8).unwrap_or(Self::NO_TOOL),
        }
    }

    /// Positions as [Steps].
    pub fn steps(&self) -> [Steps; 3] {
        self.positions.map(Steps::new)
    }

    /// Selected tool, if any.
    pub fn tool(&self) -> Option<u8> {
        u8::try_from(self.tool).ok()
    }
}

/// Position store failures.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Nothing has been stored yet.
    Empty,
    /// The record does not match its checksum.
    Checksum,
    /// The record could not be encoded or decoded.
    Encoding,
    /// The storage device failed.
    Device,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Empty => f.write_str("no record"),
            StoreError::Checksum => f.write_str("checksum mismatch"),
            StoreError::Encoding => f.write_str("bad encoding"),
            StoreError::Device => f.write_str("device failure"),
        }
    }
}

impl From<postcard::Error> for StoreError {
    fn from(_: postcard::Error) -> Self {
        StoreError::Encoding
    }
}

/// Non-volatile block that holds one record.
pub trait SnapshotStorage {
    /// Reads the stored record.
    fn read(&mut self, record: &mut [u8; RECORD_LEN]) -> Result<(), StoreError>;

    /// Replaces the stored record.
    fn write(&mut self, record: &[u8; RECORD_LEN]) -> Result<(), StoreError>;
}

/// CRC32 of the header and payload of a record.
fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Encodes a snapshot into a sealed record.
///
/// The layout is `[magic][length][postcard payload][crc32 LE]`, padded with
/// zeros to [RECORD_LEN].
pub fn encode(snapshot: &Snapshot) -> Result<[u8; RECORD_LEN], StoreError> {
    let mut record = [0u8; RECORD_LEN];
    let payload_len = {
        let payload = &mut record[HEADER_LEN..HEADER_LEN + MAX_PAYLOAD];
        postcard::to_slice(snapshot, payload)?.len()
    };
    record[0] = MAGIC;
    record[1] = payload_len as u8;

    let sealed = HEADER_LEN + payload_len;
    let crc = checksum(&record[..sealed]);
    record[sealed..sealed + CRC_LEN].copy_from_slice(&crc.to_le_bytes());
    Ok(record)
}

/// Decodes and verifies a record.
pub fn decode(record: &[u8; RECORD_LEN]) -> Result<Snapshot, StoreError> {
    if record[0] != MAGIC {
        return Err(StoreError::Empty);
    }
    let payload_len = record[1] as usize;
    if payload_len > MAX_PAYLOAD {
        return Err(StoreError::Checksum);
    }

    let sealed = HEADER_LEN + payload_len;
    let mut stored = [0u8; CRC_LEN];
    stored.copy_from_slice(&record[sealed..sealed + CRC_LEN]);
    if u32::from_le_bytes(stored) != checksum(&record[..sealed]) {
        return Err(StoreError::Checksum);
    }

    Ok(postcard::from_bytes(&record[HEADER_LEN..sealed])?)
}

/// Keeps the latest [Snapshot] in a [SnapshotStorage].
///
/// Writing an unchanged snapshot again is skipped, to spare the storage.
pub struct PositionStore<S> {
    storage: S,
    last: Option<Snapshot>,
}
impl<S: SnapshotStorage> PositionStore<S> {
    /// Creates a new `PositionStore`.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            last: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Writes a snapshot.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.last.as_ref() == Some(snapshot) {
            return Ok(());
        }
        let record = encode(snapshot)?;
        self.storage.write(&record)?;
        self.last = Some(*snapshot);
        Ok(())
    }

    /// Reads back the stored snapshot.
    pub fn load(&mut self) -> Result<Snapshot, StoreError> {
        let mut record = [0u8; RECORD_LEN];
        self.storage.read(&mut record)?;
        let snapshot = decode(&record)?;
        self.last = Some(snapshot);
        Ok(snapshot)
    }
}
