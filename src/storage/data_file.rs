//! The data file: fixed-size blocks holding serialized record groups.
//!
//! Block 0 is the metadata block; blocks 1..N each hold one length-prefixed
//! record group, zero-padded to the block size. Record groups are written
//! immediately (no buffering) since a data block change never propagates
//! further.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::constants::{BLOCK_SIZE, METADATA_BLOCK_ID};
use super::metadata::DataMetadata;
use crate::errors::{IndexError, IndexResult};
use crate::record::Record;

/// Computes how many records of the given dimensionality fit in one block
/// by simulating serialization of placeholder records until the encoded
/// payload (length prefix included) would exceed the block size.
pub fn max_records_per_block(dimensions: usize, block_size: usize) -> usize {
    let mut records: Vec<Record> = Vec::new();
    loop {
        records.push(Record::new(0, "default_name", vec![0.0; dimensions]));
        let encoded = bincode::serde::encode_to_vec(&records, bincode::config::legacy())
            .map(|b| b.len())
            .unwrap_or(usize::MAX);
        if 4 + encoded > block_size {
            return records.len() - 1;
        }
    }
}

/// Block-addressed storage for record groups.
pub struct DataFile {
    file: RwLock<File>,
    path: PathBuf,
    dimensions: usize,
    block_size: usize,
    block_count: u32,
    max_records_per_block: usize,
}

impl DataFile {
    /// Creates a fresh data file, truncating any existing one. The file
    /// starts with only its metadata block.
    pub fn create(path: impl AsRef<Path>, dimensions: usize) -> IndexResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        log::debug!("creating data file at {:?}", path.as_ref());

        let mut data_file = Self {
            file: RwLock::new(file),
            path: path.as_ref().to_path_buf(),
            dimensions,
            block_size: BLOCK_SIZE,
            block_count: 1,
            max_records_per_block: max_records_per_block(dimensions, BLOCK_SIZE),
        };
        data_file.write_metadata()?;
        Ok(data_file)
    }

    /// Reopens an existing data file from its metadata block.
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        log::debug!("opening data file at {:?}", path.as_ref());

        let mut block = vec![0u8; BLOCK_SIZE];
        file.seek(SeekFrom::Start(0))?;
        read_block_exact(&mut file, &mut block, METADATA_BLOCK_ID)?;
        let meta = DataMetadata::decode_block(&block)?;

        Ok(Self {
            file: RwLock::new(file),
            path: path.as_ref().to_path_buf(),
            dimensions: meta.dimensions as usize,
            block_size: meta.block_size as usize,
            block_count: meta.block_count,
            max_records_per_block: max_records_per_block(
                meta.dimensions as usize,
                meta.block_size as usize,
            ),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Total blocks in the file, metadata block included.
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn max_records_per_block(&self) -> usize {
        self.max_records_per_block
    }

    /// Appends one record group as a new trailing block and returns its
    /// block id. Fails with `BlockOverflow` before anything is written if
    /// the payload does not fit.
    pub fn append_block(&mut self, records: &[Record]) -> IndexResult<u64> {
        let block = self.encode_block(records)?;
        let block_id = self.block_count as u64;

        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
            file.write_all(&block)?;
        }
        self.block_count += 1;
        self.write_metadata()?;
        Ok(block_id)
    }

    /// Reads one record group. `Ok(None)` means the block id is not an
    /// allocated content block; decode failures and short reads are
    /// reported as `CorruptBlock`.
    pub fn read_block(&self, block_id: u64) -> IndexResult<Option<Vec<Record>>> {
        if block_id == METADATA_BLOCK_ID || block_id >= self.block_count as u64 {
            return Ok(None);
        }

        let mut block = vec![0u8; self.block_size];
        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
            read_block_exact(&mut *file, &mut block, block_id)?;
        }

        let (payload_len, _): (u32, usize) =
            bincode::serde::decode_from_slice(&block[..4], bincode::config::legacy()).map_err(
                |e| IndexError::CorruptBlock {
                    block_id,
                    reason: e.to_string(),
                },
            )?;
        let payload_len = payload_len as usize;
        if 4 + payload_len > self.block_size {
            return Err(IndexError::CorruptBlock {
                block_id,
                reason: format!("record payload of {} bytes does not fit the block", payload_len),
            });
        }

        let (records, _): (Vec<Record>, usize) =
            bincode::serde::decode_from_slice(&block[4..4 + payload_len], bincode::config::legacy())
                .map_err(|e| IndexError::CorruptBlock {
                    block_id,
                    reason: e.to_string(),
                })?;
        Ok(Some(records))
    }

    /// Rewrites an existing block in place with the same encoding as
    /// `append_block`, keeping its block id stable.
    pub fn overwrite_block(&mut self, block_id: u64, records: &[Record]) -> IndexResult<()> {
        let block = self.encode_block(records)?;
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
        file.write_all(&block)?;
        Ok(())
    }

    /// Places a record in the first content block under capacity, or in a
    /// new trailing block when every existing one is full. Returns the
    /// block id that now owns the record.
    pub fn append_record(&mut self, record: Record) -> IndexResult<u64> {
        for block_id in 1..self.block_count as u64 {
            if let Some(mut records) = self.read_block(block_id)? {
                if records.len() < self.max_records_per_block {
                    records.push(record);
                    self.overwrite_block(block_id, &records)?;
                    return Ok(block_id);
                }
            }
        }
        self.append_block(std::slice::from_ref(&record))
    }

    /// Removes the first record with the given id, rewriting its block in
    /// place. Returns whether a removal occurred.
    pub fn remove_record(&mut self, record_id: u64) -> IndexResult<bool> {
        for block_id in 1..self.block_count as u64 {
            if let Some(mut records) = self.read_block(block_id)? {
                if let Some(pos) = records.iter().position(|r| r.id == record_id) {
                    records.remove(pos);
                    self.overwrite_block(block_id, &records)?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Serializes a record group with its length prefix and pads to block
    /// size, refusing payloads that overflow the block.
    fn encode_block(&self, records: &[Record]) -> IndexResult<Vec<u8>> {
        let body = bincode::serde::encode_to_vec(records, bincode::config::legacy())
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        let prefix = bincode::serde::encode_to_vec(body.len() as u32, bincode::config::legacy())
            .map_err(|e| IndexError::Serialization(e.to_string()))?;

        if prefix.len() + body.len() > self.block_size {
            return Err(IndexError::BlockOverflow {
                payload: prefix.len() + body.len(),
                block_size: self.block_size,
            });
        }

        let mut block = Vec::with_capacity(self.block_size);
        block.extend_from_slice(&prefix);
        block.extend_from_slice(&body);
        block.resize(self.block_size, 0);
        Ok(block)
    }

    /// Rewrites the metadata block; called after every structural change.
    fn write_metadata(&mut self) -> IndexResult<()> {
        let meta = DataMetadata {
            dimensions: self.dimensions as u32,
            block_size: self.block_size as u32,
            block_count: self.block_count,
        };
        let block = meta.encode_block(self.block_size)?;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&block)?;
        Ok(())
    }
}

/// Reads exactly one block, mapping a short read to `CorruptBlock`.
pub(super) fn read_block_exact(
    file: &mut File,
    block: &mut [u8],
    block_id: u64,
) -> IndexResult<()> {
    file.read_exact(block).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            IndexError::CorruptBlock {
                block_id,
                reason: format!("short read (expected {} bytes)", block.len()),
            }
        } else {
            IndexError::Io(e)
        }
    })
}
