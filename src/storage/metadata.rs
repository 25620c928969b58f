//! Metadata blocks: the leading block of each storage file.
//!
//! Both file kinds store a length-prefixed integer list at offset 0, padded
//! to the block size: `[dimensions, block_size, block_count]` for the data
//! file, with a trailing `level_count` for the index file.

use crate::errors::{IndexError, IndexResult};

/// Metadata tuple of the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataMetadata {
    pub dimensions: u32,
    pub block_size: u32,
    pub block_count: u32,
}

/// Metadata tuple of the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMetadata {
    pub dimensions: u32,
    pub block_size: u32,
    pub block_count: u32,
    pub level_count: u32,
}

impl DataMetadata {
    pub fn encode_block(&self, block_size: usize) -> IndexResult<Vec<u8>> {
        encode_fields(
            &[self.dimensions, self.block_size, self.block_count],
            block_size,
        )
    }

    pub fn decode_block(block: &[u8]) -> IndexResult<Self> {
        let fields = decode_fields(block, 3)?;
        Ok(Self {
            dimensions: fields[0],
            block_size: fields[1],
            block_count: fields[2],
        })
    }
}

impl IndexMetadata {
    pub fn encode_block(&self, block_size: usize) -> IndexResult<Vec<u8>> {
        encode_fields(
            &[
                self.dimensions,
                self.block_size,
                self.block_count,
                self.level_count,
            ],
            block_size,
        )
    }

    pub fn decode_block(block: &[u8]) -> IndexResult<Self> {
        let fields = decode_fields(block, 4)?;
        Ok(Self {
            dimensions: fields[0],
            block_size: fields[1],
            block_count: fields[2],
            level_count: fields[3],
        })
    }
}

/// Serializes the field list with a length prefix and pads to block size.
fn encode_fields(fields: &[u32], block_size: usize) -> IndexResult<Vec<u8>> {
    let body = bincode::serde::encode_to_vec(fields, bincode::config::legacy())
        .map_err(|e| IndexError::Serialization(e.to_string()))?;
    let prefix = bincode::serde::encode_to_vec(body.len() as u32, bincode::config::legacy())
        .map_err(|e| IndexError::Serialization(e.to_string()))?;

    let mut block = Vec::with_capacity(block_size);
    block.extend_from_slice(&prefix);
    block.extend_from_slice(&body);
    if block.len() > block_size {
        return Err(IndexError::BlockOverflow {
            payload: block.len(),
            block_size,
        });
    }
    block.resize(block_size, 0);
    Ok(block)
}

/// Reads the length prefix and decodes the field list it covers.
fn decode_fields(block: &[u8], expected: usize) -> IndexResult<Vec<u32>> {
    if block.len() < 4 {
        return Err(IndexError::CorruptMetadata(format!(
            "metadata block too short: {} bytes",
            block.len()
        )));
    }

    let (payload_len, _): (u32, usize) =
        bincode::serde::decode_from_slice(&block[..4], bincode::config::legacy())
            .map_err(|e| IndexError::CorruptMetadata(e.to_string()))?;
    let payload_len = payload_len as usize;
    if 4 + payload_len > block.len() {
        return Err(IndexError::CorruptMetadata(format!(
            "metadata payload of {} bytes does not fit the block",
            payload_len
        )));
    }

    let (fields, _): (Vec<u32>, usize) =
        bincode::serde::decode_from_slice(&block[4..4 + payload_len], bincode::config::legacy())
            .map_err(|e| IndexError::CorruptMetadata(e.to_string()))?;
    if fields.len() != expected {
        return Err(IndexError::CorruptMetadata(format!(
            "expected {} metadata fields, got {}",
            expected,
            fields.len()
        )));
    }
    Ok(fields)
}
