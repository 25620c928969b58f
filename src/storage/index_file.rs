//! The index file: fixed-size blocks holding serialized tree nodes, with a
//! write-back buffer.
//!
//! Index nodes are mutated repeatedly during a single insert or split
//! cascade (entry adjustment up to the root), so writes accumulate in an
//! insertion-ordered in-memory buffer and reach disk only on an explicit
//! [`IndexFile::flush`]. The buffer is authoritative for reads until then;
//! a reader that bypasses it observes a stale index file.
//!
//! Block 0 is the metadata block; every node block starts with a fixed
//! 4-byte big-endian length followed by the serialized node, zero-padded to
//! the block size.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::constants::{BLOCK_SIZE, LEAF_LEVEL, METADATA_BLOCK_ID, NODE_LENGTH_PREFIX};
use super::data_file::read_block_exact;
use super::metadata::IndexMetadata;
use crate::errors::{IndexError, IndexResult};
use crate::geometry::BoundingBox;
use crate::node::{Entry, Node};

/// Computes the maximum fan-out of a node for the given dimensionality by
/// simulating serialization of placeholder entries until the encoded node
/// (length prefix included) would exceed the block size.
pub fn max_entries_per_node(dimensions: usize, block_size: usize) -> usize {
    let mut entries: Vec<Entry> = Vec::new();
    loop {
        entries.push(Entry::new(0, BoundingBox::from_point(&vec![0.0; dimensions])));
        let node = Node::new(LEAF_LEVEL, entries.clone());
        let encoded = bincode::serde::encode_to_vec(&node, bincode::config::legacy())
            .map(|b| b.len())
            .unwrap_or(usize::MAX);
        if NODE_LENGTH_PREFIX + encoded > block_size {
            return entries.len() - 1;
        }
    }
}

/// Block-addressed storage for tree nodes, buffered write-back.
pub struct IndexFile {
    file: RwLock<File>,
    path: PathBuf,
    dimensions: usize,
    block_size: usize,
    block_count: u32,
    level_count: u32,
    next_block_id: u64,
    buffer: IndexMap<u64, Node>,
    max_entries_per_node: usize,
}

impl IndexFile {
    /// Creates a fresh index file, truncating any existing one. The tree
    /// starts with one level and no node blocks.
    pub fn create(path: impl AsRef<Path>, dimensions: usize) -> IndexResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        log::debug!("creating index file at {:?}", path.as_ref());

        let mut index_file = Self {
            file: RwLock::new(file),
            path: path.as_ref().to_path_buf(),
            dimensions,
            block_size: BLOCK_SIZE,
            block_count: 1,
            level_count: 1,
            next_block_id: 0,
            buffer: IndexMap::new(),
            max_entries_per_node: max_entries_per_node(dimensions, BLOCK_SIZE),
        };
        index_file.write_metadata()?;
        Ok(index_file)
    }

    /// Reopens an existing index file from its metadata block. The buffer
    /// starts empty; fresh block ids resume past the last allocated block.
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        log::debug!("opening index file at {:?}", path.as_ref());

        let mut block = vec![0u8; BLOCK_SIZE];
        file.seek(SeekFrom::Start(0))?;
        read_block_exact(&mut file, &mut block, METADATA_BLOCK_ID)?;
        let meta = IndexMetadata::decode_block(&block)?;

        Ok(Self {
            file: RwLock::new(file),
            path: path.as_ref().to_path_buf(),
            dimensions: meta.dimensions as usize,
            block_size: meta.block_size as usize,
            block_count: meta.block_count,
            level_count: meta.level_count,
            next_block_id: meta.block_count.saturating_sub(1) as u64,
            buffer: IndexMap::new(),
            max_entries_per_node: max_entries_per_node(
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

    /// Number of levels in the tree this file stores.
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    pub fn max_entries_per_node(&self) -> usize {
        self.max_entries_per_node
    }

    /// Number of buffered nodes not yet flushed to disk.
    pub fn pending_writes(&self) -> usize {
        self.buffer.len()
    }

    /// Hands out a fresh block address for a newly created node.
    pub fn allocate_block_id(&mut self) -> u64 {
        self.next_block_id += 1;
        self.next_block_id
    }

    /// Records the tree's level count; persisted with the metadata block.
    pub fn set_level_count(&mut self, level_count: u32) -> IndexResult<()> {
        self.level_count = level_count;
        self.write_metadata()
    }

    /// Buffers a brand-new node and accounts for its block. The node must
    /// already carry an allocated block id.
    pub fn write_new_node(&mut self, node: Node) -> IndexResult<()> {
        debug_assert_ne!(node.block_id(), METADATA_BLOCK_ID, "node without an allocated block id");
        self.buffer.insert(node.block_id(), node);
        self.block_count += 1;
        self.write_metadata()
    }

    /// Buffers an updated version of an existing node without changing the
    /// block count.
    pub fn buffer_node(&mut self, node: Node) {
        debug_assert_ne!(node.block_id(), METADATA_BLOCK_ID, "node without an allocated block id");
        self.buffer.insert(node.block_id(), node);
    }

    /// Reads a node, consulting the write-back buffer first. `Ok(None)`
    /// means the block id is not an allocated node block (or the slot was
    /// never written); corruption and I/O failures are errors.
    pub fn read_node(&self, block_id: u64) -> IndexResult<Option<Node>> {
        if let Some(node) = self.buffer.get(&block_id) {
            return Ok(Some(node.clone()));
        }
        if block_id == METADATA_BLOCK_ID || block_id >= self.block_count as u64 {
            return Ok(None);
        }

        let mut block = vec![0u8; self.block_size];
        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
            read_block_exact(&mut file, &mut block, block_id)?;
        }

        let payload_len =
            u32::from_be_bytes([block[0], block[1], block[2], block[3]]) as usize;
        if payload_len == 0 {
            // Allocated slot that was never flushed; a hole, not corruption.
            return Ok(None);
        }
        if NODE_LENGTH_PREFIX + payload_len > self.block_size {
            return Err(IndexError::CorruptBlock {
                block_id,
                reason: format!("node payload of {} bytes does not fit the block", payload_len),
            });
        }

        let (node, _): (Node, usize) = bincode::serde::decode_from_slice(
            &block[NODE_LENGTH_PREFIX..NODE_LENGTH_PREFIX + payload_len],
            bincode::config::legacy(),
        )
        .map_err(|e| IndexError::CorruptBlock {
            block_id,
            reason: e.to_string(),
        })?;
        Ok(Some(node))
    }

    /// Writes every buffered node into its block-id-addressed slot, clears
    /// the buffer and persists the metadata block. Only after a flush is
    /// the on-disk index file consistent.
    pub fn flush(&mut self) -> IndexResult<()> {
        let buffered = std::mem::take(&mut self.buffer);
        let count = buffered.len();

        for (block_id, node) in buffered {
            let block = self.encode_node_block(&node)?;
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
            file.write_all(&block)?;
        }

        self.write_metadata()?;
        log::debug!("flushed {} index blocks to {:?}", count, self.path);
        Ok(())
    }

    /// Serializes a node behind its 4-byte big-endian length prefix,
    /// zero-padded to block size.
    fn encode_node_block(&self, node: &Node) -> IndexResult<Vec<u8>> {
        let body = bincode::serde::encode_to_vec(node, bincode::config::legacy())
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        if NODE_LENGTH_PREFIX + body.len() > self.block_size {
            return Err(IndexError::BlockOverflow {
                payload: NODE_LENGTH_PREFIX + body.len(),
                block_size: self.block_size,
            });
        }

        let mut block = Vec::with_capacity(self.block_size);
        block.extend_from_slice(&(body.len() as u32).to_be_bytes());
        block.extend_from_slice(&body);
        block.resize(self.block_size, 0);
        Ok(block)
    }

    /// Rewrites the metadata block; called after every structural change.
    fn write_metadata(&mut self) -> IndexResult<()> {
        let meta = IndexMetadata {
            dimensions: self.dimensions as u32,
            block_size: self.block_size as u32,
            block_count: self.block_count,
            level_count: self.level_count,
        };
        let block = meta.encode_block(self.block_size)?;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&block)?;
        Ok(())
    }
}
