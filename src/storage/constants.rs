//! Constants for the fixed-block storage layout.

/// Fixed block size (32 KiB) shared by the data and index files.
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Block 0 of each file holds that file's metadata.
pub const METADATA_BLOCK_ID: u64 = 0;

/// Block address of the tree root in the index file.
pub const ROOT_BLOCK_ID: u64 = 1;

/// The tree level whose entries reference data blocks rather than further
/// index blocks.
pub const LEAF_LEVEL: u32 = 1;

/// Byte length of the big-endian node length prefix in index blocks.
pub const NODE_LENGTH_PREFIX: usize = 4;
