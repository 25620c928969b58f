//! Fixed-size block storage: a data file for record groups and an index
//! file for tree nodes, each prefixed by one metadata block.
//!
//! Data blocks are written immediately; index blocks accumulate in a
//! write-back buffer and reach disk on an explicit flush, since index nodes
//! are mutated repeatedly while a single insert or split cascade adjusts
//! entries up to the root.

pub mod constants;
pub mod data_file;
pub mod index_file;
pub mod metadata;

pub use constants::{BLOCK_SIZE, LEAF_LEVEL, METADATA_BLOCK_ID, NODE_LENGTH_PREFIX, ROOT_BLOCK_ID};
pub use data_file::{max_records_per_block, DataFile};
pub use index_file::{max_entries_per_node, IndexFile};
pub use metadata::{DataMetadata, IndexMetadata};
