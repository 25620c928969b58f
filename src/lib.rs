//! # blockstar: a disk-resident R*-Tree over fixed-size storage blocks
//!
//! This crate stores multidimensional point records in fixed-size blocks
//! (32 KiB) across two files: a data file holding record groups and an
//! index file holding tree nodes. Range queries descend the tree and prune
//! every subtree whose bounding region does not intersect the query region.
//!
//! ## Features
//!
//! - **Block storage**: both files start with a metadata block; every
//!   payload is length-prefixed and zero-padded to the block size
//! - **Write-back buffer**: index nodes accumulate in memory and reach
//!   disk on an explicit flush, one write per block per cascade
//! - **R*-Tree splits**: split axis chosen by margin-sum minimization,
//!   split index by overlap then area minimization
//! - **Pruned range queries**: only subtrees overlapping the query region
//!   are visited
//! - **Bulk loading**: delimited text sources are packed into data blocks
//!   at the computed per-block capacity
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use blockstar::{
//!     range_query, BoundingBox, Bounds, DataFile, Entry, IndexFile, Node, Record, LEAF_LEVEL,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut data = DataFile::create("datafile.dat", 2)?;
//! let mut index = IndexFile::create("indexfile.dat", 2)?;
//!
//! // One record group, one leaf entry covering it.
//! let record = Record::new(1, "athens", vec![23.72, 37.98]);
//! let block_id = data.append_block(std::slice::from_ref(&record))?;
//! let root_id = index.allocate_block_id();
//! let root = Node::new(LEAF_LEVEL, vec![Entry::new(block_id, record.bounding_box())])
//!     .with_block_id(root_id);
//! index.write_new_node(root.clone())?;
//! index.flush()?;
//!
//! let query = BoundingBox::new(vec![Bounds::new(20.0, 25.0), Bounds::new(35.0, 40.0)]);
//! let results = range_query(&index, &data, &root, &query)?;
//! assert_eq!(results.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod geometry;
pub mod ingest;
pub mod node;
pub mod query;
pub mod record;
pub mod storage;

pub use config::TreeConfig;
pub use errors::{IndexError, IndexResult};
pub use geometry::{BoundingBox, Bounds};
pub use ingest::{bulk_load, load_records};
pub use node::{min_entries, Entry, Node};
pub use query::range_query;
pub use record::Record;
pub use storage::{
    max_entries_per_node, max_records_per_block, DataFile, IndexFile, BLOCK_SIZE, LEAF_LEVEL,
    ROOT_BLOCK_ID,
};
