//! Range queries: recursive, overlap-pruned tree descent.

use crate::errors::IndexResult;
use crate::geometry::BoundingBox;
use crate::node::Node;
use crate::record::Record;
use crate::storage::{DataFile, IndexFile};

/// Collects every record under `node` whose coordinates fall inside
/// `query`, inclusive on every dimension.
///
/// Entries whose region does not overlap the query are pruned: neither
/// their subtree nor their data block is touched. Results come back in
/// traversal order (entry order within each node, depth first); no
/// deduplication is needed since each record lives in exactly one leaf.
/// Absent child nodes or data blocks contribute nothing.
pub fn range_query(
    index: &IndexFile,
    data: &DataFile,
    node: &Node,
    query: &BoundingBox,
) -> IndexResult<Vec<Record>> {
    let mut results = Vec::new();
    query_recursive(index, data, node, query, &mut results)?;
    Ok(results)
}

fn query_recursive(
    index: &IndexFile,
    data: &DataFile,
    node: &Node,
    query: &BoundingBox,
    results: &mut Vec<Record>,
) -> IndexResult<()> {
    for entry in node.entries() {
        if !entry.bbox().overlaps(query) {
            continue;
        }

        if node.is_leaf() {
            if let Some(records) = data.read_block(entry.child_block_id())? {
                results.extend(records.into_iter().filter(|r| r.is_within(query)));
            }
        } else if let Some(child) = index.read_node(entry.child_block_id())? {
            query_recursive(index, data, &child, query, results)?;
        }
    }
    Ok(())
}
