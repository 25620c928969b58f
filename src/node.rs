//! Tree nodes, entries and the R*-tree node split engine.
//!
//! A split runs in two phases: choose the split axis by minimizing the
//! accumulated margin sum over all candidate distributions of that axis,
//! then choose the distribution on that axis by minimizing the overlap
//! volume between the two groups, breaking ties by minimal combined area.

use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, IndexResult};
use crate::geometry::BoundingBox;
use crate::storage::LEAF_LEVEL;

/// An edge in the tree: the block id of a child (an index block for inner
/// nodes, a data block for leaves) plus the minimum bounding region of
/// everything reachable through it.
///
/// The region must be readjusted whenever the child's contents change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    child_block_id: u64,
    bbox: BoundingBox,
}

impl Entry {
    pub fn new(child_block_id: u64, bbox: BoundingBox) -> Self {
        Self {
            child_block_id,
            bbox,
        }
    }

    /// An entry pointing at `node`, covering the union of its entries.
    /// `None` if the node is empty.
    pub fn for_node(node: &Node) -> Option<Self> {
        Some(Self {
            child_block_id: node.block_id(),
            bbox: node.union_of_entries()?,
        })
    }

    pub fn child_block_id(&self) -> u64 {
        self.child_block_id
    }

    pub fn set_child_block_id(&mut self, block_id: u64) {
        self.child_block_id = block_id;
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Replaces this entry's region with the minimum bounding region of the
    /// given entries. No-op for an empty slice.
    pub fn adjust_to_fit_entries(&mut self, entries: &[Entry]) {
        debug_assert!(!entries.is_empty());
        if let Some(bounds) = BoundingBox::union_of(entries.iter().map(Entry::bbox)) {
            self.bbox = BoundingBox::new(bounds);
        }
    }

    /// Extends this entry's region so it also encloses `other`.
    pub fn adjust_to_fit_entry(&mut self, other: &Entry) {
        self.bbox = BoundingBox::new(BoundingBox::union_bounds(&self.bbox, &other.bbox));
    }
}

/// A tree vertex: an ordered list of entries at a given level, addressed by
/// a unique index-file block id. A node is a leaf iff its level equals
/// [`LEAF_LEVEL`]; leaf entries reference data blocks, inner entries
/// reference further index blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    block_id: u64,
    level: u32,
    entries: Vec<Entry>,
}

/// Minimum entries per node for a given maximum fan-out: `ceil(0.5 * max)`.
pub fn min_entries(max_entries: usize) -> usize {
    max_entries.div_ceil(2)
}

impl Node {
    /// A node with no block address yet; the index file assigns one on
    /// allocation.
    pub fn new(level: u32, entries: Vec<Entry>) -> Self {
        Self {
            block_id: 0,
            level,
            entries,
        }
    }

    pub fn with_block_id(mut self, block_id: u64) -> Self {
        self.block_id = block_id;
        self
    }

    pub fn block_id(&self) -> u64 {
        self.block_id
    }

    pub fn set_block_id(&mut self, block_id: u64) {
        self.block_id = block_id;
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_leaf(&self) -> bool {
        self.level == LEAF_LEVEL
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn insert_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// The minimum bounding region covering all entries, or `None` for an
    /// empty node.
    pub fn union_of_entries(&self) -> Option<BoundingBox> {
        BoundingBox::union_of(self.entries.iter().map(Entry::bbox)).map(BoundingBox::new)
    }

    /// Splits an overflowing node into two siblings at the same level.
    ///
    /// Both resulting nodes hold at least `min_entries` entries by
    /// construction of the split-point range, and together they account for
    /// every entry of the original node. The returned nodes carry no block
    /// address; the caller allocates fresh ids and discards this node's
    /// identity.
    pub fn split(&self, max_entries: usize, min_entries: usize) -> IndexResult<(Node, Node)> {
        let distributions = self.choose_split_axis(max_entries, min_entries);
        let best = Self::choose_split_index(distributions)?;

        Ok((
            Node::new(self.level, best.first.entries),
            Node::new(self.level, best.second.entries),
        ))
    }

    /// Phase 1: for each dimension, sort entries by lower and by upper
    /// bound, enumerate every valid split point of both orderings, and sum
    /// the two groups' margins into one running total per dimension. The
    /// dimension with the smallest total wins and its full distribution
    /// list (both orderings) is carried to phase 2. Ties keep the first
    /// axis encountered.
    fn choose_split_axis(&self, max_entries: usize, min_entries: usize) -> Vec<Distribution> {
        let dimensions = self
            .entries
            .first()
            .map(|e| e.bbox().dimensions())
            .unwrap_or(0);

        let mut best_distributions = Vec::new();
        let mut best_margin_sum = f64::MAX;

        for d in 0..dimensions {
            let mut by_lower = self.entries.clone();
            by_lower.sort_by(|a, b| {
                a.bbox().bounds()[d]
                    .lower
                    .partial_cmp(&b.bbox().bounds()[d].lower)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let mut by_upper = self.entries.clone();
            by_upper.sort_by(|a, b| {
                a.bbox().bounds()[d]
                    .upper
                    .partial_cmp(&b.bbox().bounds()[d].upper)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            // One margin sum and one distribution list accumulate across
            // both orderings; there are M - 2m + 2 split points per ordering.
            let mut margin_sum = 0.0;
            let mut distributions = Vec::new();
            for sorted in [&by_lower, &by_upper] {
                for k in 1..=(max_entries + 2).saturating_sub(2 * min_entries) {
                    let pivot = (min_entries - 1) + k;
                    if pivot >= sorted.len() {
                        break;
                    }
                    let first = DistributionGroup::new(sorted[..pivot].to_vec());
                    let second = DistributionGroup::new(sorted[pivot..].to_vec());
                    margin_sum += first.bbox.margin() + second.bbox.margin();
                    distributions.push(Distribution { first, second });
                }
            }

            if margin_sum < best_margin_sum {
                best_margin_sum = margin_sum;
                best_distributions = distributions;
            }
        }

        best_distributions
    }

    /// Phase 2: among the winning axis's distributions, pick the one with
    /// minimal overlap volume between its groups; ties fall to minimal
    /// combined area, further ties to first-encountered order.
    fn choose_split_index(distributions: Vec<Distribution>) -> IndexResult<Distribution> {
        if distributions.is_empty() {
            return Err(IndexError::InvalidSplit(
                "no candidate distributions; node is below the splittable minimum".into(),
            ));
        }

        let mut best_index = 0;
        let mut min_overlap = f64::MAX;
        let mut min_area = f64::MAX;

        for (i, distribution) in distributions.iter().enumerate() {
            let overlap = distribution.first.bbox.overlap_value(&distribution.second.bbox);
            let area = distribution.first.bbox.area() + distribution.second.bbox.area();

            if overlap < min_overlap {
                min_overlap = overlap;
                min_area = area;
                best_index = i;
            } else if overlap == min_overlap && area < min_area {
                min_area = area;
                best_index = i;
            }
        }

        Ok(distributions.into_iter().nth(best_index).expect("index in range"))
    }
}

/// One candidate partition of an overflowing node's entries into two
/// complementary groups. Transient; exists only during a split.
struct Distribution {
    first: DistributionGroup,
    second: DistributionGroup,
}

/// A subset of entries plus their union bounding region.
struct DistributionGroup {
    entries: Vec<Entry>,
    bbox: BoundingBox,
}

impl DistributionGroup {
    fn new(entries: Vec<Entry>) -> Self {
        let bbox = BoundingBox::union_of(entries.iter().map(Entry::bbox))
            .map(BoundingBox::new)
            .expect("distribution group is never empty");
        Self { entries, bbox }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn point_entry(id: u64, coords: &[f64]) -> Entry {
        Entry::new(id, BoundingBox::from_point(coords))
    }

    #[test]
    fn test_min_entries_is_half_rounded_up() {
        assert_eq!(min_entries(4), 2);
        assert_eq!(min_entries(5), 3);
        assert_eq!(min_entries(64), 32);
    }

    #[test]
    fn test_union_of_entries() {
        let node = Node::new(
            LEAF_LEVEL,
            vec![
                point_entry(1, &[0.0, 0.0]),
                point_entry(2, &[5.0, 5.0]),
                point_entry(3, &[2.0, -1.0]),
            ],
        );

        let bbox = node.union_of_entries().unwrap();
        assert_eq!(bbox.bounds()[0].lower, 0.0);
        assert_eq!(bbox.bounds()[0].upper, 5.0);
        assert_eq!(bbox.bounds()[1].lower, -1.0);
        assert_eq!(bbox.bounds()[1].upper, 5.0);
    }

    #[test]
    fn test_union_of_entries_empty_node() {
        let node = Node::new(LEAF_LEVEL, vec![]);
        assert!(node.union_of_entries().is_none());
    }

    #[test]
    fn test_split_colinear_points() {
        // Five colinear points with M=4, m=2 must split into groups of
        // sizes {2,3} whose regions do not overlap.
        let entries: Vec<Entry> = (0..5)
            .map(|i| point_entry(i, &[i as f64, i as f64]))
            .collect();
        let node = Node::new(LEAF_LEVEL, entries);

        let (a, b) = node.split(4, 2).unwrap();
        let mut sizes = [a.entries().len(), b.entries().len()];
        sizes.sort();
        assert_eq!(sizes, [2, 3]);

        let bbox_a = a.union_of_entries().unwrap();
        let bbox_b = b.union_of_entries().unwrap();
        assert_eq!(bbox_a.overlap_value(&bbox_b), 0.0);
    }

    #[test]
    fn test_split_preserves_level_and_entry_total() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| point_entry(i, &[i as f64 * 3.0, 10.0 - i as f64]))
            .collect();
        let node = Node::new(3, entries);

        let (a, b) = node.split(4, 2).unwrap();
        assert_eq!(a.level(), 3);
        assert_eq!(b.level(), 3);
        assert_eq!(a.entries().len() + b.entries().len(), 5);
    }

    #[test]
    fn test_split_capacity_invariant_random_points() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let entries: Vec<Entry> = (0..5)
                .map(|i| {
                    point_entry(i, &[rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)])
                })
                .collect();
            let node = Node::new(LEAF_LEVEL, entries);

            let (a, b) = node.split(4, 2).unwrap();
            assert!(a.entries().len() >= 2);
            assert!(b.entries().len() >= 2);
            assert_eq!(a.entries().len() + b.entries().len(), 5);
        }
    }

    #[test]
    fn test_split_colinear_points_odd_fanout() {
        // Six colinear points with M=5, m=3: one split point per ordering,
        // so both groups must hold exactly m entries.
        let entries: Vec<Entry> = (0..6)
            .map(|i| point_entry(i, &[i as f64, i as f64]))
            .collect();
        let node = Node::new(LEAF_LEVEL, entries);

        let (a, b) = node.split(5, min_entries(5)).unwrap();
        assert_eq!(a.entries().len(), 3);
        assert_eq!(b.entries().len(), 3);
    }

    #[test]
    fn test_split_capacity_invariant_odd_fanouts() {
        // Odd fan-outs make 2m = M + 1; no distribution may leave a group
        // below m.
        let mut rng = StdRng::seed_from_u64(11);
        for &max in &[5usize, 7] {
            let min = min_entries(max);
            for _ in 0..50 {
                let entries: Vec<Entry> = (0..=max as u64)
                    .map(|i| {
                        point_entry(
                            i,
                            &[rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)],
                        )
                    })
                    .collect();
                let node = Node::new(LEAF_LEVEL, entries);

                let (a, b) = node.split(max, min).unwrap();
                assert!(a.entries().len() >= min);
                assert!(b.entries().len() >= min);
                assert_eq!(a.entries().len() + b.entries().len(), max + 1);
            }
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| point_entry(i, &[(i * 7 % 5) as f64, (i * 3 % 4) as f64]))
            .collect();
        let node = Node::new(LEAF_LEVEL, entries);

        let first = node.split(4, 2).unwrap();
        for _ in 0..3 {
            let again = node.split(4, 2).unwrap();
            assert_eq!(again.0.entries(), first.0.entries());
            assert_eq!(again.1.entries(), first.1.entries());
        }
    }

    #[test]
    fn test_split_below_threshold_is_invalid() {
        let node = Node::new(LEAF_LEVEL, vec![point_entry(1, &[0.0, 0.0])]);
        let err = node.split(4, 2).unwrap_err();
        assert!(matches!(err, IndexError::InvalidSplit(_)));
    }

    #[test]
    fn test_entry_adjust_to_fit_entries() {
        let mut entry = point_entry(9, &[0.0, 0.0]);
        let children = vec![point_entry(1, &[-2.0, 1.0]), point_entry(2, &[4.0, 6.0])];

        entry.adjust_to_fit_entries(&children);
        assert_eq!(entry.bbox().bounds()[0].lower, -2.0);
        assert_eq!(entry.bbox().bounds()[0].upper, 4.0);
        assert_eq!(entry.bbox().bounds()[1].lower, 1.0);
        assert_eq!(entry.bbox().bounds()[1].upper, 6.0);
    }

    #[test]
    fn test_entry_adjust_to_fit_entry_extends_region() {
        let mut entry = point_entry(9, &[1.0, 1.0]);
        entry.adjust_to_fit_entry(&point_entry(2, &[5.0, -3.0]));

        assert_eq!(entry.bbox().bounds()[0].lower, 1.0);
        assert_eq!(entry.bbox().bounds()[0].upper, 5.0);
        assert_eq!(entry.bbox().bounds()[1].lower, -3.0);
        assert_eq!(entry.bbox().bounds()[1].upper, 1.0);
    }

    #[test]
    fn test_entry_for_node_covers_union() {
        let node = Node::new(
            LEAF_LEVEL,
            vec![point_entry(1, &[0.0, 0.0]), point_entry(2, &[3.0, 4.0])],
        )
        .with_block_id(12);

        let entry = Entry::for_node(&node).unwrap();
        assert_eq!(entry.child_block_id(), 12);
        assert_eq!(entry.bbox().bounds()[0].upper, 3.0);
        assert_eq!(entry.bbox().bounds()[1].upper, 4.0);

        assert!(Entry::for_node(&Node::new(LEAF_LEVEL, vec![])).is_none());
    }
}
