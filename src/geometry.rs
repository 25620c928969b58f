//! Geometric value types: per-dimension bounds and minimum bounding regions.
//!
//! All operations here are pure functions of their inputs. A `BoundingBox`
//! never mutates its bounds in place; derived scalars (area, margin, center)
//! are computed once on construction, so replacing a region always means
//! constructing a new value.

use serde::{Deserialize, Serialize};

/// A closed interval `[lower, upper]` along one dimension.
///
/// Invariant: `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower <= upper, "Bounds invariant violated: {} > {}", lower, upper);
        Self { lower, upper }
    }

    /// Length of the interval.
    pub fn extent(&self) -> f64 {
        (self.upper - self.lower).abs()
    }
}

/// An axis-aligned minimum bounding region: one `Bounds` per dimension.
///
/// May represent a single point (degenerate, `lower == upper` on every axis)
/// or the union of many entries. Only the bounds go to disk; area, margin
/// and center are recomputed when the value is rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Bounds>", into = "Vec<Bounds>")]
pub struct BoundingBox {
    bounds: Vec<Bounds>,
    area: f64,
    margin: f64,
    center: Vec<f64>,
}

impl From<Vec<Bounds>> for BoundingBox {
    fn from(bounds: Vec<Bounds>) -> Self {
        BoundingBox::new(bounds)
    }
}

impl From<BoundingBox> for Vec<Bounds> {
    fn from(bbox: BoundingBox) -> Self {
        bbox.bounds
    }
}

impl BoundingBox {
    pub fn new(bounds: Vec<Bounds>) -> Self {
        let area = bounds.iter().map(|b| b.upper - b.lower).product::<f64>().abs();
        let margin = bounds.iter().map(Bounds::extent).sum();
        let center = bounds.iter().map(|b| (b.lower + b.upper) / 2.0).collect();
        Self {
            bounds,
            area,
            margin,
            center,
        }
    }

    /// A degenerate region covering exactly one point.
    pub fn from_point(coordinates: &[f64]) -> Self {
        Self::new(coordinates.iter().map(|&c| Bounds::new(c, c)).collect())
    }

    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    /// Product of per-dimension extents.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Sum of per-dimension extents.
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Per-dimension midpoint.
    pub fn center(&self) -> &[f64] {
        &self.center
    }

    /// True iff the two regions intersect in every dimension.
    ///
    /// Touching edges count as overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        self.bounds.iter().zip(&other.bounds).all(|(a, b)| {
            a.upper.min(b.upper) - a.lower.max(b.lower) >= 0.0
        })
    }

    /// Volume of the intersection region.
    ///
    /// Returns 0 as soon as any dimension's intersection is non-positive;
    /// touching regions have zero volume.
    pub fn overlap_value(&self, other: &BoundingBox) -> f64 {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let mut value = 1.0;
        for (a, b) in self.bounds.iter().zip(&other.bounds) {
            let intersection = a.upper.min(b.upper) - a.lower.max(b.lower);
            if intersection <= 0.0 {
                return 0.0;
            }
            value *= intersection;
        }
        value
    }

    /// Euclidean distance between the two regions' centers.
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        self.center
            .iter()
            .zip(&other.center)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Euclidean distance from a point to the nearest point on or in this
    /// region, clamping per dimension to the region's own interval.
    pub fn min_distance_from_point(&self, point: &[f64]) -> f64 {
        debug_assert_eq!(self.dimensions(), point.len());
        self.bounds
            .iter()
            .zip(point)
            .map(|(b, &p)| {
                let nearest = p.clamp(b.lower, b.upper);
                (p - nearest).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Per-dimension `[min(lowers), max(uppers)]` of two regions.
    pub fn union_bounds(a: &BoundingBox, b: &BoundingBox) -> Vec<Bounds> {
        debug_assert_eq!(a.dimensions(), b.dimensions());
        a.bounds
            .iter()
            .zip(&b.bounds)
            .map(|(x, y)| Bounds::new(x.lower.min(y.lower), x.upper.max(y.upper)))
            .collect()
    }

    /// The minimum bounding region containing all given regions, or `None`
    /// for an empty collection.
    pub fn union_of<'a, I>(boxes: I) -> Option<Vec<Bounds>>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        let mut iter = boxes.into_iter();
        let first = iter.next()?;
        let mut combined = first.bounds.clone();
        for bbox in iter {
            debug_assert_eq!(combined.len(), bbox.dimensions());
            for (acc, b) in combined.iter_mut().zip(&bbox.bounds) {
                *acc = Bounds::new(acc.lower.min(b.lower), acc.upper.max(b.upper));
            }
        }
        Some(combined)
    }
}
