//! Point records stored in data blocks.

use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, IndexResult};
use crate::geometry::BoundingBox;

/// A point record: identifier, display name and one coordinate per
/// dimension. Immutable once created; a record belongs to exactly one data
/// block at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub name: String,
    pub coordinates: Vec<f64>,
}

impl Record {
    pub fn new(id: u64, name: impl Into<String>, coordinates: Vec<f64>) -> Self {
        Self {
            id,
            name: name.into(),
            coordinates,
        }
    }

    /// Parses one delimited source line: identifier, name, then one
    /// coordinate field per dimension.
    pub fn from_line(line: &str, delimiter: char, dimensions: usize) -> IndexResult<Self> {
        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != dimensions + 2 {
            return Err(IndexError::InvalidRecord(format!(
                "expected {} fields, got {}: {:?}",
                dimensions + 2,
                fields.len(),
                line
            )));
        }

        let id = fields[0].trim().parse::<u64>().map_err(|e| {
            IndexError::InvalidRecord(format!("bad identifier {:?}: {}", fields[0], e))
        })?;
        let name = fields[1].trim().to_string();
        let coordinates = fields[2..]
            .iter()
            .map(|f| {
                f.trim().parse::<f64>().map_err(|e| {
                    IndexError::InvalidRecord(format!("bad coordinate {:?}: {}", f, e))
                })
            })
            .collect::<IndexResult<Vec<f64>>>()?;

        Ok(Self {
            id,
            name,
            coordinates,
        })
    }

    /// The degenerate bounding region covering exactly this record's point.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_point(&self.coordinates)
    }

    /// True iff every coordinate lies within the corresponding dimension's
    /// bounds of `region`, inclusive on both ends.
    pub fn is_within(&self, region: &BoundingBox) -> bool {
        debug_assert_eq!(self.coordinates.len(), region.dimensions());
        self.coordinates
            .iter()
            .zip(region.bounds())
            .all(|(&c, b)| c >= b.lower && c <= b.upper)
    }
}
