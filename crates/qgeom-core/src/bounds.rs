//! Bounding boxes over geometry tables.

use crate::geometry::BoundingBox;
use crate::record::GeometryRecord;

/// Axis-aligned box enclosing every vertex of every record.
///
/// Returns [`BoundingBox::EMPTY`] when there is nothing to enclose. Path
/// widths are not added; the box covers centerlines only.
pub fn bounds_of(records: &[GeometryRecord]) -> BoundingBox {
    BoundingBox::from_points(records.iter().flat_map(|r| r.geometry.vertices()))
        .unwrap_or(BoundingBox::EMPTY)
}

/// Conservative enclosure of several boxes.
///
/// Each coordinate is reduced independently: the smallest `min_x`, the
/// smallest `min_y`, the largest `max_x` and the largest `max_y`. An empty
/// input yields [`BoundingBox::EMPTY`]. Empty boxes in the input are not
/// special-cased and pull the result toward the origin; callers that care
/// should leave them out.
pub fn merge(boxes: &[BoundingBox]) -> BoundingBox {
    match boxes.split_first() {
        None => BoundingBox::EMPTY,
        Some((first, rest)) => rest.iter().fold(*first, |acc, b| acc.union(b)),
    }
}
