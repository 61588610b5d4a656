//! # QGeom Core
//!
//! Design geometry as the layout exporter sees it: filled regions and
//! stroked paths tagged with a layer and a subtract flag, the bounding-box
//! arithmetic used to size an export, and the [`GeometrySource`] boundary
//! through which a design hands its tables over.

pub mod geometry;
pub mod record;
pub mod bounds;
pub mod source;

pub use geometry::{BoundingBox, Geometry, Point};
pub use record::{GeometryRecord, LayerId, RecordError};
pub use bounds::{bounds_of, merge};
pub use source::{GeometrySource, GeometryTables, SourceError};
