//! # QGeom I/O
//!
//! GDS-II export of design geometry. Records from a [`GeometrySource`] are
//! encoded into layout primitives (datatype 10 for fills, 11 for strokes,
//! layer 0 for subtract geometry), collected into a single top cell and
//! streamed to disk.
//!
//! [`GeometrySource`]: qgeom_core::GeometrySource

pub mod library;
pub mod encoder;
pub mod gds;
pub mod gate;
pub mod writer;
pub mod config;
pub mod export;

pub use library::{Cell, FilledPolygon, FlexPath, LayoutPrimitive, Library, Timestamp};
pub use encoder::{encode, EncodeError};
pub use gds::{GdsError, GdsReader, GdsWriter};
pub use gate::can_write;
pub use writer::LayoutWriter;
pub use config::{ConfigError, ErrorPolicy, ExportOptions};
pub use export::{export_to_layout, ExportError, ExportReport, GdsExporter};
