//! Geometry record → layout primitive.
//!
//! Filled regions become polygons with datatype 10, stroked paths become
//! flexible paths with datatype 11, and anything flagged `subtract` lands on
//! layer 0 regardless of its nominal layer.
//!
//! Interior holes of regions are not exported: only the outer boundary is
//! encoded and a warning is logged for each record that had holes.
//!
//! Every record is validated before encoding. An empty ring or a
//! non-positive width would otherwise reach the stream writer and come back
//! as a dropped boundary or an absolute-width path.

use thiserror::Error;

use qgeom_core::geometry::{open_ring, Geometry};
use qgeom_core::{GeometryRecord, LayerId, RecordError};

use crate::library::{
    FilledPolygon, FlexPath, LayoutPrimitive, FILL_DATATYPE, STROKE_DATATYPE, SUBTRACT_LAYER,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Unsupported geometry, expected a filled region or stroked path: {description}")]
    UnsupportedGeometry { description: String },

    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
}

/// Layer a record is exported on.
pub fn layer_code(record: &GeometryRecord) -> LayerId {
    if record.subtract {
        SUBTRACT_LAYER
    } else {
        record.layer
    }
}

/// Encode one record. Pure apart from the hole warning.
pub fn encode(record: &GeometryRecord) -> Result<LayoutPrimitive, EncodeError> {
    record.validate()?;
    match &record.geometry {
        Geometry::Region {
            exterior,
            interiors,
        } => {
            if !interiors.is_empty() {
                log::warn!(
                    "Dropping {} interior hole(s) of {}",
                    interiors.len(),
                    record.description()
                );
            }
            Ok(LayoutPrimitive::Polygon(FilledPolygon {
                vertices: open_ring(exterior).to_vec(),
                layer: layer_code(record),
                datatype: FILL_DATATYPE,
            }))
        }
        Geometry::Path { points, width } => Ok(LayoutPrimitive::Path(FlexPath {
            vertices: points.clone(),
            width: *width,
            layer: layer_code(record),
            datatype: STROKE_DATATYPE,
        })),
        Geometry::Point { .. } | Geometry::Collection { .. } => {
            Err(EncodeError::UnsupportedGeometry {
                description: record.description(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgeom_core::Point;

    fn unit_square_closed() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ]
    }

    fn segment() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)]
    }

    #[test]
    fn test_region_encodes_as_fill() {
        let rec = GeometryRecord::region(7, unit_square_closed());
        match encode(&rec).unwrap() {
            LayoutPrimitive::Polygon(p) => {
                assert_eq!(p.layer, 7);
                assert_eq!(p.datatype, 10);
                assert_eq!(p.vertices.len(), 4);
                assert_eq!(p.vertices[0], Point::new(0.0, 0.0));
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_path_encodes_as_stroke() {
        let rec = GeometryRecord::path(3, segment(), 2.5);
        match encode(&rec).unwrap() {
            LayoutPrimitive::Path(p) => {
                assert_eq!(p.layer, 3);
                assert_eq!(p.datatype, 11);
                assert_eq!(p.width, 2.5);
                assert_eq!(p.vertices, segment());
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_subtract_reroutes_to_layer_zero() {
        for layer in [0, 1, 5, 255] {
            for subtract in [false, true] {
                let region = GeometryRecord::region(layer, unit_square_closed())
                    .with_subtract(subtract);
                let path = GeometryRecord::path(layer, segment(), 1.0).with_subtract(subtract);
                for rec in [region, path] {
                    let code = encode(&rec).unwrap().layer_code();
                    if subtract {
                        assert_eq!(code, 0);
                    } else {
                        assert_eq!(code, layer);
                    }
                }
            }
        }
    }

    #[test]
    fn test_holes_are_dropped() {
        let rec = GeometryRecord::new(
            Geometry::Region {
                exterior: unit_square_closed(),
                interiors: vec![vec![
                    Point::new(0.25, 0.25),
                    Point::new(0.75, 0.25),
                    Point::new(0.75, 0.75),
                ]],
            },
            1,
        );
        let prim = encode(&rec).unwrap();
        assert_eq!(prim.vertices().len(), 4);
        assert_eq!(prim.datatype_code(), FILL_DATATYPE);
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let empty = GeometryRecord::region(1, Vec::new());
        assert!(matches!(
            encode(&empty),
            Err(EncodeError::InvalidRecord(RecordError::EmptyGeometry { found: 0, .. }))
        ));

        let negative = GeometryRecord::path(2, segment(), -2.0);
        assert!(matches!(
            encode(&negative),
            Err(EncodeError::InvalidRecord(RecordError::NonPositiveWidth { .. }))
        ));
    }

    #[test]
    fn test_unsupported_geometry_is_an_error() {
        let rec = GeometryRecord::new(
            Geometry::Point {
                at: Point::new(1.0, 1.0),
            },
            2,
        )
        .with_name("Q1", "marker");
        let err = encode(&rec).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnsupportedGeometry {
                description: "point on layer 2 'marker' of component 'Q1'".into()
            }
        );
    }
}
