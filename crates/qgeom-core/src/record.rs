use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{open_ring, Geometry, Point};

/// A layer number as used by downstream fabrication tools.
pub type LayerId = u32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("{description}: path width must be positive and finite, got {width}")]
    NonPositiveWidth { description: String, width: f64 },

    #[error("{description}: coordinate ({x}, {y}) is not finite")]
    NonFiniteCoordinate { description: String, x: f64, y: f64 },

    #[error("{description}: {kind} needs at least {required} distinct vertices, got {found}")]
    EmptyGeometry {
        description: String,
        kind: &'static str,
        required: usize,
        found: usize,
    },
}

/// One row of a design geometry table: a shape plus its layer assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// Element name inside its component.
    #[serde(default)]
    pub name: String,
    /// Owning component name.
    #[serde(default)]
    pub component: String,
    pub geometry: Geometry,
    pub layer: LayerId,
    /// Negative geometry, exported on the reserved background layer.
    #[serde(default)]
    pub subtract: bool,
}

impl GeometryRecord {
    pub fn new(geometry: Geometry, layer: LayerId) -> Self {
        Self {
            name: String::new(),
            component: String::new(),
            geometry,
            layer,
            subtract: false,
        }
    }

    /// A filled region without holes.
    pub fn region(layer: LayerId, exterior: Vec<Point>) -> Self {
        Self::new(Geometry::region(exterior), layer)
    }

    /// A stroked path.
    pub fn path(layer: LayerId, points: Vec<Point>, width: f64) -> Self {
        Self::new(Geometry::path(points, width), layer)
    }

    pub fn with_name(mut self, component: &str, name: &str) -> Self {
        self.component = component.to_string();
        self.name = name.to_string();
        self
    }

    pub fn with_subtract(mut self, subtract: bool) -> Self {
        self.subtract = subtract;
        self
    }

    /// Human-readable identification used in logs and errors.
    pub fn description(&self) -> String {
        let mut out = format!("{} on layer {}", self.geometry.kind(), self.layer);
        if !self.name.is_empty() {
            out = format!("{} '{}'", out, self.name);
        }
        if !self.component.is_empty() {
            out = format!("{} of component '{}'", out, self.component);
        }
        if self.subtract {
            out.push_str(" (subtract)");
        }
        out
    }

    /// Check the invariants the exporter relies on.
    ///
    /// Shapes the encoder does not support are accepted here; they are only
    /// checked for finite coordinates.
    pub fn validate(&self) -> Result<(), RecordError> {
        if let Some(p) = self.geometry.vertices().find(|p| !p.is_finite()) {
            return Err(RecordError::NonFiniteCoordinate {
                description: self.description(),
                x: p.x,
                y: p.y,
            });
        }

        match &self.geometry {
            Geometry::Region { exterior, .. } => {
                let found = distinct_vertex_count(open_ring(exterior));
                if found < 3 {
                    return Err(RecordError::EmptyGeometry {
                        description: self.description(),
                        kind: "region",
                        required: 3,
                        found,
                    });
                }
            }
            Geometry::Path { points, width } => {
                if !(width.is_finite() && *width > 0.0) {
                    return Err(RecordError::NonPositiveWidth {
                        description: self.description(),
                        width: *width,
                    });
                }
                let found = distinct_vertex_count(points);
                if found < 2 {
                    return Err(RecordError::EmptyGeometry {
                        description: self.description(),
                        kind: "path",
                        required: 2,
                        found,
                    });
                }
            }
            Geometry::Point { .. } | Geometry::Collection { .. } => {}
        }
        Ok(())
    }
}

fn distinct_vertex_count(points: &[Point]) -> usize {
    let mut seen: Vec<&Point> = Vec::with_capacity(points.len());
    for p in points {
        if !seen.contains(&p) {
            seen.push(p);
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_valid_records() {
        assert!(GeometryRecord::region(1, unit_square()).validate().is_ok());
        let seg = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)];
        assert!(GeometryRecord::path(2, seg, 0.5).validate().is_ok());
    }

    #[test]
    fn test_path_width_must_be_positive() {
        let seg = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)];
        for width in [0.0, -1.0, f64::NAN] {
            let err = GeometryRecord::path(2, seg.clone(), width)
                .validate()
                .unwrap_err();
            assert!(matches!(err, RecordError::NonPositiveWidth { .. }));
        }
    }

    #[test]
    fn test_degenerate_region_rejected() {
        let closed_line = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 0.0),
        ];
        let err = GeometryRecord::region(1, closed_line).validate().unwrap_err();
        assert_eq!(
            err,
            RecordError::EmptyGeometry {
                description: "region on layer 1".into(),
                kind: "region",
                required: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let rec = GeometryRecord::new(
            Geometry::Point {
                at: Point::new(f64::INFINITY, 0.0),
            },
            0,
        );
        assert!(matches!(
            rec.validate(),
            Err(RecordError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn test_description() {
        let rec = GeometryRecord::region(3, unit_square())
            .with_name("Q1", "pad_top")
            .with_subtract(true);
        assert_eq!(
            rec.description(),
            "region on layer 3 'pad_top' of component 'Q1' (subtract)"
        );
    }

    #[test]
    fn test_record_json_defaults() {
        let json = r#"{
            "geometry": {"type": "region", "exterior": [
                {"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 1, "y": 1}
            ]},
            "layer": 5
        }"#;
        let rec: GeometryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.layer, 5);
        assert!(!rec.subtract);
        assert!(rec.name.is_empty());
    }
}
