use serde::{Deserialize, Serialize};

/// A 2D point in design coordinates (user units, typically micrometers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box stored as `(min_x, min_y, max_x, max_y)`.
///
/// The all-zero box doubles as the "nothing to bound" value, which is what a
/// design with no geometry reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The canonical empty box `(0, 0, 0, 0)`.
    pub const EMPTY: BoundingBox = BoundingBox {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 0.0,
        max_y: 0.0,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Component-wise enclosure of both boxes.
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// The shape carried by a geometry record.
///
/// Design tables can hold more shape kinds than the layout export knows how
/// to encode. `Point` and `Collection` still contribute to bounds but are
/// rejected by the element encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// A closed outline of solid material. Interior rings are holes.
    Region {
        exterior: Vec<Point>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        interiors: Vec<Vec<Point>>,
    },
    /// An open polyline stroked with a positive width.
    Path { points: Vec<Point>, width: f64 },
    Point { at: Point },
    Collection { items: Vec<Geometry> },
}

impl Geometry {
    pub fn region(exterior: Vec<Point>) -> Self {
        Geometry::Region {
            exterior,
            interiors: Vec::new(),
        }
    }

    pub fn path(points: Vec<Point>, width: f64) -> Self {
        Geometry::Path { points, width }
    }

    /// Short name of the shape kind, used in log lines and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Region { .. } => "region",
            Geometry::Path { .. } => "path",
            Geometry::Point { .. } => "point",
            Geometry::Collection { .. } => "collection",
        }
    }

    /// Every vertex of the shape, interior rings and nested items included.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        match self {
            Geometry::Region {
                exterior,
                interiors,
            } => Box::new(exterior.iter().chain(interiors.iter().flatten())),
            Geometry::Path { points, .. } => Box::new(points.iter()),
            Geometry::Point { at } => Box::new(std::iter::once(at)),
            Geometry::Collection { items } => Box::new(items.iter().flat_map(|g| g.vertices())),
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices())
    }

    /// Stroke width for paths, `None` for every other kind.
    pub fn width(&self) -> Option<f64> {
        match self {
            Geometry::Path { width, .. } => Some(*width),
            _ => None,
        }
    }
}

/// Drop a repeated closing vertex so the ring is stored open.
pub fn open_ring(ring: &[Point]) -> &[Point] {
    match ring {
        [first, .., last] if first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}
