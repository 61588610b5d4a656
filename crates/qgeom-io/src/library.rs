use serde::{Deserialize, Serialize};

use qgeom_core::geometry::{BoundingBox, Point};
use qgeom_core::LayerId;

/// Datatype tagging primitives that came from filled regions.
pub const FILL_DATATYPE: u16 = 10;
/// Datatype tagging primitives that came from stroked paths.
pub const STROKE_DATATYPE: u16 = 11;
/// Layer that subtract geometry is rerouted to.
pub const SUBTRACT_LAYER: LayerId = 0;

/// A filled polygon. Vertices are stored open; the stream writer closes the ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledPolygon {
    pub vertices: Vec<Point>,
    pub layer: LayerId,
    pub datatype: u16,
}

/// A centerline path with a stroke width and flush ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexPath {
    pub vertices: Vec<Point>,
    pub width: f64,
    pub layer: LayerId,
    pub datatype: u16,
}

/// An encoded layout element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutPrimitive {
    Polygon(FilledPolygon),
    Path(FlexPath),
}

impl LayoutPrimitive {
    pub fn layer_code(&self) -> LayerId {
        match self {
            LayoutPrimitive::Polygon(p) => p.layer,
            LayoutPrimitive::Path(p) => p.layer,
        }
    }

    pub fn datatype_code(&self) -> u16 {
        match self {
            LayoutPrimitive::Polygon(p) => p.datatype,
            LayoutPrimitive::Path(p) => p.datatype,
        }
    }

    pub fn vertices(&self) -> &[Point] {
        match self {
            LayoutPrimitive::Polygon(p) => &p.vertices,
            LayoutPrimitive::Path(p) => &p.vertices,
        }
    }

    pub fn width(&self) -> Option<f64> {
        match self {
            LayoutPrimitive::Polygon(_) => None,
            LayoutPrimitive::Path(p) => Some(p.width),
        }
    }
}

/// Modification/access stamp written into BGNLIB and BGNSTR records.
///
/// Kept fixed by default so that identical input produces identical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i16,
    pub month: i16,
    pub day: i16,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
}

impl Default for Timestamp {
    fn default() -> Self {
        Self {
            year: 2000,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl Timestamp {
    /// The six record values of one stamp.
    pub fn to_record_values(&self) -> [i16; 6] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ]
    }

    pub fn from_record_values(values: &[i16]) -> Option<Self> {
        match values {
            [year, month, day, hour, minute, second, ..] => Some(Self {
                year: *year,
                month: *month,
                day: *day,
                hour: *hour,
                minute: *minute,
                second: *second,
            }),
            _ => None,
        }
    }
}

/// A named cell holding primitives in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    pub primitives: Vec<LayoutPrimitive>,
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primitives: Vec::new(),
        }
    }

    pub fn add(&mut self, primitive: LayoutPrimitive) -> &mut Self {
        self.primitives.push(primitive);
        self
    }

    pub fn add_all<I>(&mut self, primitives: I) -> &mut Self
    where
        I: IntoIterator<Item = LayoutPrimitive>,
    {
        self.primitives.extend(primitives);
        self
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Bounding box of all primitive vertices in this cell.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.primitives.iter().flat_map(|p| p.vertices()))
    }
}

/// A layout library: named cells plus the units their coordinates are in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    /// User unit in meters (1e-6 means coordinates are micrometers).
    pub unit: f64,
    /// Database unit in meters; coordinates are stored as multiples of it.
    pub precision: f64,
    pub timestamp: Timestamp,
    cells: Vec<Cell>,
}

impl Library {
    pub const DEFAULT_NAME: &'static str = "library";
    pub const DEFAULT_UNIT: f64 = 1e-6;
    pub const DEFAULT_PRECISION: f64 = 1e-9;

    pub fn new(name: &str, unit: f64, precision: f64) -> Self {
        Self {
            name: name.to_string(),
            unit,
            precision,
            timestamp: Timestamp::default(),
            cells: Vec::new(),
        }
    }

    /// Database units per user unit.
    pub fn scale(&self) -> f64 {
        self.unit / self.precision
    }

    /// Create a cell, replacing any existing cell of the same name.
    ///
    /// A replaced cell keeps its position so output order stays stable.
    pub fn new_cell(&mut self, name: &str) -> &mut Cell {
        let index = match self.cells.iter().position(|c| c.name == name) {
            Some(index) => {
                log::debug!("Overwriting cell '{}'", name);
                self.cells[index] = Cell::new(name);
                index
            }
            None => {
                self.cells.push(Cell::new(name));
                self.cells.len() - 1
            }
        };
        &mut self.cells[index]
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.name == name)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_names(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME, Self::DEFAULT_UNIT, Self::DEFAULT_PRECISION)
    }
}
