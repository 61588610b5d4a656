//! GDS-II stream codec.
//!
//! GDS-II is the binary layout format read by mask and fab tooling. Each
//! record is `[2-byte length][2-byte record type][payload]`, big-endian, and
//! the records nest as BGNLIB → BGNSTR → BOUNDARY/PATH → ENDSTR → ENDLIB.
//!
//! Only the subset the exporter produces is written: boundaries and paths
//! inside plain cells. The reader understands the same subset and skips
//! every other element kind.

use std::io::{self, Read, Write};

use thiserror::Error;

use qgeom_core::geometry::{open_ring, Point};
use qgeom_core::LayerId;

use crate::library::{Cell, FilledPolygon, FlexPath, LayoutPrimitive, Library, Timestamp};

// ── GDS-II Record Types ──────────────────────────────────────────────

#[allow(dead_code)]
mod record_type {
    pub const HEADER: u16 = 0x0002;
    pub const BGNLIB: u16 = 0x0102;
    pub const LIBNAME: u16 = 0x0206;
    pub const UNITS: u16 = 0x0305;
    pub const ENDLIB: u16 = 0x0400;
    pub const BGNSTR: u16 = 0x0502;
    pub const STRNAME: u16 = 0x0606;
    pub const ENDSTR: u16 = 0x0700;
    pub const BOUNDARY: u16 = 0x0800;
    pub const PATH: u16 = 0x0900;
    pub const SREF: u16 = 0x0A00;
    pub const AREF: u16 = 0x0B00;
    pub const TEXT: u16 = 0x0C00;
    pub const LAYER: u16 = 0x0D02;
    pub const DATATYPE: u16 = 0x0E02;
    pub const WIDTH: u16 = 0x0F03;
    pub const XY: u16 = 0x1003;
    pub const ENDEL: u16 = 0x1100;
    pub const NODE: u16 = 0x1500;
    pub const PATHTYPE: u16 = 0x2102;
    pub const BOX: u16 = 0x2D00;
}

/// Stream format version written into HEADER.
const GDS_VERSION: i16 = 600;
/// Largest payload that fits behind the 16-bit record length.
const MAX_PAYLOAD: usize = u16::MAX as usize - 4;
/// Path ends flush with the first and last vertex.
const PATHTYPE_FLUSH: i16 = 0;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum GdsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid GDS-II record at offset {offset}: {message}")]
    InvalidRecord { offset: u64, message: String },

    #[error("Unexpected record type 0x{record_type:04X}, expected 0x{expected:04X}")]
    UnexpectedRecord { record_type: u16, expected: u16 },

    #[error("Coordinate {value} does not fit a 32-bit database unit at scale {scale}")]
    CoordinateOverflow { value: f64, scale: f64 },

    #[error("Layer {0} is outside the GDS-II layer range")]
    LayerOutOfRange(LayerId),

    #[error("Record 0x{record_type:04X} payload of {len} bytes exceeds the 65531 byte limit")]
    RecordTooLong { record_type: u16, len: usize },

    #[error("Invalid name {0:?}: names must be non-empty ASCII")]
    InvalidName(String),

    #[error("Stream ended inside {0}")]
    UnexpectedEof(&'static str),
}

// ── GDS-II Record ─────────────────────────────────────────────────────

#[derive(Debug)]
struct GdsRecord {
    record_type: u16,
    data: Vec<u8>,
}

impl GdsRecord {
    fn as_i16_vec(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]))
            .collect()
    }

    fn as_i32_vec(&self) -> Vec<i32> {
        self.data
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn as_string(&self) -> String {
        let s: String = self.data.iter().map(|&b| b as char).collect();
        s.trim_end_matches('\0').to_string()
    }

    fn as_f64_vec(&self) -> Vec<f64> {
        self.data
            .chunks_exact(8)
            .map(|c| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(c);
                gds_real8_to_f64(&bytes)
            })
            .collect()
    }

    fn first_i16(&self) -> Option<i16> {
        self.as_i16_vec().first().copied()
    }
}

/// Convert GDS-II excess-64 real format to IEEE 754 f64.
fn gds_real8_to_f64(bytes: &[u8; 8]) -> f64 {
    if bytes.iter().all(|&b| b == 0) {
        return 0.0;
    }

    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = (bytes[0] & 0x7F) as i32 - 64;

    let mut mantissa: u64 = 0;
    for &b in &bytes[1..] {
        mantissa = (mantissa << 8) | (b as u64);
    }

    let mantissa_f = mantissa as f64 / (1u64 << 56) as f64;
    sign * mantissa_f * 16.0_f64.powi(exponent)
}

/// Convert IEEE 754 f64 to GDS-II excess-64 real format.
fn f64_to_gds_real8(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0u8; 8];
    }

    let sign_bit: u8 = if value < 0.0 { 0x80 } else { 0x00 };
    let mut val = value.abs();

    // Normalize so that 1/16 <= val < 1
    let mut exponent: i32 = 0;
    while val >= 1.0 && exponent < 63 {
        val /= 16.0;
        exponent += 1;
    }
    while val < 1.0 / 16.0 && exponent > -64 {
        val *= 16.0;
        exponent -= 1;
    }

    let mut mantissa = (val * (1u64 << 56) as f64).round() as u64;
    if mantissa >= 1u64 << 56 {
        mantissa >>= 4;
        exponent += 1;
    }
    let exp_byte = sign_bit | ((exponent + 64) as u8 & 0x7F);

    let mut result = [0u8; 8];
    result[0] = exp_byte;
    result[1..].copy_from_slice(&mantissa.to_be_bytes()[1..]);
    result
}

// ── GDS-II Writer ─────────────────────────────────────────────────────

pub struct GdsWriter<W: Write> {
    writer: W,
    scale: f64,
}

impl<W: Write> GdsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, scale: 1000.0 }
    }

    /// Write a whole library as a GDS-II stream.
    pub fn write(&mut self, lib: &Library) -> Result<(), GdsError> {
        self.scale = lib.scale();

        self.write_i16_record(record_type::HEADER, &[GDS_VERSION])?;
        self.write_timestamp_record(record_type::BGNLIB, &lib.timestamp)?;
        self.write_name_record(record_type::LIBNAME, &lib.name)?;
        // db unit in user units, db unit in meters
        self.write_real8_record(
            record_type::UNITS,
            &[lib.precision / lib.unit, lib.precision],
        )?;

        for cell in lib.cells() {
            self.write_cell(cell, &lib.timestamp)?;
        }

        self.write_record(record_type::ENDLIB, &[])?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record_type: u16, data: &[u8]) -> Result<(), GdsError> {
        if data.len() > MAX_PAYLOAD {
            return Err(GdsError::RecordTooLong {
                record_type,
                len: data.len(),
            });
        }
        let total_len = (data.len() + 4) as u16;
        self.writer.write_all(&total_len.to_be_bytes())?;
        self.writer.write_all(&record_type.to_be_bytes())?;
        if !data.is_empty() {
            self.writer.write_all(data)?;
        }
        Ok(())
    }

    fn write_i16_record(&mut self, record_type: u16, values: &[i16]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_i32_record(&mut self, record_type: u16, values: &[i32]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_name_record(&mut self, record_type: u16, name: &str) -> Result<(), GdsError> {
        if name.is_empty() || !name.is_ascii() {
            return Err(GdsError::InvalidName(name.to_string()));
        }
        let mut data: Vec<u8> = name.bytes().collect();
        // GDS strings must be even length
        if data.len() % 2 != 0 {
            data.push(0);
        }
        self.write_record(record_type, &data)
    }

    fn write_real8_record(&mut self, record_type: u16, values: &[f64]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| f64_to_gds_real8(*v)).collect();
        self.write_record(record_type, &data)
    }

    fn write_timestamp_record(&mut self, record_type: u16, ts: &Timestamp) -> Result<(), GdsError> {
        // modification stamp followed by access stamp
        let stamp = ts.to_record_values();
        let mut values = [0i16; 12];
        values[..6].copy_from_slice(&stamp);
        values[6..].copy_from_slice(&stamp);
        self.write_i16_record(record_type, &values)
    }

    fn write_cell(&mut self, cell: &Cell, ts: &Timestamp) -> Result<(), GdsError> {
        self.write_timestamp_record(record_type::BGNSTR, ts)?;
        self.write_name_record(record_type::STRNAME, &cell.name)?;

        for primitive in &cell.primitives {
            match primitive {
                LayoutPrimitive::Polygon(poly) => self.write_polygon(poly)?,
                LayoutPrimitive::Path(path) => self.write_path(path)?,
            }
        }

        self.write_record(record_type::ENDSTR, &[])
    }

    fn write_polygon(&mut self, poly: &FilledPolygon) -> Result<(), GdsError> {
        let mut coords = self.to_db_coords(&poly.vertices)?;
        // Close the ring
        if coords.len() >= 2 {
            let (x, y) = (coords[0], coords[1]);
            coords.push(x);
            coords.push(y);
        }

        self.write_record(record_type::BOUNDARY, &[])?;
        self.write_layer_and_datatype(poly.layer, poly.datatype)?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_path(&mut self, path: &FlexPath) -> Result<(), GdsError> {
        let coords = self.to_db_coords(&path.vertices)?;
        let width = self.to_db(path.width)?;

        self.write_record(record_type::PATH, &[])?;
        self.write_layer_and_datatype(path.layer, path.datatype)?;
        self.write_i16_record(record_type::PATHTYPE, &[PATHTYPE_FLUSH])?;
        self.write_i32_record(record_type::WIDTH, &[width])?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_layer_and_datatype(&mut self, layer: LayerId, datatype: u16) -> Result<(), GdsError> {
        let layer_value = i16::try_from(layer).map_err(|_| GdsError::LayerOutOfRange(layer))?;
        self.write_i16_record(record_type::LAYER, &[layer_value])?;
        self.write_i16_record(record_type::DATATYPE, &[datatype as i16])
    }

    fn to_db(&self, value: f64) -> Result<i32, GdsError> {
        let scaled = (value * self.scale).round();
        if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
            return Err(GdsError::CoordinateOverflow {
                value,
                scale: self.scale,
            });
        }
        Ok(scaled as i32)
    }

    fn to_db_coords(&self, points: &[Point]) -> Result<Vec<i32>, GdsError> {
        let mut coords = Vec::with_capacity(points.len() * 2);
        for p in points {
            coords.push(self.to_db(p.x)?);
            coords.push(self.to_db(p.y)?);
        }
        Ok(coords)
    }
}

// ── GDS-II Reader ─────────────────────────────────────────────────────

pub struct GdsReader<R: Read> {
    reader: R,
    offset: u64,
    unit: f64,
    precision: f64,
}

impl<R: Read> GdsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            unit: Library::DEFAULT_UNIT,
            precision: Library::DEFAULT_PRECISION,
        }
    }

    /// Read the entire stream into a library.
    pub fn read(&mut self) -> Result<Library, GdsError> {
        self.read_header()?;

        let mut lib = Library::default();
        loop {
            let rec = self.expect_record("library")?;
            match rec.record_type {
                record_type::BGNLIB => {
                    if let Some(ts) = Timestamp::from_record_values(&rec.as_i16_vec()) {
                        lib.timestamp = ts;
                    }
                }
                record_type::LIBNAME => {
                    lib.name = rec.as_string();
                    log::debug!("Library name: {}", lib.name);
                }
                record_type::UNITS => {
                    let units = rec.as_f64_vec();
                    if let [user_per_db, meters_per_db, ..] = units[..] {
                        self.precision = meters_per_db;
                        self.unit = meters_per_db / user_per_db;
                        lib.precision = self.precision;
                        lib.unit = self.unit;
                    }
                }
                record_type::BGNSTR => self.read_structure(&mut lib)?,
                record_type::ENDLIB => break,
                _ => {}
            }
        }

        log::debug!("End of library. {} cells read.", lib.cell_count());
        Ok(lib)
    }

    fn read_record(&mut self) -> Result<Option<GdsRecord>, GdsError> {
        let mut len_buf = [0u8; 2];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(GdsError::Io(e)),
        }

        let total_len = u16::from_be_bytes(len_buf) as usize;
        if total_len < 4 {
            return Err(GdsError::InvalidRecord {
                offset: self.offset,
                message: format!("Record length {} is too small", total_len),
            });
        }

        let mut type_buf = [0u8; 2];
        self.reader.read_exact(&mut type_buf)?;
        let record_type = u16::from_be_bytes(type_buf);

        let mut data = vec![0u8; total_len - 4];
        self.reader.read_exact(&mut data)?;
        self.offset += total_len as u64;

        Ok(Some(GdsRecord { record_type, data }))
    }

    fn expect_record(&mut self, context: &'static str) -> Result<GdsRecord, GdsError> {
        self.read_record()?.ok_or(GdsError::UnexpectedEof(context))
    }

    fn read_header(&mut self) -> Result<(), GdsError> {
        let rec = self.read_record()?.ok_or(GdsError::InvalidRecord {
            offset: 0,
            message: "Empty file".into(),
        })?;

        if rec.record_type != record_type::HEADER {
            return Err(GdsError::UnexpectedRecord {
                record_type: rec.record_type,
                expected: record_type::HEADER,
            });
        }
        if let Some(version) = rec.first_i16() {
            log::debug!("GDS-II version: {}", version);
        }
        Ok(())
    }

    fn read_structure(&mut self, lib: &mut Library) -> Result<(), GdsError> {
        let mut name = String::new();
        let mut primitives = Vec::new();

        loop {
            let rec = self.expect_record("structure")?;
            match rec.record_type {
                record_type::STRNAME => name = rec.as_string(),
                record_type::BOUNDARY | record_type::PATH => {
                    let is_path = rec.record_type == record_type::PATH;
                    if let Some(primitive) = self.read_element(is_path)? {
                        primitives.push(primitive);
                    }
                }
                record_type::SREF
                | record_type::AREF
                | record_type::TEXT
                | record_type::NODE
                | record_type::BOX => self.skip_to_endel()?,
                record_type::ENDSTR => break,
                _ => {}
            }
        }

        lib.new_cell(&name).add_all(primitives);
        Ok(())
    }

    fn read_element(&mut self, is_path: bool) -> Result<Option<LayoutPrimitive>, GdsError> {
        let mut layer: LayerId = 0;
        let mut datatype: u16 = 0;
        let mut width = 0.0;
        let mut points: Vec<Point> = Vec::new();
        let to_user = self.precision / self.unit;

        loop {
            let rec = self.expect_record("element")?;
            match rec.record_type {
                record_type::LAYER => {
                    if let Some(v) = rec.first_i16() {
                        layer = v as LayerId;
                    }
                }
                record_type::DATATYPE => {
                    if let Some(v) = rec.first_i16() {
                        datatype = v as u16;
                    }
                }
                record_type::WIDTH => {
                    if let Some(&v) = rec.as_i32_vec().first() {
                        // negative widths are absolute (unscaled by transforms)
                        width = (v as f64).abs() * to_user;
                    }
                }
                record_type::XY => {
                    points = rec
                        .as_i32_vec()
                        .chunks_exact(2)
                        .map(|pair| Point::new(pair[0] as f64 * to_user, pair[1] as f64 * to_user))
                        .collect();
                }
                record_type::ENDEL => break,
                _ => {}
            }
        }

        if points.is_empty() {
            return Ok(None);
        }

        let primitive = if is_path {
            LayoutPrimitive::Path(FlexPath {
                vertices: points,
                width,
                layer,
                datatype,
            })
        } else {
            LayoutPrimitive::Polygon(FilledPolygon {
                vertices: open_ring(&points).to_vec(),
                layer,
                datatype,
            })
        };
        Ok(Some(primitive))
    }

    fn skip_to_endel(&mut self) -> Result<(), GdsError> {
        loop {
            let rec = self.expect_record("element")?;
            if rec.record_type == record_type::ENDEL {
                return Ok(());
            }
        }
    }
}
