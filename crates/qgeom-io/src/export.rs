//! Design geometry → GDS-II file.
//!
//! One export call checks that the destination directory is writable,
//! computes the combined bounds of the design, encodes every filled region
//! and then every path in table order, and writes them into a single top
//! cell.

use std::path::{Path, PathBuf};

use thiserror::Error;

use qgeom_core::{bounds_of, merge, BoundingBox, GeometryRecord, GeometrySource, RecordError};

use crate::config::{ConfigError, ErrorPolicy, ExportOptions};
use crate::encoder::{encode, EncodeError};
use crate::gate::{can_write, containing_directory};
use crate::gds::GdsError;
use crate::library::{LayoutPrimitive, Library};
use crate::writer::LayoutWriter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Not able to write to directory {}", directory.display())]
    WriteDenied { directory: PathBuf },

    #[error(transparent)]
    UnsupportedGeometry(EncodeError),

    #[error(transparent)]
    InvalidRecord(RecordError),

    #[error("Failed to write layout file: {0}")]
    Io(#[from] GdsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<EncodeError> for ExportError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::InvalidRecord(err) => ExportError::InvalidRecord(err),
            other => ExportError::UnsupportedGeometry(other),
        }
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub destination: PathBuf,
    /// Combined bounds of both geometry tables, for sizing and validation.
    pub bounds: BoundingBox,
    /// Filled polygons written.
    pub polygons: usize,
    /// Paths written.
    pub paths: usize,
    /// Records left out under [`ErrorPolicy::CollectAll`], either unsupported
    /// or invalid.
    pub skipped: Vec<EncodeError>,
}

impl ExportReport {
    pub fn primitive_count(&self) -> usize {
        self.polygons + self.paths
    }
}

/// Bounds of both tables together.
///
/// Only tables with at least one vertex take part, so a table that is empty
/// or holds only vertex-less shapes cannot drag the result toward the origin.
pub fn design_bounds<S: GeometrySource + ?Sized>(source: &S) -> BoundingBox {
    let boxes: Vec<BoundingBox> = [source.filled_regions(), source.paths()]
        .into_iter()
        .filter(|table| has_vertices(table))
        .map(bounds_of)
        .collect();
    merge(&boxes)
}

fn has_vertices(table: &[GeometryRecord]) -> bool {
    table.iter().any(|r| r.geometry.vertices().next().is_some())
}

/// Exports design geometry to GDS-II files.
///
/// The exporter keeps its library between calls for inspection but clears it
/// at the start of every export, so repeated exports are independent.
#[derive(Debug, Clone)]
pub struct GdsExporter {
    options: ExportOptions,
    writer: LayoutWriter,
}

impl GdsExporter {
    pub fn new(options: ExportOptions) -> Result<Self, ExportError> {
        options.validate()?;
        Ok(Self {
            options,
            writer: LayoutWriter::default(),
        })
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Library assembled by the most recent export. Empty if that export
    /// failed.
    pub fn library(&self) -> &Library {
        self.writer.library()
    }

    pub fn export<S: GeometrySource + ?Sized>(
        &mut self,
        source: &S,
        destination: impl AsRef<Path>,
    ) -> Result<ExportReport, ExportError> {
        let destination = destination.as_ref();
        self.writer.reset();
        if !can_write(destination) {
            return Err(ExportError::WriteDenied {
                directory: containing_directory(destination),
            });
        }

        let regions = source.filled_regions();
        let paths = source.paths();
        log::info!(
            "Exporting {} filled regions and {} paths to {}",
            regions.len(),
            paths.len(),
            destination.display()
        );

        let bounds = design_bounds(source);
        log::debug!("Design bounds: {:?}", bounds.as_tuple());

        let (primitives, skipped) = self.encode_all(regions.iter().chain(paths.iter()))?;

        let library = self.writer.new_library(self.options.unit);
        library.name = self.options.library_name.clone();
        library.precision = self.options.precision;
        library.timestamp = self.options.timestamp;
        let top = self.writer.write_cell(&self.options.top_cell, primitives);

        let polygons = top
            .primitives
            .iter()
            .filter(|p| matches!(p, LayoutPrimitive::Polygon(_)))
            .count();
        let path_count = top.primitive_count() - polygons;

        if let Err(err) = self.writer.serialize(destination) {
            self.writer.reset();
            return Err(err.into());
        }

        log::info!(
            "Wrote {} polygons and {} paths to {} ({} skipped)",
            polygons,
            path_count,
            destination.display(),
            skipped.len()
        );

        Ok(ExportReport {
            destination: destination.to_path_buf(),
            bounds,
            polygons,
            paths: path_count,
            skipped,
        })
    }

    fn encode_all<'a, I>(
        &self,
        records: I,
    ) -> Result<(Vec<LayoutPrimitive>, Vec<EncodeError>), ExportError>
    where
        I: Iterator<Item = &'a GeometryRecord>,
    {
        let mut primitives = Vec::new();
        let mut skipped = Vec::new();
        for record in records {
            match encode(record) {
                Ok(primitive) => primitives.push(primitive),
                Err(err) => match self.options.error_policy {
                    ErrorPolicy::FailFast => return Err(err.into()),
                    ErrorPolicy::CollectAll => {
                        log::warn!("Skipping record: {}", err);
                        skipped.push(err);
                    }
                },
            }
        }
        Ok((primitives, skipped))
    }
}

/// Export with default options: micrometer units, nanometer precision, a
/// single `TOP` cell, and unsupported records skipped.
pub fn export_to_layout<S: GeometrySource + ?Sized>(
    source: &S,
    destination: impl AsRef<Path>,
) -> Result<ExportReport, ExportError> {
    GdsExporter::new(ExportOptions::default())?.export(source, destination)
}
