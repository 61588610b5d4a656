use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::gate::containing_directory;
use crate::gds::{GdsError, GdsWriter};
use crate::library::{Cell, LayoutPrimitive, Library};

/// An empty library whose coordinates are in `unit_scale` meters.
pub fn new_library(unit_scale: f64) -> Library {
    Library::new(Library::DEFAULT_NAME, unit_scale, Library::DEFAULT_PRECISION)
}

/// Write `library` to `destination`, replacing any existing file.
///
/// The stream goes to a temporary file next to the destination and is
/// renamed into place once complete, so a failed write never leaves a
/// truncated file behind.
pub fn serialize(library: &Library, destination: impl AsRef<Path>) -> Result<(), GdsError> {
    let destination = destination.as_ref();
    let directory = containing_directory(destination);
    let mut tmp = NamedTempFile::new_in(&directory)?;

    {
        let file: &mut File = tmp.as_file_mut();
        let mut writer = GdsWriter::new(BufWriter::new(file));
        writer.write(library)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| GdsError::Io(e.error))?;

    log::debug!(
        "Wrote library '{}' ({} cells) to {}",
        library.name,
        library.cell_count(),
        destination.display()
    );
    Ok(())
}

/// Owns the library being assembled for one export.
///
/// Each writer holds its own library, so concurrent exports never share
/// cells. [`LayoutWriter::reset`] drops everything added so far, which lets a
/// writer be reused for a fresh export.
#[derive(Debug, Clone, Default)]
pub struct LayoutWriter {
    library: Library,
}

impl LayoutWriter {
    /// Start over with an empty library in `unit_scale` meters.
    pub fn new_library(&mut self, unit_scale: f64) -> &mut Library {
        self.library = new_library(unit_scale);
        &mut self.library
    }

    /// Drop every cell from the current library, keeping its settings.
    pub fn reset(&mut self) {
        if self.library.cell_count() > 0 {
            log::debug!(
                "Clearing {} cell(s) left from a previous export",
                self.library.cell_count()
            );
        }
        self.library.clear();
    }

    /// Create or overwrite cell `name` with `primitives`, in order.
    pub fn write_cell<I>(&mut self, name: &str, primitives: I) -> &mut Cell
    where
        I: IntoIterator<Item = LayoutPrimitive>,
    {
        let cell = self.library.new_cell(name);
        cell.add_all(primitives);
        cell
    }

    pub fn serialize(&self, destination: impl AsRef<Path>) -> Result<(), GdsError> {
        serialize(&self.library, destination)
    }

    pub fn library(&self) -> &Library {
        &self.library
    }
}
