use std::fs;
use std::path::Path;

use qgeom_core::{BoundingBox, Geometry, GeometryRecord, GeometryTables, Point, RecordError};
use qgeom_io::library::{FILL_DATATYPE, STROKE_DATATYPE};
use qgeom_io::{
    export_to_layout, EncodeError, ExportError, GdsError, GdsExporter, GdsReader, LayoutPrimitive,
    Library,
};

fn unit_square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(1.0, 0.0),
        Point::new(1.0, 1.0),
        Point::new(0.0, 1.0),
        Point::new(0.0, 0.0),
    ]
}

fn square_and_subtract_path() -> GeometryTables {
    let mut tables = GeometryTables::new();
    tables.add_region(GeometryRecord::region(1, unit_square()).with_name("Q1", "pad"));
    tables.add_path(
        GeometryRecord::path(1, vec![Point::new(0.0, 0.5), Point::new(3.0, 0.5)], 2.0)
            .with_name("Q1", "trace")
            .with_subtract(true),
    );
    tables
}

fn read_back(path: &Path) -> Library {
    let file = fs::File::open(path).unwrap();
    GdsReader::new(file).read().unwrap()
}

#[test]
fn test_square_and_subtract_path() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("design.gds");

    let report = export_to_layout(&square_and_subtract_path(), &dest).unwrap();
    assert_eq!(report.polygons, 1);
    assert_eq!(report.paths, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(report.bounds.as_tuple(), (0.0, 0.0, 3.0, 1.0));

    let lib = read_back(&dest);
    assert_eq!(lib.cell_names(), vec!["TOP"]);
    let top = lib.cell("TOP").unwrap();
    assert_eq!(top.primitive_count(), 2);

    match &top.primitives[0] {
        LayoutPrimitive::Polygon(poly) => {
            assert_eq!(poly.layer, 1);
            assert_eq!(poly.datatype, FILL_DATATYPE);
            assert_eq!(poly.vertices.len(), 4);
        }
        other => panic!("expected polygon first, got {:?}", other),
    }
    match &top.primitives[1] {
        LayoutPrimitive::Path(path) => {
            assert_eq!(path.layer, 0);
            assert_eq!(path.datatype, STROKE_DATATYPE);
            assert!((path.width - 2.0).abs() < 1e-9);
            assert_eq!(path.vertices.len(), 2);
        }
        other => panic!("expected path second, got {:?}", other),
    }
}

#[test]
fn test_repeated_export_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("design.gds");
    let tables = square_and_subtract_path();

    export_to_layout(&tables, &dest).unwrap();
    let first = fs::read(&dest).unwrap();
    export_to_layout(&tables, &dest).unwrap();
    let second = fs::read(&dest).unwrap();
    assert_eq!(first, second);

    // Same exporter reused for a second file.
    let other = dir.path().join("again.gds");
    let mut exporter = GdsExporter::new(Default::default()).unwrap();
    exporter.export(&tables, &dest).unwrap();
    exporter.export(&tables, &other).unwrap();
    assert_eq!(fs::read(&other).unwrap(), first);
}

#[test]
fn test_missing_directory_is_write_denied() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let dest = missing.join("design.gds");

    match export_to_layout(&square_and_subtract_path(), &dest) {
        Err(ExportError::WriteDenied { directory }) => assert_eq!(directory, missing),
        other => panic!("expected WriteDenied, got {:?}", other),
    }
    assert!(!dest.exists());
}

#[cfg(unix)]
#[test]
fn test_read_only_directory_is_write_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users ignore permission bits; nothing to check then.
    let privileged = fs::write(locked.join("scratch"), b"").is_ok();
    if !privileged {
        let dest = locked.join("design.gds");
        let result = export_to_layout(&square_and_subtract_path(), &dest);
        assert!(matches!(result, Err(ExportError::WriteDenied { .. })));
        assert!(!dest.exists());
    }

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_denied_export_leaks_nothing_into_next_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut exporter = GdsExporter::new(Default::default()).unwrap();

    let denied = dir.path().join("missing").join("design.gds");
    assert!(exporter.export(&square_and_subtract_path(), &denied).is_err());

    let mut only_path = GeometryTables::new();
    only_path.add_path(GeometryRecord::path(
        4,
        vec![Point::new(0.0, 0.0), Point::new(0.0, 9.0)],
        0.5,
    ));
    let dest = dir.path().join("design.gds");
    exporter.export(&only_path, &dest).unwrap();

    let lib = read_back(&dest);
    assert_eq!(lib.cell_count(), 1);
    let top = lib.cell("TOP").unwrap();
    assert_eq!(top.primitive_count(), 1);
    assert_eq!(top.primitives[0].layer_code(), 4);
}

#[test]
fn test_empty_design_writes_empty_top_cell() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("empty.gds");

    let report = export_to_layout(&GeometryTables::new(), &dest).unwrap();
    assert_eq!(report.bounds, BoundingBox::EMPTY);
    assert_eq!(report.primitive_count(), 0);

    let lib = read_back(&dest);
    assert_eq!(lib.cell_names(), vec!["TOP"]);
    assert_eq!(lib.cell("TOP").unwrap().primitive_count(), 0);
}

#[test]
fn test_collect_all_skips_unsupported_records() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("design.gds");

    let mut tables = square_and_subtract_path();
    tables.add_region(
        GeometryRecord::new(
            Geometry::Point {
                at: Point::new(-5.0, -5.0),
            },
            2,
        )
        .with_name("Q2", "marker"),
    );

    let report = export_to_layout(&tables, &dest).unwrap();
    assert_eq!(report.primitive_count(), 2);
    assert_eq!(
        report.skipped,
        vec![EncodeError::UnsupportedGeometry {
            description: "point on layer 2 'marker' of component 'Q2'".into()
        }]
    );
    // unsupported shapes still count toward the bounds
    assert_eq!(report.bounds.as_tuple(), (-5.0, -5.0, 3.0, 1.0));
    assert_eq!(read_back(&dest).cell("TOP").unwrap().primitive_count(), 2);
}

#[test]
fn test_regions_precede_paths_in_table_order() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("design.gds");

    let mut tables = GeometryTables::new();
    for layer in [7, 5] {
        tables.add_path(GeometryRecord::path(
            layer,
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            0.1,
        ));
    }
    for layer in [3, 9] {
        tables.add_region(GeometryRecord::region(layer, unit_square()));
    }

    export_to_layout(&tables, &dest).unwrap();
    let lib = read_back(&dest);
    let summary: Vec<(u32, u16)> = lib
        .cell("TOP")
        .unwrap()
        .primitives
        .iter()
        .map(|p| (p.layer_code(), p.datatype_code()))
        .collect();
    assert_eq!(summary, vec![(3, 10), (9, 10), (7, 11), (5, 11)]);
}

#[test]
fn test_invalid_records_are_skipped_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("design.gds");

    let mut tables = square_and_subtract_path();
    tables.add_region(GeometryRecord::region(1, Vec::new()).with_name("Q3", "hollow"));
    tables.add_path(GeometryRecord::path(
        2,
        vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)],
        -2.0,
    ));

    let report = export_to_layout(&tables, &dest).unwrap();
    assert_eq!(report.polygons, 1);
    assert_eq!(report.paths, 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(matches!(
        report.skipped[0],
        EncodeError::InvalidRecord(RecordError::EmptyGeometry { found: 0, .. })
    ));
    assert!(matches!(
        report.skipped[1],
        EncodeError::InvalidRecord(RecordError::NonPositiveWidth { .. })
    ));

    let top = read_back(&dest).cell("TOP").unwrap().clone();
    assert_eq!(top.primitive_count(), 2);
    assert!(top.primitives.iter().all(|p| p.width().map_or(true, |w| w > 0.0)));
}

#[test]
fn test_coordinate_overflow_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("design.gds");

    let mut tables = GeometryTables::new();
    tables.add_region(GeometryRecord::region(
        1,
        vec![
            Point::new(0.0, 0.0),
            Point::new(1e7, 0.0),
            Point::new(1e7, 1.0),
        ],
    ));

    match export_to_layout(&tables, &dest) {
        Err(ExportError::Io(GdsError::CoordinateOverflow { value, .. })) => {
            assert_eq!(value, 1e7)
        }
        other => panic!("expected CoordinateOverflow, got {:?}", other),
    }
    assert!(!dest.exists());
    // the temporary stream is cleaned up as well
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
