//! Full pipeline over Zarr stores on disk: scan, derive, align, iterate.

use std::path::Path;

use block_loader::{BlockCoordinate, BlockLoader, BlockSpec, LoaderError, ReferenceGrid, SkipReason};
use raster_common::{Crs, GeoTransform, TimeExtractionRule, TimeKey};
use raster_io::{RasterMetadata, ZarrBackend};
use test_utils::fixtures::grid::{GridSpec, SIMPLE_10X10, UTM33_LANDSAT};
use test_utils::fixtures::time::{DAILY_FORMAT, DAILY_STEMS};
use test_utils::generators::{create_constant_grid, create_test_grid};
use test_utils::zarr::{ZarrRasterWriter, ZarrWriterConfig};
use test_utils::{init_test_tracing, touch_dir, touch_file};

fn metadata(spec: &GridSpec, nodata: Option<f32>) -> RasterMetadata {
    RasterMetadata {
        crs: Crs::new(spec.crs),
        transform: GeoTransform::from_gdal(spec.geo_transform()),
        width: spec.width,
        height: spec.height,
        bands: 1,
        nodata,
    }
}

fn write_store(dir: &Path, name: &str, metadata: &RasterMetadata, data: &[f32]) {
    let writer = ZarrRasterWriter::new(ZarrWriterConfig {
        chunk_size: 4,
        ..Default::default()
    });
    writer
        .write(&dir.join(name), metadata, data)
        .expect("Failed to write Zarr store");
}

fn daily_rule() -> TimeExtractionRule {
    TimeExtractionRule::new(0, Some(8), DAILY_FORMAT)
}

#[test]
fn test_directory_scan_to_blocks() {
    init_test_tracing();
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (i, stem) in DAILY_STEMS.iter().enumerate() {
        write_store(
            temp_dir.path(),
            &format!("{stem}.zarr"),
            &metadata(&SIMPLE_10X10, None),
            &create_constant_grid(10, 10, i as f32 + 1.0),
        );
    }
    touch_dir(temp_dir.path(), "notes.zarr");
    touch_file(temp_dir.path(), "20240104.txt");

    let mut loader = BlockLoader::new(ZarrBackend::new(), BlockSpec::square(6).unwrap());
    let scan = loader
        .add_files_from_directory(temp_dir.path(), &daily_rule())
        .unwrap();
    assert_eq!(scan.added.len(), 3);
    assert_eq!(scan.skipped.len(), 1);
    assert!(matches!(scan.skipped[0].reason, SkipReason::Unparseable(_)));

    let grid = loader.derive_reference_from_sources().unwrap().clone();
    assert_eq!(grid.crs, Crs::new("EPSG:4326"));
    assert_eq!((grid.width, grid.height), (10, 10));
    loader.init().unwrap();

    let blocks: Vec<_> = loader.blocks().unwrap().map(Result::unwrap).collect();
    assert_eq!(blocks.len(), 3 * 4);
    for (i, chunk) in blocks.chunks(4).enumerate() {
        let expected_key = TimeKey::from_ymd(2024, 1, i as u32 + 1).unwrap();
        let valid: usize = chunk.iter().map(|b| b.valid_pixel_count()).sum();
        assert_eq!(valid, 100);
        for block in chunk {
            assert_eq!(block.time_key(), expected_key);
            assert!(block
                .data()
                .iter()
                .zip(block.valid_mask())
                .filter(|(_, valid)| **valid)
                .all(|(v, _)| *v == i as f32 + 1.0));
        }
    }
}

#[test]
fn test_scan_of_directory_without_stores() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    touch_file(temp_dir.path(), "20240101.txt");

    let mut loader = BlockLoader::new(ZarrBackend::new(), BlockSpec::square(6).unwrap());
    let err = loader
        .add_files_from_directory(temp_dir.path(), &daily_rule())
        .unwrap_err();
    assert!(matches!(err, LoaderError::NoMatchingFiles { skipped: 0, .. }));
}

#[test]
fn test_window_reads_match_source_pixels() {
    init_test_tracing();
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data = create_test_grid(10, 10);
    write_store(temp_dir.path(), "20240101.zarr", &metadata(&SIMPLE_10X10, None), &data);

    let mut loader = BlockLoader::new(ZarrBackend::new(), BlockSpec::new(3, 4).unwrap());
    loader
        .add_files_from_directory(temp_dir.path(), &daily_rule())
        .unwrap();
    let key = TimeKey::from_ymd(2024, 1, 1).unwrap();
    loader.set_reference_from_source(key).unwrap();
    loader.init().unwrap();

    let block = loader.read_block(key, BlockCoordinate::new(2, 3)).unwrap();
    // Columns 9..12, rows 8..12: one column and two rows inside the grid
    assert_eq!(block.valid_pixel_count(), 2);
    assert_eq!(block.pixel(0, 0, 0), Some(data[8 * 10 + 9]));
    assert_eq!(block.pixel(1, 0, 0), Some(data[9 * 10 + 9]));
    assert!(!block.is_valid(0, 1));
}

#[test]
fn test_reprojection_from_utm_to_geographic() {
    init_test_tracing();
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let size = UTM33_LANDSAT.width;
    write_store(
        temp_dir.path(),
        "20240101.zarr",
        &metadata(&UTM33_LANDSAT, None),
        &create_test_grid(size, size),
    );

    let mut loader = BlockLoader::new(ZarrBackend::new(), BlockSpec::square(50).unwrap());
    loader
        .add_files_from_directory(temp_dir.path(), &daily_rule())
        .unwrap();
    // Inside the UTM tile around 15°E, 50°N
    loader
        .set_reference_explicit(ReferenceGrid::new(
            Crs::new("EPSG:4326"),
            GeoTransform::from_origin(14.95, 50.04, 0.001, 0.001),
            100,
            50,
        ))
        .unwrap();
    loader.init().unwrap();

    let key = TimeKey::from_ymd(2024, 1, 1).unwrap();
    assert!(loader.plan(&key).unwrap().is_reprojection());

    let blocks: Vec<_> = loader.blocks().unwrap().map(Result::unwrap).collect();
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|b| b.valid_pixel_count() == 2500));

    // Source columns increase eastward along a reference row
    let row: Vec<f32> = blocks
        .iter()
        .flat_map(|b| (0..50).map(move |c| b.pixel(25, c, 0).unwrap()))
        .collect();
    let source_cols: Vec<u32> = row.iter().map(|v| (*v / 1000.0).floor() as u32).collect();
    assert!(source_cols.windows(2).all(|w| w[0] <= w[1]));
    // 15°E is the zone's central meridian, easting 500 km, source column ~167
    assert!((165..=168).contains(&source_cols[50]), "{}", source_cols[50]);
}

#[test]
fn test_reprojection_partial_coverage() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let size = UTM33_LANDSAT.width;
    write_store(
        temp_dir.path(),
        "20240101.zarr",
        &metadata(&UTM33_LANDSAT, None),
        &create_constant_grid(size, size, 3.0),
    );

    let mut loader = BlockLoader::new(ZarrBackend::new(), BlockSpec::square(100).unwrap());
    loader
        .add_files_from_directory(temp_dir.path(), &daily_rule())
        .unwrap();
    // Wider than the tile in longitude
    loader
        .set_reference_explicit(ReferenceGrid::new(
            Crs::new("EPSG:4326"),
            GeoTransform::from_origin(14.8, 50.04, 0.002, 0.002),
            200,
            20,
        ))
        .unwrap();
    loader.init().unwrap();

    let blocks: Vec<_> = loader.blocks().unwrap().map(Result::unwrap).collect();
    let valid: usize = blocks.iter().map(|b| b.valid_pixel_count()).sum();
    assert!(valid > 0 && valid < 200 * 20, "valid = {valid}");

    let west = &blocks[0];
    assert!(!west.is_valid(10, 0));
    assert!(west.pixel(10, 0, 0).unwrap().is_nan());
    assert_eq!(blocks[1].pixel(10, 0, 0), Some(3.0));
}
