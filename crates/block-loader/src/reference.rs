//! Resolving the reference grid every block is expressed in.

use std::collections::HashMap;

use projection::CrsTransform;
use raster_common::{BoundingBox, Crs, GeoTransform, TimeKey};
use raster_io::RasterBackend;

use crate::error::{LoaderError, Result};
use crate::registry::SourceRegistry;
use crate::types::ReferenceGrid;

/// Edge samples used when projecting a source extent.
const DENSIFY_SEGMENTS: usize = 21;

/// Extents are rounded up to whole pixels, ignoring float noise below this.
const PIXEL_EPSILON: f64 = 1e-9;

/// Adopt the native grid of the source registered under `time_key`.
pub fn reference_from_source<B: RasterBackend>(
    registry: &SourceRegistry,
    backend: &B,
    time_key: TimeKey,
) -> Result<ReferenceGrid> {
    let source = registry
        .get(&time_key)
        .ok_or(LoaderError::UnknownTimeKey { time_key })?;
    let grid = ReferenceGrid::from_metadata(source.metadata(backend)?);
    grid.validate()?;
    Ok(grid)
}

/// Derive a grid covering every registered source.
///
/// The CRS is the one most sources share (ties go to the earliest source),
/// the extent is the union of all source extents in that CRS, and the pixel
/// size is taken from the earliest source already in that CRS.
pub fn derive_reference<B: RasterBackend>(
    registry: &SourceRegistry,
    backend: &B,
) -> Result<ReferenceGrid> {
    if registry.is_empty() {
        return Err(LoaderError::NoSources);
    }

    let mut native = Vec::with_capacity(registry.len());
    for source in registry.sources() {
        native.push((source.time_key(), source.metadata(backend)?));
    }

    // (count, earliest position) per CRS
    let mut votes: HashMap<&Crs, (usize, usize)> = HashMap::new();
    for (position, (_, meta)) in native.iter().enumerate() {
        votes.entry(&meta.crs).or_insert((0, position)).0 += 1;
    }
    let target = votes
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(crs, _)| (*crs).clone())
        .ok_or(LoaderError::NoSources)?;

    let mut extent: Option<BoundingBox> = None;
    for (time_key, meta) in &native {
        let bounds = if meta.crs == target {
            meta.bounds()
        } else {
            let transform = CrsTransform::new(&meta.crs, &target).map_err(|source| {
                LoaderError::Projection {
                    time_key: *time_key,
                    source,
                }
            })?;
            match transform.transform_bounds(&meta.bounds(), DENSIFY_SEGMENTS) {
                Some(bounds) => bounds,
                None => {
                    tracing::warn!(
                        time_key = %time_key,
                        crs = %meta.crs,
                        target = %target,
                        "Source extent does not project into target CRS; ignoring it"
                    );
                    continue;
                }
            }
        };
        extent = Some(match extent {
            Some(e) => e.union(&bounds),
            None => bounds,
        });
    }
    let extent = extent.ok_or_else(|| {
        LoaderError::InvalidReference(format!("no source extent projects into {target}"))
    })?;

    let (res_x, res_y) = native
        .iter()
        .find(|(_, meta)| meta.crs == target)
        .map(|(_, meta)| meta.transform.resolution())
        .ok_or_else(|| LoaderError::InvalidReference(format!("no source in {target}")))?;

    let width = pixel_count(extent.width(), res_x);
    let height = pixel_count(extent.height(), res_y);

    let grid = ReferenceGrid::new(
        target,
        GeoTransform::from_origin(extent.min_x, extent.max_y, res_x, res_y),
        width,
        height,
    );
    grid.validate()?;

    tracing::info!(
        crs = %grid.crs,
        width = grid.width,
        height = grid.height,
        res_x,
        res_y,
        "Derived reference grid from {} sources",
        native.len()
    );

    Ok(grid)
}

fn pixel_count(extent: f64, resolution: f64) -> usize {
    if !(resolution > 0.0) || !extent.is_finite() {
        return 0;
    }
    (extent / resolution - PIXEL_EPSILON).ceil().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_io::{MemoryBackend, MemoryRaster, RasterMetadata};
    use test_utils::temp_dir_with_entries;

    fn meta(crs: &str, left: f64, top: f64, res: f64, width: usize, height: usize) -> RasterMetadata {
        RasterMetadata {
            crs: Crs::new(crs),
            transform: GeoTransform::from_origin(left, top, res, res),
            width,
            height,
            bands: 1,
            nodata: None,
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: SourceRegistry,
        backend: MemoryBackend,
    }

    fn fixture(rasters: Vec<RasterMetadata>) -> Fixture {
        let names: Vec<String> = (0..rasters.len()).map(|i| format!("{i}.zarr")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = temp_dir_with_entries(&name_refs);
        let backend = MemoryBackend::new();
        let mut registry = SourceRegistry::new();
        for (i, m) in rasters.into_iter().enumerate() {
            let path = dir.path().join(&names[i]);
            let len = m.width * m.height * m.bands;
            backend.insert(&path, MemoryRaster::new(m, vec![0.0; len]).unwrap());
            registry
                .add_source(TimeKey::from_ymd(2024, 1, i as u32 + 1).unwrap(), &path)
                .unwrap();
        }
        Fixture {
            _dir: dir,
            registry,
            backend,
        }
    }

    #[test]
    fn test_reference_from_source() {
        let f = fixture(vec![meta("EPSG:4326", 0.0, 10.0, 0.5, 20, 20)]);
        let key = TimeKey::from_ymd(2024, 1, 1).unwrap();
        let grid = reference_from_source(&f.registry, &f.backend, key).unwrap();
        assert_eq!(grid.width, 20);
        assert_eq!(grid.transform, GeoTransform::from_origin(0.0, 10.0, 0.5, 0.5));

        let missing = TimeKey::from_ymd(2030, 1, 1).unwrap();
        assert!(matches!(
            reference_from_source(&f.registry, &f.backend, missing),
            Err(LoaderError::UnknownTimeKey { .. })
        ));
    }

    #[test]
    fn test_reference_from_unreadable_source() {
        let dir = temp_dir_with_entries(&["x.zarr"]);
        let mut registry = SourceRegistry::new();
        let key = TimeKey::from_ymd(2024, 1, 1).unwrap();
        registry.add_source(key, dir.path().join("x.zarr")).unwrap();
        let err = reference_from_source(&registry, &MemoryBackend::new(), key).unwrap_err();
        assert!(matches!(err, LoaderError::Metadata { .. }));
    }

    #[test]
    fn test_derive_union_of_same_crs_sources() {
        let f = fixture(vec![
            meta("EPSG:4326", 0.0, 10.0, 1.0, 10, 10),
            meta("EPSG:4326", 5.0, 12.0, 2.0, 4, 4),
        ]);
        let grid = derive_reference(&f.registry, &f.backend).unwrap();
        assert_eq!(grid.crs, Crs::new("EPSG:4326"));
        // union: x 0..13, y 0..12 at the earliest source's 1-degree pixels
        assert_eq!(grid.transform, GeoTransform::from_origin(0.0, 12.0, 1.0, 1.0));
        assert_eq!((grid.width, grid.height), (13, 12));
    }

    #[test]
    fn test_derive_rounds_partial_pixels_up() {
        let f = fixture(vec![
            meta("EPSG:4326", 0.0, 10.0, 1.0, 10, 10),
            meta("EPSG:4326", 9.5, 10.0, 0.5, 2, 1),
        ]);
        let grid = derive_reference(&f.registry, &f.backend).unwrap();
        // x extent 0..10.5 needs 11 one-degree pixels
        assert_eq!(grid.width, 11);
        assert_eq!(grid.height, 10);
    }

    #[test]
    fn test_derive_majority_crs() {
        let f = fixture(vec![
            meta("EPSG:4326", 14.0, 46.0, 0.01, 100, 100),
            meta("EPSG:32633", 500_000.0, 5_100_000.0, 30.0, 100, 100),
            meta("EPSG:32633", 503_000.0, 5_100_000.0, 60.0, 50, 50),
        ]);
        let grid = derive_reference(&f.registry, &f.backend).unwrap();
        assert_eq!(grid.crs, Crs::new("EPSG:32633"));
        assert_eq!(grid.transform.resolution(), (30.0, 30.0));
        // Geographic source around 14-15°E, 45-46°N lands west of the UTM tiles
        assert!(grid.transform.origin_x < 500_000.0);
    }

    #[test]
    fn test_derive_tie_goes_to_earliest() {
        let f = fixture(vec![
            meta("EPSG:3857", 1_600_000.0, 5_800_000.0, 100.0, 10, 10),
            meta("EPSG:4326", 14.0, 46.0, 0.01, 10, 10),
        ]);
        let grid = derive_reference(&f.registry, &f.backend).unwrap();
        assert_eq!(grid.crs, Crs::new("EPSG:3857"));
    }

    #[test]
    fn test_derive_unsupported_crs() {
        let f = fixture(vec![
            meta("LOCAL:A", 0.0, 10.0, 1.0, 10, 10),
            meta("LOCAL:A", 0.0, 10.0, 1.0, 10, 10),
            meta("EPSG:4326", 0.0, 10.0, 1.0, 10, 10),
        ]);
        let err = derive_reference(&f.registry, &f.backend).unwrap_err();
        assert!(matches!(err, LoaderError::Projection { .. }));
    }
}
