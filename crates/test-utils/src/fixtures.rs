//! Common test fixtures for block loader tests.
//!
//! This module provides pre-defined grids and helpers that represent common
//! scenarios in raster time-series processing.

use std::path::{Path, PathBuf};

/// Common grid specifications for testing.
pub mod grid {
    /// North-up grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub crs: &'static str,
        pub width: usize,
        pub height: usize,
        /// X of the top-left corner.
        pub left: f64,
        /// Y of the top-left corner.
        pub top: f64,
        pub res_x: f64,
        pub res_y: f64,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.width * self.height
        }

        /// GDAL-ordered geotransform coefficients.
        pub fn geo_transform(&self) -> [f64; 6] {
            [self.left, self.res_x, 0.0, self.top, 0.0, -self.res_y]
        }

        /// Returns the bounds as (min_x, min_y, max_x, max_y).
        pub fn bounds(&self) -> (f64, f64, f64, f64) {
            (
                self.left,
                self.top - self.height as f64 * self.res_y,
                self.left + self.width as f64 * self.res_x,
                self.top,
            )
        }
    }

    /// Simple 10x10 geographic grid, one degree pixels
    pub const SIMPLE_10X10: GridSpec = GridSpec {
        crs: "EPSG:4326",
        width: 10,
        height: 10,
        left: 0.0,
        top: 10.0,
        res_x: 1.0,
        res_y: 1.0,
    };

    /// 150x150 grid; 100-pixel blocks leave partial edge blocks
    pub const EDGE_150: GridSpec = GridSpec {
        crs: "EPSG:4326",
        width: 150,
        height: 150,
        left: 10.0,
        top: 50.0,
        res_x: 0.01,
        res_y: 0.01,
    };

    /// 10 km square in UTM zone 33N at 30 m resolution (Landsat-like)
    pub const UTM33_LANDSAT: GridSpec = GridSpec {
        crs: "EPSG:32633",
        width: 334,
        height: 334,
        left: 495_000.0,
        top: 5_545_000.0,
        res_x: 30.0,
        res_y: 30.0,
    };

    /// Web Mercator tile-sized grid over central Europe
    pub const MERCATOR_256: GridSpec = GridSpec {
        crs: "EPSG:3857",
        width: 256,
        height: 256,
        left: 1_500_000.0,
        top: 6_500_000.0,
        res_x: 100.0,
        res_y: 100.0,
    };
}

/// Common time values for testing.
pub mod time {
    /// Daily acquisition dates used as file-name stems
    pub const DAILY_STEMS: [&str; 3] = ["20240101", "20240102", "20240103"];

    /// Date format matching [`DAILY_STEMS`]
    pub const DAILY_FORMAT: &str = "%Y%m%d";

    /// Sub-daily scene names with embedded timestamps
    pub const SCENE_NAMES: [&str; 2] = ["scn_20230704T1130.zarr", "scn_20230704T1545.zarr"];
}

/// Common CRS identifiers.
pub mod crs {
    /// WGS84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";

    /// Web Mercator
    pub const EPSG_3857: &str = "EPSG:3857";

    /// WGS84 / UTM zone 33N
    pub const EPSG_32633: &str = "EPSG:32633";

    /// An identifier no projection supports
    pub const LOCAL: &str = "LOCAL:SITE-GRID";
}

/// Create an empty file named `name` inside `dir`.
pub fn touch_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").expect("Failed to create fixture file");
    path
}

/// Create an empty directory named `name` inside `dir`.
pub fn touch_dir(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(&path).expect("Failed to create fixture directory");
    path
}

/// Create a temporary directory holding one empty entry per name.
pub fn temp_dir_with_entries(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for name in names {
        touch_dir(dir.path(), name);
    }
    dir
}
