//! I/O modules for reading Landsat scene metadata, files and rasters

pub mod metadata;
pub mod scene;
#[cfg(feature = "gdal")]
pub mod raster;

pub use metadata::{MetadataValue, SceneMetadata};
pub use scene::SceneFiles;
#[cfg(feature = "gdal")]
pub use raster::{GeoRaster, RasterReader};
