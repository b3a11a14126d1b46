use crate::types::{GeoGrid, GeoTransform, RawBand, SstError, SstResult};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::Dataset;
use ndarray::Array2;
use std::path::Path;

/// Single-band integer raster with its georeferencing
#[derive(Debug, Clone)]
pub struct GeoRaster {
    pub data: RawBand,
    pub geo_transform: GeoTransform,
    /// Coordinate system as WKT
    pub projection: String,
}

/// GDAL-backed reader for Landsat GeoTIFF bands
pub struct RasterReader;

impl RasterReader {
    /// Read band 1 of `path` as 16-bit unsigned samples
    pub fn read_u16<P: AsRef<Path>>(path: P) -> SstResult<GeoRaster> {
        log::info!("Reading raster: {}", path.as_ref().display());

        let dataset = Dataset::open(path.as_ref())?;
        let geo_transform = dataset.geo_transform()?;
        let projection = dataset.projection();
        let (width, height) = dataset.raster_size();
        log::debug!("Raster size: {}x{}", width, height);

        let rasterband = dataset.rasterband(1)?;
        let band_data = rasterband.read_as::<u16>((0, 0), (width, height), (width, height), None)?;

        let data = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| SstError::Processing(format!("Failed to reshape raster data: {}", e)))?;

        Ok(GeoRaster {
            data,
            geo_transform: GeoTransform::from_gdal(geo_transform),
            projection,
        })
    }

    /// Latitude/longitude of every pixel centre of a `shape` grid
    pub fn geolocate(
        geo_transform: &GeoTransform,
        projection_wkt: &str,
        shape: (usize, usize),
    ) -> SstResult<GeoGrid> {
        let (rows, cols) = shape;
        log::info!("Geolocating {} x {} grid", rows, cols);

        let source = SpatialRef::from_wkt(projection_wkt)?;
        let target = SpatialRef::from_epsg(4326)?;
        // Keep x=longitude, y=latitude regardless of the EPSG axis order
        source.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
        target.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
        let transform = CoordTransform::new(&source, &target)?;

        let n = rows * cols;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = geo_transform.pixel_to_map(row, col);
                xs.push(x);
                ys.push(y);
            }
        }
        let mut zs = vec![0.0; n];
        transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

        let longitude = Array2::from_shape_vec((rows, cols), xs)
            .map_err(|e| SstError::Processing(format!("Failed to reshape longitude grid: {}", e)))?;
        let latitude = Array2::from_shape_vec((rows, cols), ys)
            .map_err(|e| SstError::Processing(format!("Failed to reshape latitude grid: {}", e)))?;

        GeoGrid::new(latitude, longitude)
    }
}
