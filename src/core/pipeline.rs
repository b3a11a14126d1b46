use crate::core::calibrate::CalibrationProcessor;
use crate::core::outlier::{FilterParams, FilterReport, OutlierFilter};
use crate::core::quality::QualityClassifier;
use crate::io::metadata::SceneMetadata;
use crate::types::{
    ensure_same_shape, GeoGrid, QualityMask, RawBand, Spacecraft, SstResult, TemperatureGrid,
};
use chrono::{DateTime, Utc};
use ndarray::Array2;

/// Quality-controlled surface temperature for one scene
#[derive(Debug, Clone)]
pub struct SstProduct {
    pub acquisition_time: DateTime<Utc>,
    pub spacecraft: Spacecraft,
    pub thermal_band: u8,
    pub latitude: Array2<f64>,
    pub longitude: Array2<f64>,
    /// Degrees Celsius, NaN where rejected
    pub temperature: TemperatureGrid,
    pub quality: QualityMask,
    pub report: FilterReport,
}

impl SstProduct {
    pub fn dim(&self) -> (usize, usize) {
        self.temperature.dim()
    }

    /// Number of pixels carrying a temperature
    pub fn valid_pixels(&self) -> usize {
        self.temperature.iter().filter(|t| !t.is_nan()).count()
    }
}

/// Scene-level driver: calibration, QA decoding and outlier filtering
pub struct SstProcessor {
    params: FilterParams,
    classifier: QualityClassifier,
}

impl Default for SstProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SstProcessor {
    pub fn new() -> Self {
        Self::with_params(FilterParams::default())
    }

    pub fn with_params(params: FilterParams) -> Self {
        Self {
            params,
            classifier: QualityClassifier::new(),
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Process one scene
    ///
    /// Every fatal condition (bad parameters, missing keys, unsupported
    /// spacecraft, raster shape disagreement) is detected before any
    /// temperature is computed.
    pub fn process(
        &self,
        metadata: &SceneMetadata,
        thermal: &RawBand,
        qa: &RawBand,
        geo: GeoGrid,
    ) -> SstResult<SstProduct> {
        let dim = thermal.dim();
        log::info!("Processing scene: {} x {} pixels", dim.0, dim.1);

        self.params.validate()?;
        ensure_same_shape("thermal vs QA", dim, qa.dim())?;
        ensure_same_shape("thermal vs latitude", dim, geo.latitude.dim())?;
        ensure_same_shape("thermal vs longitude", dim, geo.longitude.dim())?;

        let spacecraft = metadata.spacecraft()?;
        let acquisition_time = metadata.acquisition_time()?;
        let calibrator = CalibrationProcessor::from_metadata(spacecraft, metadata)?;
        log::info!("Acquired {} by {}", acquisition_time, spacecraft);

        #[cfg(feature = "parallel")]
        let (mut temperature, quality) = (
            calibrator.calibrate_parallel(thermal),
            self.classifier.classify_parallel(qa),
        );
        #[cfg(not(feature = "parallel"))]
        let (mut temperature, quality) = (calibrator.calibrate(thermal), self.classifier.classify(qa));

        let report = OutlierFilter::with_params(self.params.clone()).apply(&mut temperature, &quality)?;

        Ok(SstProduct {
            acquisition_time,
            spacecraft,
            thermal_band: calibrator.calibration().band,
            latitude: geo.latitude,
            longitude: geo.longitude,
            temperature,
            quality,
            report,
        })
    }

    /// Read, geolocate and process the scene stored in `dir`
    #[cfg(feature = "gdal")]
    pub fn process_directory<P: AsRef<std::path::Path>>(&self, dir: P) -> SstResult<SstProduct> {
        use crate::io::raster::RasterReader;
        use crate::io::scene::SceneFiles;

        let files = SceneFiles::discover(dir.as_ref())?;
        let metadata = SceneMetadata::from_mtl_file(&files.metadata)?;
        let band = metadata.spacecraft()?.thermal_band();

        let thermal = RasterReader::read_u16(files.thermal_band(band)?)?;
        let qa = RasterReader::read_u16(&files.qa_pixel)?;
        let geo = RasterReader::geolocate(&thermal.geo_transform, &thermal.projection, thermal.data.dim())?;

        self.process(&metadata, &thermal.data, &qa.data, geo)
    }
}
