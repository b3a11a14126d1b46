use crate::io::metadata::{temperature_add_key, temperature_mult_key, SceneMetadata};
use crate::types::{Spacecraft, SstResult, TemperatureGrid, KELVIN_OFFSET};
use ndarray::Array2;
use num_traits::AsPrimitive;

/// Linear scaling constants for one thermal band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalCalibration {
    pub spacecraft: Spacecraft,
    pub band: u8,
    /// Kelvin per digital number
    pub slope: f64,
    /// Kelvin at DN = 0
    pub intercept: f64,
}

impl ThermalCalibration {
    /// Select the thermal band for `spacecraft` and look up its constants
    pub fn resolve(spacecraft: Spacecraft, metadata: &SceneMetadata) -> SstResult<Self> {
        let band = spacecraft.thermal_band();
        let slope = metadata.number(&temperature_mult_key(band))?;
        let intercept = metadata.number(&temperature_add_key(band))?;

        log::info!(
            "{}: thermal band {} (slope={}, intercept={})",
            spacecraft, band, slope, intercept
        );

        Ok(Self {
            spacecraft,
            band,
            slope,
            intercept,
        })
    }

    /// Temperature in Celsius for one digital number
    #[inline]
    pub fn to_celsius(&self, dn: f64) -> f64 {
        dn * self.slope + self.intercept - KELVIN_OFFSET
    }
}

/// Digital number to surface temperature converter
pub struct CalibrationProcessor {
    calibration: ThermalCalibration,
}

impl CalibrationProcessor {
    pub fn new(calibration: ThermalCalibration) -> Self {
        Self { calibration }
    }

    /// Build a processor from resolved scene metadata
    pub fn from_metadata(spacecraft: Spacecraft, metadata: &SceneMetadata) -> SstResult<Self> {
        Ok(Self::new(ThermalCalibration::resolve(spacecraft, metadata)?))
    }

    pub fn calibration(&self) -> &ThermalCalibration {
        &self.calibration
    }

    /// Convert raw digital numbers to temperature in Celsius
    ///
    /// No clamping is applied; implausible values are left for the outlier filter.
    pub fn calibrate<T>(&self, raw: &Array2<T>) -> TemperatureGrid
    where
        T: AsPrimitive<f64>,
    {
        let (rows, cols) = raw.dim();
        log::debug!("Calibrating {} x {} thermal band", rows, cols);

        let cal = self.calibration;
        let temperature = raw.mapv(|dn| cal.to_celsius(dn.as_()));

        log_range(&temperature);
        temperature
    }

    /// Parallel calibration using Rayon
    #[cfg(feature = "parallel")]
    pub fn calibrate_parallel<T>(&self, raw: &Array2<T>) -> TemperatureGrid
    where
        T: AsPrimitive<f64> + Send + Sync,
    {
        use ndarray::Zip;

        log::debug!("Calibrating {:?} thermal band in parallel", raw.dim());

        let cal = self.calibration;
        let temperature = Zip::from(raw).par_map_collect(|&dn| cal.to_celsius(dn.as_()));

        log_range(&temperature);
        temperature
    }
}

/// Calibrate `raw` with the band constants `metadata` holds for `spacecraft`
pub fn calibrate<T>(
    raw: &Array2<T>,
    spacecraft: Spacecraft,
    metadata: &SceneMetadata,
) -> SstResult<TemperatureGrid>
where
    T: AsPrimitive<f64>,
{
    Ok(CalibrationProcessor::from_metadata(spacecraft, metadata)?.calibrate(raw))
}

fn log_range(temperature: &TemperatureGrid) {
    if temperature.is_empty() {
        return;
    }
    log::info!(
        "Calibration completed. Output range: {:.2} to {:.2} °C",
        temperature.iter().cloned().fold(f64::INFINITY, f64::min),
        temperature.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    );
}
