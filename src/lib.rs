//! landsat-sst: sea-surface temperature retrieval from Landsat Collection-2 Level-2 scenes
//!
//! The surface temperature band is converted to degrees Celsius, pixels are
//! classified from the QA_PIXEL bit field, and everything except clear water
//! (optionally land) is rejected before a percentile clip removes outliers.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    GeoGrid, GeoTransform, QualityCategory, QualityMask, RawBand, Spacecraft, SstError,
    SstResult, TemperatureGrid,
};

pub use io::{MetadataValue, SceneFiles, SceneMetadata};
pub use crate::core::{
    CalibrationProcessor, FilterParams, FilterReport, OutlierFilter, QualityClassifier,
    SstProcessor, SstProduct,
};

#[cfg(feature = "python")]
mod python {
    use crate::core::{calibrate, outlier, quality};
    use crate::io::SceneMetadata;
    use crate::types::SstError;
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;

    fn to_py_err(e: SstError) -> PyErr {
        match e {
            SstError::InvalidParameter(_)
            | SstError::ShapeMismatch { .. }
            | SstError::UnsupportedSpacecraft(_) => PyValueError::new_err(e.to_string()),
            _ => PyRuntimeError::new_err(e.to_string()),
        }
    }

    /// Decode a QA_PIXEL array into quality categories
    #[pyfunction]
    fn classify_quality<'py>(py: Python<'py>, qa: PyReadonlyArray2<'py, u16>) -> &'py PyArray2<u8> {
        quality::classify(&qa.as_array().to_owned()).into_pyarray(py)
    }

    /// Convert surface temperature digital numbers to Celsius using MTL text
    #[pyfunction]
    fn calibrate_thermal<'py>(
        py: Python<'py>,
        dn: PyReadonlyArray2<'py, u16>,
        mtl_text: &str,
    ) -> PyResult<&'py PyArray2<f64>> {
        let metadata = SceneMetadata::from_mtl_text(mtl_text).map_err(to_py_err)?;
        let spacecraft = metadata.spacecraft().map_err(to_py_err)?;
        let temperature = calibrate::calibrate(&dn.as_array().to_owned(), spacecraft, &metadata)
            .map_err(to_py_err)?;
        Ok(temperature.into_pyarray(py))
    }

    /// Filter a temperature array; returns the filtered copy and the clipped percentage
    #[pyfunction]
    #[pyo3(signature = (temperature, quality, retrieve_land=false, low=2.5, high=99.0))]
    fn filter_temperature<'py>(
        py: Python<'py>,
        temperature: PyReadonlyArray2<'py, f64>,
        quality: PyReadonlyArray2<'py, u8>,
        retrieve_land: bool,
        low: f64,
        high: f64,
    ) -> PyResult<(&'py PyArray2<f64>, f64)> {
        let mut filtered = temperature.as_array().to_owned();
        let report = outlier::filter(
            &mut filtered,
            &quality.as_array().to_owned(),
            retrieve_land,
            (low, high),
        )
        .map_err(to_py_err)?;
        Ok((filtered.into_pyarray(py), report.clipped_percentage()))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(classify_quality, m)?)?;
        m.add_function(wrap_pyfunction!(calibrate_thermal, m)?)?;
        m.add_function(wrap_pyfunction!(filter_temperature, m)?)?;
        Ok(())
    }
}
