use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Raw integer raster (thermal digital numbers or packed QA bits)
pub type RawBand = Array2<u16>;

/// Surface temperature in degrees Celsius, NaN marks a rejected pixel
pub type TemperatureGrid = Array2<f64>;

/// Per-pixel quality category codes (see [`QualityCategory`])
pub type QualityMask = Array2<u8>;

/// Offset between Kelvin and Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Landsat spacecraft generations with a Collection-2 Level-2 surface temperature product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spacecraft {
    Landsat4,
    Landsat5,
    Landsat7,
    Landsat8,
    Landsat9,
}

impl Spacecraft {
    /// Thermal band that carries the surface temperature product
    pub fn thermal_band(&self) -> u8 {
        match self {
            Spacecraft::Landsat4 | Spacecraft::Landsat5 | Spacecraft::Landsat7 => 6,
            // Landsat 9 TIRS-2 shares the Landsat 8 band layout
            Spacecraft::Landsat8 | Spacecraft::Landsat9 => 10,
        }
    }
}

impl std::str::FromStr for Spacecraft {
    type Err = SstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LANDSAT_4" => Ok(Spacecraft::Landsat4),
            "LANDSAT_5" => Ok(Spacecraft::Landsat5),
            "LANDSAT_7" => Ok(Spacecraft::Landsat7),
            "LANDSAT_8" => Ok(Spacecraft::Landsat8),
            "LANDSAT_9" => Ok(Spacecraft::Landsat9),
            _ => Err(SstError::UnsupportedSpacecraft(s.to_string())),
        }
    }
}

impl std::fmt::Display for Spacecraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Spacecraft::Landsat4 => write!(f, "LANDSAT_4"),
            Spacecraft::Landsat5 => write!(f, "LANDSAT_5"),
            Spacecraft::Landsat7 => write!(f, "LANDSAT_7"),
            Spacecraft::Landsat8 => write!(f, "LANDSAT_8"),
            Spacecraft::Landsat9 => write!(f, "LANDSAT_9"),
        }
    }
}

/// Pixel categories produced by the QA bit decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QualityCategory {
    Land = 0,
    Water = 1,
    CloudShadow = 2,
    Snow = 3,
    Cloud = 4,
    Outside = 5,
}

impl QualityCategory {
    pub const ALL: [QualityCategory; 6] = [
        QualityCategory::Land,
        QualityCategory::Water,
        QualityCategory::CloudShadow,
        QualityCategory::Snow,
        QualityCategory::Cloud,
        QualityCategory::Outside,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// GDAL-style affine geotransform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            top_left_x: coeffs[0],
            pixel_width: coeffs[1],
            rotation_x: coeffs[2],
            top_left_y: coeffs[3],
            rotation_y: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Map coordinate (x, y) of the centre of pixel (row, col)
    pub fn pixel_to_map(&self, row: usize, col: usize) -> (f64, f64) {
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        let x = self.top_left_x + c * self.pixel_width + r * self.rotation_x;
        let y = self.top_left_y + c * self.rotation_y + r * self.pixel_height;
        (x, y)
    }
}

/// Latitude/longitude grids co-registered with the scene rasters
#[derive(Debug, Clone)]
pub struct GeoGrid {
    pub latitude: Array2<f64>,
    pub longitude: Array2<f64>,
}

impl GeoGrid {
    pub fn new(latitude: Array2<f64>, longitude: Array2<f64>) -> SstResult<Self> {
        ensure_same_shape("latitude vs longitude", latitude.dim(), longitude.dim())?;
        Ok(Self { latitude, longitude })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.latitude.dim()
    }
}

/// Error types for SST processing
#[derive(Debug, thiserror::Error)]
pub enum SstError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing metadata key: {0}")]
    MissingKey(String),

    #[error("Unsupported spacecraft: {0}")]
    UnsupportedSpacecraft(String),

    #[error("Shape mismatch ({context}): expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing scene file: {0}")]
    MissingFile(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for SST operations
pub type SstResult<T> = Result<T, SstError>;

/// Fail with [`SstError::ShapeMismatch`] unless both raster shapes agree
pub fn ensure_same_shape(
    context: &str,
    expected: (usize, usize),
    found: (usize, usize),
) -> SstResult<()> {
    if expected != found {
        return Err(SstError::ShapeMismatch {
            context: context.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
