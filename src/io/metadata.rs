use crate::types::{Spacecraft, SstError, SstResult};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

pub const SPACECRAFT_ID: &str = "SPACECRAFT_ID";
pub const DATE_ACQUIRED: &str = "DATE_ACQUIRED";
pub const SCENE_CENTER_TIME: &str = "SCENE_CENTER_TIME";

/// Key holding the surface temperature scale factor for `band`
pub fn temperature_mult_key(band: u8) -> String {
    format!("TEMPERATURE_MULT_BAND_ST_B{}", band)
}

/// Key holding the surface temperature offset for `band`
pub fn temperature_add_key(band: u8) -> String {
    format!("TEMPERATURE_ADD_BAND_ST_B{}", band)
}

/// A single metadata value, numeric when the text parses as a number
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl MetadataValue {
    /// Interpret raw MTL text, falling back to text on any parse failure
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches('"');
        match trimmed.parse::<f64>() {
            Ok(value) => MetadataValue::Number(value),
            Err(_) => MetadataValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(v) => Some(*v),
            MetadataValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Number(_) => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Number(v) => write!(f, "{}", v),
            MetadataValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Resolved key/value pairs from a Landsat `_MTL.txt` file
#[derive(Debug, Clone, Default)]
pub struct SceneMetadata {
    values: HashMap<String, MetadataValue>,
}

impl SceneMetadata {
    /// Extract `keys` from MTL text; every key must be present
    pub fn parse(text: &str, keys: &[&str]) -> SstResult<Self> {
        let mut values = HashMap::with_capacity(keys.len());

        for &key in keys {
            let raw = extract_mtl_value(text, key)?
                .ok_or_else(|| SstError::MissingKey(key.to_string()))?;
            let value = MetadataValue::from_raw(&raw);
            log::debug!("{} = {}", key, value);
            values.insert(key.to_string(), value);
        }

        Ok(Self { values })
    }

    /// Resolve every key the temperature pipeline needs
    ///
    /// The calibration keys depend on the thermal band, so the spacecraft
    /// identity is resolved first and the band-specific keys second.
    pub fn from_mtl_text(text: &str) -> SstResult<Self> {
        let mut metadata = Self::parse(text, &[SPACECRAFT_ID, DATE_ACQUIRED, SCENE_CENTER_TIME])?;
        let band = metadata.spacecraft()?.thermal_band();

        let mult_key = temperature_mult_key(band);
        let add_key = temperature_add_key(band);
        let calibration = Self::parse(text, &[mult_key.as_str(), add_key.as_str()])?;
        metadata.values.extend(calibration.values);

        log::info!(
            "Resolved {} metadata keys for {} (thermal band {})",
            metadata.len(),
            metadata.spacecraft()?,
            band
        );
        Ok(metadata)
    }

    /// Read and resolve an MTL file from disk
    pub fn from_mtl_file<P: AsRef<Path>>(path: P) -> SstResult<Self> {
        log::info!("Reading scene metadata: {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_mtl_text(&text)
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All resolved entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn number(&self, key: &str) -> SstResult<f64> {
        let value = self.get(key).ok_or_else(|| SstError::MissingKey(key.to_string()))?;
        value.as_number().ok_or_else(|| {
            SstError::Metadata(format!("{} is not numeric: {}", key, value))
        })
    }

    /// Value of `key` as text; numeric values are rendered back to text
    pub fn text(&self, key: &str) -> SstResult<String> {
        match self.get(key) {
            Some(MetadataValue::Text(s)) => Ok(s.clone()),
            Some(MetadataValue::Number(v)) => Ok(v.to_string()),
            None => Err(SstError::MissingKey(key.to_string())),
        }
    }

    pub fn spacecraft(&self) -> SstResult<Spacecraft> {
        self.text(SPACECRAFT_ID)?.parse()
    }

    /// Acquisition instant combined from `DATE_ACQUIRED` and `SCENE_CENTER_TIME`
    pub fn acquisition_time(&self) -> SstResult<DateTime<Utc>> {
        let date_str = self.text(DATE_ACQUIRED)?;
        let time_str = self.text(SCENE_CENTER_TIME)?;

        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            SstError::Metadata(format!("Invalid {} '{}': {}", DATE_ACQUIRED, date_str, e))
        })?;

        let time_clean = time_str.trim_end_matches('Z');
        let time = NaiveTime::parse_from_str(time_clean, "%H:%M:%S%.f").map_err(|e| {
            SstError::Metadata(format!("Invalid {} '{}': {}", SCENE_CENTER_TIME, time_str, e))
        })?;

        Ok(Utc.from_utc_datetime(&date.and_time(time)))
    }
}

/// Extract the text following `KEY = ` up to the end of its line
fn extract_mtl_value(text: &str, key: &str) -> SstResult<Option<String>> {
    // Key must start a token so that `ID` does not match inside `SPACECRAFT_ID`
    let pattern = format!(r"(?m)(?:^|\s){} = ([^\r\n]*)", regex::escape(key));
    let re = Regex::new(&pattern)
        .map_err(|e| SstError::Metadata(format!("Invalid pattern for key {}: {}", key, e)))?;
    Ok(re.captures(text).map(|cap| cap[1].trim().to_string()))
}
