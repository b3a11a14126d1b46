use crate::types::{ensure_same_shape, QualityCategory, QualityMask, SstError, SstResult, TemperatureGrid};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Outlier filtering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterParams {
    /// Keep land pixels alongside water
    pub retrieve_land: bool,
    /// Lower clip percentile (0-100)
    pub percentile_low: f64,
    /// Upper clip percentile (0-100)
    pub percentile_high: f64,
    /// Anything colder than this (°C) is rejected before the percentile clip
    pub floor_celsius: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            retrieve_land: false,
            percentile_low: 2.5,
            percentile_high: 99.0,
            floor_celsius: -60.0,
        }
    }
}

impl FilterParams {
    pub fn with_retrieve_land(mut self, retrieve_land: bool) -> Self {
        self.retrieve_land = retrieve_land;
        self
    }

    pub fn with_percentile_bounds(mut self, low: f64, high: f64) -> Self {
        self.percentile_low = low;
        self.percentile_high = high;
        self
    }

    pub fn percentile_bounds(&self) -> (f64, f64) {
        (self.percentile_low, self.percentile_high)
    }

    pub fn validate(&self) -> SstResult<()> {
        let (low, high) = self.percentile_bounds();
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(low) || !in_range(high) {
            return Err(SstError::InvalidParameter(format!(
                "Percentile bounds must lie in 0..=100, got ({}, {})",
                low, high
            )));
        }
        if low > high {
            return Err(SstError::InvalidParameter(format!(
                "Lower percentile {} exceeds upper percentile {}",
                low, high
            )));
        }
        if self.floor_celsius.is_nan() {
            return Err(SstError::InvalidParameter("Temperature floor is NaN".to_string()));
        }
        Ok(())
    }
}

/// Pixel accounting for one filter run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    pub total_pixels: usize,
    /// Pixels nulled by the category mask
    pub masked_by_category: usize,
    /// Pixels nulled by the physical floor
    pub below_floor: usize,
    /// Non-null pixels entering the percentile clip
    pub valid_before_clip: usize,
    /// Pixels nulled by the percentile clip
    pub clipped: usize,
    /// Temperature at the lower / upper clip percentile, if any pixel survived
    pub clip_bounds: Option<(f64, f64)>,
}

impl FilterReport {
    pub fn valid_after(&self) -> usize {
        self.valid_before_clip - self.clipped
    }

    /// Fraction of clip-stage input removed by the percentile clip
    pub fn clipped_fraction(&self) -> f64 {
        if self.valid_before_clip == 0 {
            0.0
        } else {
            self.clipped as f64 / self.valid_before_clip as f64
        }
    }

    pub fn clipped_percentage(&self) -> f64 {
        100.0 * self.clipped_fraction()
    }
}

/// Outcome of the percentile clip stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipOutcome {
    pub valid: usize,
    pub clipped: usize,
    pub bounds: Option<(f64, f64)>,
}

/// Category, plausibility and percentile filter for temperature grids
pub struct OutlierFilter {
    params: FilterParams,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlierFilter {
    /// Create a filter with default parameters
    pub fn new() -> Self {
        Self {
            params: FilterParams::default(),
        }
    }

    /// Create a filter with custom parameters
    pub fn with_params(params: FilterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Run all three stages in place
    ///
    /// Parameters and shapes are checked before the grid is touched.
    pub fn apply(&self, temperature: &mut TemperatureGrid, quality: &QualityMask) -> SstResult<FilterReport> {
        self.params.validate()?;
        ensure_same_shape("temperature vs quality", temperature.dim(), quality.dim())?;

        log::info!("Filtering temperature grid: {:?}", self.params);

        let masked_by_category = mask_categories(temperature, quality, self.params.retrieve_land);
        log::debug!("Category mask removed {} pixels", masked_by_category);

        let below_floor = apply_floor(temperature, self.params.floor_celsius);
        log::debug!("{} pixels below {} °C", below_floor, self.params.floor_celsius);

        let (low, high) = self.params.percentile_bounds();
        let clip = percentile_clip(temperature, low, high);

        let report = FilterReport {
            total_pixels: temperature.len(),
            masked_by_category,
            below_floor,
            valid_before_clip: clip.valid,
            clipped: clip.clipped,
            clip_bounds: clip.bounds,
        };

        log::info!(
            "Percentile clip removed {} of {} pixels ({:.2}%)",
            report.clipped,
            report.valid_before_clip,
            report.clipped_percentage()
        );

        Ok(report)
    }
}

/// Filter `temperature` in place with the given options
pub fn filter(
    temperature: &mut TemperatureGrid,
    quality: &QualityMask,
    retrieve_land: bool,
    percentile_bounds: (f64, f64),
) -> SstResult<FilterReport> {
    let params = FilterParams::default()
        .with_retrieve_land(retrieve_land)
        .with_percentile_bounds(percentile_bounds.0, percentile_bounds.1);
    OutlierFilter::with_params(params).apply(temperature, quality)
}

/// Whether a pixel of category `code` survives the category mask
#[inline]
pub fn keeps_category(code: u8, retrieve_land: bool) -> bool {
    let water = QualityCategory::Water.code();
    if retrieve_land {
        code <= water
    } else {
        code == water
    }
}

/// Null pixels whose category is rejected; returns how many were newly nulled
pub fn mask_categories(temperature: &mut TemperatureGrid, quality: &QualityMask, retrieve_land: bool) -> usize {
    let mut nulled = 0;
    Zip::from(temperature).and(quality).for_each(|t, &code| {
        if !keeps_category(code, retrieve_land) && !t.is_nan() {
            *t = f64::NAN;
            nulled += 1;
        }
    });
    nulled
}

/// Null pixels colder than `floor`; returns how many were nulled
pub fn apply_floor(temperature: &mut TemperatureGrid, floor: f64) -> usize {
    let mut nulled = 0;
    temperature.map_inplace(|t| {
        if *t < floor {
            *t = f64::NAN;
            nulled += 1;
        }
    });
    nulled
}

/// Null values outside the `[low, high]` percentile range of the non-null values
///
/// An all-null grid is returned untouched.
pub fn percentile_clip(temperature: &mut TemperatureGrid, low: f64, high: f64) -> ClipOutcome {
    let mut values: Vec<f64> = temperature.iter().cloned().filter(|t| !t.is_nan()).collect();

    if values.is_empty() {
        log::warn!("No valid pixels left for percentile clipping");
        return ClipOutcome {
            valid: 0,
            clipped: 0,
            bounds: None,
        };
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        values.par_sort_unstable_by(|a, b| a.total_cmp(b));
    }
    #[cfg(not(feature = "parallel"))]
    values.sort_unstable_by(|a, b| a.total_cmp(b));

    let low_value = percentile_sorted(&values, low);
    let high_value = percentile_sorted(&values, high);
    log::info!(
        "Percentile bounds: p{}={:.3} °C, p{}={:.3} °C",
        low, low_value, high, high_value
    );

    let mut clipped = 0;
    temperature.map_inplace(|t| {
        if *t < low_value || *t > high_value {
            *t = f64::NAN;
            clipped += 1;
        }
    });

    ClipOutcome {
        valid: values.len(),
        clipped,
        bounds: Some((low_value, high_value)),
    }
}

/// Percentile `p` (0-100) of sorted values, linear between closest ranks
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let pos = (n as f64 - 1.0) * (p / 100.0);
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let t = pos - lo as f64;
    // Exact when both ranks hold the same value
    sorted[lo] + (sorted[hi] - sorted[lo]) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    const LAND: u8 = 0;
    const WATER: u8 = 1;
    const SHADOW: u8 = 2;
    const SNOW: u8 = 3;
    const CLOUD: u8 = 4;
    const OUTSIDE: u8 = 5;

    #[test]
    fn test_water_only_mask() {
        let mut temps = Array2::from_elem((1, 6), 15.0);
        let quality = array![[LAND, WATER, SHADOW, SNOW, CLOUD, OUTSIDE]];
        let nulled = mask_categories(&mut temps, &quality, false);
        assert_eq!(nulled, 5);
        for (t, &q) in temps.iter().zip(quality.iter()) {
            assert_eq!(!t.is_nan(), q == WATER);
        }
    }

    #[test]
    fn test_land_and_water_mask() {
        let mut temps = Array2::from_elem((1, 6), 15.0);
        let quality = array![[LAND, WATER, SHADOW, SNOW, CLOUD, OUTSIDE]];
        let nulled = mask_categories(&mut temps, &quality, true);
        assert_eq!(nulled, 4);
        for (t, &q) in temps.iter().zip(quality.iter()) {
            assert_eq!(!t.is_nan(), q <= WATER);
        }
    }

    #[test]
    fn test_masking_is_idempotent() {
        let quality = array![[LAND, WATER, CLOUD], [WATER, SNOW, OUTSIDE]];
        for retrieve_land in [false, true] {
            let mut once = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
            mask_categories(&mut once, &quality, retrieve_land);
            let mut twice = once.clone();
            assert_eq!(mask_categories(&mut twice, &quality, retrieve_land), 0);
            for (a, b) in once.iter().zip(twice.iter()) {
                assert!(a == b || (a.is_nan() && b.is_nan()));
            }
        }
    }

    #[test]
    fn test_floor_rejects_implausible() {
        let mut temps = array![[-70.0, -60.0, -59.9, f64::NAN]];
        assert_eq!(apply_floor(&mut temps, -60.0), 1);
        assert!(temps[[0, 0]].is_nan());
        assert_eq!(temps[[0, 1]], -60.0);
        assert_eq!(temps[[0, 2]], -59.9);
    }

    #[test]
    fn test_percentile_linear() {
        let sorted = [-10.0, 0.0, 5.0, 10.0, 50.0];
        assert_relative_eq!(percentile_sorted(&sorted, 2.5), -9.0, epsilon = 1e-9);
        assert_relative_eq!(percentile_sorted(&sorted, 99.0), 48.4, epsilon = 1e-9);
        assert_eq!(percentile_sorted(&sorted, 0.0), -10.0);
        assert_eq!(percentile_sorted(&sorted, 100.0), 50.0);
        assert_eq!(percentile_sorted(&sorted, 50.0), 5.0);
        assert_eq!(percentile_sorted(&[3.0], 99.0), 3.0);
        assert!(percentile_sorted(&[], 50.0).is_nan());
    }

    #[test]
    fn test_floor_runs_before_percentiles() {
        let mut temps = array![[-70.0, -10.0, 0.0, 5.0, 10.0, 50.0]];
        let quality = Array2::from_elem((1, 6), WATER);
        let report = filter(&mut temps, &quality, false, (2.5, 99.0)).unwrap();

        assert_eq!(report.masked_by_category, 0);
        assert_eq!(report.below_floor, 1);
        assert_eq!(report.valid_before_clip, 5);
        assert_eq!(report.clipped, 2);
        assert_eq!(report.valid_after(), 3);
        assert_relative_eq!(report.clipped_percentage(), 40.0, epsilon = 1e-9);

        let (lo, hi) = report.clip_bounds.unwrap();
        assert_relative_eq!(lo, -9.0, epsilon = 1e-9);
        assert_relative_eq!(hi, 48.4, epsilon = 1e-9);

        assert!(temps[[0, 0]].is_nan());
        assert!(temps[[0, 1]].is_nan());
        assert_eq!(temps[[0, 2]], 0.0);
        assert_eq!(temps[[0, 3]], 5.0);
        assert_eq!(temps[[0, 4]], 10.0);
        assert!(temps[[0, 5]].is_nan());
    }

    #[test]
    fn test_inclusive_bounds_kept() {
        let mut temps = array![[1.0, 2.0, 3.0, 4.0]];
        let outcome = percentile_clip(&mut temps, 0.0, 100.0);
        assert_eq!(outcome.clipped, 0);
        assert_eq!(outcome.bounds, Some((1.0, 4.0)));
        assert!(temps.iter().all(|t| !t.is_nan()));
    }

    #[test]
    fn test_all_null_short_circuits() {
        let mut temps = Array2::from_elem((3, 3), f64::NAN);
        let outcome = percentile_clip(&mut temps, 2.5, 99.0);
        assert_eq!(outcome, ClipOutcome { valid: 0, clipped: 0, bounds: None });
        assert!(temps.iter().all(|t| t.is_nan()));

        // Everything cloudy: nothing reaches the clip stage
        let mut temps = Array2::from_elem((2, 2), 20.0);
        let quality = Array2::from_elem((2, 2), CLOUD);
        let report = filter(&mut temps, &quality, false, (2.5, 99.0)).unwrap();
        assert_eq!(report.valid_before_clip, 0);
        assert_eq!(report.clipped_fraction(), 0.0);
        assert!(report.clip_bounds.is_none());
    }

    #[test]
    fn test_shape_mismatch_leaves_grid_untouched() {
        let mut temps = Array2::from_elem((2, 3), 20.0);
        let quality = Array2::from_elem((3, 2), LAND);
        let err = filter(&mut temps, &quality, false, (2.5, 99.0)).unwrap_err();
        assert!(matches!(err, SstError::ShapeMismatch { .. }));
        assert!(temps.iter().all(|&t| t == 20.0));
    }

    #[test]
    fn test_invalid_bounds() {
        let mut temps = Array2::from_elem((2, 2), 20.0);
        let quality = Array2::from_elem((2, 2), WATER);
        assert!(matches!(
            filter(&mut temps, &quality, false, (99.0, 2.5)),
            Err(SstError::InvalidParameter(_))
        ));
        assert!(matches!(
            filter(&mut temps, &quality, false, (-1.0, 99.0)),
            Err(SstError::InvalidParameter(_))
        ));
        assert!(temps.iter().all(|&t| t == 20.0));
    }

    #[test]
    fn test_default_params() {
        let params = FilterParams::default();
        assert!(!params.retrieve_land);
        assert_eq!(params.percentile_bounds(), (2.5, 99.0));
        assert_eq!(params.floor_celsius, -60.0);
        assert!(params.validate().is_ok());
    }
}
