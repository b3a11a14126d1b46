use landsat_sst::core::outlier;
use landsat_sst::{
    FilterParams, GeoGrid, QualityCategory, SceneMetadata, Spacecraft, SstError, SstProcessor,
};
use ndarray::Array2;

const L7_MTL: &str = r#"GROUP = LANDSAT_METADATA_FILE
  GROUP = IMAGE_ATTRIBUTES
    SPACECRAFT_ID = "LANDSAT_7"
    SENSOR_ID = "ETM"
    DATE_ACQUIRED = 2003-05-01
    SCENE_CENTER_TIME = "15:01:02.0000000Z"
  END_GROUP = IMAGE_ATTRIBUTES
  GROUP = LEVEL2_SURFACE_TEMPERATURE_PARAMETERS
    TEMPERATURE_MULT_BAND_ST_B6 = 0.00341802
    TEMPERATURE_ADD_BAND_ST_B6 = 149.0
  END_GROUP = LEVEL2_SURFACE_TEMPERATURE_PARAMETERS
END_GROUP = LANDSAT_METADATA_FILE
END
"#;

const WATER: u16 = 1 << 7;
const LAND: u16 = 1 << 6; // clear bit only
const CLOUD: u16 = 1 << 3;
const SHADOW: u16 = 1 << 4;
const FILL: u16 = 1;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// DN for a temperature in Celsius under the standard Level-2 scaling
fn dn_for(celsius: f64) -> u16 {
    ((celsius + 273.15 - 149.0) / 0.00341802).round() as u16
}

/// 20 x 20 scene: left half water, right half land, a cloud block and a fill border row
fn synthetic_scene() -> (Array2<u16>, Array2<u16>, GeoGrid) {
    let (rows, cols) = (20, 20);
    let thermal = Array2::from_shape_fn((rows, cols), |(i, j)| dn_for(10.0 + 0.05 * (i * cols + j) as f64));
    let qa = Array2::from_shape_fn((rows, cols), |(i, j)| {
        if i == 0 {
            FILL
        } else if (5..8).contains(&i) && (2..6).contains(&j) {
            CLOUD
        } else if i == 9 && j < 10 {
            SHADOW | CLOUD
        } else if j < 10 {
            WATER
        } else {
            LAND
        }
    });
    let lat = Array2::from_shape_fn((rows, cols), |(i, _)| 45.0 - i as f64 * 0.01);
    let lon = Array2::from_shape_fn((rows, cols), |(_, j)| -60.0 + j as f64 * 0.01);
    (thermal, qa, GeoGrid::new(lat, lon).unwrap())
}

#[test]
fn test_water_only_scene() {
    init_logging();
    let metadata = SceneMetadata::from_mtl_text(L7_MTL).unwrap();
    let (thermal, qa, geo) = synthetic_scene();
    let lat_before = geo.latitude.clone();

    let product = SstProcessor::new().process(&metadata, &thermal, &qa, geo).unwrap();

    assert_eq!(product.spacecraft, Spacecraft::Landsat7);
    assert_eq!(product.thermal_band, 6);
    assert_eq!(product.latitude, lat_before);

    for (t, &q) in product.temperature.iter().zip(product.quality.iter()) {
        if !t.is_nan() {
            assert_eq!(q, QualityCategory::Water.code());
        }
    }

    assert_eq!(product.quality[[0, 3]], QualityCategory::Outside.code());
    assert_eq!(product.quality[[6, 3]], QualityCategory::Cloud.code());
    assert_eq!(product.quality[[9, 3]], QualityCategory::CloudShadow.code());

    // Water rows 1..20 minus the cloud block and the shadow row
    let water = 19 * 10 - 12 - 10;
    assert_eq!(product.report.valid_before_clip, water);
    assert_eq!(product.valid_pixels(), water - product.report.clipped);
    assert!(product.report.clipped > 0);
}

#[test]
fn test_retrieve_land_scene() {
    init_logging();
    let metadata = SceneMetadata::from_mtl_text(L7_MTL).unwrap();
    let (thermal, qa, geo) = synthetic_scene();
    let params = FilterParams::default().with_retrieve_land(true);

    let product = SstProcessor::with_params(params).process(&metadata, &thermal, &qa, geo).unwrap();

    for (t, &q) in product.temperature.iter().zip(product.quality.iter()) {
        if !t.is_nan() {
            assert!(q <= QualityCategory::Water.code());
        }
    }
    assert_eq!(product.report.valid_before_clip, 19 * 20 - 12 - 10);
}

#[test]
fn test_unsupported_spacecraft() {
    let text = L7_MTL.replace("LANDSAT_7", "LANDSAT_3");
    assert!(matches!(
        SceneMetadata::from_mtl_text(&text),
        Err(SstError::UnsupportedSpacecraft(_))
    ));
}

#[test]
fn test_mismatched_bundle_rejected() {
    let metadata = SceneMetadata::from_mtl_text(L7_MTL).unwrap();
    let (thermal, _, geo) = synthetic_scene();
    let qa = Array2::from_elem((20, 19), WATER);
    let err = SstProcessor::new().process(&metadata, &thermal, &qa, geo).unwrap_err();
    assert!(matches!(err, SstError::ShapeMismatch { .. }));
}

#[test]
fn test_invalid_bounds_rejected_before_processing() {
    let metadata = SceneMetadata::from_mtl_text(L7_MTL).unwrap();
    let (thermal, qa, geo) = synthetic_scene();
    let params = FilterParams::default().with_percentile_bounds(50.0, 120.0);
    let err = SstProcessor::with_params(params).process(&metadata, &thermal, &qa, geo).unwrap_err();
    assert!(matches!(err, SstError::InvalidParameter(_)));
}

#[test]
fn test_reference_clip_example() {
    let mut temps = Array2::from_shape_vec((2, 3), vec![-70.0, -10.0, 0.0, 5.0, 10.0, 50.0]).unwrap();
    let quality = Array2::from_elem((2, 3), QualityCategory::Water.code());

    let report = outlier::filter(&mut temps, &quality, false, (2.5, 99.0)).unwrap();

    let nulled = temps.iter().filter(|t| t.is_nan()).count();
    assert_eq!(report.below_floor, 1);
    assert_eq!(report.clipped, nulled - report.below_floor);
    assert_eq!(report.clipped, 2);
}
