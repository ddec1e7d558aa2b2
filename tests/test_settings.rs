mod common;

use common::*;
use potholes::DetectError;
use potholes::config::{ScoringMode, StrategyKind};
use std::io::Write;

fn settings_file(contents: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_load_partial_settings() -> anyhow::Result<()> {
    let file = settings_file(
        r#"{
            "detector": { "min_area_px": 100, "strategies": ["global_histogram"], "scoring": "keypoint_only" },
            "center": { "center_frac": 0.5 }
        }"#,
    )?;
    let settings = Settings::from_file(file.path())?;

    assert_eq!(settings.detector.min_area_px, 100);
    assert_eq!(settings.detector.strategies, vec![StrategyKind::GlobalHistogram]);
    assert_eq!(settings.detector.scoring, ScoringMode::KeypointOnly);
    assert_eq!(settings.detector.confidence_threshold, 0.5);
    assert_eq!(settings.center.center_frac, 0.5);
    assert_eq!(settings.center.rim_width_px, 10);
    Ok(())
}

#[test]
fn test_loaded_settings_drive_detection() -> anyhow::Result<()> {
    let file = settings_file(r#"{ "detector": { "min_area_px": 5000 } }"#)?;
    let settings = Settings::from_file(file.path())?;
    let detection = DetectorKind::Fused.run(&black_square(), &settings)?;
    assert_eq!(detection, Detection::none());
    Ok(())
}

#[test]
fn test_unknown_key_is_a_parse_error() -> anyhow::Result<()> {
    let file = settings_file(r#"{ "detector": { "min_area": 100 } }"#)?;
    let result = Settings::from_file(file.path());
    assert!(matches!(result, Err(DetectError::ConfigParse(_))));
    Ok(())
}

#[test]
fn test_invalid_value_is_reported_by_key() -> anyhow::Result<()> {
    let file = settings_file(r#"{ "detector": { "blur_kernel_size": 4 } }"#)?;
    let result = Settings::from_file(file.path());
    assert!(matches!(
        result,
        Err(DetectError::InvalidConfig {
            key: "blur_kernel_size",
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let result = Settings::from_file(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(DetectError::ConfigIo(_))));
    Ok(())
}
