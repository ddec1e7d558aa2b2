mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from potholes for tests
pub use potholes::detection::segmentation::Mask;
pub use potholes::{BoundingBox, Detection, DetectorConfig, DetectorKind, Pipeline, Settings};

/// Assert that two boxes agree on every edge within `tolerance` pixels.
pub fn assert_box_near(actual: BoundingBox, expected: BoundingBox, tolerance: u32) {
    let close = |a: u32, b: u32| a.abs_diff(b) <= tolerance;
    assert!(
        close(actual.x, expected.x)
            && close(actual.y, expected.y)
            && close(actual.right(), expected.right())
            && close(actual.bottom(), expected.bottom()),
        "box {:?} not within {} px of {:?}",
        actual,
        tolerance,
        expected
    );
}

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
