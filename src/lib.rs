pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod trace;

pub use config::{CenterConfig, DetectorConfig, Settings};
pub use detection::{DetectorKind, detect};
pub use error::{DetectError, Result};
pub use models::{BoundingBox, Detection};
pub use pipeline::Pipeline;
