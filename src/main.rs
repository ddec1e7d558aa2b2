use anyhow::Context;
use clap::Parser;
use image::{DynamicImage, ImageReader, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, info};
use std::path::{Path, PathBuf};

use potholes::trace::LogObserver;
use potholes::{BoundingBox, DetectorKind, Settings};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Parser)]
#[command(name = "potholes")]
#[command(about = "Detect potholes in road images")]
struct Cli {
    /// Image files or directories of images
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Detector to run
    #[arg(short, long, value_enum, default_value_t = DetectorKind::Fused)]
    detector: DetectorKind,

    /// JSON settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the acceptance threshold
    #[arg(short, long, value_name = "F")]
    threshold: Option<f32>,

    /// Write a copy of each image with the detected box drawn
    #[arg(long, value_name = "DIR")]
    annotate_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path).with_context(|| format!("Loading settings from {:?}", path))?,
        None => Settings::default(),
    };
    if let Some(threshold) = args.threshold {
        settings.detector.confidence_threshold = threshold;
    }
    settings.validate()?;
    let threshold = settings.detector.confidence_threshold;

    if let Some(dir) = &args.annotate_out {
        std::fs::create_dir_all(dir).with_context(|| format!("Creating output directory {:?}", dir))?;
    }

    let images = collect_images(&args.paths)?;
    if images.is_empty() {
        anyhow::bail!("No images found");
    }
    info!("Running the {} detector on {} image(s)", args.detector, images.len());

    let mut detected = 0usize;
    for path in &images {
        debug!("Loading image: {:?}", path);
        let img = ImageReader::open(path)?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image {:?}: {}", path, e))?;
        debug!("Image loaded: {}x{}", img.width(), img.height());

        let detection = args.detector.run_observed(&img, &settings, &mut LogObserver)?;
        let is_pothole = detection.is_pothole(threshold);

        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("{} -> confidence: {:.2}", name, detection.confidence);
        if is_pothole {
            detected += 1;
            let (x, y, w, h) = detection.bbox.as_tuple();
            println!("  POTHOLE DETECTED at ({}, {}) size {}x{}", x, y, w, h);
        } else {
            println!("  No pothole detected.");
        }

        if let Some(dir) = &args.annotate_out {
            let out = dir.join(path.file_name().unwrap_or(path.as_os_str()));
            let bbox = is_pothole.then_some(detection.bbox);
            annotate(&img, bbox)
                .save(&out)
                .with_context(|| format!("Saving annotated image to {:?}", out))?;
            debug!("Annotated image written to {:?}", out);
        }
    }

    if images.len() > 1 {
        println!("\n=== Pothole Detection Results ===");
        println!("Potholes detected in {} of {} images", detected, images.len());
    }

    Ok(())
}

/// Expand directories into their image files, sorted by name.
fn collect_images(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Reading directory {:?}", path))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_image_extension(p))
                .collect();
            entries.sort();
            images.extend(entries);
        } else {
            images.push(path.clone());
        }
    }
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Copy of `img` with a 2 px red outline around `bbox`.
fn annotate(img: &DynamicImage, bbox: Option<BoundingBox>) -> DynamicImage {
    let mut canvas = img.to_rgb8();
    if let Some(bbox) = bbox {
        let red = Rgb([255, 0, 0]);
        for inset in 0..2u32 {
            if bbox.width <= 2 * inset || bbox.height <= 2 * inset {
                break;
            }
            let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32)
                .of_size(bbox.width - 2 * inset, bbox.height - 2 * inset);
            draw_hollow_rect_mut(&mut canvas, rect, red);
        }
    }
    DynamicImage::ImageRgb8(canvas)
}
