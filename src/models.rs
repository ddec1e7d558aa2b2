use image::GrayImage;
use imageproc::point::Point;

/// Axis-aligned rectangle in source-image pixel coordinates.
///
/// `width` and `height` are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// The degenerate 1x1 box at the origin returned with a non-detection.
    pub fn sentinel() -> Self {
        Self::new(0, 0, 1, 1)
    }

    /// Build from signed corner coordinates, clamping into a `width` x `height` image.
    pub fn clamped(x: i64, y: i64, w: i64, h: i64, img_width: u32, img_height: u32) -> Self {
        let max_x = i64::from(img_width.max(1)) - 1;
        let max_y = i64::from(img_height.max(1)) - 1;
        let x0 = x.clamp(0, max_x);
        let y0 = y.clamp(0, max_y);
        let x1 = (x + w - 1).clamp(x0, max_x);
        let y1 = (y + h - 1).clamp(y0, max_y);
        Self::new(x0 as u32, y0 as u32, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32)
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Grow by `margin` on every side, staying inside the image.
    pub fn expanded(&self, margin: u32, img_width: u32, img_height: u32) -> Self {
        let m = i64::from(margin);
        Self::clamped(
            i64::from(self.x) - m,
            i64::from(self.y) - m,
            i64::from(self.width) + 2 * m,
            i64::from(self.height) + 2 * m,
            img_width,
            img_height,
        )
    }

    pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

/// Final output of a detector: a confidence and the box it refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(confidence: f32, bbox: BoundingBox) -> Self {
        Self { confidence, bbox }
    }

    /// The sentinel non-detection `(0.0, (0, 0, 1, 1))`.
    pub fn none() -> Self {
        Self::new(0.0, BoundingBox::sentinel())
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn is_pothole(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// Outer border of one connected dark region.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<u32>>,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Contour {
    /// Returns `None` for an empty point list.
    pub fn from_points(points: Vec<Point<u32>>) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            points,
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.min_x, self.min_y, self.width(), self.height())
    }

    /// Polygon area enclosed by the border points (shoelace formula).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice = 0.0f64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice += f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
        }
        twice.abs() / 2.0
    }

    /// Length of the closed polyline through the border points.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                let dx = f64::from(a.x) - f64::from(b.x);
                let dy = f64::from(a.y) - f64::from(b.y);
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width()) / (f64::from(self.height()) + 1e-6)
    }

    /// Enclosed area over bounding-box area.
    pub fn extent(&self) -> f64 {
        self.area() / (f64::from(self.width() * self.height()) + 1e-6)
    }

    /// 4π·area / perimeter², 1.0 for a perfect disc.
    pub fn circularity(&self) -> f64 {
        let perimeter = self.perimeter();
        4.0 * std::f64::consts::PI * self.area() / (perimeter * perimeter + 1e-6)
    }
}

/// One extracted region: its border, its box, and the pixels used for scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub contour: Contour,
    pub bbox: BoundingBox,
    /// Intensity crop of the box plus the configured context margin.
    pub region: GrayImage,
    /// Where `region` sits in the source image.
    pub region_box: BoundingBox,
}

impl Candidate {
    /// The pixels under `bbox` alone, without the context margin.
    pub fn box_pixels(&self) -> GrayImage {
        let x = self.bbox.x - self.region_box.x;
        let y = self.bbox.y - self.region_box.y;
        image::imageops::crop_imm(&self.region, x, y, self.bbox.width, self.bbox.height).to_image()
    }
}

/// Per-candidate feature scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureScores {
    pub darkness: f32,
    pub texture: f32,
    pub shape: f32,
    pub keypoint_density: f32,
}
