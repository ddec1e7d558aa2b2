use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};

/// Flat image of a single intensity.
pub fn uniform(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
}

/// 100x100 white image with a solid black 40x40 square at (30, 30).
pub fn black_square() -> DynamicImage {
    DynamicImage::ImageLuma8(black_square_gray())
}

pub fn black_square_gray() -> GrayImage {
    GrayImage::from_fn(100, 100, |x, y| {
        let inside = (30..70).contains(&x) && (30..70).contains(&y);
        Luma([if inside { 0 } else { 255 }])
    })
}

/// The black square as a 3-channel image.
pub fn black_square_rgb() -> DynamicImage {
    let gray = black_square_gray();
    DynamicImage::ImageRgb8(RgbImage::from_fn(100, 100, |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    }))
}

pub fn rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
}

/// 200x200 background of 100 with a dark disc (r <= 8, value 10) inside a
/// bright ring (8 < r <= 18, value 240), centred.
pub fn dark_disc_with_halo() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(200, 200, |x, y| {
        let dx = x as f32 - 100.0;
        let dy = y as f32 - 100.0;
        let r = (dx * dx + dy * dy).sqrt();
        Luma([if r <= 8.0 {
            10
        } else if r <= 18.0 {
            240
        } else {
            100
        }])
    }))
}

/// 300x300 bright road with a 160x160 dark patch at (70, 70) studded with
/// small bright grit every 8 px.
pub fn gritty_patch() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(300, 300, |x, y| {
        let inside = (70..230).contains(&x) && (70..230).contains(&y);
        if !inside {
            return Luma([230]);
        }
        let grit = |v: u32| matches!((v - 70) % 8, 3..=5) && (73..228).contains(&v);
        Luma([if grit(x) && grit(y) { 200 } else { 40 }])
    }))
}

/// Pseudo-random asphalt texture, reproducible across runs.
pub fn noisy_road(width: u32, height: u32, seed: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Luma([60 + (state % 120) as u8])
    }))
}

/// Image whose bottom `rows` rows are near-black.
pub fn dark_bottom(width: u32, height: u32, rows: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |_, y| {
        Luma([if y >= height - rows { 15 } else { 190 }])
    }))
}

/// 200x200 checkerboard of 120/140 with a 3-pixel dark bar through the centre square.
pub fn barred_texture() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(200, 200, |x, y| {
        let bar = (60..140).contains(&x) && (99..102).contains(&y);
        Luma([if bar {
            20
        } else if (x + y) % 2 == 0 {
            120
        } else {
            140
        }])
    }))
}

/// Bright 200x200 frame whose centre 60x60 square is a dim 60/70 checkerboard.
pub fn dim_centre() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(200, 200, |x, y| {
        let centre = (70..130).contains(&x) && (70..130).contains(&y);
        Luma([if !centre {
            200
        } else if (x + y) % 2 == 0 {
            60
        } else {
            70
        }])
    }))
}
