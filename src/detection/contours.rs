use crate::detection::preprocessing;
use crate::detection::segmentation::Mask;
use crate::models::{Candidate, Contour};
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

/// Find the outer borders of 8-connected regions in a mask.
///
/// Borders nested inside a hole of another region are skipped. Order is the
/// raster-scan discovery order.
pub fn find_outer_contours(mask: &Mask) -> Vec<Contour> {
    find_contours::<u32>(mask.as_image())
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| Contour::from_points(c.points))
        .collect()
}

/// Turn a mask into scored-ready candidates.
///
/// Regions whose bounding box covers fewer than `min_area` pixels are dropped.
/// Each candidate carries the intensity crop of its box grown by `margin`.
pub fn extract_candidates(mask: &Mask, gray: &GrayImage, min_area: u32, margin: u32) -> Vec<Candidate> {
    let (width, height) = gray.dimensions();
    find_outer_contours(mask)
        .into_iter()
        .filter(|c| c.width() * c.height() >= min_area)
        .map(|contour| {
            let bbox = contour.bbox();
            let region_box = bbox.expanded(margin, width, height);
            Candidate {
                contour,
                bbox,
                region: preprocessing::crop(gray, &region_box),
                region_box,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;
    use image::Luma;

    fn gray(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([200]))
    }

    #[test]
    fn empty_mask_has_no_candidates() {
        let mask = Mask::new(50, 40);
        assert!(extract_candidates(&mask, &gray(50, 40), 150, 0).is_empty());
    }

    #[test]
    fn full_mask_is_one_candidate_covering_image() {
        let mask = Mask::from_fn(50, 40, |_, _| true);
        let candidates = extract_candidates(&mask, &gray(50, 40), 150, 0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bbox, BoundingBox::new(0, 0, 50, 40));
    }

    #[test]
    fn small_regions_are_dropped() {
        let mask = Mask::from_fn(100, 100, |x, y| {
            let big = (10..30).contains(&x) && (10..30).contains(&y);
            let small = (60..65).contains(&x) && (60..65).contains(&y);
            big || small
        });
        let candidates = extract_candidates(&mask, &gray(100, 100), 150, 0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bbox, BoundingBox::new(10, 10, 20, 20));
    }

    #[test]
    fn diagonal_pixels_join_one_region() {
        let mask = Mask::from_fn(40, 40, |x, y| x == y && x >= 5 && x < 35);
        let contours = find_outer_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bbox(), BoundingBox::new(5, 5, 30, 30));
    }

    #[test]
    fn region_inside_a_hole_is_not_reported() {
        let mask = Mask::from_fn(60, 60, |x, y| {
            let ring = (5..55).contains(&x) && (5..55).contains(&y) && !((10..50).contains(&x) && (10..50).contains(&y));
            let island = (25..35).contains(&x) && (25..35).contains(&y);
            ring || island
        });
        let contours = find_outer_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bbox(), BoundingBox::new(5, 5, 50, 50));
    }

    #[test]
    fn region_crop_includes_margin() {
        let mask = Mask::from_fn(100, 100, |x, y| (40..60).contains(&x) && (40..60).contains(&y));
        let candidates = extract_candidates(&mask, &gray(100, 100), 100, 5);
        assert_eq!(candidates[0].region.dimensions(), (30, 30));
        assert_eq!(candidates[0].region_box, BoundingBox::new(35, 35, 30, 30));
        assert_eq!(candidates[0].box_pixels().dimensions(), (20, 20));
    }

    #[test]
    fn box_pixels_drop_margin_clamped_at_border() {
        let img = GrayImage::from_fn(50, 50, |x, y| Luma([(x + y) as u8]));
        let mask = Mask::from_fn(50, 50, |x, y| x < 20 && (10..30).contains(&y));
        let candidates = extract_candidates(&mask, &img, 100, 8);
        let c = &candidates[0];
        assert_eq!(c.region_box, BoundingBox::new(0, 2, 28, 36));
        let pixels = c.box_pixels();
        assert_eq!(pixels.dimensions(), (20, 20));
        assert_eq!(pixels.get_pixel(0, 0)[0], 10);
        assert_eq!(pixels.get_pixel(19, 19)[0], 48);
    }
}
