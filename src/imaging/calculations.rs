//! Pure calculation functions for crop and resize geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// A crop window in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Derive a target height that preserves the source aspect ratio.
///
/// # Examples
/// ```
/// # use vignette::imaging::derive_height;
/// // 1600x1200 source at width 400 → height 300
/// assert_eq!(derive_height((1600, 1200), 400), 300);
/// ```
pub fn derive_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    let h = (target_width as f64 * src_h as f64 / src_w as f64).round() as u32;
    h.max(1)
}

/// Compute a centered crop window whose aspect ratio matches the target box.
///
/// Compares `src_w / target_w` against `src_h / target_h` and crops along
/// whichever source axis has the larger ratio, leaving the other axis full.
/// Scaling the returned window to exactly `target_w × target_h` therefore
/// fills the box completely — "fill" semantics, never letterboxed "fit".
/// Excess content on the cropped axis is discarded symmetrically.
pub fn fill_crop_window(source: (u32, u32), target: (u32, u32)) -> CropWindow {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let ratio_w = src_w as f64 / tgt_w as f64;
    let ratio_h = src_h as f64 / tgt_h as f64;

    if ratio_w > ratio_h {
        // Source is proportionally wider: crop width, keep full height
        let crop_w = ((tgt_w as f64 * ratio_h).round() as u32).clamp(1, src_w);
        CropWindow {
            x: (src_w - crop_w) / 2,
            y: 0,
            width: crop_w,
            height: src_h,
        }
    } else {
        // Source is proportionally taller (or aspect matches): crop height
        let crop_h = ((tgt_h as f64 * ratio_w).round() as u32).clamp(1, src_h);
        CropWindow {
            x: 0,
            y: (src_h - crop_h) / 2,
            width: src_w,
            height: crop_h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // derive_height tests
    // =========================================================================

    #[test]
    fn derive_height_landscape() {
        assert_eq!(derive_height((1600, 1200), 400), 300);
    }

    #[test]
    fn derive_height_portrait() {
        assert_eq!(derive_height((600, 800), 300), 400);
    }

    #[test]
    fn derive_height_rounds() {
        // 1000x667 at width 400 → 266.8 → 267
        assert_eq!(derive_height((1000, 667), 400), 267);
    }

    #[test]
    fn derive_height_never_zero() {
        // Extreme panorama: 10000x10 at width 100 → 0.1 → clamped to 1
        assert_eq!(derive_height((10000, 10), 100), 1);
    }

    // =========================================================================
    // fill_crop_window tests
    // =========================================================================

    #[test]
    fn crop_matching_aspect_is_full_frame() {
        // 1600x1200 → 400x300, both 4:3: no cropping
        let w = fill_crop_window((1600, 1200), (400, 300));
        assert_eq!(
            w,
            CropWindow {
                x: 0,
                y: 0,
                width: 1600,
                height: 1200
            }
        );
    }

    #[test]
    fn crop_wider_source_trims_width() {
        // 1600x1200 (4:3) → square box: crop to 1200x1200, centered
        let w = fill_crop_window((1600, 1200), (400, 400));
        assert_eq!(
            w,
            CropWindow {
                x: 200,
                y: 0,
                width: 1200,
                height: 1200
            }
        );
    }

    #[test]
    fn crop_taller_source_trims_height() {
        // 1200x1600 (3:4) → square box: crop to 1200x1200, centered vertically
        let w = fill_crop_window((1200, 1600), (400, 400));
        assert_eq!(
            w,
            CropWindow {
                x: 0,
                y: 200,
                width: 1200,
                height: 1200
            }
        );
    }

    #[test]
    fn crop_window_centered_within_source() {
        // 2000x1000 → 400x300 (4:3): crop width to 1333, x = 333
        let w = fill_crop_window((2000, 1000), (400, 300));
        assert_eq!(w.height, 1000);
        assert_eq!(w.width, 1333);
        assert_eq!(w.x, 333);
        assert_eq!(w.y, 0);
    }

    #[test]
    fn crop_never_exceeds_source() {
        let w = fill_crop_window((10, 10), (4000, 3000));
        assert!(w.width <= 10 && w.height <= 10);
        assert!(w.x + w.width <= 10);
        assert!(w.y + w.height <= 10);
    }
}
