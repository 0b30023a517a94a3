use crate::error::{MockweaveError, MockweaveResult};

/// Letterbox-correct placement of a rectangular image inside a
/// differently-proportioned viewport ("contain" semantics), in normalized
/// [0,1] texture-space coordinates.
///
/// Invariants: `scale_x <= 1`, `scale_y <= 1`, exactly one axis at 1.0 unless
/// the aspects match (then both are 1.0), and each offset centers its axis:
/// `offset = (1 - scale) / 2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitTransform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl FitTransform {
    pub fn identity() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Fit an image of aspect `image_aspect` into a viewport of aspect
    /// `viewport_aspect` without distortion.
    pub fn contain(viewport_aspect: f64, image_aspect: f64) -> MockweaveResult<Self> {
        if !viewport_aspect.is_finite() || viewport_aspect <= 0.0 {
            return Err(MockweaveError::validation(
                "viewport aspect must be finite and > 0",
            ));
        }
        if !image_aspect.is_finite() || image_aspect <= 0.0 {
            return Err(MockweaveError::validation(
                "image aspect must be finite and > 0",
            ));
        }

        // Matching aspects are handled explicitly rather than relying on the
        // ratios below collapsing to exactly 1.0.
        if viewport_aspect == image_aspect {
            return Ok(Self::identity());
        }

        if viewport_aspect > image_aspect {
            // Viewport is wider than the image: fit to height, letterbox on
            // the sides.
            let scale_x = image_aspect / viewport_aspect;
            Ok(Self {
                offset_x: (1.0 - scale_x) / 2.0,
                offset_y: 0.0,
                scale_x,
                scale_y: 1.0,
            })
        } else {
            // Viewport is taller than the image: fit to width, letterbox on
            // top and bottom.
            let scale_y = viewport_aspect / image_aspect;
            Ok(Self {
                offset_x: 0.0,
                offset_y: (1.0 - scale_y) / 2.0,
                scale_x: 1.0,
                scale_y,
            })
        }
    }

    /// Pixel-space placement of the fitted image inside a `target_w x target_h`
    /// surface.
    pub fn dest_rect(&self, target_w: u32, target_h: u32) -> DestRect {
        let w = ((self.scale_x * f64::from(target_w)).round() as u32).max(1);
        let h = ((self.scale_y * f64::from(target_h)).round() as u32).max(1);
        let x = ((self.offset_x * f64::from(target_w)).round() as u32).min(target_w.saturating_sub(w));
        let y = ((self.offset_y * f64::from(target_h)).round() as u32).min(target_h.saturating_sub(h));
        DestRect {
            x,
            y,
            width: w.min(target_w),
            height: h.min(target_h),
        }
    }
}

/// Integer pixel rectangle inside a raster surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DestRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}
