use tracing::debug;

use crate::blend::BlendMode;
use crate::error::{MockweaveError, MockweaveResult};
use crate::fit::{DestRect, FitTransform};
use crate::raster::{RasterImage, RasterSurface};

/// One compositing run, fully determined: target dimensions plus the four
/// layer slots. Built fresh on every trigger event and never mutated.
///
/// Background and mesh are required; a missing mask means the mesh multiplies
/// unclipped, a missing highlight skips the screen pass.
#[derive(Clone, Debug)]
pub struct CompositeSpec {
    pub width: u32,
    pub height: u32,
    pub background: RasterImage,
    pub mesh: RasterImage,
    pub mask: Option<RasterImage>,
    pub highlight: Option<RasterImage>,
}

impl CompositeSpec {
    pub fn validate(&self) -> MockweaveResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MockweaveError::validation(
                "composite target dimensions must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Flatten the layer stack into one image.
///
/// Pass order:
/// 1. background, replace, contain-fitted to the target;
/// 2. mesh render, replace, into a separate product surface;
/// 3. mask, mask-in, on the product surface — the mask must clip the mesh
///    before the multiply pass, otherwise background pixels outside the
///    product silhouette would darken too;
/// 4. product surface, multiply, onto the background;
/// 5. highlight, screen, last and unclipped.
///
/// Stateless: identical inputs produce identical pixels.
pub fn composite(spec: &CompositeSpec) -> MockweaveResult<RasterImage> {
    spec.validate()?;
    let (width, height) = (spec.width, spec.height);
    let full = DestRect::full(width, height);

    let mut main = RasterSurface::new(width, height)?;
    let fit = FitTransform::contain(
        f64::from(width) / f64::from(height),
        spec.background.aspect(),
    )?;
    main.draw_fitted(&spec.background, fit.dest_rect(width, height), BlendMode::Replace)?;

    let mut product = RasterSurface::new(width, height)?;
    product.draw_fitted(&spec.mesh, full, BlendMode::Replace)?;
    match &spec.mask {
        Some(mask) => product.draw_fitted(mask, full, BlendMode::MaskIn)?,
        None => debug!("no mask layer; mesh multiplies unclipped"),
    }
    main.draw_fitted(&product.into_image(), full, BlendMode::Multiply)?;

    match &spec.highlight {
        Some(highlight) => main.draw_fitted(highlight, full, BlendMode::Screen)?,
        None => debug!("no highlight layer; skipping screen pass"),
    }

    debug!(width, height, "composite complete");
    Ok(main.into_image())
}
