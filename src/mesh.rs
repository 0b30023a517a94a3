use crate::blend::BlendMode;
use crate::error::{MockweaveError, MockweaveResult};
use crate::fit::FitTransform;
use crate::raster::{RasterImage, RasterSurface};

/// The 3D rendering collaborator: something that carries a surface texture
/// and can rasterize the current scene into an in-memory image on demand.
///
/// Scene, camera and mesh setup live behind this trait; the compositing
/// pipeline only installs textures and asks for pixels.
#[allow(async_fn_in_trait)]
pub trait MeshRenderSurface {
    /// Replace the mesh's surface texture with a freshly decoded pattern.
    fn set_surface_texture(&mut self, texture: RasterImage);

    /// Rasterize the current scene into a `width x height` image. Transparent
    /// outside the product; may suspend (GPU readback, worker hop, ...).
    async fn render_to_surface(&mut self, width: u32, height: u32)
    -> MockweaveResult<RasterImage>;
}

/// Software stand-in for a real 3D backend: aspect-fits the current texture
/// onto the requested surface and leaves the letterbox transparent. Used by
/// the CLI and tests; anything with an actual scene graph replaces it.
#[derive(Debug)]
pub struct FlatProjectionMesh {
    texture: Option<RasterImage>,
}

impl FlatProjectionMesh {
    pub fn new(texture: Option<RasterImage>) -> Self {
        Self { texture }
    }
}

impl MeshRenderSurface for FlatProjectionMesh {
    fn set_surface_texture(&mut self, texture: RasterImage) {
        self.texture = Some(texture);
    }

    async fn render_to_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> MockweaveResult<RasterImage> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| MockweaveError::render("no surface texture installed"))?;

        let mut surface = RasterSurface::new(width, height)?;
        let fit = FitTransform::contain(f64::from(width) / f64::from(height), texture.aspect())?;
        surface.draw_fitted(texture, fit.dest_rect(width, height), BlendMode::Replace)?;
        Ok(surface.into_image())
    }
}
