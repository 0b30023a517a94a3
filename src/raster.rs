use std::io::Cursor;
use std::sync::Arc;

use crate::blend::{self, BlendMode};
use crate::error::{MockweaveError, MockweaveResult};
use crate::fit::DestRect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Tightly packed RGB8, no alpha channel.
    Rgb8,
    /// Premultiplied RGBA8 (r,g,b already multiplied by a).
    Rgba8Premul,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8Premul => 4,
        }
    }
}

/// Immutable decoded pixel buffer. Clones share the payload; transformations
/// always produce new images or draw into a separate [`RasterSurface`].
#[derive(Clone, Debug)]
pub struct RasterImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Arc<Vec<u8>>,
}

impl RasterImage {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> MockweaveResult<Self> {
        if width == 0 || height == 0 {
            return Err(MockweaveError::validation(
                "raster image dimensions must be non-zero",
            ));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
            .ok_or_else(|| MockweaveError::validation("raster image size overflow"))?;
        if pixels.len() != expected {
            return Err(MockweaveError::validation(format!(
                "raster image payload is {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            pixels: Arc::new(pixels),
        })
    }

    /// Uniform premultiplied-RGBA8 fill.
    pub fn solid(width: u32, height: u32, rgba_premul: [u8; 4]) -> MockweaveResult<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgba_premul);
        }
        Self::new(width, height, PixelFormat::Rgba8Premul, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Premultiplied RGBA8 value at `(x, y)`. RGB images read as opaque.
    pub fn px_rgba_premul(&self, x: u32, y: u32) -> [u8; 4] {
        debug_assert!(x < self.width && y < self.height);
        let idx = (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel();
        let p = &self.pixels[idx..idx + self.format.bytes_per_pixel()];
        match self.format {
            PixelFormat::Rgb8 => [p[0], p[1], p[2], 255],
            PixelFormat::Rgba8Premul => [p[0], p[1], p[2], p[3]],
        }
    }

    /// Tightly packed premultiplied RGBA8 copy of the whole image.
    pub fn to_rgba8_premul(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgba8Premul => self.pixels.as_ref().clone(),
            PixelFormat::Rgb8 => {
                let mut out = Vec::with_capacity(self.pixels.len() / 3 * 4);
                for px in self.pixels.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                out
            }
        }
    }

    /// Encode as PNG bytes (straight alpha on the way out).
    pub fn encode_png(&self) -> MockweaveResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self.format {
            PixelFormat::Rgb8 => {
                let img =
                    image::RgbImage::from_raw(self.width, self.height, self.pixels.as_ref().clone())
                        .ok_or_else(|| {
                            MockweaveError::validation("rgb payload does not match dimensions")
                        })?;
                image::DynamicImage::ImageRgb8(img)
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .map_err(|e| MockweaveError::render(format!("encode png: {e}")))?;
            }
            PixelFormat::Rgba8Premul => {
                let mut straight = self.pixels.as_ref().clone();
                unpremultiply_rgba8_in_place(&mut straight);
                let img = image::RgbaImage::from_raw(self.width, self.height, straight)
                    .ok_or_else(|| {
                        MockweaveError::validation("rgba payload does not match dimensions")
                    })?;
                image::DynamicImage::ImageRgba8(img)
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .map_err(|e| MockweaveError::render(format!("encode png: {e}")))?;
            }
        }
        Ok(buf)
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// Mutable premultiplied-RGBA8 pixel buffer of fixed size. Created fully
/// transparent; drawn into with a [`BlendMode`]; frozen via [`snapshot`] or
/// [`into_image`].
///
/// [`snapshot`]: RasterSurface::snapshot
/// [`into_image`]: RasterSurface::into_image
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> MockweaveResult<Self> {
        if width == 0 || height == 0 {
            return Err(MockweaveError::validation(
                "raster surface dimensions must be non-zero",
            ));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| MockweaveError::validation("raster surface size overflow"))?;
        Ok(Self {
            width,
            height,
            pixels: vec![0u8; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Draw `image` scaled into `rect` with the given blend mode. Sampling is
    /// nearest-neighbor; pixels outside `rect` are untouched.
    pub fn draw_fitted(
        &mut self,
        image: &RasterImage,
        rect: DestRect,
        mode: BlendMode,
    ) -> MockweaveResult<()> {
        if rect.width == 0 || rect.height == 0 {
            return Err(MockweaveError::validation("destination rect is empty"));
        }
        let x_end = rect.x.checked_add(rect.width);
        let y_end = rect.y.checked_add(rect.height);
        if x_end.is_none_or(|v| v > self.width) || y_end.is_none_or(|v| v > self.height) {
            return Err(MockweaveError::validation(
                "destination rect exceeds surface bounds",
            ));
        }

        // Same-size full-surface draws take the flat buffer path.
        if rect == DestRect::full(self.width, self.height)
            && image.width() == self.width
            && image.height() == self.height
            && image.format() == PixelFormat::Rgba8Premul
        {
            return blend::blend_in_place(mode, &mut self.pixels, image.pixels());
        }

        for dy in 0..rect.height {
            let sy = (u64::from(dy) * u64::from(image.height()) / u64::from(rect.height)) as u32;
            for dx in 0..rect.width {
                let sx = (u64::from(dx) * u64::from(image.width()) / u64::from(rect.width)) as u32;
                let src = image.px_rgba_premul(sx, sy);
                let idx =
                    ((rect.y + dy) as usize * self.width as usize + (rect.x + dx) as usize) * 4;
                let dst = [
                    self.pixels[idx],
                    self.pixels[idx + 1],
                    self.pixels[idx + 2],
                    self.pixels[idx + 3],
                ];
                let out = blend::blend_px(mode, dst, src);
                self.pixels[idx..idx + 4].copy_from_slice(&out);
            }
        }
        Ok(())
    }

    /// Draw `image` stretched over the whole surface.
    pub fn draw(&mut self, image: &RasterImage, mode: BlendMode) -> MockweaveResult<()> {
        self.draw_fitted(image, DestRect::full(self.width, self.height), mode)
    }

    /// Freeze the current contents as an immutable image.
    pub fn snapshot(&self) -> RasterImage {
        RasterImage {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8Premul,
            pixels: Arc::new(self.pixels.clone()),
        }
    }

    pub fn into_image(self) -> RasterImage {
        RasterImage {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8Premul,
            pixels: Arc::new(self.pixels),
        }
    }
}
