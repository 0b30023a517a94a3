use std::path::PathBuf;

use crate::error::{MockweaveError, MockweaveResult};
use crate::raster::{PixelFormat, RasterImage};

/// Where a raster layer comes from. Every layer in the pipeline — background,
/// mask, highlight, user-supplied pattern — goes through [`load`].
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Read and decode a file on disk.
    Path(PathBuf),
    /// Decode an in-memory encoded buffer (e.g. a file-picker upload).
    Bytes(Vec<u8>),
    /// Already-decoded pixels; passes through untouched.
    Decoded(RasterImage),
}

/// Resolve a source to decoded pixels. Suspends for file reads; each call is
/// independent, so loads of unrelated sources may run concurrently.
pub async fn load(source: &ImageSource) -> MockweaveResult<RasterImage> {
    match source {
        ImageSource::Path(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| MockweaveError::load(format!("read '{}': {e}", path.display())))?;
            decode_image(&bytes)
        }
        ImageSource::Bytes(bytes) => decode_image(bytes),
        ImageSource::Decoded(image) => Ok(image.clone()),
    }
}

/// Decode encoded image bytes (format sniffed from the payload). Sources
/// without an alpha channel stay RGB; everything else is premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> MockweaveResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| MockweaveError::load(format!("decode image ({} bytes): {e}", bytes.len())))?;

    match dyn_img {
        image::DynamicImage::ImageRgb8(rgb) => {
            let (width, height) = rgb.dimensions();
            RasterImage::new(width, height, PixelFormat::Rgb8, rgb.into_raw())
        }
        other => {
            let rgba = other.to_rgba8();
            let (width, height) = rgba.dimensions();
            let mut pixels = rgba.into_raw();
            premultiply_rgba8_in_place(&mut pixels);
            RasterImage::new(width, height, PixelFormat::Rgba8Premul, pixels)
        }
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
