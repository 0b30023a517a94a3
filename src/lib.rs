#![forbid(unsafe_code)]

pub mod blend;
pub mod compositor;
pub mod error;
pub mod fit;
pub mod loader;
pub mod mesh;
pub mod raster;
pub mod session;
pub mod swap;

pub use blend::BlendMode;
pub use compositor::{CompositeSpec, composite};
pub use error::{MockweaveError, MockweaveResult};
pub use fit::{DestRect, FitTransform};
pub use loader::{ImageSource, decode_image, load};
pub use mesh::{FlatProjectionMesh, MeshRenderSurface};
pub use raster::{PixelFormat, RasterImage, RasterSurface};
pub use session::{MockupScene, MockupSession};
pub use swap::{CompositeSlot, PatternSwapController, SceneLayers, SwapOutcome};
