use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::{MockweaveError, MockweaveResult};
use crate::loader::{self, ImageSource};
use crate::mesh::MeshRenderSurface;
use crate::raster::RasterImage;
use crate::swap::{PatternSwapController, SceneLayers, SwapOutcome};

/// Scene manifest: the static photographic layers and the composite target
/// size. Paths are interpreted relative to wherever the manifest lives (see
/// [`MockupScene::resolved_against`]).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MockupScene {
    pub width: u32,
    pub height: u32,
    pub background: PathBuf,
    #[serde(default)]
    pub mask: Option<PathBuf>,
    #[serde(default)]
    pub highlight: Option<PathBuf>,
}

impl MockupScene {
    pub fn from_json(json: &str) -> MockweaveResult<Self> {
        let scene: Self = serde_json::from_str(json)
            .map_err(|e| MockweaveError::validation(format!("parse scene manifest: {e}")))?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn validate(&self) -> MockweaveResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MockweaveError::validation(
                "scene target dimensions must be non-zero",
            ));
        }
        Ok(())
    }

    /// Resolve relative layer paths against `root` (typically the manifest's
    /// parent directory).
    pub fn resolved_against(&self, root: &Path) -> Self {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };
        Self {
            width: self.width,
            height: self.height,
            background: resolve(&self.background),
            mask: self.mask.as_ref().map(&resolve),
            highlight: self.highlight.as_ref().map(&resolve),
        }
    }
}

/// Owns one mockup: the static layers, the mesh collaborator, and the visible
/// composite. Opening a session runs the "initial assets ready" flow as a
/// linear sequence of awaited steps; pattern events go through
/// [`swap_pattern`].
///
/// [`swap_pattern`]: MockupSession::swap_pattern
#[derive(Debug)]
pub struct MockupSession<M: MeshRenderSurface> {
    controller: PatternSwapController<M>,
}

impl<M: MeshRenderSurface> MockupSession<M> {
    /// Load the scene's layers, render the mesh once, composite, and publish.
    ///
    /// A background that fails to load is fatal. Mask and highlight failures
    /// degrade gracefully: the corresponding blend pass is skipped.
    pub async fn open(scene: &MockupScene, mesh: M) -> MockweaveResult<Self> {
        scene.validate()?;

        let background = loader::load(&ImageSource::Path(scene.background.clone())).await?;
        let mask = load_optional_layer("mask", scene.mask.as_deref()).await;
        let highlight = load_optional_layer("highlight", scene.highlight.as_deref()).await;

        let controller = PatternSwapController::new(
            mesh,
            SceneLayers {
                background,
                mask,
                highlight,
            },
            scene.width,
            scene.height,
        );
        controller.compose_initial().await?;
        Ok(Self { controller })
    }

    /// Forward a "pattern file selected" event. Last-wins: when swaps
    /// overlap, only the newest event's composite becomes visible.
    pub async fn swap_pattern(&self, pattern_bytes: Vec<u8>) -> MockweaveResult<SwapOutcome> {
        self.controller.swap_pattern(pattern_bytes).await
    }

    /// The currently visible composite.
    pub fn current_composite(&self) -> Option<Arc<RasterImage>> {
        self.controller.current_composite()
    }
}

async fn load_optional_layer(name: &str, path: Option<&Path>) -> Option<RasterImage> {
    let path = path?;
    match loader::load(&ImageSource::Path(path.to_path_buf())).await {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(
                layer = name,
                path = %path.display(),
                %err,
                "optional layer failed to load; compositing without it"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_with_optional_layers_missing() {
        let scene = MockupScene::from_json(
            r#"{"width": 100, "height": 50, "background": "bg.jpg"}"#,
        )
        .unwrap();
        assert_eq!(scene.width, 100);
        assert!(scene.mask.is_none());
        assert!(scene.highlight.is_none());
    }

    #[test]
    fn manifest_rejects_zero_dimensions() {
        let err = MockupScene::from_json(
            r#"{"width": 0, "height": 50, "background": "bg.jpg"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MockweaveError::Validation(_)));
    }

    #[test]
    fn resolved_against_keeps_absolute_paths() {
        let scene = MockupScene {
            width: 10,
            height: 10,
            background: PathBuf::from("/abs/bg.jpg"),
            mask: Some(PathBuf::from("mask.png")),
            highlight: None,
        };
        let resolved = scene.resolved_against(Path::new("/scenes"));
        assert_eq!(resolved.background, PathBuf::from("/abs/bg.jpg"));
        assert_eq!(resolved.mask.unwrap(), PathBuf::from("/scenes/mask.png"));
    }
}
