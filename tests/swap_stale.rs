use std::collections::VecDeque;
use std::io::Cursor;

use mockweave::{
    MeshRenderSurface, MockweaveError, MockweaveResult, PatternSwapController, RasterImage,
    SceneLayers, SwapOutcome,
};

/// Stub renderer: fills the surface with the texture's top-left color. Each
/// queued gate blocks one render until released, so tests can interleave
/// in-flight swap runs deterministically.
struct StubMesh {
    texture: Option<RasterImage>,
    gates: VecDeque<tokio::sync::oneshot::Receiver<()>>,
    renders_before_failure: Option<u32>,
}

impl StubMesh {
    fn new() -> Self {
        Self {
            texture: None,
            gates: VecDeque::new(),
            renders_before_failure: None,
        }
    }

    fn gated(gates: Vec<tokio::sync::oneshot::Receiver<()>>) -> Self {
        Self {
            gates: gates.into(),
            ..Self::new()
        }
    }

    fn failing_after(renders: u32) -> Self {
        Self {
            renders_before_failure: Some(renders),
            ..Self::new()
        }
    }
}

impl MeshRenderSurface for StubMesh {
    fn set_surface_texture(&mut self, texture: RasterImage) {
        self.texture = Some(texture);
    }

    async fn render_to_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> MockweaveResult<RasterImage> {
        if let Some(gate) = self.gates.pop_front() {
            let _ = gate.await;
        }
        if let Some(remaining) = self.renders_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(MockweaveError::render("stub renderer exhausted"));
            }
            *remaining -= 1;
        }
        let color = self
            .texture
            .as_ref()
            .map(|t| t.px_rgba_premul(0, 0))
            .unwrap_or([0, 0, 0, 0]);
        RasterImage::solid(width, height, color)
    }
}

fn gray_layers(width: u32, height: u32) -> SceneLayers {
    SceneLayers {
        background: RasterImage::solid(width, height, [128, 128, 128, 255]).unwrap(),
        mask: Some(RasterImage::solid(width, height, [255, 255, 255, 255]).unwrap()),
        highlight: None,
    }
}

fn png_of_color(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn compose_initial_publishes_first_composite() {
    let mut mesh = StubMesh::new();
    mesh.set_surface_texture(RasterImage::solid(1, 1, [255, 255, 255, 255]).unwrap());
    let controller = PatternSwapController::new(mesh, gray_layers(8, 8), 8, 8);

    assert!(controller.current_composite().is_none());
    let outcome = controller.compose_initial().await.unwrap();
    assert_eq!(outcome, SwapOutcome::Published);

    // White product multiplies to the background itself.
    let out = controller.current_composite().unwrap();
    assert_eq!(out.px_rgba_premul(4, 4), [128, 128, 128, 255]);
}

#[tokio::test]
async fn sequential_swaps_replace_the_visible_composite() {
    let controller = PatternSwapController::new(StubMesh::new(), gray_layers(8, 8), 8, 8);

    assert_eq!(
        controller
            .swap_pattern(png_of_color([255, 0, 0, 255]))
            .await
            .unwrap(),
        SwapOutcome::Published
    );
    assert_eq!(
        controller.current_composite().unwrap().px_rgba_premul(0, 0),
        [128, 0, 0, 255]
    );

    assert_eq!(
        controller
            .swap_pattern(png_of_color([0, 0, 255, 255]))
            .await
            .unwrap(),
        SwapOutcome::Published
    );
    assert_eq!(
        controller.current_composite().unwrap().px_rgba_premul(0, 0),
        [0, 0, 128, 255]
    );
}

#[tokio::test]
async fn overlapping_swaps_discard_the_stale_run() {
    let (release, gate) = tokio::sync::oneshot::channel();
    let controller =
        PatternSwapController::new(StubMesh::gated(vec![gate]), gray_layers(8, 8), 8, 8);

    // Run 1 blocks inside its render; run 2 arrives while it is in flight and
    // must win even though run 1 finishes afterwards.
    let first = controller.swap_pattern(png_of_color([255, 0, 0, 255]));
    let second = controller.swap_pattern(png_of_color([0, 0, 255, 255]));
    let unblock = async move {
        release.send(()).unwrap();
    };
    let (first, second, ()) = tokio::join!(first, second, unblock);

    assert_eq!(first.unwrap(), SwapOutcome::Superseded);
    assert_eq!(second.unwrap(), SwapOutcome::Published);
    assert_eq!(
        controller.current_composite().unwrap().px_rgba_premul(3, 3),
        [0, 0, 128, 255]
    );
}

#[tokio::test]
async fn undecodable_pattern_keeps_last_composite() {
    let controller = PatternSwapController::new(StubMesh::new(), gray_layers(8, 8), 8, 8);
    controller
        .swap_pattern(png_of_color([255, 0, 0, 255]))
        .await
        .unwrap();

    let err = controller
        .swap_pattern(b"not an image".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, MockweaveError::Load(_)));

    assert_eq!(
        controller.current_composite().unwrap().px_rgba_premul(0, 0),
        [128, 0, 0, 255]
    );
}

#[tokio::test]
async fn render_failure_aborts_run_but_keeps_last_composite() {
    let controller =
        PatternSwapController::new(StubMesh::failing_after(1), gray_layers(8, 8), 8, 8);
    controller
        .swap_pattern(png_of_color([255, 0, 0, 255]))
        .await
        .unwrap();

    let err = controller
        .swap_pattern(png_of_color([0, 0, 255, 255]))
        .await
        .unwrap_err();
    assert!(matches!(err, MockweaveError::Render(_)));

    assert_eq!(
        controller.current_composite().unwrap().px_rgba_premul(0, 0),
        [128, 0, 0, 255]
    );
}
