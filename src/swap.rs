use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::compositor::{self, CompositeSpec};
use crate::error::MockweaveResult;
use crate::loader::{self, ImageSource};
use crate::mesh::MeshRenderSurface;
use crate::raster::RasterImage;

/// How a swap run ended. `Superseded` is the normal fate of a run that lost
/// the race to a newer pattern event; it is not an error and never surfaces
/// to the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    Published,
    Superseded,
}

/// Monotonic run numbering. Every trigger event takes a sequence number at
/// entry; only the most recently issued number may publish.
#[derive(Debug)]
struct SwapSequencer {
    issued: AtomicU64,
}

impl SwapSequencer {
    fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
        }
    }

    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == seq
    }
}

/// The single "current composite" output slot. Replacement is atomic from the
/// viewer's perspective and strictly monotonic in sequence number, so a stale
/// completion can never overwrite a newer result.
#[derive(Debug, Default)]
pub struct CompositeSlot {
    current: Mutex<Option<(u64, Arc<RasterImage>)>>,
}

impl CompositeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published composite, if any.
    pub fn current(&self) -> Option<Arc<RasterImage>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|(_, image)| Arc::clone(image))
    }

    /// Install `image` unless a result with a newer sequence number already
    /// holds the slot. Returns whether the image became visible.
    pub fn publish(&self, seq: u64, image: Arc<RasterImage>) -> bool {
        let mut slot = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some((held, _)) = slot.as_ref()
            && *held >= seq
        {
            return false;
        }
        *slot = Some((seq, image));
        true
    }
}

/// Reacts to "pattern file selected" events: decodes the new pattern,
/// installs it on the mesh, re-renders, recomposites against the unchanged
/// static layers, and publishes last-wins.
#[derive(Debug)]
pub struct PatternSwapController<M: MeshRenderSurface> {
    mesh: tokio::sync::Mutex<M>,
    layers: SceneLayers,
    width: u32,
    height: u32,
    sequencer: SwapSequencer,
    slot: CompositeSlot,
}

/// The photographic layers that stay fixed across pattern swaps.
#[derive(Clone, Debug)]
pub struct SceneLayers {
    pub background: RasterImage,
    pub mask: Option<RasterImage>,
    pub highlight: Option<RasterImage>,
}

impl<M: MeshRenderSurface> PatternSwapController<M> {
    pub fn new(mesh: M, layers: SceneLayers, width: u32, height: u32) -> Self {
        Self {
            mesh: tokio::sync::Mutex::new(mesh),
            layers,
            width,
            height,
            sequencer: SwapSequencer::new(),
            slot: CompositeSlot::new(),
        }
    }

    /// The currently visible composite, if one has been published.
    pub fn current_composite(&self) -> Option<Arc<RasterImage>> {
        self.slot.current()
    }

    /// "Initial assets ready": composite with whatever texture the mesh
    /// already carries.
    pub async fn compose_initial(&self) -> MockweaveResult<SwapOutcome> {
        let seq = self.sequencer.issue();
        let rendered = {
            let mut mesh = self.mesh.lock().await;
            mesh.render_to_surface(self.width, self.height).await
        };
        self.finish_run(seq, rendered)
    }

    /// "Pattern file selected": decode, install, re-render, recomposite,
    /// publish. If a newer event arrives while this run is suspended, this
    /// run's result is discarded, not merged.
    pub async fn swap_pattern(&self, pattern_bytes: Vec<u8>) -> MockweaveResult<SwapOutcome> {
        let seq = self.sequencer.issue();

        let pattern = loader::load(&ImageSource::Bytes(pattern_bytes)).await?;
        if !self.sequencer.is_latest(seq) {
            debug!(seq, "pattern decoded but already superseded");
            return Ok(SwapOutcome::Superseded);
        }

        let rendered = {
            let mut mesh = self.mesh.lock().await;
            mesh.set_surface_texture(pattern);
            mesh.render_to_surface(self.width, self.height).await
        };
        self.finish_run(seq, rendered)
    }

    fn finish_run(
        &self,
        seq: u64,
        rendered: MockweaveResult<RasterImage>,
    ) -> MockweaveResult<SwapOutcome> {
        let superseded = !self.sequencer.is_latest(seq);
        let rendered = match rendered {
            Ok(image) => image,
            // A superseded run's failure is as invisible as its success would
            // have been; the last good composite stays up either way.
            Err(_) if superseded => {
                debug!(seq, "discarding failed stale run");
                return Ok(SwapOutcome::Superseded);
            }
            Err(err) => return Err(err),
        };
        if superseded {
            debug!(seq, "discarding stale render");
            return Ok(SwapOutcome::Superseded);
        }

        let spec = CompositeSpec {
            width: self.width,
            height: self.height,
            background: self.layers.background.clone(),
            mesh: rendered,
            mask: self.layers.mask.clone(),
            highlight: self.layers.highlight.clone(),
        };
        let image = compositor::composite(&spec)?;

        if self.slot.publish(seq, Arc::new(image)) {
            debug!(seq, "published composite");
            Ok(SwapOutcome::Published)
        } else {
            debug!(seq, "publish lost to newer run");
            Ok(SwapOutcome::Superseded)
        }
    }
}
