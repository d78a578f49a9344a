//! Reactive preview controller for the upload flow.
//!
//! The controller owns the watermark session state: the selected source
//! image, the current [`WatermarkSettings`], and the render lifecycle that
//! keeps the displayed preview converging on the latest settings.
//!
//! Concurrency model: at most one render runs at a time. Every mutation
//! bumps a monotonic generation counter; a render captures the generation
//! it was dispatched for, and a completion whose generation no longer
//! matches is discarded without touching the resource store. When a stale
//! run finishes and the settings still call for a watermark, the newest
//! generation is dispatched immediately. Intermediate generations are
//! never rendered and never displayed.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use crate::upload::resources::{PreviewHandle, ResourceStore};
use crate::upload::source::{DecodeLimits, SourceImage, SourceImageInfo};
use crate::watermark::{
    ComposedPreview, Compositor, DecodeError, RenderError, WatermarkPosition, WatermarkSettings,
};

/// Rendering seam between the controller and the compositor, so tests can
/// script completions without touching real pixels.
#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    async fn render(
        &self,
        source: &SourceImage,
        settings: &WatermarkSettings,
    ) -> Result<ComposedPreview, RenderError>;
}

#[async_trait]
impl PreviewRenderer for Compositor {
    async fn render(
        &self,
        source: &SourceImage,
        settings: &WatermarkSettings,
    ) -> Result<ComposedPreview, RenderError> {
        let compositor = self.clone();
        let raster = source.raster();
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || compositor.compose(&raster, &settings))
            .await
            .map_err(|e| RenderError::TaskError(e.to_string()))?
    }
}

/// Externally visible render state of the preview session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    /// No composition is wanted; the raw preview (if any) is displayed
    Idle,
    /// A composition for `generation` is in flight
    Rendering { generation: u64 },
    /// The in-flight run was superseded; its completion will be dropped
    /// and the newest settings dispatched in its place
    DiscardingStale { generation: u64 },
    /// The displayed composition matches the current settings
    Ready { generation: u64 },
    /// The last attempt failed; the previous preview stays displayed
    Failed { generation: u64, message: String },
}

/// Snapshot of the session published through the watch channel.
#[derive(Debug, Clone)]
pub struct PreviewSnapshot {
    pub state: RenderState,
    pub generation: u64,
    /// What the page shows right now: the composed preview when one is
    /// live, else the raw preview, else nothing
    pub displayed: Option<PreviewHandle>,
    pub source: Option<SourceImageInfo>,
}

impl Default for PreviewSnapshot {
    fn default() -> Self {
        Self {
            state: RenderState::Idle,
            generation: 0,
            displayed: None,
            source: None,
        }
    }
}

/// Final payload handed to the upload transport on submit.
#[derive(Debug, Clone)]
pub struct UploadArtifact {
    pub source: SourceImageInfo,
    pub data: Bytes,
    pub content_type: &'static str,
    pub watermarked: bool,
}

struct ControllerState {
    source: Option<SourceImage>,
    settings: WatermarkSettings,
    generation: u64,
    /// Generation captured by the run currently executing, if any
    in_flight: Option<u64>,
    render_state: RenderState,
}

struct ControllerInner {
    renderer: Arc<dyn PreviewRenderer>,
    store: ResourceStore,
    limits: DecodeLimits,
    state: Mutex<ControllerState>,
    snapshot_tx: watch::Sender<PreviewSnapshot>,
}

/// Drives watermark previews for one upload session.
#[derive(Clone)]
pub struct PreviewController {
    inner: Arc<ControllerInner>,
}

impl PreviewController {
    pub fn new(
        renderer: Arc<dyn PreviewRenderer>,
        store: ResourceStore,
        limits: DecodeLimits,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(PreviewSnapshot::default());
        Self {
            inner: Arc::new(ControllerInner {
                renderer,
                store,
                limits,
                state: Mutex::new(ControllerState {
                    source: None,
                    settings: WatermarkSettings::default(),
                    generation: 0,
                    in_flight: None,
                    render_state: RenderState::Idle,
                }),
                snapshot_tx,
            }),
        }
    }

    /// Decode a newly selected photo and make it the session source.
    ///
    /// Resources of the previous source are released, the raw preview of
    /// the new one is registered, and the current settings are re-applied.
    /// A decode failure leaves the session untouched.
    pub async fn load_source(&self, bytes: Bytes) -> Result<SourceImageInfo, DecodeError> {
        let limits = self.inner.limits;
        let decoded = tokio::task::spawn_blocking(move || SourceImage::decode(bytes, &limits))
            .await
            .map_err(|e| DecodeError::unreadable(format!("decode task failed: {}", e)))??;

        let info = decoded.info();
        let raw_bytes = decoded.original_bytes();
        let content_type = decoded.content_type();

        let mut state = self.inner.state.lock();
        if let Some(previous) = state.source.take() {
            let released = self.inner.store.release_all(previous.id());
            tracing::debug!(source = %previous.id(), released, "replaced source image");
        }
        self.inner.store.insert_raw(info.id, raw_bytes, content_type);
        state.source = Some(decoded);
        state.generation += 1;
        tracing::info!(
            source = %info.id,
            width = info.width,
            height = info.height,
            generation = state.generation,
            "loaded source image"
        );
        self.reconcile(&mut state);
        self.publish_snapshot(&state);
        Ok(info)
    }

    /// Drop the current source and everything rendered for it.
    pub fn clear_source(&self) {
        let mut state = self.inner.state.lock();
        if let Some(source) = state.source.take() {
            let released = self.inner.store.release_all(source.id());
            tracing::info!(source = %source.id(), released, "cleared source image");
        }
        state.generation += 1;
        state.render_state = RenderState::Idle;
        self.publish_snapshot(&state);
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.update_settings(|settings| settings.set_text(text));
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update_settings(|settings| settings.set_enabled(enabled));
    }

    pub fn set_position(&self, position: WatermarkPosition) {
        self.update_settings(|settings| settings.set_position(position));
    }

    pub fn set_opacity(&self, opacity: u32) {
        self.update_settings(|settings| settings.set_opacity(opacity));
    }

    pub fn set_font_size(&self, font_size: u32) {
        self.update_settings(|settings| settings.set_font_size(font_size));
    }

    pub fn set_color(&self, color: impl Into<String>) {
        self.update_settings(|settings| settings.set_color(color));
    }

    /// Apply one settings mutation, advance the generation, and reconcile
    /// the render pipeline with the new desired state.
    pub fn update_settings(&self, mutate: impl FnOnce(&mut WatermarkSettings)) {
        let mut state = self.inner.state.lock();
        mutate(&mut state.settings);
        state.generation += 1;
        self.reconcile(&mut state);
        self.publish_snapshot(&state);
    }

    pub fn settings(&self) -> WatermarkSettings {
        self.inner.state.lock().settings.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    pub fn render_state(&self) -> RenderState {
        self.inner.state.lock().render_state.clone()
    }

    pub fn source_info(&self) -> Option<SourceImageInfo> {
        self.inner.state.lock().source.as_ref().map(SourceImage::info)
    }

    /// Current snapshot without subscribing.
    pub fn snapshot(&self) -> PreviewSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<PreviewSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Hand the displayed preview over for submission and tear the session
    /// down. The composed preview wins when one is live; otherwise the raw
    /// bytes are submitted unwatermarked.
    pub fn take_artifact(&self) -> Option<UploadArtifact> {
        let mut state = self.inner.state.lock();
        let info = state.source.as_ref()?.info();

        let (handle, watermarked) = match self.inner.store.composed_preview(info.id) {
            Some(handle) => (handle, true),
            None => (self.inner.store.raw_preview(info.id)?, false),
        };

        state.source = None;
        let released = self.inner.store.release_all(info.id);
        state.generation += 1;
        state.render_state = RenderState::Idle;

        let artifact = UploadArtifact {
            source: info,
            data: handle.data().clone(),
            content_type: handle.content_type(),
            watermarked,
        };
        tracing::info!(
            source = %info.id,
            watermarked,
            bytes = artifact.data.len(),
            released,
            "took upload artifact"
        );
        self.publish_snapshot(&state);
        Some(artifact)
    }

    /// Bring the render pipeline in line with the current source and
    /// settings. Called with the state lock held; never awaits.
    fn reconcile(&self, state: &mut ControllerState) {
        let renderable = state.source.is_some() && state.settings.should_render();

        if renderable {
            match state.in_flight {
                None => self.dispatch(state),
                Some(generation) if generation == state.generation => {}
                Some(generation) => {
                    // Latest wins: mark the running generation doomed. Its
                    // completion handler re-dispatches the newest settings.
                    state.render_state = RenderState::DiscardingStale { generation };
                    tracing::debug!(
                        stale = generation,
                        current = state.generation,
                        "superseding in-flight render"
                    );
                }
            }
        } else {
            // Watermark disabled or text blank: the composed preview is
            // released immediately and the raw preview shows again.
            if let Some(source) = &state.source {
                if self.inner.store.release_composed(source.id()) {
                    tracing::debug!(source = %source.id(), "released composed preview, watermark off");
                }
            }
            state.render_state = RenderState::Idle;
        }
    }

    /// Spawn a render for the current generation. Called with the state
    /// lock held; the spawned task re-locks on completion.
    fn dispatch(&self, state: &mut ControllerState) {
        let source = match &state.source {
            Some(source) => source.clone(),
            None => return,
        };
        let settings = state.settings.clone();
        let generation = state.generation;

        state.in_flight = Some(generation);
        state.render_state = RenderState::Rendering { generation };
        tracing::debug!(generation, "dispatching preview render");

        let controller = self.clone();
        tokio::spawn(async move {
            let result = controller.inner.renderer.render(&source, &settings).await;
            controller.finish_render(source.id(), generation, result);
        });
    }

    fn finish_render(
        &self,
        source_id: Uuid,
        generation: u64,
        result: Result<ComposedPreview, RenderError>,
    ) {
        let mut state = self.inner.state.lock();
        state.in_flight = None;

        let still_current = state.generation == generation
            && state.source.as_ref().map(SourceImage::id) == Some(source_id);

        if !still_current {
            // The result never reaches the store; dropping it here is its
            // entire lifecycle.
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding stale render result"
            );
            self.reconcile(&mut state);
            self.publish_snapshot(&state);
            return;
        }

        match result {
            Ok(preview) => {
                let handle = self.inner.store.publish(source_id, preview);
                state.render_state = RenderState::Ready { generation };
                tracing::debug!(generation, resource = %handle.id(), "preview ready");
            }
            Err(error) => {
                tracing::warn!(generation, error = %error, "preview composition failed");
                state.render_state = RenderState::Failed {
                    generation,
                    message: error.to_string(),
                };
            }
        }
        self.publish_snapshot(&state);
    }

    fn publish_snapshot(&self, state: &ControllerState) {
        let displayed = state.source.as_ref().and_then(|source| {
            self.inner
                .store
                .composed_preview(source.id())
                .or_else(|| self.inner.store.raw_preview(source.id()))
        });
        let snapshot = PreviewSnapshot {
            state: state.render_state.clone(),
            generation: state.generation,
            displayed,
            source: state.source.as_ref().map(SourceImage::info),
        };
        // send_replace keeps the stored snapshot current even with no
        // subscribers, so snapshot() never reads a stale value.
        self.inner.snapshot_tx.send_replace(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::resources::ResourceKind;
    use image::codecs::png::PngEncoder;
    use image::{ImageEncoder, RgbaImage};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let image = RgbaImage::new(width, height);
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(image.as_raw(), width, height, image::ColorType::Rgba8)
            .unwrap();
        Bytes::from(out)
    }

    /// Renderer that completes immediately and records its inputs.
    #[derive(Default)]
    struct InstantRenderer {
        calls: AtomicUsize,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl PreviewRenderer for InstantRenderer {
        async fn render(
            &self,
            source: &SourceImage,
            settings: &WatermarkSettings,
        ) -> Result<ComposedPreview, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(RenderError::FontError("scripted failure".to_string()));
            }
            Ok(ComposedPreview {
                data: Bytes::from(format!("preview:{}", settings.text())),
                content_type: "image/png",
                width: source.width(),
                height: source.height(),
            })
        }
    }

    fn controller_with(renderer: Arc<InstantRenderer>) -> PreviewController {
        PreviewController::new(renderer, ResourceStore::new(), DecodeLimits::default())
    }

    async fn wait_for_state(
        controller: &PreviewController,
        pred: impl Fn(&RenderState) -> bool,
    ) -> PreviewSnapshot {
        let mut rx = controller.subscribe();
        let snapshot = rx
            .wait_for(|snapshot| pred(&snapshot.state))
            .await
            .unwrap();
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_load_source_shows_raw_preview() {
        let controller = controller_with(Arc::new(InstantRenderer::default()));
        let bytes = png_bytes(40, 30);

        let info = controller.load_source(bytes.clone()).await.unwrap();
        assert_eq!((info.width, info.height), (40, 30));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, RenderState::Idle);
        let displayed = snapshot.displayed.unwrap();
        assert_eq!(displayed.kind(), ResourceKind::RawPreview);
        assert_eq!(displayed.data(), &bytes);
    }

    #[tokio::test]
    async fn test_disabled_watermark_never_renders() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        controller.load_source(png_bytes(16, 16)).await.unwrap();

        controller.set_text("For Sale");
        controller.set_position(WatermarkPosition::Center);
        controller.set_opacity(80);

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.render_state(), RenderState::Idle);
    }

    #[tokio::test]
    async fn test_blank_text_never_renders() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        controller.load_source(png_bytes(16, 16)).await.unwrap();

        controller.set_enabled(true);
        controller.set_text("   ");

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.render_state(), RenderState::Idle);
    }

    #[tokio::test]
    async fn test_enable_renders_and_displays_composed() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        controller.load_source(png_bytes(16, 16)).await.unwrap();

        controller.set_text("© Jane");
        controller.set_enabled(true);

        let snapshot =
            wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;
        let displayed = snapshot.displayed.unwrap();
        assert_eq!(displayed.kind(), ResourceKind::ComposedPreview);
        assert_eq!(displayed.data().as_ref(), b"preview:\xc2\xa9 Jane");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disable_reverts_to_raw_and_releases_composed() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        let bytes = png_bytes(16, 16);
        controller.load_source(bytes.clone()).await.unwrap();

        controller.set_text("mark");
        controller.set_enabled(true);
        wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;

        controller.set_enabled(false);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, RenderState::Idle);
        let displayed = snapshot.displayed.unwrap();
        assert_eq!(displayed.kind(), ResourceKind::RawPreview);
        assert_eq!(displayed.data(), &bytes);

        // One composed preview was allocated and released, raw stays live.
        let info = controller.source_info().unwrap();
        assert!(controller.inner.store.composed_preview(info.id).is_none());
    }

    #[tokio::test]
    async fn test_failed_render_keeps_previous_preview() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        controller.load_source(png_bytes(16, 16)).await.unwrap();

        controller.set_text("good");
        controller.set_enabled(true);
        wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;

        renderer.fail_next.store(true, Ordering::SeqCst);
        controller.set_text("bad");

        let snapshot =
            wait_for_state(&controller, |s| matches!(s, RenderState::Failed { .. })).await;
        match &snapshot.state {
            RenderState::Failed { message, .. } => {
                assert!(message.contains("scripted failure"), "message: {message}");
            }
            other => panic!("unexpected state: {other:?}"),
        }
        // Display still shows the last good composition.
        let displayed = snapshot.displayed.unwrap();
        assert_eq!(displayed.data().as_ref(), b"preview:good");
    }

    #[tokio::test]
    async fn test_replacing_source_releases_previous_resources() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());

        let first = controller.load_source(png_bytes(16, 16)).await.unwrap();
        controller.set_text("mark");
        controller.set_enabled(true);
        wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;

        let second = controller.load_source(png_bytes(32, 8)).await.unwrap();
        assert_ne!(first.id, second.id);

        // Settings survive the swap, so the new source re-renders.
        let snapshot =
            wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;
        assert_eq!(snapshot.source.unwrap().id, second.id);

        let store = &controller.inner.store;
        assert!(store.raw_preview(first.id).is_none());
        assert!(store.composed_preview(first.id).is_none());
        assert!(store.raw_preview(second.id).is_some());
    }

    #[tokio::test]
    async fn test_take_artifact_prefers_composed_and_tears_down() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        controller.load_source(png_bytes(16, 16)).await.unwrap();

        controller.set_text("mark");
        controller.set_enabled(true);
        wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;

        let artifact = controller.take_artifact().unwrap();
        assert!(artifact.watermarked);
        assert_eq!(artifact.data.as_ref(), b"preview:mark");

        assert!(controller.source_info().is_none());
        assert_eq!(controller.inner.store.stats().live, 0);
        assert!(controller.take_artifact().is_none());
        assert_eq!(controller.snapshot().state, RenderState::Idle);
    }

    #[tokio::test]
    async fn test_take_artifact_falls_back_to_raw() {
        let controller = controller_with(Arc::new(InstantRenderer::default()));
        let bytes = png_bytes(16, 16);
        controller.load_source(bytes.clone()).await.unwrap();

        let artifact = controller.take_artifact().unwrap();
        assert!(!artifact.watermarked);
        assert_eq!(artifact.data, bytes);
        assert_eq!(artifact.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_decode_failure_leaves_session_untouched() {
        let controller = controller_with(Arc::new(InstantRenderer::default()));
        let bytes = png_bytes(16, 16);
        let info = controller.load_source(bytes).await.unwrap();

        let err = controller
            .load_source(Bytes::from_static(b"not an image"))
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unreadable { .. }));

        // The previous source and its raw preview are still in place.
        assert_eq!(controller.source_info().unwrap().id, info.id);
        assert!(controller.inner.store.raw_preview(info.id).is_some());
    }

    #[tokio::test]
    async fn test_clear_source_releases_everything() {
        let renderer = Arc::new(InstantRenderer::default());
        let controller = controller_with(renderer.clone());
        controller.load_source(png_bytes(16, 16)).await.unwrap();
        controller.set_text("mark");
        controller.set_enabled(true);
        wait_for_state(&controller, |s| matches!(s, RenderState::Ready { .. })).await;

        controller.clear_source();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, RenderState::Idle);
        assert!(snapshot.displayed.is_none());
        assert!(snapshot.source.is_none());
        assert_eq!(controller.inner.store.stats().live, 0);
    }

    #[tokio::test]
    async fn test_generation_increases_monotonically() {
        let controller = controller_with(Arc::new(InstantRenderer::default()));
        let start = controller.generation();

        controller.set_text("a");
        controller.set_opacity(40);
        controller.set_enabled(true);

        assert_eq!(controller.generation(), start + 3);
    }
}
