//! Renderer: the preview and export entry points.
//!
//! ```text
//! fetch -> decode -> geometry -> adjustments -> (preview) resample -> encode
//! ```
//!
//! A [`Renderer`] holds only immutable configuration. One instance can be
//! shared by reference across any number of worker threads.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::color::to_working;
use crate::config::RenderConfig;
use crate::decode::{decode_source, read_orientation, DecodedImage, Orientation};
use crate::effects::GrainSeed;
use crate::encode::encode;
use crate::error::RenderError;
use crate::pipeline::apply_adjustments;
use crate::resample::resize_to_fit;
use crate::store::{AssetRef, AssetStore};
use crate::transform::{normalize_geometry, GeometrySpec};
use crate::AdjustmentParameters;

/// Output tier. The operator chain is identical in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Fast straighten sampling, optional downscale
    Preview,
    /// High-quality straighten sampling, full resolution
    Export,
}

/// A fully resolved render: source pixels plus everything done to them.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: DecodedImage,
    /// Orientation of `source` as stored.
    pub orientation: Orientation,
    pub geometry: Option<GeometrySpec>,
    pub params: AdjustmentParameters,
    /// Longest output side; honored by the preview tier only.
    pub max_side: Option<u32>,
    /// JPEG quality on a 0 to 1 scale, clamped.
    pub quality: f32,
    /// Grain seed; a fresh one is drawn when `None`.
    pub grain_seed: Option<GrainSeed>,
}

impl RenderRequest {
    pub fn new(source: DecodedImage, params: AdjustmentParameters, quality: f32) -> Self {
        Self {
            source,
            orientation: Orientation::Normal,
            geometry: None,
            params,
            max_side: None,
            quality,
            grain_seed: None,
        }
    }
}

/// Preview of a stored asset.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub asset: AssetRef,
    pub params: AdjustmentParameters,
    pub geometry: Option<GeometrySpec>,
    pub max_side: u32,
    /// Falls back to the preview tier's configured quality.
    pub quality: Option<f32>,
    pub grain_seed: Option<GrainSeed>,
}

/// Full-resolution export of a stored asset.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub asset: AssetRef,
    pub params: AdjustmentParameters,
    pub geometry: Option<GeometrySpec>,
    /// Falls back to the export tier's configured quality.
    pub quality: Option<f32>,
    pub grain_seed: Option<GrainSeed>,
}

/// Outcome of a successful export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Saved,
}

impl ExportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportStatus::Saved => "saved",
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering pipeline with its configuration.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: Arc<RenderConfig>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_shared(Arc::new(config.sanitize()))
    }

    pub fn with_shared(config: Arc<RenderConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a resolved request to JPEG bytes.
    #[instrument(
        skip(self, request),
        fields(width = request.source.width, height = request.source.height)
    )]
    pub fn render(&self, request: &RenderRequest, tier: Tier) -> Result<Vec<u8>, RenderError> {
        if request.max_side == Some(0) {
            return Err(RenderError::InputError("maxSide must be positive".into()));
        }
        if !request.source.is_consistent() {
            return Err(RenderError::InputError(format!(
                "source buffer holds {} bytes, expected {}",
                request.source.pixels.len(),
                request.source.expected_len()
            )));
        }
        let tier_config = self.config.tier(tier);

        let mut image = normalize_geometry(
            to_working(&request.source),
            request.orientation,
            request.geometry.as_ref(),
            tier_config.filter,
        );

        let seed = request.grain_seed.unwrap_or_else(GrainSeed::random);
        apply_adjustments(&mut image, &request.params, &self.config.operators, seed);

        if tier == Tier::Preview {
            image = resize_to_fit(image, request.max_side);
        }

        let bytes = encode(&image, request.quality)?;
        debug!(
            width = image.width(),
            height = image.height(),
            len = bytes.len(),
            "Encoded"
        );
        Ok(bytes)
    }

    /// Render a downscaled preview of a stored asset.
    #[instrument(
        skip(self, store, request),
        fields(asset = %request.asset, max_side = request.max_side)
    )]
    pub fn render_preview(
        &self,
        store: &dyn AssetStore,
        request: &PreviewRequest,
    ) -> Result<Vec<u8>, RenderError> {
        let (source, orientation) = load_source(store, &request.asset)?;
        let render = RenderRequest {
            source,
            orientation,
            geometry: request.geometry,
            params: request.params,
            max_side: Some(request.max_side),
            quality: request.quality.unwrap_or(self.config.preview.quality),
            grain_seed: request.grain_seed,
        };
        self.render(&render, Tier::Preview)
    }

    /// Render at full resolution and save the result as a new asset.
    ///
    /// Encoding must succeed before write permission is requested, and the
    /// store write is attempted only once permission is granted.
    #[instrument(skip(self, store, request), fields(asset = %request.asset))]
    pub fn export_full_res(
        &self,
        store: &dyn AssetStore,
        request: &ExportRequest,
    ) -> Result<ExportStatus, RenderError> {
        let (source, orientation) = load_source(store, &request.asset)?;
        let render = RenderRequest {
            source,
            orientation,
            geometry: request.geometry,
            params: request.params,
            max_side: None,
            quality: request.quality.unwrap_or(self.config.export.quality),
            grain_seed: request.grain_seed,
        };
        let bytes = self.render(&render, Tier::Export)?;

        if !store.request_write_permission()? {
            info!("Export write permission denied");
            return Err(RenderError::PermissionDenied);
        }
        store.write_new_asset(&bytes)?;

        info!(len = bytes.len(), "Export saved");
        Ok(ExportStatus::Saved)
    }
}

/// Fetch and decode an asset, resolving its orientation.
fn load_source(
    store: &dyn AssetStore,
    asset: &AssetRef,
) -> Result<(DecodedImage, Orientation), RenderError> {
    let fetched = store.fetch(asset)?;
    let source = decode_source(&fetched.bytes)?;
    let orientation = fetched
        .orientation
        .unwrap_or_else(|| read_orientation(&fetched.bytes));
    debug!(
        width = source.width,
        height = source.height,
        ?orientation,
        srgb = source.is_srgb(),
        "Decoded source"
    );
    Ok((source, orientation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodeError;
    use crate::encode::EncodeError;
    use crate::store::{MemoryAssetStore, SourceAsset};
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    fn gradient(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[
                    (x * 255 / width) as u8,
                    (y * 255 / height) as u8,
                    96,
                ]);
            }
        }
        DecodedImage::new(width, height, pixels)
    }

    fn png_bytes(image: &DecodedImage) -> Vec<u8> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&image.pixels, image.width, image.height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    fn store_with(id: &str, width: u32, height: u32) -> MemoryAssetStore {
        let store = MemoryAssetStore::new();
        store.insert(id, SourceAsset::new(png_bytes(&gradient(width, height))));
        store
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(bytes).unwrap();
        (img.width(), img.height())
    }

    fn preview(id: &str, max_side: u32) -> PreviewRequest {
        PreviewRequest {
            asset: AssetRef::new(id),
            params: AdjustmentParameters::default(),
            geometry: None,
            max_side,
            quality: None,
            grain_seed: None,
        }
    }

    fn export(id: &str) -> ExportRequest {
        ExportRequest {
            asset: AssetRef::new(id),
            params: AdjustmentParameters::default(),
            geometry: None,
            quality: None,
            grain_seed: None,
        }
    }

    #[test]
    fn test_render_preview_downscales() {
        let store = store_with("a", 80, 40);
        let bytes = Renderer::default()
            .render_preview(&store, &preview("a", 20))
            .unwrap();
        assert_eq!(decoded_dimensions(&bytes), (20, 10));
    }

    #[test]
    fn test_export_ignores_max_side() {
        let renderer = Renderer::default();
        let mut request = RenderRequest::new(gradient(30, 20), Default::default(), 0.9);
        request.max_side = Some(10);

        let bytes = renderer.render(&request, Tier::Export).unwrap();
        assert_eq!(decoded_dimensions(&bytes), (30, 20));
    }

    #[test]
    fn test_zero_max_side_is_input_error() {
        let mut request = RenderRequest::new(gradient(8, 8), Default::default(), 0.9);
        request.max_side = Some(0);
        let result = Renderer::default().render(&request, Tier::Preview);
        assert!(matches!(result, Err(RenderError::InputError(_))));
    }

    #[test]
    fn test_short_buffer_is_input_error() {
        let source = DecodedImage::new(8, 8, vec![0; 30]);
        let request = RenderRequest::new(source, Default::default(), 0.9);
        let result = Renderer::default().render(&request, Tier::Export);
        assert!(matches!(result, Err(RenderError::InputError(_))));
    }

    #[test]
    fn test_store_orientation_is_applied() {
        let store = MemoryAssetStore::new();
        let asset = SourceAsset::new(png_bytes(&gradient(40, 20)))
            .with_orientation(Orientation::Rotate90CW);
        store.insert("rot", asset);
        let bytes = Renderer::default()
            .render_preview(&store, &preview("rot", 100))
            .unwrap();
        assert_eq!(decoded_dimensions(&bytes), (20, 40));
    }

    /// JPEG whose only metadata is an EXIF orientation tag.
    fn jpeg_with_exif_orientation(image: &DecodedImage, tag: u16) -> Vec<u8> {
        let jpeg = crate::encode::encode_jpeg(&image.pixels, image.width, image.height, 90)
            .unwrap();

        let mut tiff = b"MM\0\x2a\0\0\0\x08".to_vec();
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&tag.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_embedded_exif_orientation_is_applied() {
        let bytes = jpeg_with_exif_orientation(&gradient(40, 20), 6);
        assert_eq!(read_orientation(&bytes), Orientation::Rotate90CW);

        let store = MemoryAssetStore::new();
        store.insert("exif", SourceAsset::new(bytes));
        let out = Renderer::default()
            .render_preview(&store, &preview("exif", 100))
            .unwrap();
        assert_eq!(decoded_dimensions(&out), (20, 40));
    }

    #[test]
    fn test_store_orientation_wins_over_exif() {
        let bytes = jpeg_with_exif_orientation(&gradient(40, 20), 6);
        let store = MemoryAssetStore::new();
        store.insert(
            "both",
            SourceAsset::new(bytes).with_orientation(Orientation::Normal),
        );
        let out = Renderer::default()
            .render_preview(&store, &preview("both", 100))
            .unwrap();
        assert_eq!(decoded_dimensions(&out), (40, 20));
    }

    #[test]
    fn test_unbounded_preview_matches_export() {
        let store = store_with("a", 48, 32);
        let params = AdjustmentParameters {
            exposure: 0.4,
            contrast: 0.3,
            sharpen: 0.5,
            vignette: 0.6,
            grain: 0.4,
            ..Default::default()
        };
        let renderer = Renderer::default();

        let mut preview_request = preview("a", 48);
        preview_request.params = params;
        preview_request.quality = Some(0.9);
        preview_request.grain_seed = Some(GrainSeed(7));
        let preview_bytes = renderer.render_preview(&store, &preview_request).unwrap();

        let mut export_request = export("a");
        export_request.params = params;
        export_request.quality = Some(0.9);
        export_request.grain_seed = Some(GrainSeed(7));
        renderer.export_full_res(&store, &export_request).unwrap();

        assert_eq!(store.written(), vec![preview_bytes]);
    }

    #[test]
    fn test_output_is_tagged_srgb() {
        let store = store_with("a", 16, 16);
        let bytes = Renderer::default()
            .render_preview(&store, &preview("a", 16))
            .unwrap();
        let decoded = crate::decode::decode_source(&bytes).unwrap();
        assert_eq!(decoded.icc_profile.as_deref(), Some(crate::icc::srgb_profile()));
    }

    #[test]
    fn test_missing_asset() {
        let store = MemoryAssetStore::new();
        let result = Renderer::default().render_preview(&store, &preview("gone", 100));
        assert!(matches!(result, Err(RenderError::AssetNotFound(ref id)) if id == "gone"));
    }

    #[test]
    fn test_undecodable_asset() {
        let store = MemoryAssetStore::new();
        store.insert("junk", SourceAsset::new(vec![1, 2, 3, 4, 5, 6, 7, 8]));
        let result = Renderer::default().render_preview(&store, &preview("junk", 100));
        assert!(matches!(
            result,
            Err(RenderError::DecodeError(DecodeError::InvalidFormat))
        ));
    }

    #[test]
    fn test_export_saves() {
        let store = store_with("a", 32, 24);
        let status = Renderer::default().export_full_res(&store, &export("a")).unwrap();

        assert_eq!(status, ExportStatus::Saved);
        assert_eq!(status.to_string(), "saved");
        let written = store.written();
        assert_eq!(written.len(), 1);
        assert_eq!(decoded_dimensions(&written[0]), (32, 24));
    }

    #[test]
    fn test_export_permission_denied_never_writes() {
        let store = store_with("a", 32, 24);
        store.set_permission(false);

        let result = Renderer::default().export_full_res(&store, &export("a"));
        assert!(matches!(result, Err(RenderError::PermissionDenied)));
        assert_eq!(store.permission_requests(), 1);
        assert_eq!(store.write_attempts(), 0);
    }

    #[test]
    fn test_export_encode_failure_skips_permission() {
        // A 1px-wide source cannot be encoded
        let store = store_with("thin", 1, 24);
        let result = Renderer::default().export_full_res(&store, &export("thin"));

        assert!(matches!(
            result,
            Err(RenderError::EncodeError(EncodeError::DegenerateExtent { .. }))
        ));
        assert_eq!(store.permission_requests(), 0);
        assert_eq!(store.write_attempts(), 0);
    }

    #[test]
    fn test_export_write_rejected() {
        let store = store_with("a", 16, 16);
        store.set_reject_writes(true);
        let result = Renderer::default().export_full_res(&store, &export("a"));
        assert!(matches!(result, Err(RenderError::WriteError(_))));
    }

    #[test]
    fn test_renderer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Renderer>();
    }
}
