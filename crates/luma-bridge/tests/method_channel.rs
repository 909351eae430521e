//! Method-channel behavior as seen by a host process.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use luma_bridge::{
    handle_method_call, CancelToken, ErrorCode, LatestOnly, Payload, RenderService, Reply,
};
use luma_core::{MemoryAssetStore, RenderConfig, SourceAsset};
use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(60);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 90]);
        }
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&pixels, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

fn setup() -> (Arc<MemoryAssetStore>, RenderService) {
    init_tracing();
    let store = Arc::new(MemoryAssetStore::new());
    store.insert("wide", SourceAsset::new(png(200, 100)));
    let config = RenderConfig {
        workers: 2,
        ..Default::default()
    };
    let service = RenderService::new(config, store.clone()).unwrap();
    (store, service)
}

fn call(service: &RenderService, method: &str, args: serde_json::Value) -> Reply {
    let (tx, rx) = mpsc::channel();
    handle_method_call(service, method, &args, &CancelToken::new(), tx).unwrap();
    rx.recv_timeout(TIMEOUT).unwrap()
}

fn jpeg_dimensions(reply: Reply) -> (u32, u32) {
    match reply.outcome {
        Ok(Payload::Bytes(bytes)) => {
            let img = image::load_from_memory(&bytes).unwrap();
            (img.width(), img.height())
        }
        other => panic!("expected JPEG bytes, got {:?}", other),
    }
}

#[test]
fn render_preview_returns_bounded_jpeg() {
    let (_, service) = setup();
    let reply = call(
        &service,
        "renderPreview",
        json!({
            "assetId": "wide",
            "values": {"exposure": 0.3, "vignette": 0.5},
            "maxSide": 50,
            "requestId": 12,
        }),
    );
    assert_eq!(reply.request_id, Some(12));
    assert_eq!(jpeg_dimensions(reply), (50, 25));
}

#[test]
fn render_preview_applies_geometry() {
    let (_, service) = setup();
    let reply = call(
        &service,
        "renderPreview",
        json!({
            "assetId": "wide",
            "values": {},
            "maxSide": 400,
            "rotationTurns": 1,
            "cropRect": {"x": 0.0, "y": 0.0, "w": 1.0, "h": 0.5},
        }),
    );
    // Turned to 100x200, then the top half kept
    assert_eq!(jpeg_dimensions(reply), (100, 100));
}

#[test]
fn missing_arguments_are_bad_args_and_schedule_nothing() {
    let (store, service) = setup();
    let (tx, rx) = mpsc::channel();

    let err = handle_method_call(
        &service,
        "renderPreview",
        &json!({"assetId": "wide", "values": {}}),
        &CancelToken::new(),
        tx,
    )
    .unwrap_err();

    assert_eq!(err.code, ErrorCode::BadArgs);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(store.permission_requests(), 0);
}

#[test]
fn unknown_method_is_not_implemented() {
    let (_, service) = setup();
    let (tx, _rx) = mpsc::channel();
    let err = handle_method_call(&service, "deleteAsset", &json!({}), &CancelToken::new(), tx)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotImplemented);
}

#[test]
fn missing_asset_is_render_failed() {
    let (_, service) = setup();
    let reply = call(
        &service,
        "renderPreview",
        json!({"assetId": "nope", "values": {}, "maxSide": 10}),
    );
    assert_eq!(reply.outcome.unwrap_err().code, ErrorCode::RenderFailed);
}

#[test]
fn export_saves_full_resolution() {
    let (store, service) = setup();
    let reply = call(
        &service,
        "exportFullRes",
        json!({"assetId": "wide", "values": {"contrast": 0.4}, "maxSide": 10}),
    );

    assert_eq!(reply.method, "exportFullRes");
    match reply.outcome {
        Ok(Payload::Status(status)) => assert_eq!(status.as_str(), "saved"),
        other => panic!("expected saved, got {:?}", other),
    }
    let written = store.written();
    assert_eq!(written.len(), 1);
    let img = image::load_from_memory(&written[0]).unwrap();
    assert_eq!((img.width(), img.height()), (200, 100));
}

#[test]
fn export_permission_denied_is_export_failed_without_write() {
    let (store, service) = setup();
    store.set_permission(false);

    let reply = call(&service, "exportFullRes", json!({"assetId": "wide", "values": {}}));

    assert_eq!(reply.outcome.unwrap_err().code, ErrorCode::ExportFailed);
    assert_eq!(store.permission_requests(), 1);
    assert_eq!(store.write_attempts(), 0);
}

#[test]
fn cancelled_before_submission_is_rejected() {
    let (_, service) = setup();
    let (tx, rx) = mpsc::channel();
    let token = CancelToken::new();
    token.cancel();

    let err = handle_method_call(
        &service,
        "renderPreview",
        &json!({"assetId": "wide", "values": {}, "maxSide": 10, "requestId": 1}),
        &token,
        tx,
    )
    .unwrap_err();

    assert_eq!(err.code, ErrorCode::Cancelled);
    assert!(rx.recv().is_err());
}

#[test]
fn latest_only_keeps_the_newest_preview() {
    let (_, service) = setup();
    let latest = LatestOnly::new();
    let (tx, rx) = mpsc::channel();

    for id in 1..=4 {
        latest.submitted(id);
        handle_method_call(
            &service,
            "renderPreview",
            &json!({"assetId": "wide", "values": {"grain": 0.2}, "maxSide": 32, "requestId": id}),
            &CancelToken::new(),
            tx.clone(),
        )
        .unwrap();
    }
    drop(tx);

    let delivered: Vec<Reply> = rx.iter().collect();
    assert_eq!(delivered.len(), 4);
    let kept: Vec<i64> = delivered
        .into_iter()
        .filter_map(|reply| latest.filter(reply))
        .filter_map(|reply| reply.request_id)
        .collect();
    assert_eq!(kept, vec![4]);
}

#[test]
fn grain_free_previews_are_byte_identical() {
    let (_, service) = setup();
    let args = json!({"assetId": "wide", "values": {"exposure": 0.2}, "maxSide": 64});
    let first = call(&service, "renderPreview", args.clone());
    let second = call(&service, "renderPreview", args);
    assert_eq!(first.outcome.unwrap(), second.outcome.unwrap());
}
