//! Method-call argument parsing.
//!
//! Arguments arrive as a JSON object. Required fields are checked before any
//! render work is scheduled; a failure here is always `bad_args`.

use luma_core::{
    AdjustmentParameters, AssetRef, ExportRequest, GeometrySpec, NormalizedRect, PreviewRequest,
};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::BridgeError;

/// Method name for a downscaled preview render.
pub const RENDER_PREVIEW: &str = "renderPreview";
/// Method name for a full-resolution export.
pub const EXPORT_FULL_RES: &str = "exportFullRes";

/// Parsed preview call.
#[derive(Debug, Clone)]
pub struct PreviewCall {
    /// Caller correlation id, echoed on the reply.
    pub request_id: Option<i64>,
    pub request: PreviewRequest,
}

/// Parsed export call.
#[derive(Debug, Clone)]
pub struct ExportCall {
    pub request: ExportRequest,
}

/// A recognized, fully parsed method call.
#[derive(Debug, Clone)]
pub enum MethodCall {
    RenderPreview(PreviewCall),
    ExportFullRes(ExportCall),
}

impl MethodCall {
    /// Parse a method name and its JSON arguments.
    pub fn parse(method: &str, args: &Value) -> Result<Self, BridgeError> {
        match method {
            RENDER_PREVIEW => parse_preview(args).map(MethodCall::RenderPreview),
            EXPORT_FULL_RES => parse_export(args).map(MethodCall::ExportFullRes),
            other => Err(BridgeError::not_implemented(other)),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            MethodCall::RenderPreview(_) => RENDER_PREVIEW,
            MethodCall::ExportFullRes(_) => EXPORT_FULL_RES,
        }
    }

    pub fn request_id(&self) -> Option<i64> {
        match self {
            MethodCall::RenderPreview(call) => call.request_id,
            MethodCall::ExportFullRes(_) => None,
        }
    }
}

fn parse_preview(args: &Value) -> Result<PreviewCall, BridgeError> {
    let fields = as_object(args)?;
    let asset = asset_id(fields)?;
    let params = values(fields)?;
    let max_side = match field(fields, "maxSide") {
        Some(value) => positive_int(value, "maxSide")?,
        None => return Err(BridgeError::bad_args("maxSide is required")),
    };

    Ok(PreviewCall {
        request_id: optional_int(fields, "requestId")?,
        request: PreviewRequest {
            asset,
            params,
            geometry: geometry(fields)?,
            max_side,
            quality: optional_number(fields, "quality")?.map(|q| q as f32),
            grain_seed: None,
        },
    })
}

fn parse_export(args: &Value) -> Result<ExportCall, BridgeError> {
    let fields = as_object(args)?;
    Ok(ExportCall {
        request: ExportRequest {
            asset: asset_id(fields)?,
            params: values(fields)?,
            geometry: geometry(fields)?,
            quality: optional_number(fields, "quality")?.map(|q| q as f32),
            grain_seed: None,
        },
    })
}

fn as_object(args: &Value) -> Result<&Map<String, Value>, BridgeError> {
    args.as_object()
        .ok_or_else(|| BridgeError::bad_args("arguments must be an object"))
}

/// A present, non-null field.
fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn asset_id(fields: &Map<String, Value>) -> Result<AssetRef, BridgeError> {
    match field(fields, "assetId") {
        Some(Value::String(id)) if !id.is_empty() => Ok(AssetRef::new(id.as_str())),
        Some(_) => Err(BridgeError::bad_args("assetId must be a non-empty string")),
        None => Err(BridgeError::bad_args("assetId is required")),
    }
}

fn values(fields: &Map<String, Value>) -> Result<AdjustmentParameters, BridgeError> {
    let map = match field(fields, "values") {
        Some(Value::Object(map)) => map,
        Some(_) => return Err(BridgeError::bad_args("values must be an object")),
        None => return Err(BridgeError::bad_args("values is required")),
    };

    let mut params = AdjustmentParameters::default();
    for (name, value) in map {
        let Some(number) = value.as_f64() else {
            return Err(BridgeError::bad_args(format!("values.{} must be a number", name)));
        };
        if !params.set(name, number as f32) {
            warn!(name = %name, "Ignoring unknown adjustment");
        }
    }
    Ok(params)
}

fn geometry(fields: &Map<String, Value>) -> Result<Option<GeometrySpec>, BridgeError> {
    let aspect = optional_number(fields, "cropAspect")?;
    let turns = optional_int(fields, "rotationTurns")?;
    let straighten = optional_number(fields, "straightenDegrees")?;
    let rect = match field(fields, "cropRect") {
        Some(value) => Some(crop_rect(value)?),
        None => None,
    };

    if aspect.is_none() && turns.is_none() && straighten.is_none() && rect.is_none() {
        return Ok(None);
    }
    Ok(Some(GeometrySpec {
        aspect,
        rect,
        rotation_turns: turns.unwrap_or(0),
        straighten_degrees: straighten.unwrap_or(0.0),
    }))
}

fn crop_rect(value: &Value) -> Result<NormalizedRect, BridgeError> {
    let Some(map) = value.as_object() else {
        return Err(BridgeError::bad_args("cropRect must be an object"));
    };
    let component = |key: &str| {
        map.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| BridgeError::bad_args(format!("cropRect.{} must be a number", key)))
    };
    Ok(NormalizedRect::new(
        component("x")?,
        component("y")?,
        component("w")?,
        component("h")?,
    ))
}

fn optional_number(fields: &Map<String, Value>, key: &str) -> Result<Option<f64>, BridgeError> {
    match field(fields, key) {
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| BridgeError::bad_args(format!("{} must be a number", key))),
        None => Ok(None),
    }
}

fn optional_int(fields: &Map<String, Value>, key: &str) -> Result<Option<i64>, BridgeError> {
    match field(fields, key) {
        Some(value) => integer(value, key).map(Some),
        None => Ok(None),
    }
}

/// Integers may arrive as whole-valued floats from loosely typed callers.
fn integer(value: &Value, key: &str) -> Result<i64, BridgeError> {
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    match value.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(BridgeError::bad_args(format!("{} must be an integer", key))),
    }
}

fn positive_int(value: &Value, key: &str) -> Result<u32, BridgeError> {
    let v = integer(value, key)?;
    if v <= 0 {
        return Err(BridgeError::bad_args(format!("{} must be positive", key)));
    }
    u32::try_from(v).map_err(|_| BridgeError::bad_args(format!("{} is out of range", key)))
}
