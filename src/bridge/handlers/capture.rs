// Screenshot and render capture.
// Idle-tick commands have no active context, so the screenshot handler installs one.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::bridge::error::BridgeError;
use crate::host::Host;
use crate::host::image::PixelBuffer;
use crate::host::render::MAX_SAMPLES;

use super::HandlerResult;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ScreenshotParams {
    #[serde(default)]
    pub max_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RenderParams {
    #[serde(default)]
    pub resolution_x: Option<u32>,
    #[serde(default)]
    pub resolution_y: Option<u32>,
    #[serde(default)]
    pub samples: Option<u32>,
}

pub fn screenshot(host: &mut Host, params: ScreenshotParams, default_max_size: u32) -> HandlerResult {
    let target = host
        .layout
        .find_viewport()
        .ok_or_else(|| BridgeError::Capture("No 3D viewport found".to_string()))?;

    let pixels = {
        let guard = host.temp_override(target);
        guard
            .render_viewport()
            .map_err(|e| BridgeError::Capture(e.to_string()))?
    };

    let max_size = params.max_size.unwrap_or(default_max_size).max(1);
    let image = pixels.resize_to_fit(max_size);
    image_payload(&image).map_err(BridgeError::Capture)
}

pub fn render(host: &mut Host, params: RenderParams) -> HandlerResult {
    let defaults = host.render_settings;
    let width = params.resolution_x.unwrap_or(defaults.resolution_x);
    let height = params.resolution_y.unwrap_or(defaults.resolution_y);
    let samples = params.samples.unwrap_or(defaults.samples);

    let image = host
        .render_camera(width, height, samples)
        .map_err(|e| BridgeError::Render(e.to_string()))?;

    let mut payload = image_payload(&image).map_err(BridgeError::Render)?;
    payload["samples"] = json!(samples.clamp(1, MAX_SAMPLES));
    Ok(payload)
}

fn image_payload(image: &PixelBuffer) -> Result<Value, String> {
    let png = image.encode_png().map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(json!({
        "image_data": STANDARD.encode(png),
        "width": image.width(),
        "height": image.height(),
        "format": "png",
    }))
}
