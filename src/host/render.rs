// Software rasterizer for the host.
// Orthographic top-down projection onto the XY plane; objects are drawn as
// flat footprints shaded by height, topmost first.

use thiserror::Error;

use super::image::PixelBuffer;
use super::layout::ViewState;
use super::scene::{ObjectKind, Primitive, Scene, SceneObject};

pub const MAX_SAMPLES: u32 = 16;
pub const MAX_RESOLUTION: u32 = 8192;
/// World units covered by the camera's shorter side at scale 1
pub const CAMERA_ORTHO_SCALE: f64 = 7.0;

const VIEWPORT_BACKGROUND: [u8; 4] = [57, 57, 57, 255];
const WORLD_BACKGROUND: [u8; 4] = [13, 13, 13, 255];
const DEFAULT_SURFACE: [f32; 4] = [0.8, 0.8, 0.8, 1.0];
const CAMERA_MARKER: [f32; 4] = [0.1, 0.1, 0.1, 1.0];
const LIGHT_MARKER: [f32; 4] = [1.0, 0.85, 0.3, 1.0];
/// Marker radius for cameras and lights, in pixels
const MARKER_RADIUS_PX: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("operation requires an active 3D viewport (current area: {0})")]
    NoViewportContext(String),

    #[error("no camera in scene")]
    NoCamera,

    #[error("resolution {width}x{height} out of range (1..=8192)")]
    BadResolution { width: u32, height: u32 },
}

/// Render options
#[derive(Debug, Clone, Copy)]
pub struct RenderPass {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    /// Draw cameras and lights as markers (viewport only)
    pub overlays: bool,
}

/// Rasterize `scene` as seen through `view`
pub fn rasterize(scene: &Scene, view: &ViewState, pass: RenderPass) -> PixelBuffer {
    let background = if pass.overlays {
        VIEWPORT_BACKGROUND
    } else {
        WORLD_BACKGROUND
    };
    let mut buffer = PixelBuffer::filled(pass.width, pass.height, background);
    if pass.width == 0 || pass.height == 0 {
        return buffer;
    }

    let units_per_px = view.extent / pass.width.min(pass.height) as f64;

    // Topmost first so the first hit wins
    let mut drawables: Vec<&SceneObject> = scene
        .objects()
        .iter()
        .filter(|o| o.visible && (pass.overlays || o.kind.is_mesh()))
        .collect();
    drawables.sort_by(|a, b| b.transform.location[2].total_cmp(&a.transform.location[2]));

    let colors: Vec<[f32; 4]> = drawables.iter().map(|o| surface_color(scene, o)).collect();
    let samples = pass.samples.clamp(1, MAX_SAMPLES);
    let offsets: Vec<(f64, f64)> = (0..samples)
        .map(|s| {
            let ox = (s as f64 + 0.5) / samples as f64;
            let oy = (0.5 + s as f64 * 0.618_033_988_7).fract();
            (ox, oy)
        })
        .collect();
    let bg = background.map(|c| c as f32 / 255.0);

    for py in 0..pass.height {
        for px in 0..pass.width {
            let mut acc = [0f32; 4];
            for &(ox, oy) in &offsets {
                let wx = view.center[0] + (px as f64 + ox - pass.width as f64 / 2.0) * units_per_px;
                let wy = view.center[1] - (py as f64 + oy - pass.height as f64 / 2.0) * units_per_px;

                let color = drawables
                    .iter()
                    .zip(&colors)
                    .find(|(o, _)| covers(o, wx, wy, units_per_px))
                    .map(|(o, c)| shade(*c, o.transform.location[2]))
                    .unwrap_or(bg);
                for c in 0..4 {
                    acc[c] += color[c];
                }
            }
            let n = samples as f32;
            buffer.set_pixel(px, py, acc.map(|v| ((v / n).clamp(0.0, 1.0) * 255.0).round() as u8));
        }
    }
    buffer
}

fn surface_color(scene: &Scene, object: &SceneObject) -> [f32; 4] {
    match object.kind {
        ObjectKind::Camera => CAMERA_MARKER,
        ObjectKind::Light(_) => LIGHT_MARKER,
        _ => scene.object_color(object).unwrap_or(DEFAULT_SURFACE),
    }
}

/// Brighter the higher the object sits
fn shade(color: [f32; 4], z: f64) -> [f32; 4] {
    let factor = (0.6 + 0.4 * ((z + 5.0) / 10.0).clamp(0.0, 1.0)) as f32;
    [color[0] * factor, color[1] * factor, color[2] * factor, color[3]]
}

/// Does the object's footprint cover world point (wx, wy)?
fn covers(object: &SceneObject, wx: f64, wy: f64, units_per_px: f64) -> bool {
    let t = &object.transform;
    let dx = wx - t.location[0];
    let dy = wy - t.location[1];

    match object.kind {
        ObjectKind::Camera | ObjectKind::Light(_) => {
            let r = MARKER_RADIUS_PX * units_per_px;
            dx * dx + dy * dy <= r * r
        }
        ObjectKind::Empty => false,
        ObjectKind::Mesh(primitive) => {
            let (sin, cos) = (-t.rotation[2]).sin_cos();
            let sx = if t.scale[0].abs() < f64::EPSILON { f64::EPSILON } else { t.scale[0] };
            let sy = if t.scale[1].abs() < f64::EPSILON { f64::EPSILON } else { t.scale[1] };
            let lx = (dx * cos - dy * sin) / sx;
            let ly = (dx * sin + dy * cos) / sy;
            let r2 = lx * lx + ly * ly;
            match primitive {
                Primitive::Cube | Primitive::Plane => lx.abs() <= 1.0 && ly.abs() <= 1.0,
                Primitive::Torus => (0.5625..=1.5625).contains(&r2),
                _ => r2 <= 1.0,
            }
        }
    }
}
