pub mod assets;
pub mod capture;
pub mod code;
pub mod meta;
pub mod modifiers;
pub mod scene;

use serde_json::Value;

use crate::host::Host;
use crate::host::scene::SceneObject;

use super::error::BridgeError;

pub type HandlerResult = Result<Value, BridgeError>;

pub(crate) fn find_object<'a>(host: &'a Host, name: &str) -> Result<&'a SceneObject, BridgeError> {
    host.scene
        .get(name)
        .ok_or_else(|| BridgeError::not_found("Object", name))
}

pub(crate) fn find_object_mut<'a>(host: &'a mut Host, name: &str) -> Result<&'a mut SceneObject, BridgeError> {
    host.scene
        .get_mut(name)
        .ok_or_else(|| BridgeError::not_found("Object", name))
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub(crate) fn round_vec(v: [f64; 3]) -> [f64; 3] {
    v.map(round2)
}
