// Scene queries and object CRUD.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::bridge::error::BridgeError;
use crate::host::Host;
use crate::host::scene::{ObjectKind, SceneObject, Transform};

use super::{HandlerResult, find_object, find_object_mut, round_vec};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SceneInfoParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Addresses one object by name
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectRef {
    #[serde(alias = "object_name", alias = "ref")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateObjectParams {
    #[serde(rename = "type", alias = "object_type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<[f64; 3]>,
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
    #[serde(default)]
    pub scale: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModifyObjectParams {
    #[serde(alias = "object_name", alias = "ref")]
    pub name: String,
    #[serde(default)]
    pub location: Option<[f64; 3]>,
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
    #[serde(default)]
    pub scale: Option<[f64; 3]>,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectParams {
    #[serde(alias = "object_names", alias = "refs")]
    pub names: Vec<String>,
    /// Replace the current selection (true) or extend it (false)
    #[serde(default = "default_deselect_all")]
    pub deselect_all: bool,
}

fn default_deselect_all() -> bool {
    true
}

fn summary(object: &SceneObject) -> Value {
    json!({
        "name": object.name,
        "type": object.kind.type_name(),
        "location": round_vec(object.transform.location),
        "rotation": round_vec(object.transform.rotation),
        "scale": round_vec(object.transform.scale),
    })
}

pub fn scene_info(host: &mut Host, params: SceneInfoParams) -> HandlerResult {
    let scene = &host.scene;
    let limit = params.limit.unwrap_or(usize::MAX);
    let objects: Vec<Value> = scene.objects().iter().take(limit).map(summary).collect();

    Ok(json!({
        "name": scene.name,
        "object_count": scene.len(),
        "materials_count": scene.materials_count(),
        "objects": objects,
        "selected": scene.selected(),
        "active": scene.active(),
    }))
}

pub fn object_info(host: &mut Host, params: ObjectRef) -> HandlerResult {
    let object = find_object(host, &params.name)?;
    let modifiers: Vec<&str> = object.modifiers.iter().map(|m| m.name.as_str()).collect();

    let mut info = json!({
        "name": object.name,
        "type": object.kind.type_name(),
        "location": object.transform.location,
        "rotation": object.transform.rotation,
        "scale": object.transform.scale,
        "visible": object.visible,
        "materials": object.materials,
        "modifiers": modifiers,
    });
    if let Some(mesh) = object.mesh {
        info["mesh"] = json!({
            "vertices": mesh.vertices,
            "edges": mesh.edges,
            "polygons": mesh.polygons,
        });
    }
    Ok(info)
}

pub fn create_object(host: &mut Host, params: CreateObjectParams) -> HandlerResult {
    let kind = params
        .kind
        .parse::<ObjectKind>()
        .map_err(|e| BridgeError::InvalidType(e.to_string()))?;

    let defaults = Transform::default();
    let transform = Transform {
        location: params.location.unwrap_or(defaults.location),
        rotation: params.rotation.unwrap_or(defaults.rotation),
        scale: params.scale.unwrap_or(defaults.scale),
    };
    let requested = params.name.unwrap_or_else(|| kind.default_name().to_string());
    let name = host.scene.add_object(&requested, kind, transform);

    Ok(json!({
        "name": name,
        "type": kind.type_name(),
        "location": transform.location,
    }))
}

pub fn modify_object(host: &mut Host, params: ModifyObjectParams) -> HandlerResult {
    let object = find_object_mut(host, &params.name)?;
    let mut modified = Vec::new();

    if let Some(location) = params.location {
        object.transform.location = location;
        modified.push("location");
    }
    if let Some(rotation) = params.rotation {
        object.transform.rotation = rotation;
        modified.push("rotation");
    }
    if let Some(scale) = params.scale {
        object.transform.scale = scale;
        modified.push("scale");
    }
    if let Some(visible) = params.visible {
        object.visible = visible;
        modified.push("visible");
    }

    Ok(json!({
        "name": object.name,
        "modified": modified,
        "location": object.transform.location,
        "rotation": object.transform.rotation,
        "scale": object.transform.scale,
        "visible": object.visible,
    }))
}

pub fn delete_object(host: &mut Host, params: ObjectRef) -> HandlerResult {
    host.scene
        .remove(&params.name)
        .ok_or_else(|| BridgeError::not_found("Object", &params.name))?;
    Ok(json!({ "deleted": params.name }))
}

pub fn select_objects(host: &mut Host, params: SelectParams) -> HandlerResult {
    host.scene
        .select(&params.names, params.deselect_all)
        .map_err(|missing| BridgeError::not_found("Object", missing))?;
    Ok(json!({
        "selected": host.scene.selected(),
        "active": host.scene.active(),
    }))
}
