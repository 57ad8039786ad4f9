// Modifier stack commands.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::bridge::error::BridgeError;
use crate::host::Host;
use crate::host::modifier::{Modifier, ModifierKind, unique_modifier_name};
use crate::host::scene::SceneObject;

use super::{HandlerResult, find_object, find_object_mut};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectNameParams {
    #[serde(alias = "name")]
    pub object_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddModifierParams {
    #[serde(alias = "name")]
    pub object_name: String,
    #[serde(alias = "type")]
    pub modifier_type: String,
    #[serde(default)]
    pub modifier_name: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModifierRef {
    #[serde(alias = "name")]
    pub object_name: String,
    pub modifier_name: String,
}

fn describe(modifier: &Modifier) -> Value {
    json!({
        "name": modifier.name,
        "type": modifier.kind.type_name(),
        "properties": modifier.properties,
    })
}

fn modifier_index(object: &SceneObject, name: &str) -> Result<usize, BridgeError> {
    object
        .modifiers
        .iter()
        .position(|m| m.name == name)
        .ok_or_else(|| BridgeError::not_found("Modifier", format!("{} on {}", name, object.name)))
}

pub fn get_modifiers(host: &mut Host, params: ObjectNameParams) -> HandlerResult {
    let object = find_object(host, &params.object_name)?;
    let modifiers: Vec<Value> = object.modifiers.iter().map(describe).collect();
    Ok(Value::Array(modifiers))
}

pub fn add_modifier(host: &mut Host, params: AddModifierParams) -> HandlerResult {
    let object = find_object_mut(host, &params.object_name)?;
    if !object.kind.is_mesh() {
        return Err(BridgeError::InvalidType(format!(
            "{} is a {} object; modifiers need a mesh",
            object.name,
            object.kind.type_name()
        )));
    }
    let kind: ModifierKind = params.modifier_type.parse().map_err(BridgeError::InvalidType)?;

    let requested = params
        .modifier_name
        .unwrap_or_else(|| kind.default_name().to_string());
    let name = unique_modifier_name(&object.modifiers, &requested);
    let mut modifier = Modifier::new(name.clone(), kind);

    let mut applied = Map::new();
    let mut ignored = Vec::new();
    for (key, value) in params.properties {
        if modifier.set_property(&key, value.clone()) {
            applied.insert(key, value);
        } else {
            ignored.push(key);
        }
    }
    object.modifiers.push(modifier);

    Ok(json!({
        "modifier_name": name,
        "type": kind.type_name(),
        "properties": applied,
        "ignored_properties": ignored,
    }))
}

pub fn remove_modifier(host: &mut Host, params: ModifierRef) -> HandlerResult {
    let object = find_object_mut(host, &params.object_name)?;
    let index = modifier_index(object, &params.modifier_name)?;
    let removed = object.modifiers.remove(index);
    Ok(json!({ "removed": removed.name }))
}

/// Bake the modifier's effect into the mesh and drop it from the stack
pub fn apply_modifier(host: &mut Host, params: ModifierRef) -> HandlerResult {
    let object = find_object_mut(host, &params.object_name)?;
    let index = modifier_index(object, &params.modifier_name)?;
    // The stack only changes once the baked mesh is in hand
    let baked = object.mesh.map(|mesh| object.modifiers[index].apply_to(mesh));
    let modifier = object.modifiers.remove(index);
    if baked.is_some() {
        object.mesh = baked;
    }

    Ok(json!({
        "applied": modifier.name,
        "mesh": object.mesh,
    }))
}
