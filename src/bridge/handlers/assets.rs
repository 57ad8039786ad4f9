// Asset library commands.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::bridge::error::BridgeError;
use crate::host::Host;
use crate::host::assets::{self as library, AssetError, AssetLibrary};

use super::HandlerResult;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListAssetsParams {
    #[serde(alias = "library")]
    pub library_name: String,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppendAssetParams {
    #[serde(alias = "library")]
    pub library_name: String,
    #[serde(alias = "asset")]
    pub asset_name: String,
    #[serde(default)]
    pub location: [f64; 3],
}

fn find_library<'a>(host: &'a Host, name: &str) -> Result<&'a AssetLibrary, BridgeError> {
    host.asset_library(name)
        .ok_or_else(|| BridgeError::not_found("Asset library", name))
}

fn asset_error(command: &str, err: AssetError) -> BridgeError {
    match err {
        AssetError::NotFound(name) => BridgeError::not_found("Asset", name),
        AssetError::Io { .. } => BridgeError::Internal(err.to_string()),
        AssetError::Parse { .. } | AssetError::InvalidObject { .. } => {
            BridgeError::invalid_params(command, err.to_string())
        }
    }
}

pub fn get_asset_libraries(host: &mut Host) -> HandlerResult {
    let libraries: Vec<Value> = host
        .asset_libraries
        .iter()
        .map(|l| json!({ "name": l.name, "path": l.path }))
        .collect();
    Ok(Value::Array(libraries))
}

pub fn list_assets(host: &mut Host, params: ListAssetsParams) -> HandlerResult {
    let lib = find_library(host, &params.library_name)?;
    let all = lib.list().map_err(|e| asset_error("list_assets", e))?;
    let matches = library::search(&all, params.search.as_deref());

    let page: Vec<_> = matches.iter().skip(params.offset).take(params.limit).collect();
    Ok(json!({
        "library": lib.name,
        "total": matches.len(),
        "offset": params.offset,
        "limit": params.limit,
        "assets": page,
    }))
}

pub fn append_asset(host: &mut Host, params: AppendAssetParams) -> HandlerResult {
    let doc = find_library(host, &params.library_name)?
        .load(&params.asset_name)
        .map_err(|e| asset_error("append_asset", e))?;
    let names = library::append(&mut host.scene, &params.asset_name, &doc, params.location)
        .map_err(|e| asset_error("append_asset", e))?;

    Ok(json!({
        "appended_objects": names,
        "location": params.location,
    }))
}
