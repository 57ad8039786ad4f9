//! Asset libraries on disk.
//!
//! A library is a directory of `.scene` files. Each file is one asset: a
//! JSON document listing the objects (and optionally the materials) that
//! appending it adds to the current scene.
//!
//! ```json
//! {
//!   "materials": [{"name": "Wood", "color": [0.5, 0.3, 0.1, 1.0]}],
//!   "objects": [
//!     {"name": "Seat", "type": "cube", "location": [0, 0, 0.5], "scale": [1, 1, 0.1], "materials": ["Wood"]}
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scene::{Material, ObjectKind, Scene, SceneObject, Transform};

pub const ASSET_EXTENSION: &str = "scene";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse asset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid object '{object}' in asset {asset}: {reason}")]
    InvalidObject {
        asset: String,
        object: String,
        reason: String,
    },
}

/// A configured asset library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLibrary {
    pub name: String,
    pub path: PathBuf,
}

/// One asset file in a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEntry {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetDocument {
    #[serde(default)]
    pub materials: Vec<Material>,
    pub objects: Vec<AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub location: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default)]
    pub materials: Vec<String>,
}

fn unit_scale() -> [f64; 3] {
    [1.0; 3]
}

fn visible() -> bool {
    true
}

impl AssetLibrary {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Every asset in the library, sorted by name
    pub fn list(&self) -> Result<Vec<AssetEntry>, AssetError> {
        let entries = fs::read_dir(&self.path).map_err(|source| AssetError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut assets: Vec<AssetEntry> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_asset_file(path))
            .filter_map(|path| {
                let name = path.file_stem()?.to_str()?.to_string();
                let file = path.file_name()?.to_str()?.to_string();
                Some(AssetEntry { name, file })
            })
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    /// Read and parse one asset. `asset` may be given with or without the extension.
    pub fn load(&self, asset: &str) -> Result<AssetDocument, AssetError> {
        let stem = asset
            .strip_suffix(&format!(".{}", ASSET_EXTENSION))
            .unwrap_or(asset);
        if stem.is_empty() || stem.contains(['/', '\\']) || stem == ".." {
            return Err(AssetError::NotFound(asset.to_string()));
        }

        let path = self.path.join(format!("{}.{}", stem, ASSET_EXTENSION));
        if !path.is_file() {
            return Err(AssetError::NotFound(asset.to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AssetError::Parse { path, source })
    }
}

fn is_asset_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ASSET_EXTENSION)
}

/// Case-insensitive substring filter on asset names
pub fn search<'a>(assets: &'a [AssetEntry], query: Option<&str>) -> Vec<&'a AssetEntry> {
    match query.map(str::to_lowercase) {
        Some(q) if !q.is_empty() => assets
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&q))
            .collect(),
        _ => assets.iter().collect(),
    }
}

/// Add every object of `doc` to the scene, shifted by `offset`.
///
/// All object types are checked before anything is added, so a bad document
/// leaves the scene untouched. Returns the names the objects ended up with.
pub fn append(
    scene: &mut Scene,
    asset: &str,
    doc: &AssetDocument,
    offset: [f64; 3],
) -> Result<Vec<String>, AssetError> {
    let kinds = doc
        .objects
        .iter()
        .map(|o| {
            o.kind.parse::<ObjectKind>().map_err(|e| AssetError::InvalidObject {
                asset: asset.to_string(),
                object: o.name.clone(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for material in &doc.materials {
        scene.upsert_material(&material.name, material.color);
    }

    let names = doc
        .objects
        .iter()
        .zip(kinds)
        .map(|(o, kind)| {
            let transform = Transform {
                location: [
                    o.location[0] + offset[0],
                    o.location[1] + offset[1],
                    o.location[2] + offset[2],
                ],
                rotation: o.rotation,
                scale: o.scale,
            };
            let mut object = SceneObject::new(o.name.clone(), kind, transform);
            object.visible = o.visible;
            object.materials = o.materials.clone();
            scene.insert(object)
        })
        .collect();
    Ok(names)
}
