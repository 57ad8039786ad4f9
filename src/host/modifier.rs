// Modifier stacks on mesh objects.
// Each modifier type has a fixed table of known properties with host defaults.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use super::scene::MeshStats;

/// Upper bound on ARRAY copies when applying
pub const MAX_ARRAY_COUNT: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    Subsurf,
    Bevel,
    Array,
    Mirror,
    Boolean,
    Solidify,
    Wireframe,
    Decimate,
    Remesh,
    Smooth,
    Shrinkwrap,
    Curve,
}

impl ModifierKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ModifierKind::Subsurf => "SUBSURF",
            ModifierKind::Bevel => "BEVEL",
            ModifierKind::Array => "ARRAY",
            ModifierKind::Mirror => "MIRROR",
            ModifierKind::Boolean => "BOOLEAN",
            ModifierKind::Solidify => "SOLIDIFY",
            ModifierKind::Wireframe => "WIREFRAME",
            ModifierKind::Decimate => "DECIMATE",
            ModifierKind::Remesh => "REMESH",
            ModifierKind::Smooth => "SMOOTH",
            ModifierKind::Shrinkwrap => "SHRINKWRAP",
            ModifierKind::Curve => "CURVE",
        }
    }

    /// Name a new modifier of this type gets when none is requested
    pub fn default_name(&self) -> &'static str {
        match self {
            ModifierKind::Subsurf => "Subdivision",
            ModifierKind::Bevel => "Bevel",
            ModifierKind::Array => "Array",
            ModifierKind::Mirror => "Mirror",
            ModifierKind::Boolean => "Boolean",
            ModifierKind::Solidify => "Solidify",
            ModifierKind::Wireframe => "Wireframe",
            ModifierKind::Decimate => "Decimate",
            ModifierKind::Remesh => "Remesh",
            ModifierKind::Smooth => "Smooth",
            ModifierKind::Shrinkwrap => "Shrinkwrap",
            ModifierKind::Curve => "Curve",
        }
    }

    /// Properties this modifier exposes, with their default values
    pub fn default_properties(&self) -> Map<String, Value> {
        let defaults = match self {
            ModifierKind::Subsurf => {
                json!({"levels": 1, "render_levels": 2, "uv_smooth": "PRESERVE_BOUNDARIES", "quality": 3})
            }
            ModifierKind::Bevel => {
                json!({"width": 0.1, "segments": 1, "limit_method": "ANGLE", "offset_type": "OFFSET"})
            }
            ModifierKind::Array => json!({
                "count": 2,
                "use_relative_offset": true,
                "use_constant_offset": false,
                "relative_offset_displace": [1.0, 0.0, 0.0],
                "constant_offset_displace": [1.0, 0.0, 0.0]
            }),
            ModifierKind::Mirror => json!({
                "use_axis": [true, false, false],
                "use_bisect_axis": [false, false, false],
                "merge_threshold": 0.001
            }),
            ModifierKind::Boolean => json!({"operation": "DIFFERENCE", "solver": "EXACT"}),
            ModifierKind::Solidify => {
                json!({"thickness": 0.01, "offset": -1.0, "use_even_offset": false})
            }
            ModifierKind::Wireframe => {
                json!({"thickness": 0.02, "use_replace": true, "use_even_offset": true})
            }
            ModifierKind::Decimate => {
                json!({"decimate_type": "COLLAPSE", "ratio": 1.0, "angle_limit": 0.0873})
            }
            ModifierKind::Remesh => json!({"mode": "VOXEL", "octree_depth": 4, "voxel_size": 0.1}),
            ModifierKind::Smooth => json!({"factor": 0.5, "iterations": 1}),
            ModifierKind::Shrinkwrap => {
                json!({"wrap_method": "NEAREST_SURFACEPOINT", "wrap_mode": "ON_SURFACE", "offset": 0.0})
            }
            ModifierKind::Curve => json!({"deform_axis": "POS_X"}),
        };
        match defaults {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ModifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_uppercase().as_str() {
            "SUBSURF" | "SUBDIVISION" => ModifierKind::Subsurf,
            "BEVEL" => ModifierKind::Bevel,
            "ARRAY" => ModifierKind::Array,
            "MIRROR" => ModifierKind::Mirror,
            "BOOLEAN" => ModifierKind::Boolean,
            "SOLIDIFY" => ModifierKind::Solidify,
            "WIREFRAME" => ModifierKind::Wireframe,
            "DECIMATE" => ModifierKind::Decimate,
            "REMESH" => ModifierKind::Remesh,
            "SMOOTH" => ModifierKind::Smooth,
            "SHRINKWRAP" => ModifierKind::Shrinkwrap,
            "CURVE" => ModifierKind::Curve,
            _ => return Err(format!("unsupported modifier type '{}'", s)),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
    pub properties: Map<String, Value>,
}

impl Modifier {
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: kind.default_properties(),
        }
    }

    /// Set a known property. Unknown names are rejected and left untouched.
    pub fn set_property(&mut self, key: &str, value: Value) -> bool {
        match self.properties.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn number(&self, key: &str, default: f64) -> f64 {
        self.properties
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Topology after applying this modifier to `mesh`
    pub fn apply_to(&self, mesh: MeshStats) -> MeshStats {
        match self.kind {
            ModifierKind::Subsurf => {
                // Catmull-Clark on quads: each level splits every face into four
                let levels = self.number("levels", 1.0).clamp(0.0, 6.0) as u32;
                (0..levels).fold(mesh, |m, _| MeshStats {
                    vertices: m.vertices.saturating_add(m.edges).saturating_add(m.polygons),
                    edges: m
                        .edges
                        .saturating_mul(2)
                        .saturating_add(m.polygons.saturating_mul(4)),
                    polygons: m.polygons.saturating_mul(4),
                })
            }
            ModifierKind::Array => {
                let count = self.number("count", 2.0).clamp(1.0, MAX_ARRAY_COUNT) as u64;
                scale_stats(mesh, count)
            }
            ModifierKind::Mirror => {
                let axes = self
                    .properties
                    .get("use_axis")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter(|v| v.as_bool() == Some(true)).count())
                    .unwrap_or(1)
                    .min(3) as u32;
                scale_stats(mesh, 2u64.pow(axes))
            }
            ModifierKind::Decimate => {
                let ratio = self.number("ratio", 1.0).clamp(0.0, 1.0);
                let shrink = |n: u64| ((n as f64) * ratio).round() as u64;
                MeshStats {
                    vertices: shrink(mesh.vertices),
                    edges: shrink(mesh.edges),
                    polygons: shrink(mesh.polygons),
                }
            }
            _ => mesh,
        }
    }
}

fn scale_stats(mesh: MeshStats, factor: u64) -> MeshStats {
    MeshStats {
        vertices: mesh.vertices.saturating_mul(factor),
        edges: mesh.edges.saturating_mul(factor),
        polygons: mesh.polygons.saturating_mul(factor),
    }
}

/// Pick a modifier name not already used on the stack
pub fn unique_modifier_name(stack: &[Modifier], requested: &str) -> String {
    if !stack.iter().any(|m| m.name == requested) {
        return requested.to_string();
    }
    (1..)
        .map(|n| format!("{}.{:03}", requested, n))
        .find(|candidate| !stack.iter().any(|m| &m.name == candidate))
        .unwrap_or_else(|| requested.to_string())
}
