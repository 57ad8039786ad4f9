// Scene graph owned by the host main thread.
// Objects are addressed by unique name; the host resolves name collisions Blender-style ("Cube.001").

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::modifier::Modifier;

/// Mesh primitive shapes the host can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Cube,
    UvSphere,
    IcoSphere,
    Cylinder,
    Cone,
    Plane,
    Torus,
    Monkey,
}

/// Light flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Point,
    Sun,
    Spot,
    Area,
}

/// What an object is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "variant")]
pub enum ObjectKind {
    Mesh(Primitive),
    Camera,
    Light(LightKind),
    Empty,
}

impl ObjectKind {
    /// Host type tag as reported to controllers
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Mesh(_) => "MESH",
            ObjectKind::Camera => "CAMERA",
            ObjectKind::Light(_) => "LIGHT",
            ObjectKind::Empty => "EMPTY",
        }
    }

    /// Name given to a new object when none is requested
    pub fn default_name(&self) -> &'static str {
        match self {
            ObjectKind::Mesh(Primitive::Cube) => "Cube",
            ObjectKind::Mesh(Primitive::UvSphere) => "Sphere",
            ObjectKind::Mesh(Primitive::IcoSphere) => "Icosphere",
            ObjectKind::Mesh(Primitive::Cylinder) => "Cylinder",
            ObjectKind::Mesh(Primitive::Cone) => "Cone",
            ObjectKind::Mesh(Primitive::Plane) => "Plane",
            ObjectKind::Mesh(Primitive::Torus) => "Torus",
            ObjectKind::Mesh(Primitive::Monkey) => "Suzanne",
            ObjectKind::Camera => "Camera",
            ObjectKind::Light(_) => "Light",
            ObjectKind::Empty => "Empty",
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, ObjectKind::Mesh(_))
    }
}

/// Returned when a type string names nothing the host can create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized object type '{}'", self.0)
    }
}

impl FromStr for ObjectKind {
    type Err = UnknownKind;

    /// Case-insensitive; accepts both primitive names and the generic kinds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "cube" => ObjectKind::Mesh(Primitive::Cube),
            "sphere" | "uv_sphere" | "uvsphere" => ObjectKind::Mesh(Primitive::UvSphere),
            "ico_sphere" | "icosphere" => ObjectKind::Mesh(Primitive::IcoSphere),
            "cylinder" => ObjectKind::Mesh(Primitive::Cylinder),
            "cone" => ObjectKind::Mesh(Primitive::Cone),
            "plane" => ObjectKind::Mesh(Primitive::Plane),
            "torus" => ObjectKind::Mesh(Primitive::Torus),
            "monkey" | "suzanne" => ObjectKind::Mesh(Primitive::Monkey),
            "camera" => ObjectKind::Camera,
            "light" | "point" | "point_light" => ObjectKind::Light(LightKind::Point),
            "sun" => ObjectKind::Light(LightKind::Sun),
            "spot" => ObjectKind::Light(LightKind::Spot),
            "area" => ObjectKind::Light(LightKind::Area),
            "empty" => ObjectKind::Empty,
            _ => return Err(UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Location, euler rotation (radians) and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    pub fn at(location: [f64; 3]) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }
}

/// Topology counts of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub vertices: u64,
    pub edges: u64,
    pub polygons: u64,
}

impl MeshStats {
    /// Counts for the host's default primitive settings
    pub fn for_primitive(primitive: Primitive) -> Self {
        let (vertices, edges, polygons) = match primitive {
            Primitive::Cube => (8, 12, 6),
            Primitive::UvSphere => (482, 992, 512),
            Primitive::IcoSphere => (42, 120, 80),
            Primitive::Cylinder => (64, 96, 34),
            Primitive::Cone => (33, 64, 33),
            Primitive::Plane => (4, 4, 1),
            Primitive::Torus => (576, 1152, 576),
            Primitive::Monkey => (507, 1005, 500),
        };
        Self {
            vertices,
            edges,
            polygons,
        }
    }
}

/// Named material with a base color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub color: [f32; 4],
}

/// One entity in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub visible: bool,
    /// Material names, one per slot
    pub materials: Vec<String>,
    pub mesh: Option<MeshStats>,
    pub modifiers: Vec<Modifier>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind, transform: Transform) -> Self {
        let mesh = match kind {
            ObjectKind::Mesh(primitive) => Some(MeshStats::for_primitive(primitive)),
            _ => None,
        };
        Self {
            name: name.into(),
            kind,
            transform,
            visible: true,
            materials: Vec::new(),
            mesh,
            modifiers: Vec::new(),
        }
    }
}

/// The scene: objects, materials, selection and the active camera
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    objects: Vec<SceneObject>,
    materials: HashMap<String, Material>,
    selected: Vec<String>,
    active: Option<String>,
    /// Explicit render camera; falls back to the first camera object
    pub camera: Option<String>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::empty()
    }
}

impl Scene {
    pub fn empty() -> Self {
        Self {
            name: "Scene".to_string(),
            objects: Vec::new(),
            materials: HashMap::new(),
            selected: Vec::new(),
            active: None,
            camera: None,
        }
    }

    /// The host's startup scene: a cube, a camera and a light
    pub fn startup() -> Self {
        let mut scene = Self::empty();
        scene.add_object("Cube", ObjectKind::Mesh(Primitive::Cube), Transform::default());
        let camera = scene.add_object(
            "Camera",
            ObjectKind::Camera,
            Transform {
                location: [7.36, -6.93, 4.96],
                rotation: [1.11, 0.0, 0.81],
                scale: [1.0; 3],
            },
        );
        scene.add_object(
            "Light",
            ObjectKind::Light(LightKind::Point),
            Transform::at([4.08, 1.0, 5.9]),
        );
        scene.camera = Some(camera);
        scene
    }

    /// Add an object, disambiguating its name if taken. Returns the final name.
    pub fn add_object(&mut self, name: &str, kind: ObjectKind, transform: Transform) -> String {
        let name = self.unique_name(name);
        self.objects.push(SceneObject::new(name.clone(), kind, transform));
        name
    }

    /// Add a fully built object, disambiguating its name if taken
    pub fn insert(&mut self, mut object: SceneObject) -> String {
        object.name = self.unique_name(&object.name);
        let name = object.name.clone();
        self.objects.push(object);
        name
    }

    /// Remove an object and every reference to it
    pub fn remove(&mut self, name: &str) -> Option<SceneObject> {
        let idx = self.objects.iter().position(|o| o.name == name)?;
        let object = self.objects.remove(idx);
        self.selected.retain(|n| n != name);
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        if self.camera.as_deref() == Some(name) {
            self.camera = None;
        }
        Some(object)
    }

    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Update the selection. All names must exist or nothing changes.
    /// Returns the first missing name on failure.
    pub fn select(&mut self, names: &[String], exclusive: bool) -> Result<(), String> {
        if let Some(missing) = names.iter().find(|n| !self.contains(n)) {
            return Err(missing.clone());
        }
        if exclusive {
            self.selected.clear();
        }
        for name in names {
            if !self.selected.contains(name) {
                self.selected.push(name.clone());
            }
        }
        match names.first() {
            Some(first) => self.active = Some(first.clone()),
            None if exclusive => self.active = None,
            None => {}
        }
        Ok(())
    }

    /// Camera used for final renders
    pub fn render_camera(&self) -> Option<&SceneObject> {
        self.camera
            .as_deref()
            .and_then(|name| self.get(name))
            .or_else(|| self.objects.iter().find(|o| o.kind == ObjectKind::Camera))
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn materials_count(&self) -> usize {
        self.materials.len()
    }

    /// Create or recolor a material
    pub fn upsert_material(&mut self, name: &str, color: [f32; 4]) {
        self.materials.insert(
            name.to_string(),
            Material {
                name: name.to_string(),
                color,
            },
        );
    }

    /// Put `material` in the first slot of `object`. Returns false if the object is missing.
    pub fn assign_material(&mut self, object: &str, material: &str) -> bool {
        let Some(obj) = self.get_mut(object) else {
            return false;
        };
        if obj.materials.is_empty() {
            obj.materials.push(material.to_string());
        } else {
            obj.materials[0] = material.to_string();
        }
        true
    }

    /// Base color of an object's first material, if any
    pub fn object_color(&self, object: &SceneObject) -> Option<[f32; 4]> {
        object
            .materials
            .first()
            .and_then(|m| self.materials.get(m))
            .map(|m| m.color)
    }

    /// "Cube" -> "Cube" if free, else "Cube.001", "Cube.002", ...
    fn unique_name(&self, requested: &str) -> String {
        let requested = if requested.trim().is_empty() {
            "Object"
        } else {
            requested
        };
        if !self.contains(requested) {
            return requested.to_string();
        }

        let base = split_numeric_suffix(requested);
        (1..)
            .map(|n| format!("{}.{:03}", base, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| requested.to_string())
    }
}

/// Strip a trailing ".NNN" so "Cube.001" disambiguates to "Cube.002", not "Cube.001.001"
fn split_numeric_suffix(name: &str) -> &str {
    static SUFFIX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(.+)\.\d{3,}$").ok());
    SUFFIX
        .as_ref()
        .and_then(|re| re.captures(name))
        .and_then(|caps| caps.get(1))
        .map(|m| &name[m.start()..m.end()])
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_kinds_case_insensitively() {
        assert_eq!("SPHERE".parse::<ObjectKind>(), Ok(ObjectKind::Mesh(Primitive::UvSphere)));
        assert_eq!("Camera".parse::<ObjectKind>(), Ok(ObjectKind::Camera));
        assert_eq!("light".parse::<ObjectKind>(), Ok(ObjectKind::Light(LightKind::Point)));
        assert_eq!("sun".parse::<ObjectKind>(), Ok(ObjectKind::Light(LightKind::Sun)));
        assert_eq!(
            "teapot".parse::<ObjectKind>(),
            Err(UnknownKind("teapot".to_string()))
        );
    }

    #[test]
    fn startup_scene_has_cube_camera_light() {
        let scene = Scene::startup();
        let names: Vec<&str> = scene.objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Cube", "Camera", "Light"]);
        assert_eq!(scene.render_camera().unwrap().name, "Camera");
    }

    #[test]
    fn name_collisions_get_numeric_suffixes() {
        let mut scene = Scene::empty();
        let cube = ObjectKind::Mesh(Primitive::Cube);
        assert_eq!(scene.add_object("Cube", cube, Transform::default()), "Cube");
        assert_eq!(scene.add_object("Cube", cube, Transform::default()), "Cube.001");
        assert_eq!(scene.add_object("Cube", cube, Transform::default()), "Cube.002");
        assert_eq!(scene.add_object("Cube.001", cube, Transform::default()), "Cube.003");
    }

    #[test]
    fn blank_name_falls_back_to_object() {
        let mut scene = Scene::empty();
        assert_eq!(scene.add_object("  ", ObjectKind::Empty, Transform::default()), "Object");
    }

    #[test]
    fn mesh_objects_get_primitive_stats() {
        let obj = SceneObject::new("Cube", ObjectKind::Mesh(Primitive::Cube), Transform::default());
        assert_eq!(
            obj.mesh,
            Some(MeshStats {
                vertices: 8,
                edges: 12,
                polygons: 6
            })
        );
        let cam = SceneObject::new("Camera", ObjectKind::Camera, Transform::default());
        assert!(cam.mesh.is_none());
    }

    #[test]
    fn select_is_all_or_nothing() {
        let mut scene = Scene::startup();
        scene.select(&["Cube".to_string()], true).unwrap();

        let err = scene.select(&["Light".to_string(), "Ghost".to_string()], true);
        assert_eq!(err, Err("Ghost".to_string()));
        assert_eq!(scene.selected(), ["Cube".to_string()]);
        assert_eq!(scene.active(), Some("Cube"));
    }

    #[test]
    fn additive_select_keeps_existing_selection() {
        let mut scene = Scene::startup();
        scene.select(&["Cube".to_string()], true).unwrap();
        scene.select(&["Light".to_string()], false).unwrap();
        assert_eq!(scene.selected(), ["Cube".to_string(), "Light".to_string()]);
        assert_eq!(scene.active(), Some("Light"));
    }

    #[test]
    fn empty_exclusive_select_clears_active() {
        let mut scene = Scene::startup();
        scene.select(&["Cube".to_string()], true).unwrap();

        scene.select(&[], false).unwrap();
        assert_eq!(scene.active(), Some("Cube"));

        scene.select(&[], true).unwrap();
        assert!(scene.selected().is_empty());
        assert!(scene.active().is_none());
    }

    #[test]
    fn remove_clears_selection_and_camera() {
        let mut scene = Scene::startup();
        scene.select(&["Camera".to_string()], true).unwrap();
        assert!(scene.remove("Camera").is_some());
        assert!(scene.selected().is_empty());
        assert!(scene.active().is_none());
        assert!(scene.render_camera().is_none());
        assert!(scene.remove("Camera").is_none());
    }

    #[test]
    fn assign_material_fills_first_slot() {
        let mut scene = Scene::startup();
        scene.upsert_material("Red", [1.0, 0.0, 0.0, 1.0]);
        assert!(scene.assign_material("Cube", "Red"));
        assert!(!scene.assign_material("Ghost", "Red"));

        let cube = scene.get("Cube").unwrap();
        assert_eq!(cube.materials, vec!["Red".to_string()]);
        assert_eq!(scene.object_color(cube), Some([1.0, 0.0, 0.0, 1.0]));
    }
}
