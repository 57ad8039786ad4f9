// Command dispatch table: command names and aliases map onto BridgeCommand variants.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::host::Host;

use super::error::BridgeError;
use super::handlers::{self, assets, capture, code, meta, modifiers, scene};
use super::protocol::{Command, Response};

pub const DEFAULT_SCREENSHOT_MAX_SIZE: u32 = 800;

/// A parsed, parameter-checked command
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Ping,
    Help,
    SceneInfo(scene::SceneInfoParams),
    ObjectInfo(scene::ObjectRef),
    CreateObject(scene::CreateObjectParams),
    ModifyObject(scene::ModifyObjectParams),
    DeleteObject(scene::ObjectRef),
    SelectObjects(scene::SelectParams),
    ExecuteCode(code::ExecuteCodeParams),
    Screenshot(capture::ScreenshotParams),
    Render(capture::RenderParams),
    GetModifiers(modifiers::ObjectNameParams),
    AddModifier(modifiers::AddModifierParams),
    RemoveModifier(modifiers::ModifierRef),
    ApplyModifier(modifiers::ModifierRef),
    GetAssetLibraries,
    ListAssets(assets::ListAssetsParams),
    AppendAsset(assets::AppendAssetParams),
}

impl BridgeCommand {
    pub fn parse(command: Command) -> Result<Self, BridgeError> {
        let Command { name, params } = command;
        let params = Value::Object(params);

        let parsed = match name.as_str() {
            "ping" => BridgeCommand::Ping,
            "help" | "commands" => BridgeCommand::Help,
            "get_scene_info" | "scene_info" => BridgeCommand::SceneInfo(params_for(&name, params)?),
            "get_object_info" | "object_info" => BridgeCommand::ObjectInfo(params_for(&name, params)?),
            "create_object" => BridgeCommand::CreateObject(params_for(&name, params)?),
            "modify_object" => BridgeCommand::ModifyObject(params_for(&name, params)?),
            "delete_object" => BridgeCommand::DeleteObject(params_for(&name, params)?),
            "select_objects" => BridgeCommand::SelectObjects(params_for(&name, params)?),
            "execute_code" => BridgeCommand::ExecuteCode(params_for(&name, params)?),
            "get_viewport_screenshot" | "screenshot" => {
                BridgeCommand::Screenshot(params_for(&name, params)?)
            }
            "render_image" | "render" => BridgeCommand::Render(params_for(&name, params)?),
            "get_modifiers" => BridgeCommand::GetModifiers(params_for(&name, params)?),
            "add_modifier" => BridgeCommand::AddModifier(params_for(&name, params)?),
            "remove_modifier" => BridgeCommand::RemoveModifier(params_for(&name, params)?),
            "apply_modifier" => BridgeCommand::ApplyModifier(params_for(&name, params)?),
            "get_asset_libraries" => BridgeCommand::GetAssetLibraries,
            "list_assets" => BridgeCommand::ListAssets(params_for(&name, params)?),
            "append_asset" => BridgeCommand::AppendAsset(params_for(&name, params)?),
            _ => return Err(BridgeError::UnknownCommand(name)),
        };
        Ok(parsed)
    }
}

fn params_for<T: DeserializeOwned>(command: &str, params: Value) -> Result<T, BridgeError> {
    serde_json::from_value(params).map_err(|e| BridgeError::invalid_params(command, e.to_string()))
}

/// One entry of the `help` catalogue
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// (name, required)
    pub args: &'static [(&'static str, bool)],
}

pub const CATALOGUE: &[CommandSpec] = &[
    CommandSpec {
        name: "ping",
        aliases: &[],
        description: "Check that the host is responsive",
        args: &[],
    },
    CommandSpec {
        name: "help",
        aliases: &["commands"],
        description: "List every command the bridge understands",
        args: &[],
    },
    CommandSpec {
        name: "get_scene_info",
        aliases: &["scene_info"],
        description: "Summarize the scene and its objects",
        args: &[("limit", false)],
    },
    CommandSpec {
        name: "get_object_info",
        aliases: &["object_info"],
        description: "Full details of one object",
        args: &[("name", true)],
    },
    CommandSpec {
        name: "create_object",
        aliases: &[],
        description: "Create a primitive, camera, light or empty",
        args: &[
            ("type", true),
            ("name", false),
            ("location", false),
            ("rotation", false),
            ("scale", false),
        ],
    },
    CommandSpec {
        name: "modify_object",
        aliases: &[],
        description: "Change an object's transform or visibility",
        args: &[
            ("name", true),
            ("location", false),
            ("rotation", false),
            ("scale", false),
            ("visible", false),
        ],
    },
    CommandSpec {
        name: "delete_object",
        aliases: &[],
        description: "Remove an object from the scene",
        args: &[("name", true)],
    },
    CommandSpec {
        name: "select_objects",
        aliases: &[],
        description: "Select objects, replacing or extending the selection",
        args: &[("names", true), ("deselect_all", false)],
    },
    CommandSpec {
        name: "execute_code",
        aliases: &[],
        description: "Run a Lua script in the host and return its printed output",
        args: &[("code", true)],
    },
    CommandSpec {
        name: "get_viewport_screenshot",
        aliases: &["screenshot"],
        description: "Capture the 3D viewport as a PNG",
        args: &[("max_size", false)],
    },
    CommandSpec {
        name: "render_image",
        aliases: &["render"],
        description: "Render the scene through its camera as a PNG",
        args: &[("resolution_x", false), ("resolution_y", false), ("samples", false)],
    },
    CommandSpec {
        name: "get_modifiers",
        aliases: &[],
        description: "List an object's modifier stack",
        args: &[("object_name", true)],
    },
    CommandSpec {
        name: "add_modifier",
        aliases: &[],
        description: "Add a modifier to a mesh object",
        args: &[
            ("object_name", true),
            ("modifier_type", true),
            ("modifier_name", false),
            ("properties", false),
        ],
    },
    CommandSpec {
        name: "remove_modifier",
        aliases: &[],
        description: "Remove a modifier from an object",
        args: &[("object_name", true), ("modifier_name", true)],
    },
    CommandSpec {
        name: "apply_modifier",
        aliases: &[],
        description: "Bake a modifier into the object's mesh",
        args: &[("object_name", true), ("modifier_name", true)],
    },
    CommandSpec {
        name: "get_asset_libraries",
        aliases: &[],
        description: "List configured asset libraries",
        args: &[],
    },
    CommandSpec {
        name: "list_assets",
        aliases: &[],
        description: "List assets in a library",
        args: &[
            ("library_name", true),
            ("search", false),
            ("offset", false),
            ("limit", false),
        ],
    },
    CommandSpec {
        name: "append_asset",
        aliases: &[],
        description: "Append an asset's objects to the scene",
        args: &[("library_name", true), ("asset_name", true), ("location", false)],
    },
];

/// Routes commands to their handlers against the host state
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    screenshot_max_size: u32,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SCREENSHOT_MAX_SIZE)
    }
}

impl CommandDispatcher {
    pub fn new(screenshot_max_size: u32) -> Self {
        Self { screenshot_max_size }
    }

    /// Parse and run one command. Never fails: every error becomes an error response.
    pub fn dispatch(&self, host: &mut Host, command: Command) -> Response {
        let name = command.name.clone();
        let result = BridgeCommand::parse(command).and_then(|cmd| self.execute(host, cmd));
        match &result {
            Ok(_) => debug!(command = %name, "command succeeded"),
            Err(e) => warn!(command = %name, kind = ?e.kind(), error = %e, "command failed"),
        }
        result.into()
    }

    pub fn execute(&self, host: &mut Host, command: BridgeCommand) -> handlers::HandlerResult {
        match command {
            BridgeCommand::Ping => meta::ping(host),
            BridgeCommand::Help => meta::help(),
            BridgeCommand::SceneInfo(p) => scene::scene_info(host, p),
            BridgeCommand::ObjectInfo(p) => scene::object_info(host, p),
            BridgeCommand::CreateObject(p) => scene::create_object(host, p),
            BridgeCommand::ModifyObject(p) => scene::modify_object(host, p),
            BridgeCommand::DeleteObject(p) => scene::delete_object(host, p),
            BridgeCommand::SelectObjects(p) => scene::select_objects(host, p),
            BridgeCommand::ExecuteCode(p) => code::execute_code(host, p),
            BridgeCommand::Screenshot(p) => capture::screenshot(host, p, self.screenshot_max_size),
            BridgeCommand::Render(p) => capture::render(host, p),
            BridgeCommand::GetModifiers(p) => modifiers::get_modifiers(host, p),
            BridgeCommand::AddModifier(p) => modifiers::add_modifier(host, p),
            BridgeCommand::RemoveModifier(p) => modifiers::remove_modifier(host, p),
            BridgeCommand::ApplyModifier(p) => modifiers::apply_modifier(host, p),
            BridgeCommand::GetAssetLibraries => assets::get_asset_libraries(host),
            BridgeCommand::ListAssets(p) => assets::list_assets(host, p),
            BridgeCommand::AppendAsset(p) => assets::append_asset(host, p),
        }
    }
}
