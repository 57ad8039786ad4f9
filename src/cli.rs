use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use crate::bridge::{BridgeClient, Command};
use crate::config::{Config, DEFAULT_CONFIG_FILE};

/// Scenebridge - command bridge for a single-threaded scene host
#[derive(Parser, Debug)]
#[command(name = "sbridge")]
#[command(version)]
#[command(about = "Command bridge for a single-threaded scene host")]
#[command(long_about = "Scenebridge (sbridge) runs a scene host whose state lives on one main thread,
and a loopback socket bridge that lets a controller query and mutate that state.

Every command received on the socket is queued and executed on the host's main
thread, one per idle tick, in arrival order.

Quick start:
  1. Run 'sbridge --init' to generate a config file
  2. Run 'sbridge' to start the host and bridge
  3. From another terminal: 'sbridge scene', 'sbridge create sphere --name Ball'")]
pub struct Cli {
    /// Path to config file (defaults to .scenebridge.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Initialize a new .scenebridge.toml config file
    #[arg(long)]
    pub init: bool,

    /// Address to bind or connect to (overrides config file setting)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind or connect to (overrides config file setting)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Subcommand; runs the host and bridge when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands. Everything except `serve` talks to a running bridge.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the host and the bridge (default)
    Serve,
    /// Check that the bridge and host are responsive
    Ping,
    /// List the commands the bridge understands
    #[command(name = "commands")]
    BridgeHelp,
    /// Summarize the scene
    Scene {
        /// Maximum number of objects to list
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Show full details of one object
    Object {
        /// Object name
        name: String,
    },
    /// Create an object (cube, sphere, cylinder, camera, light, empty, ...)
    Create {
        /// Object type
        kind: String,
        /// Requested name (the host disambiguates collisions)
        #[arg(long)]
        name: Option<String>,
        /// Location as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        location: Option<[f64; 3]>,
        /// Rotation in radians as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        rotation: Option<[f64; 3]>,
        /// Scale as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        scale: Option<[f64; 3]>,
    },
    /// Change an object's transform or visibility
    Modify {
        /// Object name
        name: String,
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        location: Option<[f64; 3]>,
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        rotation: Option<[f64; 3]>,
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        scale: Option<[f64; 3]>,
        /// Show or hide the object
        #[arg(long)]
        visible: Option<bool>,
    },
    /// Delete an object
    Delete {
        /// Object name
        name: String,
    },
    /// Select objects
    Select {
        /// Object names
        #[arg(required = true)]
        names: Vec<String>,
        /// Add to the current selection instead of replacing it
        #[arg(long)]
        add: bool,
    },
    /// Run a Lua script in the host
    Exec {
        /// Script source, or '-' to read from stdin
        code: Option<String>,
        /// Read the script from a file
        #[arg(long, short = 'f', conflicts_with = "code")]
        file: Option<PathBuf>,
    },
    /// Capture the 3D viewport
    Screenshot {
        /// Largest allowed image side in pixels
        #[arg(long)]
        max_size: Option<u32>,
        /// Write the PNG here instead of printing base64
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Render through the scene camera
    Render {
        #[arg(long)]
        resolution_x: Option<u32>,
        #[arg(long)]
        resolution_y: Option<u32>,
        #[arg(long)]
        samples: Option<u32>,
        /// Write the PNG here instead of printing base64
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Send a raw command
    Send {
        /// Command name
        name: String,
        /// Parameters as a JSON object
        params: Option<String>,
    },
}

/// Parse "x,y,z" into a vector
pub fn parse_vec3(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{}'", s));
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("'{}' is not a number", part))?;
    }
    Ok(out)
}

/// Put `value` under `key` only when present
fn set_opt<T: serde::Serialize>(params: &mut Value, key: &str, value: &Option<T>) {
    if let Some(v) = value {
        params[key] = json!(v);
    }
}

/// Build the bridge command a client subcommand sends.
/// Returns `None` for `serve`, which runs locally.
pub fn build_command(command: &Commands) -> anyhow::Result<Option<Command>> {
    let built = match command {
        Commands::Serve => return Ok(None),
        Commands::Ping => Command::new("ping"),
        Commands::BridgeHelp => Command::new("help"),
        Commands::Scene { limit } => {
            let mut params = json!({});
            set_opt(&mut params, "limit", limit);
            Command::with_params("get_scene_info", params)
        }
        Commands::Object { name } => Command::with_params("get_object_info", json!({"name": name})),
        Commands::Create {
            kind,
            name,
            location,
            rotation,
            scale,
        } => {
            let mut params = json!({"type": kind});
            set_opt(&mut params, "name", name);
            set_opt(&mut params, "location", location);
            set_opt(&mut params, "rotation", rotation);
            set_opt(&mut params, "scale", scale);
            Command::with_params("create_object", params)
        }
        Commands::Modify {
            name,
            location,
            rotation,
            scale,
            visible,
        } => {
            let mut params = json!({"name": name});
            set_opt(&mut params, "location", location);
            set_opt(&mut params, "rotation", rotation);
            set_opt(&mut params, "scale", scale);
            set_opt(&mut params, "visible", visible);
            Command::with_params("modify_object", params)
        }
        Commands::Delete { name } => Command::with_params("delete_object", json!({"name": name})),
        Commands::Select { names, add } => Command::with_params(
            "select_objects",
            json!({"names": names, "deselect_all": !add}),
        ),
        Commands::Exec { code, file } => {
            let source = match (code.as_deref(), file) {
                (_, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read script '{}'", path.display()))?,
                (Some("-"), None) => std::io::read_to_string(std::io::stdin())
                    .context("Failed to read script from stdin")?,
                (Some(code), None) => code.to_string(),
                (None, None) => return Err(anyhow!("exec needs a script or --file")),
            };
            Command::with_params("execute_code", json!({"code": source}))
        }
        Commands::Screenshot { max_size, .. } => {
            let mut params = json!({});
            set_opt(&mut params, "max_size", max_size);
            Command::with_params("get_viewport_screenshot", params)
        }
        Commands::Render {
            resolution_x,
            resolution_y,
            samples,
            ..
        } => {
            let mut params = json!({});
            set_opt(&mut params, "resolution_x", resolution_x);
            set_opt(&mut params, "resolution_y", resolution_y);
            set_opt(&mut params, "samples", samples);
            Command::with_params("render_image", params)
        }
        Commands::Send { name, params } => {
            let params: Value = match params {
                Some(raw) => serde_json::from_str(raw)
                    .with_context(|| format!("Parameters are not valid JSON: {}", raw))?,
                None => json!({}),
            };
            if !params.is_object() {
                return Err(anyhow!("Parameters must be a JSON object"));
            }
            Command::with_params(name.clone(), params)
        }
    };
    Ok(Some(built))
}

/// Decode the image in a capture result to `path`, replacing the inline
/// base64 with the file location
pub fn save_image(result: &mut Value, path: &Path) -> anyhow::Result<()> {
    let encoded = result
        .get("image_data")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Response has no image data"))?;
    let bytes = STANDARD
        .decode(encoded)
        .context("Image data is not valid base64")?;
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write image to '{}'", path.display()))?;

    if let Some(obj) = result.as_object_mut() {
        obj.remove("image_data");
        obj.insert("saved_to".to_string(), json!(path.display().to_string()));
        obj.insert("bytes".to_string(), json!(bytes.len()));
    }
    Ok(())
}

/// Initialize a new config file with the defaults
pub fn init_config(config_path: &str) -> anyhow::Result<()> {
    if Path::new(config_path).exists() {
        println!("Config file '{}' already exists.", config_path);
        return Ok(());
    }

    let config = Config::default();
    config
        .save(config_path)
        .with_context(|| format!("Failed to write config to '{}'", config_path))?;

    // Append a commented-out asset library example
    use std::fs::OpenOptions;
    use std::io::Write;
    let mut file = OpenOptions::new()
        .append(true)
        .open(config_path)
        .with_context(|| format!("Failed to append to '{}'", config_path))?;
    writeln!(file, "\n# Directories of .scene assets for list_assets / append_asset")?;
    writeln!(file, "# [[asset_libraries]]")?;
    writeln!(file, "# name = \"props\"")?;
    writeln!(file, "# path = \"assets/props\"")?;

    println!("Created {}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit {} to change the port or add asset libraries", config_path);
    println!("  2. Run 'sbridge' to start the host and bridge");
    Ok(())
}

/// Load the config file (defaults if missing), apply CLI overrides, validate
pub fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from '{}'", cli.config))?;
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.validate()?;
    Ok(config)
}

/// Run a client command against a running bridge and print the response
pub async fn run_bridge_command(config: &Config, command: &Commands) -> anyhow::Result<()> {
    let Some(request) = build_command(command)? else {
        return Err(anyhow!("serve does not talk to a bridge"));
    };
    let addr = format!("{}:{}", config.host, config.port);

    let mut client = BridgeClient::connect(&addr)
        .await
        .with_context(|| format!("Could not connect to bridge at {}. Is 'sbridge' running?", addr))?;

    let mut response = client
        .call(&request)
        .await
        .with_context(|| format!("Failed to communicate with bridge at {}", addr))?;

    let output = match command {
        Commands::Screenshot { output, .. } | Commands::Render { output, .. } => output.as_ref(),
        _ => None,
    };
    if let (Some(path), Some(result)) = (output, response.result.as_mut()) {
        save_image(result, path)?;
    }

    // Print response as JSON
    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);

    // Exit with error code if command failed
    if !response.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
