use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::assets::AssetLibrary;
use crate::host::layout::Layout;
use crate::host::render::MAX_RESOLUTION;
use crate::host::scene::Scene;

pub const DEFAULT_CONFIG_FILE: &str = ".scenebridge.toml";
pub const DEFAULT_PORT: u16 = 9876;

const MIN_FRAME_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub tick_interval_ms: u64,
    pub max_frame_bytes: usize,
    pub screenshot_max_size: u32,
    pub startup_scene: StartupScene,
    /// Run without any 3D viewport (screenshots fail with CaptureError)
    pub headless: bool,
    pub viewport: ViewportConfig,
    pub logging: LoggingConfig,
    pub asset_libraries: Vec<AssetLibrary>,

    // This field is not serialized, just used at runtime
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupScene {
    #[default]
    Default,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            tick_interval_ms: 10,
            max_frame_bytes: 16 * 1024 * 1024,
            screenshot_max_size: 800,
            startup_scene: StartupScene::Default,
            headless: false,
            viewport: ViewportConfig::default(),
            logging: LoggingConfig::default(),
            asset_libraries: Vec::new(),
            config_path: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_path = Some(PathBuf::from(path));
        Ok(config)
    }

    /// Like `from_file`, but a missing file yields the defaults
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("host must not be empty");
        }
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be at least 1");
        }
        if self.max_frame_bytes < MIN_FRAME_BYTES {
            anyhow::bail!(
                "max_frame_bytes must be at least {} (got {})",
                MIN_FRAME_BYTES,
                self.max_frame_bytes
            );
        }
        if self.screenshot_max_size == 0 {
            anyhow::bail!("screenshot_max_size must be at least 1");
        }
        if !self.headless && (self.viewport.width == 0 || self.viewport.height == 0) {
            anyhow::bail!(
                "viewport size {}x{} is empty",
                self.viewport.width,
                self.viewport.height
            );
        }
        if self.viewport.width > MAX_RESOLUTION || self.viewport.height > MAX_RESOLUTION {
            anyhow::bail!(
                "viewport size {}x{} exceeds {} on a side",
                self.viewport.width,
                self.viewport.height,
                MAX_RESOLUTION
            );
        }

        let mut names: HashSet<&str> = HashSet::new();
        for library in &self.asset_libraries {
            if !names.insert(&library.name) {
                anyhow::bail!("Duplicate asset library name '{}'", library.name);
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn initial_scene(&self) -> Scene {
        match self.startup_scene {
            StartupScene::Default => Scene::startup(),
            StartupScene::Empty => Scene::empty(),
        }
    }

    pub fn layout(&self) -> Layout {
        if self.headless {
            Layout::headless()
        } else {
            Layout::with_viewport(self.viewport.width, self.viewport.height)
        }
    }
}
