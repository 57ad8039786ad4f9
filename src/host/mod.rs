//! The single-threaded host.
//!
//! [`Host`] owns every piece of mutable state the bridge can reach. It is not
//! `Sync` in spirit: only the thread driving [`HostApp::run`] ever touches it.
//! Connection tasks reach it exclusively through the main-thread scheduler.

pub mod assets;
pub mod image;
pub mod layout;
pub mod modifier;
pub mod render;
pub mod scene;
pub mod script;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::bridge::dispatch::CommandDispatcher;
use crate::bridge::scheduler::MainThreadScheduler;

use assets::AssetLibrary;
use image::PixelBuffer;
use layout::{ActiveContext, AreaKind, ContextGuard, ContextOverride, Layout, ViewState};
use render::{CAMERA_ORTHO_SCALE, MAX_RESOLUTION, RenderError, RenderPass};
use scene::Scene;

/// Defaults used by `render_image` when the controller omits them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub samples: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution_x: 1920,
            resolution_y: 1080,
            samples: 128,
        }
    }
}

/// All host state
#[derive(Debug)]
pub struct Host {
    pub scene: Scene,
    pub layout: Layout,
    pub context: ActiveContext,
    pub render_settings: RenderSettings,
    pub asset_libraries: Vec<AssetLibrary>,
    /// Idle ticks completed so far
    pub frame: u64,
}

impl Host {
    pub fn new(scene: Scene, layout: Layout) -> Self {
        Self {
            scene,
            layout,
            context: ActiveContext::default(),
            render_settings: RenderSettings::default(),
            asset_libraries: Vec::new(),
            frame: 0,
        }
    }

    pub fn with_asset_libraries(mut self, libraries: Vec<AssetLibrary>) -> Self {
        self.asset_libraries = libraries;
        self
    }

    /// Make `target` the active context until the returned guard drops
    pub fn temp_override(&mut self, target: ContextOverride) -> ContextGuard<'_> {
        ContextGuard::install(self, target)
    }

    pub fn asset_library(&self, name: &str) -> Option<&AssetLibrary> {
        self.asset_libraries.iter().find(|l| l.name == name)
    }

    /// Draw the active viewport region at its native size.
    ///
    /// Only valid while the active context points at a VIEW_3D area, which is
    /// never the case for code running from the idle tick unless an override
    /// is installed.
    pub fn render_viewport(&self) -> Result<PixelBuffer, RenderError> {
        let target = self
            .context
            .target
            .ok_or_else(|| RenderError::NoViewportContext("none".to_string()))?;
        let area = self
            .layout
            .area(&target)
            .ok_or_else(|| RenderError::NoViewportContext("none".to_string()))?;
        if area.kind != AreaKind::View3d {
            return Err(RenderError::NoViewportContext(area.kind.type_name().to_string()));
        }
        let region = self
            .layout
            .region(&target)
            .ok_or_else(|| RenderError::NoViewportContext(area.kind.type_name().to_string()))?;

        Ok(render::rasterize(
            &self.scene,
            &area.view,
            RenderPass {
                width: region.width,
                height: region.height,
                samples: 1,
                overlays: true,
            },
        ))
    }

    /// Final render through the scene camera
    pub fn render_camera(&self, width: u32, height: u32, samples: u32) -> Result<PixelBuffer, RenderError> {
        if !(1..=MAX_RESOLUTION).contains(&width) || !(1..=MAX_RESOLUTION).contains(&height) {
            return Err(RenderError::BadResolution { width, height });
        }
        let camera = self.scene.render_camera().ok_or(RenderError::NoCamera)?;
        let t = &camera.transform;
        let view = ViewState {
            center: [t.location[0], t.location[1]],
            extent: CAMERA_ORTHO_SCALE * t.scale[0].abs().max(0.01),
        };

        Ok(render::rasterize(
            &self.scene,
            &view,
            RenderPass {
                width,
                height,
                samples,
                overlays: false,
            },
        ))
    }
}

/// The host's main loop: owns the host state and drains the scheduler from
/// its idle tick.
pub struct HostApp {
    host: Host,
    scheduler: MainThreadScheduler,
    dispatcher: CommandDispatcher,
}

impl HostApp {
    pub fn new(host: Host, scheduler: MainThreadScheduler, dispatcher: CommandDispatcher) -> Self {
        Self {
            host,
            scheduler,
            dispatcher,
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn scheduler(&self) -> &MainThreadScheduler {
        &self.scheduler
    }

    /// One idle tick: run at most one pending command, then the host's own
    /// per-frame work. Returns true if a command ran.
    pub fn tick(&mut self) -> bool {
        let Self {
            host,
            scheduler,
            dispatcher,
        } = self;
        let ran = scheduler.run_once(|command| dispatcher.dispatch(host, command));
        host.frame += 1;
        ran
    }

    /// Tick every `interval` until `stop` is set, then fail whatever is
    /// still queued.
    pub fn run(&mut self, stop: &AtomicBool, interval: Duration) {
        info!(interval_ms = interval.as_millis() as u64, "host loop started");
        while !stop.load(Ordering::SeqCst) {
            self.tick();
            std::thread::sleep(interval);
        }
        let failed = self.scheduler.shutdown();
        info!(frames = self.host.frame, failed, "host loop stopped");
    }
}

impl Drop for HostApp {
    fn drop(&mut self) {
        if !self.scheduler.is_closed() {
            debug!("host dropped without shutdown, closing scheduler");
            self.scheduler.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::{Command, ErrorKind};
    use serde_json::json;

    fn app(host: Host) -> HostApp {
        HostApp::new(host, MainThreadScheduler::new(), CommandDispatcher::default())
    }

    #[test]
    fn viewport_render_needs_an_override() {
        let mut host = Host::new(Scene::startup(), Layout::with_viewport(32, 24));
        assert!(matches!(host.render_viewport(), Err(RenderError::NoViewportContext(_))));

        let target = host.layout.find_viewport().unwrap();
        let guard = host.temp_override(target);
        let img = guard.render_viewport().unwrap();
        assert_eq!((img.width(), img.height()), (32, 24));
    }

    #[test]
    fn viewport_render_rejects_non_viewport_area() {
        let mut host = Host::new(Scene::startup(), Layout::with_viewport(32, 24));
        // Area 0 is the outliner
        let guard = host.temp_override(ContextOverride {
            window: 0,
            area: 0,
            region: 0,
        });
        assert_eq!(
            guard.render_viewport(),
            Err(RenderError::NoViewportContext("OUTLINER".to_string()))
        );
    }

    #[test]
    fn camera_render_validates_inputs() {
        let host = Host::new(Scene::startup(), Layout::headless());
        assert_eq!(
            host.render_camera(0, 10, 1).unwrap_err(),
            RenderError::BadResolution { width: 0, height: 10 }
        );
        let img = host.render_camera(16, 9, 4).unwrap();
        assert_eq!((img.width(), img.height()), (16, 9));

        let empty = Host::new(Scene::empty(), Layout::headless());
        assert_eq!(empty.render_camera(16, 9, 1).unwrap_err(), RenderError::NoCamera);
    }

    #[test]
    fn tick_runs_one_command_per_frame() {
        let mut app = app(Host::new(Scene::startup(), Layout::headless()));
        let scheduler = app.scheduler().clone();

        let submitters: Vec<_> = (0..2)
            .map(|_| {
                let s = scheduler.clone();
                std::thread::spawn(move || s.submit_blocking(Command::new("ping")))
            })
            .collect();
        while scheduler.pending() < 2 {
            std::thread::yield_now();
        }

        assert!(app.tick());
        assert_eq!(scheduler.pending(), 1);
        assert!(app.tick());
        assert!(!app.tick());
        assert_eq!(app.host().frame, 3);

        for handle in submitters {
            assert!(handle.join().unwrap().is_success());
        }
    }

    #[test]
    fn run_force_fails_pending_work_on_stop() {
        let mut app = app(Host::new(Scene::startup(), Layout::headless()));
        let scheduler = app.scheduler().clone();
        let stop = AtomicBool::new(true);

        let waiter = {
            let s = scheduler.clone();
            std::thread::spawn(move || s.submit_blocking(Command::with_params("delete_object", json!({"name": "Cube"}))))
        };
        while scheduler.pending() < 1 {
            std::thread::yield_now();
        }

        app.run(&stop, Duration::from_millis(1));
        let response = waiter.join().unwrap();
        assert_eq!(response.kind, Some(ErrorKind::HostUnavailable));
        assert!(app.host().scene.contains("Cube"));
    }
}
