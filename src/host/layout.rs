// Window layout and the active context.
// Capture code installs an explicit override through ContextGuard.

use std::ops::{Deref, DerefMut};

use super::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    View3d,
    Properties,
    Outliner,
    Timeline,
    ImageEditor,
}

impl AreaKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            AreaKind::View3d => "VIEW_3D",
            AreaKind::Properties => "PROPERTIES",
            AreaKind::Outliner => "OUTLINER",
            AreaKind::Timeline => "TIMELINE",
            AreaKind::ImageEditor => "IMAGE_EDITOR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Window,
    Header,
    Ui,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub kind: RegionKind,
    pub width: u32,
    pub height: u32,
}

/// Orthographic view state of a 3D viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// World-space point at the center of the view
    pub center: [f64; 2],
    /// World units visible across the shorter side
    pub extent: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            extent: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub kind: AreaKind,
    pub regions: Vec<Region>,
    pub view: ViewState,
}

impl Area {
    pub fn new(kind: AreaKind, regions: Vec<Region>) -> Self {
        Self {
            kind,
            regions,
            view: ViewState::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub areas: Vec<Area>,
}

/// Every window the host has open
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub windows: Vec<Window>,
}

impl Layout {
    /// A single window with a 3D viewport sized `width` x `height` beside an outliner
    pub fn with_viewport(width: u32, height: u32) -> Self {
        let viewport = Area::new(
            AreaKind::View3d,
            vec![
                Region {
                    kind: RegionKind::Header,
                    width,
                    height: 26,
                },
                Region {
                    kind: RegionKind::Window,
                    width,
                    height,
                },
                Region {
                    kind: RegionKind::Ui,
                    width: 240,
                    height,
                },
            ],
        );
        let outliner = Area::new(
            AreaKind::Outliner,
            vec![Region {
                kind: RegionKind::Window,
                width: 300,
                height,
            }],
        );
        Self {
            windows: vec![Window {
                areas: vec![outliner, viewport],
            }],
        }
    }

    /// A layout with no 3D viewport anywhere
    pub fn headless() -> Self {
        let properties = Area::new(
            AreaKind::Properties,
            vec![Region {
                kind: RegionKind::Window,
                width: 400,
                height: 600,
            }],
        );
        Self {
            windows: vec![Window {
                areas: vec![properties],
            }],
        }
    }

    /// First VIEW_3D area that has a WINDOW region
    pub fn find_viewport(&self) -> Option<ContextOverride> {
        self.windows.iter().enumerate().find_map(|(w, window)| {
            window.areas.iter().enumerate().find_map(|(a, area)| {
                if area.kind != AreaKind::View3d {
                    return None;
                }
                area.regions
                    .iter()
                    .position(|r| r.kind == RegionKind::Window)
                    .map(|r| ContextOverride {
                        window: w,
                        area: a,
                        region: r,
                    })
            })
        })
    }

    pub fn area(&self, target: &ContextOverride) -> Option<&Area> {
        self.windows.get(target.window)?.areas.get(target.area)
    }

    pub fn region(&self, target: &ContextOverride) -> Option<&Region> {
        self.area(target)?.regions.get(target.region)
    }
}

/// Indices of the window/area/region to treat as current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOverride {
    pub window: usize,
    pub area: usize,
    pub region: usize,
}

/// What the host considers "current" for context-sensitive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveContext {
    pub target: Option<ContextOverride>,
}

/// Scoped context override. Dereferences to the host; restores the previous
/// context on drop.
pub struct ContextGuard<'a> {
    host: &'a mut Host,
    previous: ActiveContext,
}

impl<'a> ContextGuard<'a> {
    pub(super) fn install(host: &'a mut Host, target: ContextOverride) -> Self {
        let previous = host.context;
        host.context = ActiveContext {
            target: Some(target),
        };
        Self { host, previous }
    }
}

impl Deref for ContextGuard<'_> {
    type Target = Host;

    fn deref(&self) -> &Host {
        self.host
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Host {
        self.host
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.host.context = self.previous;
    }
}
