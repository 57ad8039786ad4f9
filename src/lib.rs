// Library exports for scenebridge
// This allows the test suite to import modules

pub mod bridge;
pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
