//! WGSL sources for the three passes.

use crate::animator::animator_wgsl;
use crate::config::EngineConfig;
use crate::generator::generator_wgsl;
use crate::palette::Palette;
use crate::shading::render_wgsl;

/// Generated shader sources, built once per engine configuration.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    /// One-shot compute pass, entry point `generate`.
    pub generate: String,
    /// Per-frame compute pass, entry point `update`.
    pub update: String,
    /// Billboard pass, entry points `vs_main` and `fs_main`.
    pub render: String,
}

impl ShaderSet {
    pub fn new(config: &EngineConfig, palette: &Palette) -> Self {
        Self {
            generate: generator_wgsl(&config.field, palette),
            update: animator_wgsl(&config.drift),
            render: render_wgsl(&config.shading, config.field.depth_range),
        }
    }
}
