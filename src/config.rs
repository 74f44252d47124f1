use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use tickboy_core::config::{Config, DmaLockout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DmaMode {
    /// CPU limited to I/O and HRAM while DMA runs.
    #[default]
    Strict,
    /// Only OAM is blocked.
    Relaxed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Stop after this many frames.
    pub frames: Option<u64>,
    /// Echo serial output to stdout.
    pub serial: bool,
    pub vram_lock: bool,
    pub oam_lock: bool,
    pub dma: DmaMode,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frames: None,
            serial: true,
            vram_lock: true,
            oam_lock: true,
            dma: DmaMode::default(),
        }
    }
}

impl RunnerConfig {
    pub fn core_config(&self) -> Config {
        Config {
            vram_lock: self.vram_lock,
            oam_lock: self.oam_lock,
            dma_lockout: match self.dma {
                DmaMode::Strict => DmaLockout::HighPageOnly,
                DmaMode::Relaxed => DmaLockout::OamOnly,
            },
        }
    }
}

/// Read a runner config. A missing file gives the defaults; a malformed one
/// is reported and also falls back to the defaults.
pub fn load_from_file(path: &Path) -> RunnerConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!("Cannot read config {}: {e}; using defaults", path.display());
            return RunnerConfig::default();
        }
    };

    match toml::from_str::<RunnerConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            RunnerConfig::default()
        }
    }
}
