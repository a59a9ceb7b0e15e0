use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::kernel::{Kernel, KernelError, Normalization};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub still: StillConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_fps")]
    pub fps: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KernelConfig {
    #[serde(default = "default_kernel_size")]
    pub size: usize,
    /// Row-major weights; all ones when omitted.
    #[serde(default)]
    pub weights: Option<Vec<f32>>,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub bias: f32,
    #[serde(default)]
    pub anchor: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_live_stages")]
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StillConfig {
    /// Image loaded as the static frame source at startup.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_still_stages")]
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One filter stage as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    ChannelRemap {
        channel: usize,
        #[serde(default)]
        op: RemapOp,
    },
    Convolution {
        #[serde(default)]
        border: BorderPolicy,
        #[serde(default)]
        output: OutputDepth,
    },
    Flip {
        axis: FlipAxis,
    },
}

/// Byte transform applied by a channel remap stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemapOp {
    /// `(2 * x) mod 256`. Wraps instead of saturating.
    #[default]
    Double,
    /// `255 - x`.
    Invert,
}

/// Rule for sourcing neighbours that fall outside the frame during convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderPolicy {
    /// Mirror around the edge pixel without repeating it: `dcb|abcd|cba`.
    #[default]
    Reflect101,
    /// Repeat the edge pixel: `aaa|abcd|ddd`.
    Replicate,
}

/// Channel layout of a convolution stage's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDepth {
    /// Convert to luma first and produce a single-channel frame.
    #[default]
    Grayscale,
    /// Filter every channel independently, keeping the input layout.
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    /// Mirror left/right (reverse column order).
    Horizontal,
    /// Mirror top/bottom (reverse row order).
    Vertical,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            size: default_kernel_size(),
            weights: None,
            normalization: Normalization::default(),
            bias: 0.0,
            anchor: None,
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            stages: default_live_stages(),
        }
    }
}

impl Default for StillConfig {
    fn default() -> Self {
        Self {
            path: None,
            stages: default_still_stages(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl KernelConfig {
    /// Materialize the configured kernel.
    pub fn build(&self) -> Result<Kernel, KernelError> {
        let kernel = match &self.weights {
            Some(weights) => Kernel::from_weights(self.size, weights.clone())?,
            None => Kernel::filled(self.size, 1.0)?,
        };
        let kernel = kernel
            .with_normalization(self.normalization)
            .with_bias(self.bias);
        match self.anchor {
            Some((row, col)) => kernel.with_anchor(row, col),
            None => Ok(kernel),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_width() -> usize {
    640
}
fn default_height() -> usize {
    480
}
fn default_fps() -> f64 {
    30.0
}
fn default_kernel_size() -> usize {
    3
}
fn default_live_stages() -> Vec<StageConfig> {
    vec![
        StageConfig::ChannelRemap {
            channel: 0,
            op: RemapOp::Double,
        },
        StageConfig::Flip {
            axis: FlipAxis::Horizontal,
        },
    ]
}
fn default_still_stages() -> Vec<StageConfig> {
    vec![StageConfig::Convolution {
        border: BorderPolicy::Reflect101,
        output: OutputDepth::Grayscale,
    }]
}
fn default_refresh_ms() -> u64 {
    33
}
fn default_log_level() -> String {
    "info".into()
}
